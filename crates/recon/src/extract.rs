//! One parametrized extractor for every source.
//!
//! A source differs from another only in its column aliases, its rename map
//! and the set of columns it retains, so all of that lives in [`SourceSpec`].

use std::collections::BTreeMap;

use tracing::{debug, warn};

use crate::config::{ChannelConfig, DmsConfig};
use crate::error::ReconError;
use crate::model::{Table, Vehicle, VehicleField};
use crate::normalize::{resolve_column, StockId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceSpec {
    pub name: String,
    /// Identifier column aliases, highest priority first.
    pub id_columns: Vec<String>,
    /// Price column aliases, highest priority first. Empty = no prices.
    pub price_columns: Vec<String>,
    /// Columns retained per identifier, named after renames.
    pub keep_columns: Vec<String>,
    /// Raw header -> canonical header.
    pub renames: BTreeMap<String, String>,
}

impl SourceSpec {
    pub fn for_dms(dms: &DmsConfig) -> Self {
        Self {
            name: "dms".into(),
            id_columns: dms.id_columns.clone(),
            price_columns: Vec::new(),
            keep_columns: VehicleField::ALL.iter().map(|f| f.column().to_string()).collect(),
            renames: dms.renames.clone(),
        }
    }

    pub fn for_channel(channel: &ChannelConfig) -> Self {
        Self {
            name: channel.key.clone(),
            id_columns: channel.id_columns.clone(),
            price_columns: channel.price_columns.clone(),
            keep_columns: Vec::new(),
            renames: BTreeMap::new(),
        }
    }

    /// Error for a source whose input could not be found at all.
    pub fn missing(&self, detail: impl Into<String>) -> ReconError {
        ReconError::MissingSource {
            source: self.name.clone(),
            detail: detail.into(),
        }
    }
}

/// Identifier-keyed contribution of one source.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extraction {
    pub source: String,
    /// Retained columns per identifier (empty maps for listing channels).
    pub fields: BTreeMap<StockId, BTreeMap<String, String>>,
    /// Price per identifier; "" when the source has no price column.
    pub prices: BTreeMap<StockId, String>,
    /// Rows dropped for a blank identifier.
    pub dropped_rows: usize,
    /// Rows that repeated an identifier already seen (last one wins).
    pub duplicate_rows: usize,
}

impl Extraction {
    pub fn empty(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            ..Default::default()
        }
    }

    /// Degrade recoverable failures to an empty contribution.
    ///
    /// Non-recoverable errors still degrade, but are logged at error level
    /// since they indicate an I/O problem rather than an absent export.
    pub fn or_empty(result: Result<Extraction, ReconError>, source: &str) -> Extraction {
        match result {
            Ok(extraction) => extraction,
            Err(err) if err.is_recoverable() => {
                warn!(source, error = %err, "source contributes no records");
                Extraction::empty(source)
            }
            Err(err) => {
                tracing::error!(source, error = %err, "source unreadable; contributing no records");
                Extraction::empty(source)
            }
        }
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn contains(&self, id: &StockId) -> bool {
        self.fields.contains_key(id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &StockId> {
        self.fields.keys()
    }

    pub fn price(&self, id: &StockId) -> &str {
        self.prices.get(id).map(String::as_str).unwrap_or("")
    }

    /// Fold another file of the same source into this one. Later rows win.
    pub fn merge(&mut self, other: Extraction) {
        self.dropped_rows += other.dropped_rows;
        self.duplicate_rows += other.duplicate_rows;
        for (id, fields) in other.fields {
            if self.fields.insert(id, fields).is_some() {
                self.duplicate_rows += 1;
            }
        }
        self.prices.extend(other.prices);
    }

    /// Typed DMS view of the retained fields.
    pub fn vehicles(&self) -> BTreeMap<StockId, Vehicle> {
        self.fields
            .iter()
            .map(|(id, fields)| (id.clone(), Vehicle::from_fields(fields)))
            .collect()
    }
}

/// Extract one table according to `spec`.
///
/// Fails only with `SchemaMismatch` when no identifier alias is present;
/// blank identifiers are dropped and counted.
pub fn extract(spec: &SourceSpec, table: &Table) -> Result<Extraction, ReconError> {
    let headers: Vec<String> = table
        .headers
        .iter()
        .map(|h| {
            let h = h.trim();
            spec.renames.get(h).cloned().unwrap_or_else(|| h.to_string())
        })
        .collect();

    let (id_idx, id_alias) = resolve_column(&headers, &spec.id_columns).ok_or_else(|| {
        ReconError::SchemaMismatch {
            source: spec.name.clone(),
            expected: spec.id_columns.clone(),
            found: headers.clone(),
        }
    })?;
    let price_idx = resolve_column(&headers, &spec.price_columns).map(|(idx, _)| idx);

    let kept = kept_columns(spec, &table.headers, &headers);

    let mut out = Extraction::empty(&spec.name);
    for row in 0..table.rows.len() {
        let Some(id) = StockId::parse(table.cell(row, id_idx)) else {
            out.dropped_rows += 1;
            continue;
        };

        let fields: BTreeMap<String, String> = kept
            .iter()
            .map(|(idx, name)| (name.clone(), table.cell(row, *idx).trim().to_string()))
            .collect();
        let price = price_idx
            .map(|idx| table.cell(row, idx).trim().to_string())
            .unwrap_or_default();

        if out.fields.insert(id.clone(), fields).is_some() {
            out.duplicate_rows += 1;
        }
        out.prices.insert(id, price);
    }

    debug!(
        source = %spec.name,
        id_column = id_alias,
        price_column = price_idx.map(|i| headers[i].as_str()).unwrap_or("-"),
        records = out.len(),
        dropped = out.dropped_rows,
        duplicates = out.duplicate_rows,
        "extracted source"
    );

    Ok(out)
}

/// Resolve retained columns to header indices. When a renamed header and a
/// header already carrying the canonical name both exist, the renamed one wins.
fn kept_columns(spec: &SourceSpec, raw: &[String], renamed: &[String]) -> Vec<(usize, String)> {
    spec.keep_columns
        .iter()
        .filter_map(|name| {
            let via_rename = renamed
                .iter()
                .zip(raw)
                .position(|(r, orig)| r == name && orig.trim() != name.as_str());
            via_rename
                .or_else(|| renamed.iter().position(|r| r == name))
                .map(|idx| (idx, name.clone()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ReconConfig;

    fn table(headers: &[&str], rows: &[&[&str]]) -> Table {
        Table::new(
            headers.iter().map(|s| s.to_string()).collect(),
            rows.iter()
                .map(|r| r.iter().map(|s| s.to_string()).collect())
                .collect(),
        )
    }

    fn channel_spec(key: &str) -> SourceSpec {
        let config = ReconConfig::default();
        SourceSpec::for_channel(config.channel(key).unwrap())
    }

    #[test]
    fn autotrader_alias_and_price_priority() {
        let t = table(
            &["Ref", "Price", "PriceFormatted"],
            &[&["uf001 ", "100000", "R 100 000"], &["UF002", "95000", "R 95 000"]],
        );
        let out = extract(&channel_spec("autotrader"), &t).unwrap();
        assert_eq!(out.len(), 2);
        let id = StockId::parse("UF001").unwrap();
        assert!(out.contains(&id));
        // PriceFormatted outranks Price
        assert_eq!(out.price(&id), "R 100 000");
    }

    #[test]
    fn missing_price_column_yields_empty_price() {
        let t = table(&["Reference", "Make"], &[&["UA10", "Nissan"]]);
        let out = extract(&channel_spec("cars"), &t).unwrap();
        assert_eq!(out.price(&StockId::parse("UA10").unwrap()), "");
    }

    #[test]
    fn schema_mismatch_when_no_id_alias() {
        let t = table(&["Make", "Price"], &[&["Ford", "1"]]);
        let err = extract(&channel_spec("pmg_web"), &t).unwrap_err();
        assert!(matches!(err, ReconError::SchemaMismatch { .. }));
        assert!(err.is_recoverable());
    }

    #[test]
    fn blank_identifiers_dropped() {
        let t = table(&["SKU"], &[&["  "], &[""], &["ug5"]]);
        let out = extract(&channel_spec("pmg_web"), &t).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out.dropped_rows, 2);
    }

    #[test]
    fn duplicate_rows_last_wins() {
        let t = table(&["SKU", "Price"], &[&["UF1", "10"], &["uf1", "20"]]);
        let out = extract(&channel_spec("pmg_web"), &t).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out.duplicate_rows, 1);
        assert_eq!(out.price(&StockId::parse("UF1").unwrap()), "20");
    }

    #[test]
    fn dms_allow_list_and_rename() {
        let spec = SourceSpec::for_dms(&ReconConfig::default().dms);
        let t = table(
            &["Stock Number", "Make", "Customer Order", "Vehicle Code", "Photo Count"],
            &[&[" uf001", " Ford ", "Yes", "VC1", "3"]],
        );
        let out = extract(&spec, &t).unwrap();
        let id = StockId::parse("UF001").unwrap();
        let fields = &out.fields[&id];
        assert_eq!(fields.get("Make").map(String::as_str), Some("Ford"));
        assert_eq!(fields.get("Customer Ordered").map(String::as_str), Some("Yes"));
        assert!(!fields.contains_key("Vehicle Code"));
        assert!(!fields.contains_key("Customer Order"));

        let vehicles = out.vehicles();
        assert_eq!(vehicles[&id].customer_ordered, "Yes");
        assert_eq!(vehicles[&id].photo_count, "3");
    }

    #[test]
    fn renamed_header_beats_canonical_header() {
        let spec = SourceSpec::for_dms(&ReconConfig::default().dms);
        let t = table(
            &["Stock Number", "Customer Ordered", "Customer Order"],
            &[&["UF1", "old", "new"]],
        );
        let out = extract(&spec, &t).unwrap();
        let fields = &out.fields[&StockId::parse("UF1").unwrap()];
        assert_eq!(fields.get("Customer Ordered").map(String::as_str), Some("new"));
    }

    #[test]
    fn merge_later_file_wins() {
        let spec = channel_spec("autotrader");
        let mut first = extract(&spec, &table(&["StockNumber", "Price"], &[&["UF1", "1"], &["UF2", "2"]])).unwrap();
        let second = extract(&spec, &table(&["StockNumber", "Price"], &[&["uf2", "22"], &["UF3", "3"]])).unwrap();
        first.merge(second);
        assert_eq!(first.len(), 3);
        assert_eq!(first.duplicate_rows, 1);
        assert_eq!(first.price(&StockId::parse("UF2").unwrap()), "22");
    }

    #[test]
    fn or_empty_degrades_missing_source() {
        let spec = channel_spec("cars");
        let out = Extraction::or_empty(Err(spec.missing("no files matched")), "cars");
        assert!(out.is_empty());
        assert_eq!(out.source, "cars");
    }
}
