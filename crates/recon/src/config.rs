use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::ReconError;
use crate::normalize::StockId;
use crate::views::{file_stem, sheet_name, FIXED_VIEWS};

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Every fixed table the engine consults. Each section defaults to the
/// reference dealership group, so an empty document is a complete config.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReconConfig {
    pub name: String,
    pub dms: DmsConfig,
    /// Listing channels in iteration order (notes and tasks follow it).
    pub channels: Vec<ChannelConfig>,
    pub dealers: Vec<DealerPrefix>,
    pub overrides: Vec<PresenceOverride>,
    pub tasks: TaskConfig,
}

impl Default for ReconConfig {
    fn default() -> Self {
        Self {
            name: "Dealer stock reconciliation".into(),
            dms: DmsConfig::default(),
            channels: default_channels(),
            dealers: default_dealers(),
            overrides: default_overrides(),
            tasks: TaskConfig::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// DMS
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct DmsConfig {
    /// Glob patterns relative to the input directory.
    pub files: Vec<String>,
    pub id_columns: Vec<String>,
    /// Historical header spellings, applied before the allow-list filter.
    pub renames: BTreeMap<String, String>,
}

impl Default for DmsConfig {
    fn default() -> Self {
        let mut renames = BTreeMap::new();
        renames.insert("Customer Order".to_string(), "Customer Ordered".to_string());
        Self {
            files: strings(&["pmg_dms_data.csv"]),
            id_columns: strings(&["Stock Number"]),
            renames,
        }
    }
}

// ---------------------------------------------------------------------------
// Channels
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelKind {
    /// Third-party listing site; prices are carried in removal lists.
    Marketplace,
    /// The group's own web store.
    Storefront,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ChannelConfig {
    pub key: String,
    pub label: String,
    pub kind: ChannelKind,
    pub files: Vec<String>,
    pub id_columns: Vec<String>,
    #[serde(default)]
    pub price_columns: Vec<String>,
}

fn default_channels() -> Vec<ChannelConfig> {
    vec![
        ChannelConfig {
            key: "cars".into(),
            label: "Cars".into(),
            kind: ChannelKind::Marketplace,
            files: strings(&["*/cars.xlsx"]),
            id_columns: strings(&["Reference", "Stock Number"]),
            price_columns: strings(&["Price", "price"]),
        },
        ChannelConfig {
            key: "autotrader".into(),
            label: "AutoTrader".into(),
            kind: ChannelKind::Marketplace,
            files: strings(&["*/autotrader.csv"]),
            id_columns: strings(&["StockNumber", "Stock Number", "Reference", "Ref"]),
            price_columns: strings(&["PriceFormatted", "Price", "price"]),
        },
        ChannelConfig {
            key: "pmg_web".into(),
            label: "PMG Web".into(),
            kind: ChannelKind::Storefront,
            files: strings(&["pmg_web_data.csv"]),
            id_columns: strings(&["SKU", "Stock Number"]),
            price_columns: strings(&["Regular price", "Regular Price", "price", "Price"]),
        },
    ]
}

// ---------------------------------------------------------------------------
// Dealers + overrides
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DealerPrefix {
    pub name: String,
    pub prefix: String,
}

fn default_dealers() -> Vec<DealerPrefix> {
    [
        ("Ford_Nelspruit", "UF"),
        ("Ford_Mazda", "UG"),
        ("Produkta_Nissan", "UA"),
        ("Suzuki_Nelspruit", "UE"),
        ("Ford_Malalane", "US"),
    ]
    .into_iter()
    .map(|(name, prefix)| DealerPrefix {
        name: name.into(),
        prefix: prefix.into(),
    })
    .collect()
}

/// Identifiers with `prefix` always count as present on `channel`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PresenceOverride {
    pub prefix: String,
    pub channel: String,
}

fn default_overrides() -> Vec<PresenceOverride> {
    vec![PresenceOverride {
        prefix: "UE".into(),
        channel: "cars".into(),
    }]
}

// ---------------------------------------------------------------------------
// Tasks
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct TaskConfig {
    /// A listing needs fixing once its photo count exceeds this.
    pub photo_threshold: u32,
}

impl Default for TaskConfig {
    fn default() -> Self {
        Self { photo_threshold: 1 }
    }
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl ReconConfig {
    pub fn from_toml(input: &str) -> Result<Self, ReconError> {
        let config: ReconConfig =
            toml::from_str(input).map_err(|e| ReconError::ConfigParse(e.to_string()))?;
        let config = config.normalized();
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, ReconError> {
        toml::to_string_pretty(self).map_err(|e| ReconError::ConfigParse(e.to_string()))
    }

    /// Canonicalize prefixes the same way identifiers are canonicalized.
    pub fn normalized(mut self) -> Self {
        for dealer in &mut self.dealers {
            dealer.prefix = dealer.prefix.trim().to_uppercase();
        }
        for ov in &mut self.overrides {
            ov.prefix = ov.prefix.trim().to_uppercase();
        }
        self
    }

    pub fn validate(&self) -> Result<(), ReconError> {
        if self.dms.id_columns.is_empty() {
            return Err(ReconError::ConfigValidation(
                "dms: id_columns must not be empty".into(),
            ));
        }

        if self.channels.is_empty() {
            return Err(ReconError::ConfigValidation(
                "at least one channel is required".into(),
            ));
        }

        let mut keys = HashSet::new();
        for channel in &self.channels {
            if channel.key.trim().is_empty() {
                return Err(ReconError::ConfigValidation(
                    "channel key must not be empty".into(),
                ));
            }
            if !keys.insert(channel.key.as_str()) {
                return Err(ReconError::ConfigValidation(format!(
                    "duplicate channel key '{}'",
                    channel.key
                )));
            }
            if channel.id_columns.is_empty() {
                return Err(ReconError::ConfigValidation(format!(
                    "channel '{}': id_columns must not be empty",
                    channel.key
                )));
            }
        }

        // Dealer names become sheet and file names beside the fixed views;
        // Excel compares sheet names case-insensitively.
        let mut sheets: HashSet<String> =
            FIXED_VIEWS.iter().map(|v| sheet_name(v).to_lowercase()).collect();
        let mut stems: HashSet<String> =
            FIXED_VIEWS.iter().map(|v| file_stem(v).to_lowercase()).collect();
        let mut names = HashSet::new();
        let mut prefixes = HashSet::new();
        for dealer in &self.dealers {
            if dealer.name.trim().is_empty() {
                return Err(ReconError::ConfigValidation(format!(
                    "dealer with prefix '{}': name must not be empty",
                    dealer.prefix
                )));
            }
            if !names.insert(dealer.name.as_str()) {
                return Err(ReconError::ConfigValidation(format!(
                    "duplicate dealer name '{}'",
                    dealer.name
                )));
            }
            if FIXED_VIEWS.contains(&dealer.name.as_str()) {
                return Err(ReconError::ConfigValidation(format!(
                    "dealer name '{}' is reserved for a report sheet",
                    dealer.name
                )));
            }
            if !sheets.insert(sheet_name(&dealer.name).to_lowercase())
                || !stems.insert(file_stem(&dealer.name).to_lowercase())
            {
                return Err(ReconError::ConfigValidation(format!(
                    "dealer name '{}' clashes with another sheet or file name",
                    dealer.name
                )));
            }
            if dealer.prefix.is_empty() {
                return Err(ReconError::ConfigValidation(format!(
                    "dealer '{}': prefix must not be empty",
                    dealer.name
                )));
            }
            if !prefixes.insert(dealer.prefix.as_str()) {
                return Err(ReconError::ConfigValidation(format!(
                    "duplicate dealer prefix '{}'",
                    dealer.prefix
                )));
            }
        }

        for ov in &self.overrides {
            if ov.prefix.is_empty() {
                return Err(ReconError::ConfigValidation(
                    "override prefix must not be empty".into(),
                ));
            }
            if !keys.contains(ov.channel.as_str()) {
                return Err(ReconError::UnknownChannel(format!(
                    "override '{}': channel '{}' not found",
                    ov.prefix, ov.channel
                )));
            }
        }

        Ok(())
    }

    pub fn channel(&self, key: &str) -> Option<&ChannelConfig> {
        self.channels.iter().find(|c| c.key == key)
    }

    pub fn channel_keys(&self) -> Vec<String> {
        self.channels.iter().map(|c| c.key.clone()).collect()
    }

    /// Whether `id` carries any dealer's prefix.
    pub fn recognizes(&self, id: &StockId) -> bool {
        self.dealers.iter().any(|d| id.has_prefix(&d.prefix))
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_is_reference_config() {
        let config = ReconConfig::from_toml("").unwrap();
        assert_eq!(config, ReconConfig::default());
        assert_eq!(config.channels.len(), 3);
        assert_eq!(config.dealers.len(), 5);
        assert_eq!(config.overrides[0].prefix, "UE");
        assert_eq!(config.overrides[0].channel, "cars");
        assert_eq!(config.tasks.photo_threshold, 1);
        assert_eq!(
            config.dms.renames.get("Customer Order").map(String::as_str),
            Some("Customer Ordered")
        );
    }

    #[test]
    fn channel_order_is_preserved() {
        let config = ReconConfig::default();
        assert_eq!(config.channel_keys(), vec!["cars", "autotrader", "pmg_web"]);
        assert_eq!(config.channel("pmg_web").unwrap().kind, ChannelKind::Storefront);
    }

    #[test]
    fn parse_custom_channels_and_dealers() {
        let input = r#"
name = "Two Sites"
overrides = []

[[channels]]
key = "autotrader"
label = "AutoTrader"
kind = "marketplace"
files = ["*/autotrader.csv"]
id_columns = ["StockNumber", "Ref"]
price_columns = ["Price"]

[[channels]]
key = "web"
label = "Website"
kind = "storefront"
files = ["web.csv"]
id_columns = ["SKU"]

[[dealers]]
name = "North"
prefix = "nb"

[tasks]
photo_threshold = 5
"#;
        let config = ReconConfig::from_toml(input).unwrap();
        assert_eq!(config.name, "Two Sites");
        assert_eq!(config.channel_keys(), vec!["autotrader", "web"]);
        assert!(config.channel("web").unwrap().price_columns.is_empty());
        // Prefixes are canonicalized like identifiers
        assert_eq!(config.dealers[0].prefix, "NB");
        assert_eq!(config.tasks.photo_threshold, 5);
        assert!(config.overrides.is_empty());
        // Untouched sections keep their defaults
        assert_eq!(config.dms, DmsConfig::default());
    }

    #[test]
    fn default_override_requires_cars_channel() {
        let input = r#"
[[channels]]
key = "web"
label = "Website"
kind = "storefront"
files = ["web.csv"]
id_columns = ["SKU"]
"#;
        let err = ReconConfig::from_toml(input).unwrap_err();
        assert!(err.to_string().contains("'cars'"));

        let fixed = format!("overrides = []\n{input}");
        assert!(ReconConfig::from_toml(&fixed).is_ok());
    }

    #[test]
    fn reject_duplicate_channel_key() {
        let mut config = ReconConfig::default();
        let dup = config.channels[0].clone();
        config.channels.push(dup);
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("duplicate channel key 'cars'"));
    }

    #[test]
    fn reject_empty_id_aliases() {
        let mut config = ReconConfig::default();
        config.channels[1].id_columns.clear();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("autotrader"));
    }

    #[test]
    fn reject_duplicate_prefix() {
        let mut config = ReconConfig::default();
        config.dealers.push(DealerPrefix {
            name: "Other".into(),
            prefix: "UF".into(),
        });
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("'UF'"));
    }

    fn with_dealer(name: &str, prefix: &str) -> ReconConfig {
        let mut config = ReconConfig::default();
        config.dealers.push(DealerPrefix {
            name: name.into(),
            prefix: prefix.into(),
        });
        config
    }

    #[test]
    fn reject_empty_dealer_name() {
        let err = with_dealer("  ", "ZA").validate().unwrap_err();
        assert!(err.to_string().contains("name must not be empty"));
    }

    #[test]
    fn reject_duplicate_dealer_name() {
        let err = with_dealer("Ford_Nelspruit", "ZA").validate().unwrap_err();
        assert!(err.to_string().contains("duplicate dealer name 'Ford_Nelspruit'"));
    }

    #[test]
    fn reject_dealer_named_after_fixed_view() {
        for view in FIXED_VIEWS {
            let err = with_dealer(view, "ZA").validate().unwrap_err();
            assert!(err.to_string().contains("reserved"), "{view}: {err}");
        }
        // Sheet names collide regardless of case
        let err = with_dealer("Summary", "ZA").validate().unwrap_err();
        assert!(err.to_string().contains("clashes"));
    }

    #[test]
    fn reject_dealer_names_equal_after_truncation() {
        let mut config = with_dealer(&format!("{}_North", "X".repeat(31)), "ZA");
        config.dealers.push(DealerPrefix {
            name: format!("{}_South", "X".repeat(31)),
            prefix: "ZB".into(),
        });
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("_South"));
    }

    #[test]
    fn reject_dealer_names_equal_as_file_names() {
        let mut config = with_dealer("Ford Hazyview", "ZA");
        config.dealers.push(DealerPrefix {
            name: "Ford_Hazyview".into(),
            prefix: "ZB".into(),
        });
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("'Ford_Hazyview' clashes"));
    }

    #[test]
    fn reject_unknown_field() {
        let err = ReconConfig::from_toml("nmae = \"typo\"").unwrap_err();
        assert!(matches!(err, ReconError::ConfigParse(_)));
    }

    #[test]
    fn reject_invalid_kind() {
        let input = r#"
overrides = []
[[channels]]
key = "x"
label = "X"
kind = "marketplac"
files = []
id_columns = ["Ref"]
"#;
        assert!(ReconConfig::from_toml(input).is_err());
    }

    #[test]
    fn toml_round_trip_of_reference_config() {
        let config = ReconConfig::default();
        let text = config.to_toml().unwrap();
        assert!(text.contains("[[channels]]"));
        let back = ReconConfig::from_toml(&text).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn recognized_prefixes() {
        let config = ReconConfig::default();
        assert!(config.recognizes(&StockId::parse("uf001").unwrap()));
        assert!(config.recognizes(&StockId::parse("US77").unwrap()));
        assert!(!config.recognizes(&StockId::parse("XX099").unwrap()));
    }
}
