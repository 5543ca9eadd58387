use std::collections::BTreeSet;

use tracing::debug;

use crate::config::PresenceOverride;
use crate::extract::Extraction;
use crate::model::{Listing, UnifiedRecord, Vehicle};
use crate::normalize::StockId;

/// Build one unified record per identifier in the union of all sources.
///
/// Records come out in ascending identifier order. `channels` pairs each
/// channel key with its extraction, in channel order; `overrides` are applied
/// after membership so they win over whatever the channel export says.
pub fn reconcile(
    dms: &Extraction,
    channels: &[(&str, &Extraction)],
    overrides: &[PresenceOverride],
) -> Vec<UnifiedRecord> {
    let mut all_ids: BTreeSet<&StockId> = dms.ids().collect();
    for (_, channel) in channels {
        all_ids.extend(channel.ids());
    }

    let vehicles = dms.vehicles();
    let mut forced = 0usize;

    let records: Vec<UnifiedRecord> = all_ids
        .into_iter()
        .map(|id| {
            let (in_primary_system, vehicle) = match vehicles.get(id) {
                Some(v) => (true, v.clone()),
                None => (false, Vehicle::default()),
            };

            let mut listings: Vec<Listing> = channels
                .iter()
                .map(|(key, channel)| Listing {
                    channel: key.to_string(),
                    present: channel.contains(id),
                    price: channel.price(id).to_string(),
                })
                .collect();

            for ov in overrides.iter().filter(|ov| id.has_prefix(&ov.prefix)) {
                if let Some(listing) = listings.iter_mut().find(|l| l.channel == ov.channel) {
                    if !listing.present {
                        forced += 1;
                    }
                    listing.present = true;
                }
            }

            UnifiedRecord {
                identifier: id.clone(),
                in_primary_system,
                vehicle,
                listings,
            }
        })
        .collect();

    debug!(
        records = records.len(),
        dms = dms.len(),
        forced_present = forced,
        "reconciled sources"
    );

    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn id(s: &str) -> StockId {
        StockId::parse(s).unwrap()
    }

    fn source(name: &str, entries: &[(&str, &str)]) -> Extraction {
        let mut out = Extraction::empty(name);
        for (raw, price) in entries {
            out.fields.insert(id(raw), BTreeMap::new());
            out.prices.insert(id(raw), price.to_string());
        }
        out
    }

    fn dms(entries: &[(&str, &str)]) -> Extraction {
        let mut out = Extraction::empty("dms");
        for (raw, make) in entries {
            let mut fields = BTreeMap::new();
            fields.insert("Make".to_string(), make.to_string());
            out.fields.insert(id(raw), fields);
        }
        out
    }

    fn ue_cars() -> Vec<PresenceOverride> {
        vec![PresenceOverride {
            prefix: "UE".into(),
            channel: "cars".into(),
        }]
    }

    #[test]
    fn union_in_ascending_order() {
        let d = dms(&[("UF002", "Ford")]);
        let cars = source("cars", &[("UA001", "1")]);
        let at = source("autotrader", &[("UG009", "2"), ("UF002", "3")]);
        let records = reconcile(&d, &[("cars", &cars), ("autotrader", &at)], &[]);
        let ids: Vec<&str> = records.iter().map(|r| r.identifier.as_str()).collect();
        assert_eq!(ids, vec!["UA001", "UF002", "UG009"]);
    }

    #[test]
    fn dms_fields_copied_only_when_present() {
        let d = dms(&[("UF002", "Ford")]);
        let at = source("autotrader", &[("XX1", "")]);
        let records = reconcile(&d, &[("autotrader", &at)], &[]);
        let uf = records.iter().find(|r| r.identifier.as_str() == "UF002").unwrap();
        assert!(uf.in_primary_system);
        assert_eq!(uf.vehicle.make, "Ford");
        let xx = records.iter().find(|r| r.identifier.as_str() == "XX1").unwrap();
        assert!(!xx.in_primary_system);
        assert_eq!(xx.vehicle, Vehicle::default());
    }

    #[test]
    fn listings_follow_channel_order_with_prices() {
        let d = dms(&[("UF1", "Ford")]);
        let cars = source("cars", &[]);
        let at = source("autotrader", &[("UF1", "R 1")]);
        let records = reconcile(&d, &[("cars", &cars), ("autotrader", &at)], &[]);
        let r = &records[0];
        assert_eq!(r.listings[0].channel, "cars");
        assert!(!r.listings[0].present);
        assert_eq!(r.listings[0].price, "");
        assert_eq!(r.listings[1].channel, "autotrader");
        assert!(r.listings[1].present);
        assert_eq!(r.listings[1].price, "R 1");
    }

    #[test]
    fn override_forces_presence() {
        let d = dms(&[("UE002", "Suzuki"), ("UF001", "Ford")]);
        let cars = source("cars", &[]);
        let records = reconcile(&d, &[("cars", &cars)], &ue_cars());
        let ue = records.iter().find(|r| r.identifier.as_str() == "UE002").unwrap();
        assert!(ue.is_present_on("cars"));
        // Price is not invented by the override
        assert_eq!(ue.listing("cars").unwrap().price, "");
        let uf = records.iter().find(|r| r.identifier.as_str() == "UF001").unwrap();
        assert!(!uf.is_present_on("cars"));
    }

    #[test]
    fn override_for_absent_channel_is_ignored() {
        let d = dms(&[("UE002", "Suzuki")]);
        let at = source("autotrader", &[]);
        let records = reconcile(&d, &[("autotrader", &at)], &ue_cars());
        assert_eq!(records[0].listings.len(), 1);
        assert!(!records[0].is_present_on("autotrader"));
    }

    #[test]
    fn empty_inputs_yield_no_records() {
        let records = reconcile(&Extraction::empty("dms"), &[], &ue_cars());
        assert!(records.is_empty());
    }
}
