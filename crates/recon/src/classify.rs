//! Derived views over the unified record set. Every view is a pure filter or
//! projection; records are cloned, never mutated.

use crate::config::ReconConfig;
use crate::model::{
    DealerBucket, ListingTask, RemovalCandidate, RemovalSplit, TaskKind, UnifiedRecord,
    UploadCandidate,
};

/// DMS vehicles whose identifier starts with `prefix`.
pub fn dealer_bucket(records: &[UnifiedRecord], prefix: &str) -> Vec<UnifiedRecord> {
    records
        .iter()
        .filter(|r| r.in_primary_system && r.identifier.has_prefix(prefix))
        .cloned()
        .collect()
}

/// One bucket per configured dealer, in config order. Empty buckets are kept.
pub fn dealer_buckets(records: &[UnifiedRecord], config: &ReconConfig) -> Vec<DealerBucket> {
    config
        .dealers
        .iter()
        .map(|d| DealerBucket {
            dealer: d.name.clone(),
            prefix: d.prefix.clone(),
            records: dealer_bucket(records, &d.prefix),
        })
        .collect()
}

/// DMS vehicles missing from at least one channel.
pub fn upload_candidates(records: &[UnifiedRecord], config: &ReconConfig) -> Vec<UploadCandidate> {
    records
        .iter()
        .filter(|r| r.in_primary_system)
        .filter_map(|r| {
            let missing: Vec<&str> = r
                .missing_channels()
                .map(|l| channel_label(config, &l.channel))
                .collect();
            if missing.is_empty() {
                return None;
            }
            Some(UploadCandidate {
                identifier: r.identifier.clone(),
                make: r.vehicle.make.clone(),
                model: r.vehicle.model.clone(),
                note: format!("Add to {}", missing.join(", ")),
                done: String::new(),
            })
        })
        .collect()
}

/// Listed identifiers the DMS does not carry, split by prefix recognition.
pub fn removal_candidates(records: &[UnifiedRecord], config: &ReconConfig) -> RemovalSplit {
    let mut split = RemovalSplit::default();
    for r in records.iter().filter(|r| !r.in_primary_system) {
        let candidate = RemovalCandidate {
            identifier: r.identifier.clone(),
            listings: r.listings.clone(),
            done: String::new(),
        };
        if config.recognizes(&r.identifier) {
            split.recognized.push(candidate);
        } else {
            split.foreign.push(candidate);
        }
    }
    split
}

/// Listing-quality tasks: fix-listing tasks in record order, then one removal
/// task per removal candidate in record order.
///
/// A fix-listing note names only the first channel (in channel order) the
/// vehicle is missing from.
pub fn listing_tasks(records: &[UnifiedRecord], config: &ReconConfig) -> Vec<ListingTask> {
    let threshold = f64::from(config.tasks.photo_threshold);
    let mut tasks = Vec::new();

    for r in records.iter().filter(|r| r.in_primary_system) {
        if r.vehicle.photo_count_value() <= threshold {
            continue;
        }
        if let Some(first_missing) = r.missing_channels().next() {
            tasks.push(ListingTask {
                task: TaskKind::FixListing,
                identifier: r.identifier.clone(),
                note: format!(
                    "Photo count > {} but missing on {}",
                    config.tasks.photo_threshold,
                    channel_label(config, &first_missing.channel)
                ),
            });
        }
    }

    for r in records.iter().filter(|r| !r.in_primary_system) {
        tasks.push(ListingTask {
            task: TaskKind::RemoveFromSite,
            identifier: r.identifier.clone(),
            note: "Website-only".into(),
        });
    }

    tasks
}

fn channel_label<'a>(config: &'a ReconConfig, key: &'a str) -> &'a str {
    config.channel(key).map(|c| c.label.as_str()).unwrap_or(key)
}
