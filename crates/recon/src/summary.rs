use std::collections::BTreeMap;

use crate::classify::dealer_bucket;
use crate::config::ReconConfig;
use crate::model::{ListingTask, ReconSummary, RemovalSplit, UnifiedRecord, UploadCandidate};

/// Count records per source and per dealer.
pub fn compute_summary(records: &[UnifiedRecord], config: &ReconConfig) -> ReconSummary {
    let mut per_channel: BTreeMap<String, usize> =
        config.channels.iter().map(|c| (c.key.clone(), 0)).collect();
    let mut in_primary_system = 0;

    for r in records {
        if r.in_primary_system {
            in_primary_system += 1;
        }
        for listing in r.listings.iter().filter(|l| l.present) {
            *per_channel.entry(listing.channel.clone()).or_insert(0) += 1;
        }
    }

    let per_dealer = config
        .dealers
        .iter()
        .map(|d| (d.name.clone(), dealer_bucket(records, &d.prefix).len()))
        .collect();

    ReconSummary {
        total_records: records.len(),
        in_primary_system,
        not_in_primary_system: records.len() - in_primary_system,
        per_channel,
        per_dealer,
        ..Default::default()
    }
}

/// Fill in the counts of the derived action lists.
pub fn with_action_counts(
    mut summary: ReconSummary,
    uploads: &[UploadCandidate],
    removals: &RemovalSplit,
    tasks: &[ListingTask],
) -> ReconSummary {
    summary.upload_candidates = uploads.len();
    summary.removal_recognized = removals.recognized.len();
    summary.removal_foreign = removals.foreign.len();
    summary.tasks = tasks.len();
    summary
}
