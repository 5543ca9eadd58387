use std::collections::BTreeMap;

use tracing::info;

use crate::classify::{dealer_buckets, listing_tasks, removal_candidates, upload_candidates};
use crate::config::ReconConfig;
use crate::error::ReconError;
use crate::extract::Extraction;
use crate::model::{ReconMeta, ReconReport};
use crate::reconcile::reconcile;
use crate::summary::{compute_summary, with_action_counts};

/// Pre-extracted sources for one run.
#[derive(Debug, Clone, Default)]
pub struct ReconInput {
    pub dms: Extraction,
    /// Channel key -> merged extraction. Channels absent here contribute nothing.
    pub channels: BTreeMap<String, Extraction>,
}

impl ReconInput {
    pub fn new(dms: Extraction) -> Self {
        Self {
            dms,
            channels: BTreeMap::new(),
        }
    }

    pub fn with_channel(mut self, key: impl Into<String>, extraction: Extraction) -> Self {
        self.channels.insert(key.into(), extraction);
        self
    }
}

/// Run reconciliation per config. Returns the unified records, every derived
/// view and the summary.
pub fn run(config: &ReconConfig, input: &ReconInput) -> Result<ReconReport, ReconError> {
    config.validate()?;

    if let Some(key) = input.channels.keys().find(|k| config.channel(k).is_none()) {
        return Err(ReconError::UnknownChannel(format!(
            "input carries channel '{key}' which is not configured"
        )));
    }

    let fallback: Vec<Extraction> = config
        .channels
        .iter()
        .map(|c| Extraction::empty(&c.key))
        .collect();
    let channels: Vec<(&str, &Extraction)> = config
        .channels
        .iter()
        .zip(&fallback)
        .map(|(c, empty)| (c.key.as_str(), input.channels.get(&c.key).unwrap_or(empty)))
        .collect();

    let records = reconcile(&input.dms, &channels, &config.overrides);

    let dealers = dealer_buckets(&records, config);
    let uploads = upload_candidates(&records, config);
    let removals = removal_candidates(&records, config);
    let tasks = listing_tasks(&records, config);

    let summary = with_action_counts(compute_summary(&records, config), &uploads, &removals, &tasks);

    info!(
        records = summary.total_records,
        in_dms = summary.in_primary_system,
        uploads = summary.upload_candidates,
        removals = removals.len(),
        tasks = summary.tasks,
        "reconciliation complete"
    );

    Ok(ReconReport {
        meta: ReconMeta {
            config_name: config.name.clone(),
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            run_at: chrono::Utc::now().to_rfc3339(),
            channels: config.channel_keys(),
        },
        summary,
        records,
        dealers,
        upload_candidates: uploads,
        removals,
        tasks,
    })
}
