//! Source discovery: glob each source's file patterns under the input
//! directory, read every match and fold them into one extraction.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use stockrecon_recon::config::ReconConfig;
use stockrecon_recon::extract::{extract, Extraction, SourceSpec};
use stockrecon_recon::{ReconError, ReconInput};
use tracing::{info, warn};

/// Load the DMS export and every configured channel. Sources that cannot be
/// found or read contribute nothing; the run always proceeds.
pub fn load_sources(config: &ReconConfig, input_dir: &Path) -> ReconInput {
    let dms_spec = SourceSpec::for_dms(&config.dms);
    let dms = Extraction::or_empty(load_source(&dms_spec, &config.dms.files, input_dir), &dms_spec.name);

    let mut input = ReconInput::new(dms);
    for channel in &config.channels {
        let spec = SourceSpec::for_channel(channel);
        let extraction = Extraction::or_empty(load_source(&spec, &channel.files, input_dir), &channel.key);
        input.channels.insert(channel.key.clone(), extraction);
    }
    input
}

/// Files matching any of `patterns` relative to `input_dir`, sorted and
/// de-duplicated.
pub fn resolve_files(patterns: &[String], input_dir: &Path) -> Result<Vec<PathBuf>, String> {
    let base = glob::Pattern::escape(&input_dir.to_string_lossy());
    let mut files = BTreeSet::new();

    for pattern in patterns {
        let full = format!("{}/{}", base.trim_end_matches('/'), pattern);
        let entries = glob::glob(&full).map_err(|e| format!("bad file pattern '{pattern}': {e}"))?;
        for entry in entries {
            match entry {
                Ok(path) if path.is_file() => {
                    files.insert(path);
                }
                Ok(_) => {}
                Err(e) => warn!(pattern = %pattern, error = %e, "unreadable path while matching"),
            }
        }
    }

    Ok(files.into_iter().collect())
}

/// Read and extract every file of one source. Later files win on duplicate
/// identifiers. A file that fails is skipped; the source fails only when no
/// file could be used.
fn load_source(
    spec: &SourceSpec,
    patterns: &[String],
    input_dir: &Path,
) -> Result<Extraction, ReconError> {
    let files = resolve_files(patterns, input_dir).map_err(|e| spec.missing(e))?;
    if files.is_empty() {
        return Err(spec.missing(format!("no file matches {}", patterns.join(", "))));
    }

    let mut merged = Extraction::empty(&spec.name);
    let mut used = 0usize;
    let mut last_err = None;

    for path in &files {
        let result = stockrecon_io::read_table(path)
            .map_err(ReconError::Io)
            .and_then(|table| extract(spec, &table));
        match result {
            Ok(extraction) => {
                merged.merge(extraction);
                used += 1;
            }
            Err(e) => {
                warn!(source = %spec.name, path = %path.display(), error = %e, "file skipped");
                last_err = Some(e);
            }
        }
    }

    if used == 0 {
        if let Some(e) = last_err {
            return Err(e);
        }
    }

    info!(
        source = %spec.name,
        files = used,
        records = merged.len(),
        dropped = merged.dropped_rows,
        duplicates = merged.duplicate_rows,
        "loaded source"
    );
    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn resolve_files_sorted_across_subfolders() {
        let dir = tempdir().unwrap();
        for dealer in ["Ford_Mazda", "Ford_Nelspruit", "Empty"] {
            fs::create_dir(dir.path().join(dealer)).unwrap();
        }
        fs::write(dir.path().join("Ford_Nelspruit/autotrader.csv"), "StockNumber\n").unwrap();
        fs::write(dir.path().join("Ford_Mazda/autotrader.csv"), "StockNumber\n").unwrap();

        let files = resolve_files(&["*/autotrader.csv".to_string()], dir.path()).unwrap();
        let names: Vec<String> = files
            .iter()
            .map(|p| p.parent().unwrap().file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["Ford_Mazda", "Ford_Nelspruit"]);
    }

    #[test]
    fn later_file_wins_and_counts_duplicate() {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join("a")).unwrap();
        fs::create_dir(dir.path().join("b")).unwrap();
        fs::write(dir.path().join("a/autotrader.csv"), "StockNumber,Price\nUF1,100\n").unwrap();
        fs::write(dir.path().join("b/autotrader.csv"), "Ref,Price\nuf1,200\nUG2,300\n").unwrap();

        let config = ReconConfig::default();
        let input = load_sources(&config, dir.path());
        let at = &input.channels["autotrader"];
        assert_eq!(at.len(), 2);
        assert_eq!(at.duplicate_rows, 1);
        assert_eq!(at.price(&stockrecon_recon::StockId::parse("UF1").unwrap()), "200");
    }

    #[test]
    fn missing_sources_degrade_to_empty() {
        let dir = tempdir().unwrap();
        let input = load_sources(&ReconConfig::default(), dir.path());
        assert!(input.dms.is_empty());
        assert_eq!(input.channels.len(), 3);
        assert!(input.channels.values().all(|e| e.is_empty()));
    }

    #[test]
    fn schema_mismatch_degrades_to_empty() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("pmg_web_data.csv"), "Name,Price\nRanger,1\n").unwrap();
        let err = load_source(
            &SourceSpec::for_channel(ReconConfig::default().channel("pmg_web").unwrap()),
            &["pmg_web_data.csv".to_string()],
            dir.path(),
        )
        .unwrap_err();
        assert!(matches!(err, ReconError::SchemaMismatch { .. }));
    }
}
