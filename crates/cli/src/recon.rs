//! `stockrecon run | validate | init-config` — config-driven stock reconciliation.

use std::path::{Path, PathBuf};

use stockrecon_io::xlsx::ReportOptions;
use stockrecon_recon::views::report_views;
use stockrecon_recon::ReconConfig;
use tracing::info;

use crate::exit_codes::{
    recon_exit_code, EXIT_ERROR, EXIT_OUTPUT_WRITE, EXIT_RECON_DISCREPANCIES,
    EXIT_RECON_INVALID_CONFIG, EXIT_USAGE,
};
use crate::load::load_sources;
use crate::CliError;

/// Arguments of `stockrecon run`.
pub struct RunArgs {
    pub input_dir: PathBuf,
    pub config: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub csv_dir: Option<PathBuf>,
    pub json: bool,
    pub json_output: Option<PathBuf>,
    pub strict: bool,
}

fn recon_err(code: u8, msg: impl Into<String>) -> CliError {
    CliError { code, message: msg.into(), hint: None }
}

/// Built-in reference config when `path` is None.
fn load_config(path: Option<&Path>) -> Result<ReconConfig, CliError> {
    let Some(path) = path else {
        info!("using built-in configuration");
        return Ok(ReconConfig::default());
    };

    let config_str = std::fs::read_to_string(path).map_err(|e| {
        recon_err(EXIT_USAGE, format!("cannot read config {}: {e}", path.display()))
            .with_hint("run `stockrecon init-config --output stockrecon.toml` to create one")
    })?;

    ReconConfig::from_toml(&config_str)
        .map_err(|e| recon_err(EXIT_RECON_INVALID_CONFIG, format!("{}: {e}", path.display())))
}

pub fn cmd_run(args: RunArgs) -> Result<(), CliError> {
    let config = load_config(args.config.as_deref())?;

    if !args.input_dir.is_dir() {
        return Err(recon_err(
            EXIT_USAGE,
            format!("input directory not found: {}", args.input_dir.display()),
        )
        .with_hint("pass the folder holding the DMS export and the channel exports"));
    }

    let input = load_sources(&config, &args.input_dir);

    let report = stockrecon_recon::run(&config, &input)
        .map_err(|e| recon_err(recon_exit_code(&e), e.to_string()))?;
    let views = report_views(&report, &config);

    if let Some(ref path) = args.output {
        let options = ReportOptions {
            photo_threshold: config.tasks.photo_threshold,
        };
        let result = stockrecon_io::xlsx::write_report(&views, path, &options)
            .map_err(|e| recon_err(EXIT_OUTPUT_WRITE, format!("cannot write {}: {e}", path.display())))?;
        eprintln!(
            "wrote {} ({} sheets, {} empty skipped)",
            path.display(),
            result.sheets_exported,
            result.sheets_skipped,
        );
    }

    if let Some(ref dir) = args.csv_dir {
        let written = stockrecon_io::csv::write_views(&views, dir)
            .map_err(|e| recon_err(EXIT_OUTPUT_WRITE, format!("cannot write CSV views: {e}")))?;
        eprintln!("wrote {} CSV file(s) to {}", written.len(), dir.display());
    }

    if args.json || args.json_output.is_some() {
        let json_str = serde_json::to_string_pretty(&report)
            .map_err(|e| recon_err(EXIT_ERROR, format!("JSON serialization error: {e}")))?;

        if let Some(ref path) = args.json_output {
            std::fs::write(path, &json_str)
                .map_err(|e| recon_err(EXIT_OUTPUT_WRITE, format!("cannot write {}: {e}", path.display())))?;
            eprintln!("wrote {}", path.display());
        }

        if args.json {
            println!("{json_str}");
        }
    }

    // Human summary to stderr
    let s = &report.summary;
    eprintln!(
        "stock recon: {} vehicles, {} in DMS, {} to upload, {} to remove ({} foreign), {} tasks",
        s.total_records,
        s.in_primary_system,
        s.upload_candidates,
        s.removal_recognized + s.removal_foreign,
        s.removal_foreign,
        s.tasks,
    );

    if args.strict && report.has_discrepancies() {
        return Err(recon_err(EXIT_RECON_DISCREPANCIES, "discrepancies found (--strict)"));
    }

    Ok(())
}

pub fn cmd_validate(config_path: Option<PathBuf>) -> Result<(), CliError> {
    let config = load_config(config_path.as_deref())?;
    eprintln!(
        "valid: '{}' with {} channel(s), {} dealer(s), {} override(s)",
        config.name,
        config.channels.len(),
        config.dealers.len(),
        config.overrides.len(),
    );
    Ok(())
}

pub fn cmd_init_config(output: Option<PathBuf>) -> Result<(), CliError> {
    let toml_str = ReconConfig::default()
        .to_toml()
        .map_err(|e| recon_err(EXIT_ERROR, e.to_string()))?;

    match output {
        Some(path) => {
            if path.exists() {
                return Err(recon_err(EXIT_USAGE, format!("{} already exists", path.display()))
                    .with_hint("choose another --output path or remove the file"));
            }
            std::fs::write(&path, &toml_str)
                .map_err(|e| recon_err(EXIT_OUTPUT_WRITE, format!("cannot write {}: {e}", path.display())))?;
            eprintln!("wrote {}", path.display());
        }
        None => print!("{toml_str}"),
    }
    Ok(())
}
