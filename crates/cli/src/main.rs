// stockrecon CLI - dealer stock reconciliation across DMS, marketplaces and web store

mod exit_codes;
mod load;
mod recon;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use exit_codes::EXIT_SUCCESS;

#[derive(Parser)]
#[command(name = "stockrecon")]
#[command(about = "Reconcile dealer stock across the DMS, listing sites and the web store")]
#[command(long_version = long_version())]
#[command(version)]
struct Cli {
    /// Debug logging (overrides RUST_LOG)
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Reconcile the exports in a folder and write the report
    #[command(after_help = "\
Examples:
  stockrecon run ./exports --output stock_report.xlsx
  stockrecon run ./exports --config group.toml --csv-dir ./report
  stockrecon run ./exports --json > report.json
  stockrecon run ./exports --strict --json-output report.json")]
    Run {
        /// Folder holding the DMS export and the channel exports
        input_dir: PathBuf,

        /// Reconciliation config (TOML); built-in reference config when omitted
        #[arg(long, short = 'c', env = "STOCKRECON_CONFIG")]
        config: Option<PathBuf>,

        /// Write the report workbook (.xlsx)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,

        /// Write one CSV per report sheet into this folder
        #[arg(long)]
        csv_dir: Option<PathBuf>,

        /// Output the full report as JSON to stdout
        #[arg(long)]
        json: bool,

        /// Write the full report as JSON to a file
        #[arg(long)]
        json_output: Option<PathBuf>,

        /// Exit 3 when anything needs uploading, removing or fixing
        #[arg(long)]
        strict: bool,
    },

    /// Validate a config without reading any exports
    #[command(after_help = "\
Examples:
  stockrecon validate --config group.toml")]
    Validate {
        /// Reconciliation config (TOML); built-in reference config when omitted
        #[arg(long, short = 'c', env = "STOCKRECON_CONFIG")]
        config: Option<PathBuf>,
    },

    /// Print the reference config as TOML, ready to edit
    #[command(after_help = "\
Examples:
  stockrecon init-config > group.toml
  stockrecon init-config --output group.toml")]
    InitConfig {
        /// Write to this file instead of stdout (refuses to overwrite)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },
}

fn long_version() -> &'static str {
    concat!(
        env!("CARGO_PKG_VERSION"),
        " (", env!("GIT_COMMIT_HASH"), ")",
        "\nengine:  stockrecon-recon ", env!("CARGO_PKG_VERSION"),
        "\ntarget:  ", env!("TARGET"),
    )
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Run {
            input_dir,
            config,
            output,
            csv_dir,
            json,
            json_output,
            strict,
        } => recon::cmd_run(recon::RunArgs {
            input_dir,
            config,
            output,
            csv_dir,
            json,
            json_output,
            strict,
        }),
        Commands::Validate { config } => recon::cmd_validate(config),
        Commands::InitConfig { output } => recon::cmd_init_config(output),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}
