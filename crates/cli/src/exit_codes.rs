//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Exit codes are part of the shell contract — scheduled report jobs rely on them.
//!
//! # Exit Codes
//!
//! | Code | Domain    | Description                                        |
//! |------|-----------|----------------------------------------------------|
//! | 0    | Universal | Success                                            |
//! | 1    | Universal | General error (unspecified)                        |
//! | 2    | Universal | CLI usage error (bad args, missing input or file)  |
//! | 3    | recon     | Discrepancies found (only with `--strict`)         |
//! | 4    | recon     | Config failed to parse or validate                 |
//! | 5    | output    | A requested report file could not be written       |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Wire it into the relevant command's error handling

use stockrecon_recon::ReconError;

// =============================================================================
// Universal (0-2)
// =============================================================================

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
/// Avoid using this; prefer a specific error code.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, missing input directory or config file.
pub const EXIT_USAGE: u8 = 2;

// =============================================================================
// Recon (3-4)
// =============================================================================

/// Upload candidates, removal candidates or listing tasks exist and
/// `--strict` was given.
pub const EXIT_RECON_DISCREPANCIES: u8 = 3;

/// Config could not be parsed or failed validation.
pub const EXIT_RECON_INVALID_CONFIG: u8 = 4;

// =============================================================================
// Output (5)
// =============================================================================

/// Workbook, CSV or JSON output could not be written.
pub const EXIT_OUTPUT_WRITE: u8 = 5;

/// Map an engine error to its exit code.
pub fn recon_exit_code(err: &ReconError) -> u8 {
    match err {
        ReconError::ConfigParse(_)
        | ReconError::ConfigValidation(_)
        | ReconError::UnknownChannel(_) => EXIT_RECON_INVALID_CONFIG,
        ReconError::MissingSource { .. }
        | ReconError::SchemaMismatch { .. }
        | ReconError::Io(_) => EXIT_ERROR,
    }
}
