//! CLI Exit Code Registry
//!
//! This is the single source of truth for all `lvmap` exit codes.
//! Scripts and CI jobs gate on them, so codes are never renumbered.
//!
//! | Code | Meaning                                                        |
//! |------|----------------------------------------------------------------|
//! | 0    | Success, no findings                                           |
//! | 1    | General error (unspecified)                                    |
//! | 2    | Usage error (bad arguments, bad splitter lookup)               |
//! | 3    | Discrepancies found (wrong positions, load/sense/label misses) |
//! | 4    | Unresolved anomalies (non-tolerated)                           |
//! | 5    | Input parse failure                                            |
//! | 6    | Invalid config                                                 |
//! | 7    | I/O failure (unreadable input, unwritable report)              |
//!
//! When a run has both discrepancies and unresolved anomalies, 3 wins.

use lvmap_io::IoError;
use lvmap_recon::{HarnessSummary, ReconError};

/// Success - command completed without findings.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
/// Avoid using this; prefer a specific error code.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments.
pub const EXIT_USAGE: u8 = 2;

/// The run found cables to fix or schematics to correct.
pub const EXIT_DISCREPANCIES: u8 = 3;

/// The run finished, but some records could not be resolved.
pub const EXIT_UNRESOLVED: u8 = 4;

/// An input table, netlist or label sheet could not be parsed.
pub const EXIT_PARSE: u8 = 5;

/// The config file failed to parse or validate.
pub const EXIT_INVALID_CONFIG: u8 = 6;

/// A file could not be read or a report could not be written.
pub const EXIT_IO: u8 = 7;

/// Map an ingestion/writing error to its exit code.
pub fn io_exit_code(err: &IoError) -> u8 {
    match err {
        IoError::Read { .. } | IoError::Write { .. } => EXIT_IO,
        IoError::NoParser { .. } | IoError::UnexpectedInput { .. } => EXIT_ERROR,
        _ => EXIT_PARSE,
    }
}

/// Map an engine error to its exit code.
pub fn recon_exit_code(err: &ReconError) -> u8 {
    match err {
        ReconError::ConfigParse(_) | ReconError::ConfigValidation(_) => EXIT_INVALID_CONFIG,
        ReconError::MissingInput { .. } => EXIT_USAGE,
    }
}

/// Exit code for a completed run.
pub fn summary_exit_code(summary: &HarnessSummary) -> u8 {
    if summary.discrepancies() > 0 {
        EXIT_DISCREPANCIES
    } else if summary.unresolved_anomalies > 0 {
        EXIT_UNRESOLVED
    } else {
        EXIT_SUCCESS
    }
}
