//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Exit codes are part of the shell contract: scripts rely on them.
//!
//! # Exit Code Ranges
//!
//! | Range   | Domain    | Description                              |
//! |---------|-----------|------------------------------------------|
//! | 0       | Universal | Success                                  |
//! | 1       | Universal | General error (unspecified)              |
//! | 2       | Universal | CLI usage error (bad args, missing file) |
//! | 3-9     | workbook  | Reading or writing test workbooks        |

use tpmgrid_io::CodecError;

// =============================================================================
// Universal (0-2)
// =============================================================================

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, missing required options.
pub const EXIT_USAGE: u8 = 2;

// =============================================================================
// Workbook (3-9)
// =============================================================================

/// File could not be read or written.
pub const EXIT_IO: u8 = 3;

/// Sheet is narrower than the requested samples need.
pub const EXIT_SCHEMA_MISMATCH: u8 = 4;

/// Test sheet not found in the workbook.
pub const EXIT_MISSING_SHEET: u8 = 5;

/// Another save holds the workbook.
pub const EXIT_SAVE_BUSY: u8 = 6;

/// Map a codec error to its exit code.
pub fn codec_exit_code(err: &CodecError) -> u8 {
    match err {
        CodecError::SchemaMismatch { .. } => EXIT_SCHEMA_MISMATCH,
        CodecError::MissingSheet(_) => EXIT_MISSING_SHEET,
        CodecError::SaveInProgress => EXIT_SAVE_BUSY,
        CodecError::Xlsx(_) | CodecError::Csv(_) | CodecError::Io(_) => EXIT_IO,
        CodecError::Engine(_) => EXIT_USAGE,
    }
}
