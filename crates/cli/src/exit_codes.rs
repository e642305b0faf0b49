//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Exit codes are part of the shell contract — scripts rely on them.
//!
//! | Code | Domain    | Description                                   |
//! |------|-----------|-----------------------------------------------|
//! | 0    | Universal | Success                                       |
//! | 1    | Universal | General error (unspecified)                   |
//! | 2    | Universal | CLI usage error (bad args)                    |
//! | 3    | join      | Config failed to parse or validate            |
//! | 4    | join      | Runtime failure (IO, CSV, duplicate codes)    |
//! | 5    | join      | Unmatched listings (`run --strict`, `lookup`) |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant
//! 2. Document what triggers it
//! 3. Update the table above

// =============================================================================
// Universal (0-2)
// =============================================================================

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
/// Avoid using this; prefer a specific error code.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, conflicting options.
pub const EXIT_USAGE: u8 = 2;

// =============================================================================
// Join (3-9)
// =============================================================================

/// Config file parsed but failed validation, or is not valid TOML.
pub const EXIT_INVALID_CONFIG: u8 = 3;

/// Input could not be read or loaded (missing file, bad CSV, duplicate
/// canonical codes), or output could not be written.
pub const EXIT_RUNTIME: u8 = 4;

/// At least one listing found no reference record.
/// Only raised by `run --strict` and by `lookup`.
pub const EXIT_UNMATCHED: u8 = 5;
