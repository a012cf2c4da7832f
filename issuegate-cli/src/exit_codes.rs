//! Exit code constants for CLI commands
//!
//! - 0: Success
//! - 1: Runtime failure, such as the server stopping with an error
//! - 2: Invalid or incomplete configuration

/// Successful execution
pub const EXIT_SUCCESS: i32 = 0;

/// Runtime failure
pub const EXIT_FAILURE: i32 = 1;

/// Configuration rejected at startup
pub const EXIT_CONFIG_ERROR: i32 = 2;
