//! IssueGate CLI Library
//!
//! Command-line definitions, logging bootstrap, exit codes and the command
//! implementations behind the `issuegate` binary.

/// Command-line interface definitions and argument parsing
pub mod cli;
/// The `check-config` command
pub mod config_check;
/// Error type carrying an exit code
pub mod error;
/// Exit codes used by the CLI application
pub mod exit_codes;
/// Logging bootstrap
pub mod logging;
/// The `serve` command
pub mod serve;
/// The `tools` command
pub mod tools;
