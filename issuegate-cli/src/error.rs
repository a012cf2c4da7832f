//! Error handling for the IssueGate CLI
//!
//! Command results carry a suggested exit code alongside the error chain so
//! `main` can print the cause and exit accordingly.

use crate::exit_codes::{EXIT_CONFIG_ERROR, EXIT_FAILURE, EXIT_SUCCESS};
use std::error::Error;
use std::fmt;

/// CLI-specific result type that preserves error information
pub type CliResult<T> = Result<T, CliError>;

/// CLI error type that includes both error information and suggested exit code
#[derive(Debug)]
pub struct CliError {
    pub message: String,
    pub exit_code: i32,
    pub source: Option<Box<dyn Error + Send + Sync>>,
}

impl CliError {
    /// Create a new CLI error with a message and exit code
    pub fn new(message: impl Into<String>, exit_code: i32) -> Self {
        Self {
            message: message.into(),
            exit_code,
            source: None,
        }
    }

    /// Create a CLI error from another error with a specific exit code
    pub fn from_error<E: Error + Send + Sync + 'static>(error: E, exit_code: i32) -> Self {
        Self {
            message: error.to_string(),
            exit_code,
            source: Some(Box::new(error)),
        }
    }

    /// Runtime failure, exit code 1
    pub fn failure<E: Error + Send + Sync + 'static>(error: E) -> Self {
        Self::from_error(error, EXIT_FAILURE)
    }

    /// Configuration problem, exit code 2
    pub fn config<E: Error + Send + Sync + 'static>(error: E) -> Self {
        Self::from_error(error, EXIT_CONFIG_ERROR)
    }

    /// The message followed by every cause
    pub fn full_chain(&self) -> String {
        let mut result = self.message.clone();

        let mut current_source = self.source();
        while let Some(err) = current_source {
            let cause = err.to_string();
            if !result.contains(&cause) {
                result.push_str(&format!("\n  Caused by: {cause}"));
            }
            current_source = err.source();
        }

        result
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl Error for CliError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn Error + 'static))
    }
}

impl From<issuegate::ConfigError> for CliError {
    fn from(error: issuegate::ConfigError) -> Self {
        Self::config(error)
    }
}

impl From<issuegate::GatewayError> for CliError {
    fn from(error: issuegate::GatewayError) -> Self {
        match error {
            issuegate::GatewayError::Config(e) => Self::config(e),
            other => Self::failure(other),
        }
    }
}

impl From<anyhow::Error> for CliError {
    fn from(error: anyhow::Error) -> Self {
        Self::new(format!("{error:#}"), EXIT_FAILURE)
    }
}

/// Convert a CliResult to an exit code, printing the full error chain if needed
pub fn handle_cli_result<T>(result: CliResult<T>) -> i32 {
    match result {
        Ok(_) => EXIT_SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e.full_chain());
            e.exit_code
        }
    }
}
