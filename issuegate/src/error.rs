//! Unified error handling for the IssueGate library
//!
//! Every governance stage reports failures through [`GatewayError`]. Security
//! rejections carry a stable [`SecurityCode`] so the transport layer can tag them
//! distinctly from ordinary failures.

use crate::config::ConfigError;
use std::fmt;
use std::io;
use thiserror::Error;

/// Machine-readable codes attached to security rejections
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SecurityCode {
    /// Traversal sequence, protocol prefix or encoded traversal in a path
    DangerousPathPattern,
    /// Resolved path is outside every allowed directory
    PathNotAllowed,
    /// Path does not exist
    FileNotFound,
    /// Path exists but is not a regular file
    NotAFile,
    /// File exceeds the configured size ceiling
    FileTooLarge,
    /// File extension is not in the allow-list
    ExtensionNotAllowed,
    /// Parent directory of a save path does not exist
    ParentDirNotFound,
    /// Query matched a script or destructive-keyword pattern
    DangerousJqlPattern,
    /// Query exceeds the length ceiling
    JqlTooLong,
    /// Destructive operation lacked the configured confirmation phrase
    ConfirmationRequired,
    /// Field value matched a dangerous content pattern
    DangerousFieldValue,
}

impl SecurityCode {
    /// Stable string form used on the wire and in audit records
    pub fn as_str(&self) -> &'static str {
        match self {
            SecurityCode::DangerousPathPattern => "DANGEROUS_PATH_PATTERN",
            SecurityCode::PathNotAllowed => "PATH_NOT_ALLOWED",
            SecurityCode::FileNotFound => "FILE_NOT_FOUND",
            SecurityCode::NotAFile => "NOT_A_FILE",
            SecurityCode::FileTooLarge => "FILE_TOO_LARGE",
            SecurityCode::ExtensionNotAllowed => "EXTENSION_NOT_ALLOWED",
            SecurityCode::ParentDirNotFound => "PARENT_DIR_NOT_FOUND",
            SecurityCode::DangerousJqlPattern => "DANGEROUS_JQL_PATTERN",
            SecurityCode::JqlTooLong => "JQL_TOO_LONG",
            SecurityCode::ConfirmationRequired => "CONFIRMATION_REQUIRED",
            SecurityCode::DangerousFieldValue => "DANGEROUS_FIELD_VALUE",
        }
    }
}

impl fmt::Display for SecurityCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The main error type for the IssueGate library
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum GatewayError {
    /// Input rejected by the security validator
    #[error("Security violation [{code}]: {message}")]
    Security {
        /// Machine-readable rejection code
        code: SecurityCode,
        /// Human-readable explanation
        message: String,
    },

    /// Rate-limit admission denied
    #[error("Rate limit exceeded for {key}. Try again in {retry_after_secs} seconds")]
    RateLimited {
        /// Rate-limit key that was exhausted
        key: String,
        /// Seconds until the oldest request leaves the window
        retry_after_secs: u64,
    },

    /// Payload field failed validation
    #[error("Invalid field '{field}': {reason}")]
    Validation {
        /// Offending field name
        field: String,
        /// Why the field was rejected
        reason: String,
    },

    /// Caller lacks a required capability
    #[error("Permission denied: missing {capability} for {scope}")]
    PermissionDenied {
        /// First missing required capability
        capability: String,
        /// Project key or "global"
        scope: String,
    },

    /// Operation switched off by configuration
    #[error("Operation '{0}' is disabled by configuration")]
    OperationDisabled(String),

    /// Failure reported by the remote tracker
    #[error("Remote service error{}: {message}", status.map(|s| format!(" ({s})")).unwrap_or_default())]
    Remote {
        /// HTTP status when one was received
        status: Option<u16>,
        /// Message returned by the remote service
        message: String,
    },

    /// Invalid configuration
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// IO operation failed
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP transport failure talking to the remote tracker
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Other errors
    #[error("{0}")]
    Other(String),

    /// Generic error with context
    #[error("{message}")]
    Context {
        /// Context message
        message: String,
        /// Wrapped error
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl GatewayError {
    /// Build a security rejection
    pub fn security(code: SecurityCode, message: impl Into<String>) -> Self {
        GatewayError::Security {
            code,
            message: message.into(),
        }
    }

    /// Build a field validation failure
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        GatewayError::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Build a remote failure without a status code
    pub fn remote(message: impl Into<String>) -> Self {
        GatewayError::Remote {
            status: None,
            message: message.into(),
        }
    }

    /// Security code when this is a security-origin failure
    pub fn security_code(&self) -> Option<SecurityCode> {
        match self {
            GatewayError::Security { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// True for failures raised by the security validator
    pub fn is_security(&self) -> bool {
        self.security_code().is_some()
    }

    /// True for errors the caller caused, as opposed to remote or internal faults
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            GatewayError::Security { .. }
                | GatewayError::RateLimited { .. }
                | GatewayError::Validation { .. }
                | GatewayError::PermissionDenied { .. }
                | GatewayError::OperationDisabled(_)
        )
    }
}

/// Result type alias for IssueGate operations
pub type Result<T> = std::result::Result<T, GatewayError>;

/// Extension trait for adding context to errors
pub trait ErrorContext<T> {
    /// Add context to an error
    fn context<S: Into<String>>(self, msg: S) -> Result<T>;

    /// Add context with a closure that's only called on error
    fn with_context<F, S>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Into<String>;
}

impl<T, E> ErrorContext<T> for std::result::Result<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn context<S: Into<String>>(self, msg: S) -> Result<T> {
        self.map_err(|e| GatewayError::Context {
            message: msg.into(),
            source: Box::new(e),
        })
    }

    fn with_context<F, S>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Into<String>,
    {
        self.map_err(|e| GatewayError::Context {
            message: f().into(),
            source: Box::new(e),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_security_code_strings() {
        assert_eq!(
            SecurityCode::DangerousPathPattern.as_str(),
            "DANGEROUS_PATH_PATTERN"
        );
        assert_eq!(SecurityCode::JqlTooLong.to_string(), "JQL_TOO_LONG");
        let json = serde_json::to_string(&SecurityCode::ConfirmationRequired).unwrap();
        assert_eq!(json, "\"CONFIRMATION_REQUIRED\"");
    }

    #[test]
    fn test_security_error_display_includes_code() {
        let err = GatewayError::security(SecurityCode::PathNotAllowed, "outside /srv");
        let msg = err.to_string();
        assert!(msg.contains("PATH_NOT_ALLOWED"));
        assert!(msg.contains("outside /srv"));
        assert!(err.is_security());
        assert!(err.is_user_error());
    }

    #[test]
    fn test_remote_error_display() {
        let err = GatewayError::Remote {
            status: Some(404),
            message: "Issue does not exist".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Remote service error (404): Issue does not exist"
        );
        assert!(!err.is_user_error());
        assert_eq!(
            GatewayError::remote("boom").to_string(),
            "Remote service error: boom"
        );
    }

    #[test]
    fn test_error_context() {
        let err: std::result::Result<(), io::Error> =
            Err(io::Error::new(io::ErrorKind::NotFound, "file not found"));
        let msg = err
            .context("Failed to open attachment")
            .unwrap_err()
            .to_string();
        assert!(msg.contains("Failed to open attachment"));
    }
}
