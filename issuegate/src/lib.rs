//! # IssueGate
//!
//! A governed Model Context Protocol gateway for the Jira issue tracker.
//!
//! ## Features
//!
//! - **Security Validation**: Path, query and field content sanitization
//! - **Rate Limiting**: Sliding-window limits per operation class with burst penalties
//! - **Audit Logging**: In-memory journal with risk classification and retention
//! - **Permission Checks**: Advisory capability checks with a per-project cache
//! - **MCP Support**: Seventeen tracker and audit tools served over stdio
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use issuegate::{GatewayConfig, McpServer};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = GatewayConfig::load()?;
//! let server = McpServer::from_config(config)?;
//! println!("{} tools enabled", server.enabled_tool_names().len());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

/// Structured audit journal
pub mod audit;

/// Time source abstraction
pub mod clock;

/// Shared building blocks such as rate limiting and background cleanup
pub mod common;

/// Layered configuration loading and validation
pub mod config;

/// Error types used throughout the library
pub mod error;

/// Wiring of the governance components
pub mod governance;

/// Model Context Protocol (MCP) server support
pub mod mcp;

/// Advisory capability checks
pub mod permissions;

/// Input sanitization for paths, queries and destructive operations
pub mod security;

/// Remote tracker port and adapters
pub mod tracker;

/// Field validation for tracker payloads
pub mod validation;

// Re-export core types
pub use config::{ConfigError, GatewayConfig};
pub use error::{GatewayError, Result, SecurityCode};
pub use governance::Governance;
pub use mcp::McpServer;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Test utilities module for testing support
#[doc(hidden)]
pub mod test_utils;
