//! Model Context Protocol (MCP) server support
//!
//! This module serves the governed tracker tools over MCP. Tools are
//! registered in a [`ToolRegistry`] and execute through the [`Dispatcher`].

// Module declarations
pub mod dispatcher;
pub mod error_handling;
pub mod responses;
pub mod server;
pub mod tool_registry;
pub mod tools;
pub mod types;
pub mod utils;

// Re-export commonly used items from submodules
pub use dispatcher::{Dispatcher, GovernedOperation, DEFAULT_CALLER};
pub use error_handling::McpErrorHandler;
pub use server::McpServer;
pub use tool_registry::{McpTool, ToolContext, ToolRegistry};
pub use tools::register_all_tools;
