//! The `serve` command: MCP over stdio

use crate::config_check::load_config;
use crate::error::{CliError, CliResult};
use crate::exit_codes::EXIT_FAILURE;
use issuegate::McpServer;
use rmcp::serve_server;
use rmcp::transport::io::stdio;
use std::future::Future;
use std::path::Path;
use tokio_util::sync::CancellationToken;

/// Cancel `token` once `signal` fires
///
/// A listener that cannot be installed leaves the token alone, so the server
/// keeps running until the client disconnects.
async fn cancel_on_signal<F>(signal: F, token: CancellationToken)
where
    F: Future<Output = std::io::Result<()>>,
{
    match signal.await {
        Ok(()) => {
            tracing::info!("Shutdown signal received");
            token.cancel();
        }
        Err(e) => tracing::error!("Failed to listen for ctrl+c, serving until disconnect: {e}"),
    }
}

pub async fn run_server(path: Option<&Path>) -> CliResult<()> {
    let config = load_config(path)?;
    let server = McpServer::from_config(config)?;
    tracing::info!(
        tools = server.enabled_tool_names().len(),
        "MCP server initialized"
    );

    let ct = CancellationToken::new();
    tokio::spawn(cancel_on_signal(tokio::signal::ctrl_c(), ct.clone()));

    let running = serve_server(server.clone(), stdio()).await.map_err(|e| {
        server.shutdown();
        CliError::new(format!("MCP server error: {e}"), EXIT_FAILURE)
    })?;
    tracing::info!("MCP server started successfully");

    let outcome = tokio::select! {
        quit = running.waiting() => match quit {
            Ok(reason) => {
                tracing::info!("MCP client disconnected: {reason:?}");
                Ok(())
            }
            Err(e) => Err(CliError::new(format!("MCP server task failed: {e}"), EXIT_FAILURE)),
        },
        _ = ct.cancelled() => Ok(()),
    };

    server.shutdown();
    tracing::info!("MCP server exited");
    outcome
}
