use clap::CommandFactory;
use issuegate_cli::cli::{Cli, Commands};
use issuegate_cli::error::handle_cli_result;
use issuegate_cli::exit_codes::{EXIT_FAILURE, EXIT_SUCCESS};
use issuegate_cli::logging::{init_logging, log_level};
use issuegate_cli::{config_check, serve, tools};
use std::process;

#[tokio::main]
async fn main() {
    let cli = Cli::parse_args();

    // Fast path for help - avoid logging setup
    let Some(command) = cli.command else {
        let code = match Cli::command().print_help() {
            Ok(()) => EXIT_SUCCESS,
            Err(_) => EXIT_FAILURE,
        };
        process::exit(code);
    };

    let level = log_level(cli.quiet, cli.debug, cli.verbose);
    init_logging(level, matches!(command, Commands::Serve));

    let config_path = cli.config.as_deref();
    let result = match command {
        Commands::Serve => {
            tracing::info!("Starting MCP server");
            serve::run_server(config_path).await
        }
        Commands::CheckConfig {
            format,
            require_connection,
        } => config_check::run_check_config(config_path, format, require_connection),
        Commands::Tools { format, all } => tools::run_tools_command(config_path, format, all),
    };

    process::exit(handle_cli_result(result));
}
