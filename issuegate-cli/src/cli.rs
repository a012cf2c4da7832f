use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Json,
    Yaml,
}

#[derive(Parser, Debug)]
#[command(name = "issuegate")]
#[command(version)]
#[command(about = "A governed MCP gateway for the Jira issue tracker")]
#[command(long_about = "
issuegate is an MCP (Model Context Protocol) server that lets an AI assistant
work with Jira through a governed pipeline: input sanitization, per-class rate
limits, advisory permission checks and an in-memory audit journal.

Example usage:
  issuegate serve           # Run as MCP server over stdio
  issuegate check-config    # Validate and print the effective configuration
  issuegate tools           # List the tools the current configuration enables
")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub debug: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Configuration file to use instead of the discovered issuegate.yaml
    #[arg(short, long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run as MCP server over stdio
    #[command(long_about = "
Runs issuegate as an MCP server on stdin/stdout. Connection settings come from
issuegate.yaml or the ISSUEGATE_BASE_URL, ISSUEGATE_EMAIL and
ISSUEGATE_API_TOKEN environment variables.

Logs are written to ~/.issuegate/mcp.log because stdout carries the protocol.
Set ISSUEGATE_LOG_FILE to change the file name.

Example:
  issuegate serve
")]
    Serve,
    /// Validate the configuration and print the effective settings
    #[command(name = "check-config")]
    CheckConfig {
        /// Output format
        #[arg(long, value_enum, default_value = "yaml")]
        format: OutputFormat,
        /// Also require connection credentials
        #[arg(long)]
        require_connection: bool,
    },
    /// List the tools the current configuration enables
    Tools {
        /// Output format
        #[arg(long, value_enum, default_value = "table")]
        format: OutputFormat,
        /// Include disabled tools
        #[arg(long)]
        all: bool,
    },
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }

    pub fn try_parse_from_args<I, T>(args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        Self::try_parse_from(args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_help_works() {
        let result = Cli::try_parse_from_args(["issuegate", "--help"]);
        assert!(result.is_err());
        assert_eq!(result.unwrap_err().kind(), clap::error::ErrorKind::DisplayHelp);
    }

    #[test]
    fn test_cli_no_subcommand() {
        let cli = Cli::try_parse_from_args(["issuegate"]).unwrap();
        assert!(cli.command.is_none());
        assert!(!cli.verbose);
        assert!(!cli.quiet);
        assert!(cli.config.is_none());
    }

    #[test]
    fn test_cli_serve_with_flags() {
        let cli =
            Cli::try_parse_from_args(["issuegate", "serve", "--debug", "--config", "gw.yaml"])
                .unwrap();
        assert!(matches!(cli.command, Some(Commands::Serve)));
        assert!(cli.debug);
        assert_eq!(cli.config, Some(PathBuf::from("gw.yaml")));
    }

    #[test]
    fn test_cli_check_config_defaults() {
        let cli = Cli::try_parse_from_args(["issuegate", "check-config"]).unwrap();
        match cli.command {
            Some(Commands::CheckConfig {
                format,
                require_connection,
            }) => {
                assert_eq!(format, OutputFormat::Yaml);
                assert!(!require_connection);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_cli_tools_json_all() {
        let cli =
            Cli::try_parse_from_args(["issuegate", "tools", "--format", "json", "--all"]).unwrap();
        match cli.command {
            Some(Commands::Tools { format, all }) => {
                assert_eq!(format, OutputFormat::Json);
                assert!(all);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_cli_invalid_subcommand() {
        assert!(Cli::try_parse_from_args(["issuegate", "frobnicate"]).is_err());
    }
}
