//! The `check-config` command

use crate::cli::OutputFormat;
use crate::error::{CliError, CliResult};
use crate::exit_codes::EXIT_FAILURE;
use colored::*;
use issuegate::GatewayConfig;
use std::path::Path;

/// Load the configuration from `path` or the usual locations
pub fn load_config(path: Option<&Path>) -> CliResult<GatewayConfig> {
    let config = match path {
        Some(path) => GatewayConfig::load_from(Some(path))?,
        None => GatewayConfig::load()?,
    };
    Ok(config)
}

/// Copy of `config` safe to print
pub fn redacted(config: &GatewayConfig) -> GatewayConfig {
    let mut shown = config.clone();
    if !shown.connection.api_token.is_empty() {
        shown.connection.api_token = "***".to_string();
    }
    shown
}

/// Validate the configuration and print it
pub fn run_check_config(
    path: Option<&Path>,
    format: OutputFormat,
    require_connection: bool,
) -> CliResult<()> {
    let config = load_config(path)?;
    if require_connection {
        config.require_connection()?;
    }

    let shown = redacted(&config);
    let rendered = match format {
        OutputFormat::Json => serde_json::to_string_pretty(&shown)
            .map_err(|e| CliError::from_error(e, EXIT_FAILURE))?,
        OutputFormat::Yaml | OutputFormat::Table => {
            serde_yaml::to_string(&shown).map_err(|e| CliError::from_error(e, EXIT_FAILURE))?
        }
    };
    println!("{}", rendered.trim_end());

    if format != OutputFormat::Json {
        eprintln!("{} configuration is valid", "✓".green());
    }
    Ok(())
}
