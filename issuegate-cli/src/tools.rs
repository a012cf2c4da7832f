//! The `tools` command

use crate::cli::OutputFormat;
use crate::config_check::load_config;
use crate::error::{CliError, CliResult};
use crate::exit_codes::EXIT_FAILURE;
use is_terminal::IsTerminal;
use issuegate::config::OperationsConfig;
use issuegate::mcp::{register_all_tools, ToolRegistry};
use serde::Serialize;
use std::io;
use std::path::Path;
use tabled::{
    settings::{object::Rows, Alignment, Color, Modify, Style},
    Table, Tabled,
};

#[derive(Tabled)]
struct ToolRow {
    #[tabled(rename = "Tool")]
    name: String,
    #[tabled(rename = "Enabled")]
    enabled: String,
    #[tabled(rename = "Summary")]
    summary: String,
}

#[derive(Debug, Serialize)]
pub struct ToolInfo {
    pub name: String,
    pub enabled: bool,
    pub summary: String,
}

/// Every registered tool with its enable state under `operations`
pub fn collect_tools(operations: &OperationsConfig, include_disabled: bool) -> Vec<ToolInfo> {
    let mut registry = ToolRegistry::new();
    register_all_tools(&mut registry);

    registry
        .list_tools()
        .into_iter()
        .map(|tool| ToolInfo {
            enabled: operations.allows(&tool.name),
            summary: tool
                .description
                .as_deref()
                .and_then(|d| d.lines().next())
                .unwrap_or_default()
                .trim()
                .to_string(),
            name: tool.name.to_string(),
        })
        .filter(|info| include_disabled || info.enabled)
        .collect()
}

pub fn run_tools_command(path: Option<&Path>, format: OutputFormat, all: bool) -> CliResult<()> {
    let config = load_config(path)?;
    let tools = collect_tools(&config.operations, all);

    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&tools)
                .map_err(|e| CliError::from_error(e, EXIT_FAILURE))?;
            println!("{json}");
        }
        OutputFormat::Yaml => {
            let yaml =
                serde_yaml::to_string(&tools).map_err(|e| CliError::from_error(e, EXIT_FAILURE))?;
            print!("{yaml}");
        }
        OutputFormat::Table => display_table(&tools),
    }
    Ok(())
}

fn display_table(tools: &[ToolInfo]) {
    if tools.is_empty() {
        println!("No tools enabled by the current configuration.");
        return;
    }

    let rows: Vec<ToolRow> = tools
        .iter()
        .map(|info| ToolRow {
            name: info.name.clone(),
            enabled: if info.enabled { "yes" } else { "no" }.to_string(),
            summary: info.summary.clone(),
        })
        .collect();

    let mut table = Table::new(rows);
    table.with(Style::modern());

    if io::stdout().is_terminal() {
        table.with(Modify::new(Rows::one(0)).with(Color::FG_BRIGHT_CYAN));
        for (i, info) in tools.iter().enumerate() {
            if !info.enabled {
                table.with(Modify::new(Rows::one(i + 1)).with(Color::FG_BRIGHT_BLACK));
            }
        }
    }

    table.with(Modify::new(Rows::new(1..)).with(Alignment::left()));
    println!("{table}");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collect_tools_defaults() {
        let tools = collect_tools(&OperationsConfig::default(), false);
        assert_eq!(tools.len(), 17);
        assert!(tools.iter().all(|t| t.enabled && !t.summary.is_empty()));
        let names: Vec<_> = tools.iter().map(|t| t.name.as_str()).collect();
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);
    }

    #[test]
    fn test_collect_tools_hides_disabled() {
        let ops = OperationsConfig {
            enable_bulk: false,
            ..Default::default()
        };
        let enabled = collect_tools(&ops, false);
        assert_eq!(enabled.len(), 16);
        assert!(!enabled.iter().any(|t| t.name == "bulk_update_issues"));

        let all = collect_tools(&ops, true);
        let bulk = all.iter().find(|t| t.name == "bulk_update_issues").unwrap();
        assert!(!bulk.enabled);
    }
}
