//! Resolved configuration presentation.

use crate::cli::presentation::shared::format_section_heading;
use crate::config::{DeploymentTarget, StackConfig};
use crate::error::StackError;
use comfy_table::presets::UTF8_BORDERS_ONLY;
use comfy_table::Table;
use serde::Serialize;
use std::path::PathBuf;

/// Everything `config` shows
#[derive(Debug, Serialize)]
pub struct ConfigView<'a> {
    pub config: &'a StackConfig,
    pub target: Option<&'a DeploymentTarget>,
    pub target_error: Option<String>,
    pub runtime_name: Option<String>,
    pub sources: Vec<PathBuf>,
}

pub fn format_config_text(view: &ConfigView<'_>) -> String {
    let config = view.config;
    let mut out = String::new();

    out.push_str(&format!("{}\n\n", format_section_heading("Stack")));
    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["Key", "Value"]);
    let dash = || "-".to_string();
    let rows: Vec<(&str, String)> = vec![
        ("name", config.stack.name.clone()),
        (
            "runtime name",
            view.runtime_name.clone().unwrap_or_else(dash),
        ),
        (
            "account",
            view.target.map(|t| t.account().to_string()).unwrap_or_else(dash),
        ),
        (
            "region",
            view.target.map(|t| t.region().to_string()).unwrap_or_else(dash),
        ),
        ("model id", config.stack.model_id.clone().unwrap_or_else(dash)),
        ("agent dir", config.stack.agent_dir.display().to_string()),
        ("platform", config.runtime.platform.to_string()),
        ("scope", format!("{:?}", config.policy.scope)),
        ("observability", format!("{:?}", config.policy.observability)),
    ];
    for (key, value) in rows {
        table.add_row(vec![key.to_string(), value]);
    }
    out.push_str(&format!("{}\n", table));

    if let Some(error) = &view.target_error {
        out.push_str(&format!("\n  Target unresolved: {}\n", error));
    }

    if !config.runtime.environment.is_empty() {
        out.push_str(&format!("\n{}\n\n", format_section_heading("Extra environment")));
        let mut table = Table::new();
        table.load_preset(UTF8_BORDERS_ONLY);
        table.set_header(vec!["Name", "Value"]);
        for entry in &config.runtime.environment {
            table.add_row(vec![entry.name.clone(), entry.value.clone()]);
        }
        out.push_str(&format!("{}\n", table));
    }

    out.push_str(&format!("\n{}\n\n", format_section_heading("Sources")));
    if view.sources.is_empty() {
        out.push_str("  defaults and environment only");
    } else {
        let lines: Vec<String> = view
            .sources
            .iter()
            .map(|p| format!("  {}", p.display()))
            .collect();
        out.push_str(&lines.join("\n"));
    }
    out
}

pub fn format_config_json(view: &ConfigView<'_>) -> Result<String, StackError> {
    Ok(serde_json::to_string_pretty(view)?)
}
