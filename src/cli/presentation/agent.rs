//! Agent list presentation: text and json.

use crate::error::GroveError;
use comfy_table::Table;
use serde::Serialize;
use std::path::PathBuf;

/// One resolvable agent as shown by `grove agents`.
#[derive(Debug, Clone, Serialize)]
pub struct AgentListEntry {
    pub name: String,
    pub command: String,
    pub args: Vec<String>,
    pub configured: bool,
    /// Where the command was found on PATH
    pub location: Option<PathBuf>,
}

pub fn format_agent_list_text(entries: &[AgentListEntry]) -> String {
    let mut table = Table::new();
    table.load_preset(comfy_table::presets::UTF8_FULL);
    table.set_header(vec!["Agent", "Command", "Source", "Installed"]);
    for entry in entries {
        let mut command = entry.command.clone();
        for arg in &entry.args {
            command.push(' ');
            command.push_str(arg);
        }
        table.add_row(vec![
            entry.name.clone(),
            command,
            if entry.configured { "config" } else { "built-in" }.to_string(),
            entry
                .location
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "not found".to_string()),
        ]);
    }
    format!("{}\n\nTotal: {} agent(s)", table, entries.len())
}

pub fn format_agent_list_json(entries: &[AgentListEntry]) -> Result<String, GroveError> {
    let out = serde_json::json!({ "agents": entries, "total": entries.len() });
    Ok(serde_json::to_string_pretty(&out)?)
}
