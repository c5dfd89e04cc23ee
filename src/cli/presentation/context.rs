//! Context presentation: list table, detail view, status.

use crate::context::Context;
use crate::error::GroveError;
use crate::vcs::RepoStatus;
use comfy_table::presets::UTF8_BORDERS_ONLY;
use comfy_table::Table;
use owo_colors::OwoColorize;

pub fn format_context_list_text(contexts: &[Context]) -> String {
    if contexts.is_empty() {
        return "No contexts. Create one with `grove create <name>`.".to_string();
    }
    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["Name", "Branch", "Strategy", "Agent", "Created", "Path"]);
    for context in contexts {
        table.add_row(vec![
            context.name.clone(),
            context.branch.clone(),
            context.strategy.to_string(),
            context.agent.clone().unwrap_or_else(|| "-".to_string()),
            context.created_at.format("%Y-%m-%d %H:%M").to_string(),
            context.path.display().to_string(),
        ]);
    }
    table.to_string()
}

pub fn format_context_list_json(contexts: &[Context]) -> Result<String, GroveError> {
    Ok(serde_json::to_string_pretty(contexts)?)
}

pub fn format_context_text(context: &Context) -> String {
    let mut output = format!("{}\n", context.name.bold());
    output.push_str(&format!("  Branch:   {}\n", context.branch));
    output.push_str(&format!("  Path:     {}\n", context.path.display()));
    output.push_str(&format!("  Strategy: {}\n", context.strategy));
    output.push_str(&format!("  Created:  {}\n", context.created_at.to_rfc3339()));
    if let Some(base) = &context.base_branch {
        output.push_str(&format!("  Base:     {}\n", base));
    }
    if let Some(agent) = &context.agent {
        output.push_str(&format!("  Agent:    {}\n", agent));
    }
    if let Some(task) = &context.task {
        output.push_str(&format!("  Task:     {}\n", task));
    }
    output.trim_end().to_string()
}

pub fn format_context_json(context: &Context) -> Result<String, GroveError> {
    Ok(serde_json::to_string_pretty(context)?)
}

pub fn format_status_text(label: &str, status: &RepoStatus) -> String {
    let state = if status.dirty {
        format!("{}", "dirty".yellow())
    } else {
        format!("{}", "clean".green())
    };
    let mut output = format!("{} on {} ({})\n", label.bold(), status.branch, state);
    if !status.upstream.is_empty() {
        output.push_str(&format!(
            "  upstream {}: {} ahead, {} behind\n",
            status.upstream, status.ahead, status.behind
        ));
    }
    if status.dirty {
        output.push_str(&format!(
            "  {} staged, {} unstaged, {} untracked",
            status.staged, status.unstaged, status.untracked
        ));
        if status.conflicted > 0 {
            output.push_str(&format!(", {}", format!("{} conflicted", status.conflicted).red()));
        }
        output.push('\n');
    }
    output.trim_end().to_string()
}

pub fn format_status_json(label: &str, status: &RepoStatus) -> Result<String, GroveError> {
    let mut value = serde_json::to_value(status)?;
    value["name"] = serde_json::json!(label);
    Ok(serde_json::to_string_pretty(&value)?)
}
