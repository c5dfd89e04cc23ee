//! CLI domain: parse, route, output, and presentation only.
//! No domain orchestration; single route table dispatches to domain services.

mod output;
mod parse;
mod presentation;
mod route;

pub use output::map_error;
pub use parse::{Cli, Commands, TemplateCommands};
pub use presentation::{
    format_agent_list_json, format_agent_list_text, format_context_json,
    format_context_list_json, format_context_list_text, format_context_text,
    format_context_sections, format_doctor_report, format_orchestra_report, format_plan_preview,
    format_status_json, format_status_text, format_template_list_json, format_template_list_text,
    AgentListEntry,
};
pub use route::{CommandOutput, RunContext};
