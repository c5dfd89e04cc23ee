//! CLI presentation: text and json formatters per command family.

mod agent;
mod context;
mod doctor;
mod history;
mod orchestra;
mod template;

pub use agent::{format_agent_list_json, format_agent_list_text, AgentListEntry};
pub use context::{
    format_context_json, format_context_list_json, format_context_list_text,
    format_context_text, format_status_json, format_status_text,
};
pub use orchestra::{format_orchestra_report, format_plan_preview};
pub use doctor::format_doctor_report;
pub use history::format_context_sections;
pub use template::{format_template_list_json, format_template_list_text};
