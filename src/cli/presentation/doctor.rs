//! Doctor report presentation.

use crate::doctor::{CheckResult, CheckStatus};
use owo_colors::OwoColorize;

pub fn format_doctor_report(results: &[CheckResult]) -> String {
    results
        .iter()
        .map(|result| {
            let mark = match result.status {
                CheckStatus::Ok => "✓".green().to_string(),
                CheckStatus::Warn => "!".yellow().to_string(),
                CheckStatus::Fail => "✗".red().to_string(),
            };
            format!(" {} {}: {}", mark, result.name, result.message)
        })
        .collect::<Vec<_>>()
        .join("\n")
}
