//! Orchestra presentation: plan preview and per-task report.

use crate::orchestra::{Plan, RunSummary, TaskOutcome};
use owo_colors::OwoColorize;

pub fn format_plan_preview(plan: &Plan) -> String {
    let mut output = format!("Plan with {} task(s):\n", plan.tasks.len());
    for task in &plan.tasks {
        output.push_str(&format!("  {} [{}] on {}", task.name, task.agent, task.branch_name()));
        if let Some(base) = task.base_branch() {
            output.push_str(&format!(" from {}", base));
        }
        if !task.depends_on.is_empty() {
            output.push_str(&format!(" after {}", task.depends_on.join(", ")));
        }
        output.push('\n');
    }
    output.trim_end().to_string()
}

pub fn format_orchestra_report(outcomes: &[TaskOutcome]) -> String {
    let mut output = String::new();
    for outcome in outcomes {
        match &outcome.result {
            Ok(()) => output.push_str(&format!("{} {}\n", "✓".green(), outcome.name)),
            Err(failure) => output.push_str(&format!(
                "{} {}: {}\n",
                "✗".red(),
                outcome.name,
                failure
            )),
        }
    }
    let summary = RunSummary::from_outcomes(outcomes);
    output.push_str(&format!(
        "\n{} launched, {} failed",
        summary.succeeded, summary.failed
    ));
    output
}
