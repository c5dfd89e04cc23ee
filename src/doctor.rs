//! Environment checks behind `grove doctor`.

use crate::agent::ConfiguredAgents;
use crate::context::StateLayout;
use crate::session::ENV_CONTEXT;
use serde::Serialize;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    Ok,
    Warn,
    Fail,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckResult {
    pub name: &'static str,
    pub status: CheckStatus,
    pub message: String,
}

impl CheckResult {
    fn new(name: &'static str, status: CheckStatus, message: impl Into<String>) -> Self {
        Self {
            name,
            status,
            message: message.into(),
        }
    }
}

/// Run every check in display order.
pub async fn run_checks(
    cancel: &CancellationToken,
    layout: &StateLayout,
    agents: &ConfiguredAgents,
) -> Vec<CheckResult> {
    vec![
        check_git(cancel).await,
        check_agents(agents),
        check_state_dir(layout.root()),
        check_active_context(std::env::var(ENV_CONTEXT).ok().as_deref()),
    ]
}

/// Any failed check makes the whole report a failure; warnings do not.
pub fn all_passed(results: &[CheckResult]) -> bool {
    results.iter().all(|r| r.status != CheckStatus::Fail)
}

async fn check_git(cancel: &CancellationToken) -> CheckResult {
    let mut command = Command::new("git");
    command.arg("--version").stdin(Stdio::null()).kill_on_drop(true);
    let output = tokio::select! {
        biased;
        _ = cancel.cancelled() => return CheckResult::new("Git", CheckStatus::Fail, "check interrupted"),
        output = command.output() => output,
    };
    match output {
        Ok(output) if output.status.success() => CheckResult::new(
            "Git",
            CheckStatus::Ok,
            String::from_utf8_lossy(&output.stdout).trim(),
        ),
        Ok(output) => CheckResult::new(
            "Git",
            CheckStatus::Fail,
            format!("git --version exited with {}", output.status),
        ),
        Err(err) => {
            debug!(error = %err, "git not runnable");
            CheckResult::new("Git", CheckStatus::Fail, "git not found in PATH")
        }
    }
}

fn check_agents(agents: &ConfiguredAgents) -> CheckResult {
    let found: Vec<String> = agents
        .names()
        .into_iter()
        .filter_map(|name| agents.lookup(&name))
        .filter(|agent| agents.locate(agent).is_some())
        .map(|agent| agent.name)
        .collect();
    if found.is_empty() {
        CheckResult::new(
            "Agents",
            CheckStatus::Warn,
            "no agent command found in PATH; configure one under [agents.<name>]",
        )
    } else {
        CheckResult::new("Agents", CheckStatus::Ok, found.join(", "))
    }
}

fn check_state_dir(root: &Path) -> CheckResult {
    let writable = std::fs::create_dir_all(root).and_then(|()| tempfile::tempfile_in(root));
    match writable {
        Ok(_) => CheckResult::new("State directory", CheckStatus::Ok, root.display().to_string()),
        Err(err) => CheckResult::new(
            "State directory",
            CheckStatus::Fail,
            format!("{} is not writable: {}", root.display(), err),
        ),
    }
}

fn check_active_context(active: Option<&str>) -> CheckResult {
    match active.filter(|name| !name.is_empty()) {
        Some(name) => CheckResult::new("Active context", CheckStatus::Ok, name),
        None => CheckResult::new(
            "Active context",
            CheckStatus::Warn,
            "none; use `grove run <name>` or `grove spawn <name>`",
        ),
    }
}
