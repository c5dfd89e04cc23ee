//! Sessions inside a context
//!
//! `run` executes an agent or an explicit command in the foreground with the context's
//! environment; `spawn` hands the equivalent shell command to a [`TerminalSpawner`].

use crate::agent::{quote, Agent, AgentResolver};
use crate::context::Context;
use crate::error::{GroveError, Result};
use crate::spawn::TerminalSpawner;
use std::process::{ExitStatus, Stdio};
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

pub const ENV_CONTEXT: &str = "GROVE_CTX";
pub const ENV_REPO: &str = "GROVE_REPO";
pub const ENV_DIR: &str = "GROVE_DIR";
pub const ENV_BRANCH: &str = "GROVE_BRANCH";

/// Shell command for a session with nothing else to run.
const INTERACTIVE_SHELL: &str = "exec \"${SHELL:-sh}\"";

/// Variables exported to everything launched in `context`.
pub fn context_env(context: &Context, repo_name: &str) -> Vec<(&'static str, String)> {
    vec![
        (ENV_CONTEXT, context.name.clone()),
        (ENV_REPO, repo_name.to_string()),
        (ENV_DIR, context.path.display().to_string()),
        (ENV_BRANCH, context.branch.clone()),
    ]
}

/// What a session starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Launch {
    Agent { agent: Agent, prompt: String },
    Command(Vec<String>),
    Shell,
}

impl Launch {
    /// Pick what to start in `context`.
    ///
    /// A non-empty `command` wins. Otherwise the agent (flag, then the context's agent) runs
    /// with the prompt (flag, then the context's task). With neither, an interactive shell.
    pub fn resolve(
        context: &Context,
        agent: Option<&str>,
        prompt: Option<&str>,
        command: &[String],
        agents: &dyn AgentResolver,
    ) -> Result<Self> {
        if !command.is_empty() {
            return Ok(Launch::Command(command.to_vec()));
        }
        let agent_name = agent
            .filter(|a| !a.is_empty())
            .or(context.agent.as_deref().filter(|a| !a.is_empty()));
        let Some(agent_name) = agent_name else {
            return Ok(Launch::Shell);
        };
        let agent = agents.resolve(agent_name)?;
        let prompt = prompt
            .filter(|p| !p.is_empty())
            .or(context.task.as_deref())
            .unwrap_or_default()
            .to_string();
        Ok(Launch::Agent { agent, prompt })
    }

    pub fn agent_name(&self) -> Option<&str> {
        match self {
            Launch::Agent { agent, .. } => Some(&agent.name),
            _ => None,
        }
    }

    /// Program and argv, or `None` for an interactive shell.
    pub fn exec_args(&self) -> Option<(String, Vec<String>)> {
        match self {
            Launch::Agent { agent, prompt } => Some(agent.exec_args(prompt)),
            Launch::Command(words) => {
                let (program, args) = words.split_first()?;
                Some((program.clone(), args.to_vec()))
            }
            Launch::Shell => None,
        }
    }

    /// One shell command line for the session.
    pub fn shell_command(&self) -> String {
        match self {
            Launch::Agent { agent, prompt } => agent.build_command(prompt),
            Launch::Command(words) => words.iter().map(|w| quote(w)).collect::<Vec<_>>().join(" "),
            Launch::Shell => INTERACTIVE_SHELL.to_string(),
        }
    }
}

/// Run `launch` in the foreground inside `context`, sharing our stdio.
///
/// Cancelling kills the child and returns `GroveError::Cancelled`.
pub async fn run_in_context(
    cancel: &CancellationToken,
    context: &Context,
    repo_name: &str,
    launch: &Launch,
) -> Result<ExitStatus> {
    let (program, args) = launch.exec_args().ok_or_else(|| {
        GroveError::validation(
            "usage: grove run <name> -- <command...> or grove run <name> --agent <agent>",
        )
    })?;
    if cancel.is_cancelled() {
        return Err(GroveError::Cancelled);
    }

    let mut child = Command::new(&program)
        .args(&args)
        .current_dir(&context.path)
        .envs(context_env(context, repo_name))
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| GroveError::subprocess(&program, None, e.to_string()))?;
    debug!(context = %context.name, program = %program, pid = child.id(), "Started command");

    let status = tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            // kill_on_drop reaps the child.
            return Err(GroveError::Cancelled);
        }
        status = child.wait() => status?,
    };
    info!(context = %context.name, program = %program, code = status.code(), "Command finished");
    Ok(status)
}

/// Open a session for `launch` through `spawner` and return its label.
pub async fn spawn_in_context(
    spawner: &dyn TerminalSpawner,
    context: &Context,
    repo_name: &str,
    launch: &Launch,
    title_prefix: &str,
) -> Result<String> {
    let exports: Vec<String> = context_env(context, repo_name)
        .into_iter()
        .map(|(key, value)| format!("{}={}", key, quote(&value)))
        .collect();
    let shell_command = format!("export {}; {}", exports.join(" "), launch.shell_command());
    let title = format!("{} {} ({})", title_prefix, context.name, repo_name);

    spawner.open_tab(&context.path, &shell_command, &title).await?;

    let label = match launch.agent_name() {
        Some(agent) => format!("{} [{}]", context.name, agent),
        None => context.name.clone(),
    };
    info!(context = %context.name, spawner = spawner.name(), "Spawned session");
    Ok(label)
}
