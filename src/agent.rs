//! Coding agents
//!
//! An agent is an external CLI (claude, gemini, codex or a configured command) launched in a
//! context's directory with the task prompt as its final argument.

mod registry;

pub use registry::{builtin_agents, AgentResolver, ConfiguredAgents};

use serde::{Deserialize, Serialize};
use std::borrow::Cow;

/// How to invoke one agent CLI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Agent {
    pub name: String,
    pub command: String,
    pub args: Vec<String>,
}

/// Agent definition from configuration (`[agents.<name>]`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentConfig {
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
}

impl AgentConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.command.trim().is_empty() {
            return Err("command cannot be empty".to_string());
        }
        Ok(())
    }
}

impl Agent {
    pub fn new(name: impl Into<String>, command: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            name: name.into(),
            command: command.into(),
            args,
        }
    }

    /// Shell command line that runs the agent with `prompt` as one quoted word.
    ///
    /// Every part is quoted only when needed, so a plain `claude` stays `claude`.
    pub fn build_command(&self, prompt: &str) -> String {
        let mut parts: Vec<String> = Vec::with_capacity(self.args.len() + 2);
        parts.push(quote(&self.command));
        parts.extend(self.args.iter().map(|a| quote(a)));
        if !prompt.is_empty() {
            parts.push(quote(prompt));
        }
        parts.join(" ")
    }

    /// Program and argv for running the agent without a shell.
    pub fn exec_args(&self, prompt: &str) -> (String, Vec<String>) {
        let mut args = self.args.clone();
        if !prompt.is_empty() {
            args.push(prompt.to_string());
        }
        (self.command.clone(), args)
    }
}

pub(crate) fn quote(word: &str) -> String {
    match shlex::try_quote(word) {
        Ok(quoted) => quoted.into_owned(),
        // Interior NUL bytes cannot be passed to a shell at all; drop them.
        Err(_) => shlex::try_quote(&word.replace('\0', ""))
            .map(Cow::into_owned)
            .unwrap_or_default(),
    }
}
