//! Agent resolution: configured agents first, then built-ins.

use super::{Agent, AgentConfig};
use crate::error::{GroveError, Result};
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;

/// Resolves an agent name to an invocable [`Agent`].
pub trait AgentResolver: Send + Sync {
    fn resolve(&self, name: &str) -> Result<Agent>;
}

/// Built-in agents keyed by name.
pub fn builtin_agents() -> BTreeMap<&'static str, Agent> {
    ["claude", "gemini", "codex"]
        .into_iter()
        .map(|name| (name, Agent::new(name, name, Vec::new())))
        .collect()
}

/// Resolver backed by configuration with the built-ins as fallback.
///
/// Resolution checks that the agent's command is on `PATH`.
#[derive(Debug, Clone, Default)]
pub struct ConfiguredAgents {
    custom: HashMap<String, AgentConfig>,
    search_path: Option<std::ffi::OsString>,
}

impl ConfiguredAgents {
    pub fn new(custom: HashMap<String, AgentConfig>) -> Self {
        Self {
            custom,
            search_path: None,
        }
    }

    /// Look commands up in `paths` instead of the process `PATH`.
    pub fn with_search_path(mut self, paths: impl Into<std::ffi::OsString>) -> Self {
        self.search_path = Some(paths.into());
        self
    }

    /// Names of every resolvable agent, configured ones included, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = builtin_agents().keys().map(|n| n.to_string()).collect();
        for name in self.custom.keys() {
            if !names.contains(name) {
                names.push(name.clone());
            }
        }
        names.sort();
        names
    }

    /// Look up without the `PATH` check.
    pub fn lookup(&self, name: &str) -> Option<Agent> {
        if let Some(custom) = self.custom.get(name) {
            return Some(Agent::new(name, custom.command.clone(), custom.args.clone()));
        }
        builtin_agents().remove(name)
    }

    /// Where the agent's command was found, if anywhere.
    pub fn locate(&self, agent: &Agent) -> Option<PathBuf> {
        match &self.search_path {
            Some(paths) => {
                let cwd = std::env::current_dir().ok()?;
                which::which_in(&agent.command, Some(paths), cwd).ok()
            }
            None => which::which(&agent.command).ok(),
        }
    }
}

impl AgentResolver for ConfiguredAgents {
    fn resolve(&self, name: &str) -> Result<Agent> {
        let agent = self.lookup(name).ok_or_else(|| GroveError::NotFound {
            kind: "agent",
            name: name.to_string(),
        })?;
        if self.locate(&agent).is_none() {
            return Err(GroveError::NotFound {
                kind: "agent command",
                name: agent.command,
            });
        }
        Ok(agent)
    }
}
