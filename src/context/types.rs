//! Context records, strategy tags and name rules shared by the store, provisioners and
//! orchestration.

use crate::error::{GroveError, Result};
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::OnceLock;

/// Current on-disk state version
pub const STATE_VERSION: u32 = 1;

/// Longest accepted context name
pub const MAX_NAME_LEN: usize = 128;

/// How a context's working copy is materialized.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// Resolved to [`Strategy::Worktree`] when a provisioner is built
    #[default]
    Auto,
    Worktree,
    Clone,
}

impl Strategy {
    /// Lenient parse: anything unrecognized is `Auto`.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "worktree" => Strategy::Worktree,
            "clone" => Strategy::Clone,
            _ => Strategy::Auto,
        }
    }

    /// Concrete strategy: `Auto` becomes `Worktree`.
    pub fn resolve(self) -> Self {
        match self {
            Strategy::Auto => Strategy::Worktree,
            other => other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::Auto => "auto",
            Strategy::Worktree => "worktree",
            Strategy::Clone => "clone",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A registered, branch-scoped working copy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Context {
    pub name: String,
    pub branch: String,
    pub path: PathBuf,
    pub strategy: Strategy,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_branch: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent: Option<String>,
}

impl Context {
    pub fn new(
        name: impl Into<String>,
        branch: impl Into<String>,
        path: impl Into<PathBuf>,
        strategy: Strategy,
    ) -> Self {
        Self {
            name: name.into(),
            branch: branch.into(),
            path: path.into(),
            strategy: strategy.resolve(),
            created_at: Utc::now(),
            base_branch: None,
            task: None,
            agent: None,
        }
    }

    pub fn with_base_branch(mut self, base: Option<String>) -> Self {
        self.base_branch = base.filter(|b| !b.is_empty());
        self
    }

    pub fn with_task(mut self, task: Option<String>) -> Self {
        self.task = task.filter(|t| !t.is_empty());
        self
    }

    pub fn with_agent(mut self, agent: Option<String>) -> Self {
        self.agent = agent.filter(|a| !a.is_empty());
        self
    }
}

/// Persisted collection of contexts in insertion order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct State {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub contexts: Vec<Context>,
}

fn default_version() -> u32 {
    STATE_VERSION
}

impl Default for State {
    fn default() -> Self {
        Self {
            version: STATE_VERSION,
            contexts: Vec::new(),
        }
    }
}

impl State {
    pub fn find(&self, name: &str) -> Option<&Context> {
        self.contexts.iter().find(|c| c.name == name)
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.contexts.iter().position(|c| c.name == name)
    }
}

fn name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[a-zA-Z0-9][a-zA-Z0-9._/-]*$").unwrap_or_else(|_| unreachable!())
    })
}

/// Check that `name` can be used as a context name.
pub fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(GroveError::validation("context name must not be empty"));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(GroveError::validation(format!(
            "context name {:?} is longer than {} characters",
            name, MAX_NAME_LEN
        )));
    }
    if !name_pattern().is_match(name) {
        return Err(GroveError::validation(format!(
            "context name {:?} must start with a letter or digit and contain only letters, digits, '.', '_', '/' or '-'",
            name
        )));
    }
    Ok(())
}

/// Directory component for a context name; path separators become `__`.
pub fn safe_dir_name(name: &str) -> String {
    name.replace(['/', '\\'], "__")
}
