//! Configuration System
//!
//! Layered settings: built-in defaults, the user's global file, the repository's
//! `<git-common-dir>/grove/config.toml`, then `GROVE__SECTION__KEY` environment variables.

use crate::context::Strategy;
use crate::lock::{Lock, DEFAULT_POLL_INTERVAL};
use crate::logging::LoggingConfig;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

pub use crate::agent::AgentConfig;

mod facade;
mod merge;
mod sources;

pub use facade::ConfigLoader;
pub use sources::global_file::global_config_path;

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroveConfig {
    /// Strategy for contexts created without one
    #[serde(default)]
    pub default_strategy: Strategy,

    /// Leading marker of spawned session titles
    #[serde(default = "default_prompt_emoji")]
    pub prompt_emoji: String,

    #[serde(default)]
    pub lock: LockConfig,

    /// Custom agents; these shadow built-ins of the same name
    #[serde(default)]
    pub agents: HashMap<String, AgentConfig>,

    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_prompt_emoji() -> String {
    "\u{1f9d9}".to_string()
}

impl Default for GroveConfig {
    fn default() -> Self {
        Self {
            default_strategy: Strategy::Auto,
            prompt_emoji: default_prompt_emoji(),
            lock: LockConfig::default(),
            agents: HashMap::new(),
            logging: LoggingConfig::default(),
        }
    }
}

/// State lock tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockConfig {
    /// Milliseconds between attempts on a contended lock
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Give up after this many milliseconds; 0 waits until interrupted
    #[serde(default = "default_lock_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_poll_interval_ms() -> u64 {
    DEFAULT_POLL_INTERVAL.as_millis() as u64
}

fn default_lock_timeout_ms() -> u64 {
    30_000
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            timeout_ms: default_lock_timeout_ms(),
        }
    }
}

impl LockConfig {
    pub fn build_lock(&self, path: &Path) -> Lock {
        let timeout = (self.timeout_ms > 0).then(|| Duration::from_millis(self.timeout_ms));
        Lock::new(path)
            .with_poll_interval(Duration::from_millis(self.poll_interval_ms.max(1)))
            .with_timeout(timeout)
    }
}

/// Configuration validation errors
#[derive(Debug, Clone)]
pub enum ValidationError {
    Agent(String, String),
    Lock(String),
    Logging(String),
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::Agent(name, msg) => write!(f, "Agent '{}': {}", name, msg),
            ValidationError::Lock(msg) => write!(f, "Lock: {}", msg),
            ValidationError::Logging(msg) => write!(f, "Logging: {}", msg),
        }
    }
}

impl std::error::Error for ValidationError {}

impl GroveConfig {
    /// Validate the entire configuration
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        for (name, agent) in &self.agents {
            if let Err(e) = agent.validate() {
                errors.push(ValidationError::Agent(name.clone(), e));
            }
        }

        if self.lock.poll_interval_ms == 0 {
            errors.push(ValidationError::Lock(
                "poll_interval_ms must be greater than zero".to_string(),
            ));
        }

        if !matches!(self.logging.format.as_str(), "text" | "json") {
            errors.push(ValidationError::Logging(format!(
                "unknown format '{}'",
                self.logging.format
            )));
        }
        if !matches!(self.logging.output.as_str(), "stderr" | "file") {
            errors.push(ValidationError::Logging(format!(
                "unknown output '{}'",
                self.logging.output
            )));
        }
        if self.logging.output == "file" && self.logging.file.is_none() {
            errors.push(ValidationError::Logging(
                "output is 'file' but no file is set".to_string(),
            ));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
