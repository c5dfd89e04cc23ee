//! Error types for the grove context lifecycle engine.

use std::path::PathBuf;
use thiserror::Error;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, GroveError>;

/// Errors returned by the store, provisioners, git gateway and plan loader
#[derive(Debug, Error)]
pub enum GroveError {
    #[error("{kind} {name:?} not found")]
    NotFound { kind: &'static str, name: String },

    #[error("{kind} {name:?} already exists")]
    AlreadyExists { kind: &'static str, name: String },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Timed out waiting for lock {0}")]
    LockTimeout(PathBuf),

    #[error("Lock error on {path}: {message}")]
    Lock { path: PathBuf, message: String },

    #[error("{command} failed{}: {output}", .code.map(|c| format!(" (exit code {})", c)).unwrap_or_default())]
    Subprocess {
        command: String,
        code: Option<i32>,
        output: String,
    },

    #[error("{0} has uncommitted changes; use --force to delete anyway")]
    DirtyWorkingTree(PathBuf),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("State file {path}: {message}")]
    State { path: PathBuf, message: String },

    #[error("Plan file {path}: {message}")]
    Plan { path: PathBuf, message: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl GroveError {
    /// Lookup miss for a context
    pub fn context_not_found(name: impl Into<String>) -> Self {
        GroveError::NotFound {
            kind: "context",
            name: name.into(),
        }
    }

    /// Duplicate context name
    pub fn context_exists(name: impl Into<String>) -> Self {
        GroveError::AlreadyExists {
            kind: "context",
            name: name.into(),
        }
    }

    pub fn template_not_found(name: impl Into<String>) -> Self {
        GroveError::NotFound {
            kind: "template",
            name: name.into(),
        }
    }

    /// Malformed input
    pub fn validation(msg: impl Into<String>) -> Self {
        GroveError::Validation(msg.into())
    }

    pub fn lock(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        GroveError::Lock {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn subprocess(command: impl Into<String>, code: Option<i32>, output: impl Into<String>) -> Self {
        GroveError::Subprocess {
            command: command.into(),
            code,
            output: output.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, GroveError::NotFound { .. })
    }

    pub fn is_already_exists(&self) -> bool {
        matches!(self, GroveError::AlreadyExists { .. })
    }
}

impl From<config::ConfigError> for GroveError {
    fn from(err: config::ConfigError) -> Self {
        GroveError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for GroveError {
    fn from(err: serde_json::Error) -> Self {
        GroveError::Serialization(err.to_string())
    }
}
