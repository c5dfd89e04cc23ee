//! Terminal spawning
//!
//! A [`TerminalSpawner`] opens a session in a directory and runs a shell command in it.
//! Terminal-emulator adapters implement the trait outside this crate; [`ShellSpawner`] is
//! the headless default that starts the command as a detached background process.

use crate::error::{GroveError, Result};
use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tracing::info;

#[async_trait]
pub trait TerminalSpawner: Send + Sync {
    fn name(&self) -> &str;

    /// Open a session in `dir` running `shell_command`, labelled `title`.
    async fn open_tab(&self, dir: &Path, shell_command: &str, title: &str) -> Result<()>;
}

/// Runs the command with `sh -c` in the background, detached from our stdio.
#[derive(Debug, Clone)]
pub struct ShellSpawner {
    shell: String,
}

impl Default for ShellSpawner {
    fn default() -> Self {
        Self {
            shell: "sh".to_string(),
        }
    }
}

impl ShellSpawner {
    pub fn with_shell(shell: impl Into<String>) -> Self {
        Self {
            shell: shell.into(),
        }
    }
}

#[async_trait]
impl TerminalSpawner for ShellSpawner {
    fn name(&self) -> &str {
        "shell"
    }

    async fn open_tab(&self, dir: &Path, shell_command: &str, title: &str) -> Result<()> {
        let child = Command::new(&self.shell)
            .arg("-c")
            .arg(shell_command)
            .current_dir(dir)
            .env("GROVE_TITLE", title)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| {
                GroveError::subprocess(format!("{} -c {}", self.shell, shell_command), None, e.to_string())
            })?;
        info!(title, dir = %dir.display(), pid = child.id(), "Spawned session");
        Ok(())
    }
}
