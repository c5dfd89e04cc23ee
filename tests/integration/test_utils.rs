//! Shared test utilities for integration tests
//!
//! Throwaway git repositories, a stub agent resolver and a recording terminal spawner.

use async_trait::async_trait;
use grove::agent::{Agent, AgentResolver};
use grove::spawn::TerminalSpawner;
use grove::vcs::Repo;
use grove::{GroveError, Result};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

/// Serializes tests that change process environment variables
static ENV_MUTEX: Mutex<()> = Mutex::new(());

pub fn env_guard() -> MutexGuard<'static, ()> {
    ENV_MUTEX.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Run git in `dir`, panicking with its output on failure.
pub fn git_in(dir: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .env("GIT_CONFIG_NOSYSTEM", "1")
        .output()
        .expect("git should be installed");
    assert!(
        output.status.success(),
        "git {:?} failed: {}{}",
        args,
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

/// A temporary git repository on branch `main`.
pub struct TestRepo {
    _dir: TempDir,
    root: PathBuf,
}

impl TestRepo {
    /// Repository with one commit containing README.md.
    pub fn new() -> Self {
        let repo = Self::empty();
        repo.commit_file("README.md", "# test\n", "initial commit");
        repo
    }

    /// Initialised repository without commits.
    pub fn empty() -> Self {
        let dir = TempDir::new().unwrap();
        let root = dunce::canonicalize(dir.path()).unwrap().join("repo");
        std::fs::create_dir(&root).unwrap();

        git_in(&root, &["init", "-q"]);
        git_in(&root, &["symbolic-ref", "HEAD", "refs/heads/main"]);
        git_in(&root, &["config", "user.email", "tests@example.com"]);
        git_in(&root, &["config", "user.name", "Grove Tests"]);
        git_in(&root, &["config", "commit.gpgsign", "false"]);

        Self { _dir: dir, root }
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    pub fn git(&self, args: &[&str]) -> String {
        git_in(&self.root, args)
    }

    pub fn commit_file(&self, rel: &str, content: &str, message: &str) {
        let path = self.root.join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(&path, content).unwrap();
        self.git(&["add", rel]);
        self.git(&["commit", "-q", "-m", message]);
    }

    pub async fn repo(&self) -> Repo {
        Repo::discover(&self.root, &CancellationToken::new())
            .await
            .unwrap()
    }

    /// `<git-common-dir>/grove`
    pub fn state_dir(&self) -> PathBuf {
        self.root.join(".git").join("grove")
    }
}

/// Resolves every agent name except `missing` to `echo`.
pub struct StaticAgents;

impl AgentResolver for StaticAgents {
    fn resolve(&self, name: &str) -> Result<Agent> {
        if name == "missing" {
            return Err(GroveError::NotFound {
                kind: "agent",
                name: name.to_string(),
            });
        }
        Ok(Agent::new(name, "echo", Vec::new()))
    }
}

#[derive(Debug, Clone)]
pub struct SpawnCall {
    pub dir: PathBuf,
    pub command: String,
    pub title: String,
    pub started: Instant,
    pub finished: Instant,
}

/// Records every `open_tab` call and holds each one open for `delay`.
pub struct RecordingSpawner {
    delay: Duration,
    calls: Mutex<Vec<SpawnCall>>,
    fail_for: Option<String>,
}

impl RecordingSpawner {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            calls: Mutex::new(Vec::new()),
            fail_for: None,
        }
    }

    /// Fail sessions whose title contains `needle`.
    pub fn failing_for(mut self, needle: &str) -> Self {
        self.fail_for = Some(needle.to_string());
        self
    }

    pub fn calls(&self) -> Vec<SpawnCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_for(&self, task: &str) -> Option<SpawnCall> {
        let needle = format!(" {} [", task);
        self.calls().into_iter().find(|c| c.title.contains(&needle))
    }
}

#[async_trait]
impl TerminalSpawner for RecordingSpawner {
    fn name(&self) -> &str {
        "recording"
    }

    async fn open_tab(&self, dir: &Path, shell_command: &str, title: &str) -> Result<()> {
        let started = Instant::now();
        tokio::time::sleep(self.delay).await;
        if let Some(needle) = &self.fail_for {
            if title.contains(needle.as_str()) {
                return Err(GroveError::subprocess("open tab", Some(1), "terminal refused"));
            }
        }
        self.calls.lock().unwrap().push(SpawnCall {
            dir: dir.to_path_buf(),
            command: shell_command.to_string(),
            title: title.to_string(),
            started,
            finished: Instant::now(),
        });
        Ok(())
    }
}
