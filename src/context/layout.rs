//! On-disk layout of the per-repository state directory.
//!
//! Everything lives under `<git-common-dir>/grove/`, so every worktree of a repository
//! resolves the same directory.

use crate::vcs::Repo;
use std::path::{Path, PathBuf};

pub const STATE_DIR_NAME: &str = "grove";
pub const STATE_FILE_NAME: &str = "state.json";
pub const LOCK_FILE_NAME: &str = "grove.lock";
pub const CONFIG_FILE_NAME: &str = "config.toml";
pub const TEMPLATES_FILE_NAME: &str = "templates.json";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateLayout {
    root: PathBuf,
}

impl StateLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn for_repo(repo: &Repo) -> Self {
        Self::new(repo.common_dir().join(STATE_DIR_NAME))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn state_file(&self) -> PathBuf {
        self.root.join(STATE_FILE_NAME)
    }

    pub fn lock_file(&self) -> PathBuf {
        self.root.join(LOCK_FILE_NAME)
    }

    pub fn config_file(&self) -> PathBuf {
        self.root.join(CONFIG_FILE_NAME)
    }

    pub fn templates_file(&self) -> PathBuf {
        self.root.join(TEMPLATES_FILE_NAME)
    }

    /// Parent directory of worktree-backed contexts
    pub fn trees_dir(&self) -> PathBuf {
        self.root.join("trees")
    }

    /// Parent directory of clone-backed contexts
    pub fn clones_dir(&self) -> PathBuf {
        self.root.join("clones")
    }
}
