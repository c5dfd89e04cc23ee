//! Provisioning strategies: how a context's working copy is created and removed.

mod clone;
mod worktree;

pub use clone::CloneProvisioner;
pub use worktree::WorktreeProvisioner;

use super::types::Strategy;
use crate::error::{GroveError, Result};
use crate::vcs::Repo;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// Inputs for materializing one context.
#[derive(Debug, Clone, Copy)]
pub struct CreateOptions<'a> {
    pub name: &'a str,
    pub branch: &'a str,
    pub base_branch: Option<&'a str>,
    pub repo: &'a Repo,
}

/// A filesystem backing strategy for contexts.
#[async_trait]
pub trait Provisioner: Send + Sync {
    /// Create the working copy and return its absolute path.
    ///
    /// On failure nothing created by this call is left behind.
    async fn create(&self, cancel: &CancellationToken, options: &CreateOptions<'_>) -> Result<PathBuf>;

    /// Remove the working copy at `path`.
    async fn destroy(&self, cancel: &CancellationToken, path: &Path, force: bool) -> Result<()>;

    fn strategy(&self) -> Strategy;
}

/// Build the provisioner for `strategy`. `Auto` yields the worktree provisioner.
pub fn provisioner_for(strategy: Strategy, repo: &Repo) -> Box<dyn Provisioner> {
    match strategy.resolve() {
        Strategy::Clone => Box::new(CloneProvisioner::new(repo.clone())),
        _ => Box::new(WorktreeProvisioner::new(repo.clone())),
    }
}

/// Refuse to provision into a directory that already exists.
fn ensure_vacant(path: &Path) -> Result<()> {
    if path.exists() {
        return Err(GroveError::AlreadyExists {
            kind: "context directory",
            name: path.display().to_string(),
        });
    }
    Ok(())
}

/// Delete a directory tree. A missing directory is not an error.
async fn remove_tree(path: &Path) -> Result<()> {
    match tokio::fs::remove_dir_all(path).await {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err.into()),
    }
}

/// Best-effort removal of a partially created working copy.
async fn discard_partial(path: &Path) {
    if let Err(err) = remove_tree(path).await {
        warn!(path = %path.display(), error = %err, "Failed to remove partial working copy");
    }
}
