use super::{discard_partial, ensure_vacant, remove_tree, CreateOptions, Provisioner};
use crate::context::layout::StateLayout;
use crate::context::types::{safe_dir_name, Strategy};
use crate::error::{GroveError, Result};
use crate::vcs::{status_at, Repo};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Contexts as linked worktrees under `<state>/trees/`.
#[derive(Debug, Clone)]
pub struct WorktreeProvisioner {
    repo: Repo,
}

impl WorktreeProvisioner {
    pub fn new(repo: Repo) -> Self {
        Self { repo }
    }
}

#[async_trait]
impl Provisioner for WorktreeProvisioner {
    async fn create(&self, cancel: &CancellationToken, options: &CreateOptions<'_>) -> Result<PathBuf> {
        let repo = options.repo;
        let trees_dir = StateLayout::for_repo(repo).trees_dir();
        let path = trees_dir.join(safe_dir_name(options.name));
        ensure_vacant(&path)?;
        tokio::fs::create_dir_all(&trees_dir).await?;

        let exists = repo.branch_exists(cancel, options.branch).await?;
        let result = repo
            .worktree_add(cancel, &path, options.branch, !exists, options.base_branch)
            .await;

        match result {
            Ok(()) => {
                info!(name = options.name, path = %path.display(), "Created worktree context");
                Ok(path)
            }
            Err(err) => {
                discard_partial(&path).await;
                prune_stale(repo).await;
                Err(err)
            }
        }
    }

    async fn destroy(&self, cancel: &CancellationToken, path: &Path, force: bool) -> Result<()> {
        if !force {
            match status_at(path, cancel).await {
                Ok(status) if status.dirty => {
                    return Err(GroveError::DirtyWorkingTree(path.to_path_buf()));
                }
                Err(GroveError::Cancelled) => return Err(GroveError::Cancelled),
                _ => {}
            }
        }

        match self.repo.worktree_remove(cancel, path, force).await {
            Ok(()) => Ok(()),
            Err(err) if force => {
                warn!(path = %path.display(), error = %err, "git worktree remove failed, deleting directory");
                remove_tree(path).await?;
                prune_stale(&self.repo).await;
                Ok(())
            }
            Err(err) => Err(err),
        }
    }

    fn strategy(&self) -> Strategy {
        Strategy::Worktree
    }
}

/// Drop metadata of worktrees whose directories are gone. Runs to completion even after
/// the caller's token has fired.
async fn prune_stale(repo: &Repo) {
    if let Err(err) = repo.worktree_prune(&CancellationToken::new()).await {
        warn!(error = %err, "git worktree prune failed");
    }
}
