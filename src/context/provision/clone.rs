use super::{discard_partial, ensure_vacant, remove_tree, CreateOptions, Provisioner};
use crate::context::layout::StateLayout;
use crate::context::types::{safe_dir_name, Strategy};
use crate::error::{GroveError, Result};
use crate::vcs::{run_git, status_at, Repo};
use async_trait::async_trait;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Contexts as `--shared` clones under `<state>/clones/`.
///
/// A shared clone borrows the source repository's object store, so it is cheap to create
/// but must not outlive the source.
#[derive(Debug, Clone)]
pub struct CloneProvisioner {
    repo: Repo,
}

impl CloneProvisioner {
    pub fn new(repo: Repo) -> Self {
        Self { repo }
    }

    async fn checkout(
        &self,
        cancel: &CancellationToken,
        clone: &Repo,
        branch: &str,
        base: Option<&str>,
    ) -> Result<()> {
        if clone.branch_exists(cancel, branch).await? {
            clone.run(cancel, ["checkout", branch]).await?;
            return Ok(());
        }

        let remote = format!("refs/remotes/origin/{}", branch);
        if clone.ref_exists(cancel, &remote).await? {
            let tracking = format!("origin/{}", branch);
            clone
                .run(cancel, ["checkout", "-b", branch, "--track", tracking.as_str()])
                .await?;
            return Ok(());
        }

        let start = match base.filter(|b| !b.is_empty()) {
            None => "HEAD".to_string(),
            Some(base) => {
                let remote_base = format!("refs/remotes/origin/{}", base);
                if !clone.branch_exists(cancel, base).await?
                    && clone.ref_exists(cancel, &remote_base).await?
                {
                    format!("origin/{}", base)
                } else {
                    base.to_string()
                }
            }
        };
        debug!(branch, start = %start, "Creating branch in clone");
        clone
            .run(cancel, ["checkout", "-b", branch, start.as_str()])
            .await?;
        Ok(())
    }
}

#[async_trait]
impl Provisioner for CloneProvisioner {
    async fn create(&self, cancel: &CancellationToken, options: &CreateOptions<'_>) -> Result<PathBuf> {
        let repo = options.repo;
        let clones_dir = StateLayout::for_repo(repo).clones_dir();
        let path = clones_dir.join(safe_dir_name(options.name));
        ensure_vacant(&path)?;
        tokio::fs::create_dir_all(&clones_dir).await?;

        let args: Vec<OsString> = vec![
            "clone".into(),
            "--shared".into(),
            "--quiet".into(),
            repo.work_dir().into(),
            path.clone().into(),
        ];
        if let Err(err) = run_git(repo.work_dir(), &args, cancel).await {
            discard_partial(&path).await;
            return Err(err);
        }

        let checked_out = match Repo::discover(&path, cancel).await {
            Ok(clone) => {
                self.checkout(cancel, &clone, options.branch, options.base_branch)
                    .await
            }
            Err(err) => Err(err),
        };
        if let Err(err) = checked_out {
            discard_partial(&path).await;
            return Err(err);
        }

        info!(name = options.name, path = %path.display(), "Created clone context");
        Ok(path)
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
        remove_tree(path).await?;
        debug!(path = %path.display(), source = %self.repo.work_dir().display(), "Removed clone");
        Ok(())
    }

    fn strategy(&self) -> Strategy {
        Strategy::Clone
    }
}
