//! Linked worktree commands.

use super::repo::Repo;
use crate::error::Result;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing::info;

/// One entry of `git worktree list --porcelain`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorktreeInfo {
    pub path: PathBuf,
    pub head: String,
    /// Short branch name; `None` when detached or bare
    pub branch: Option<String>,
    pub bare: bool,
    pub detached: bool,
}

/// Parse porcelain worktree listing. Blank lines separate entries.
pub fn parse_worktree_list(text: &str) -> Vec<WorktreeInfo> {
    let mut worktrees = Vec::new();
    let mut current: Option<WorktreeInfo> = None;

    for line in text.lines() {
        if let Some(path) = line.strip_prefix("worktree ") {
            if let Some(done) = current.take() {
                worktrees.push(done);
            }
            current = Some(WorktreeInfo {
                path: PathBuf::from(path),
                ..WorktreeInfo::default()
            });
            continue;
        }

        let Some(entry) = current.as_mut() else {
            continue;
        };
        if let Some(head) = line.strip_prefix("HEAD ") {
            entry.head = head.to_string();
        } else if let Some(branch) = line.strip_prefix("branch ") {
            let short = branch.strip_prefix("refs/heads/").unwrap_or(branch);
            entry.branch = Some(short.to_string());
        } else if line == "bare" {
            entry.bare = true;
        } else if line == "detached" {
            entry.detached = true;
        } else if line.is_empty() {
            if let Some(done) = current.take() {
                worktrees.push(done);
            }
        }
    }

    if let Some(done) = current.take() {
        worktrees.push(done);
    }
    worktrees
}

impl Repo {
    /// Add a linked worktree at `path`.
    ///
    /// With `create_branch` a new branch is created from `base` (or HEAD); otherwise the
    /// existing `branch` is checked out.
    pub async fn worktree_add(
        &self,
        cancel: &CancellationToken,
        path: &Path,
        branch: &str,
        create_branch: bool,
        base: Option<&str>,
    ) -> Result<()> {
        let mut args: Vec<OsString> = vec!["worktree".into(), "add".into()];
        if create_branch {
            args.push("-b".into());
            args.push(branch.into());
            args.push(path.into());
            if let Some(base) = base.filter(|b| !b.is_empty()) {
                args.push(base.into());
            }
        } else {
            args.push(path.into());
            args.push(branch.into());
        }

        self.run(cancel, &args).await?;
        info!(path = %path.display(), branch, create_branch, "Added worktree");
        Ok(())
    }

    pub async fn worktree_list(&self, cancel: &CancellationToken) -> Result<Vec<WorktreeInfo>> {
        let output = self
            .run_stdout(cancel, ["worktree", "list", "--porcelain"])
            .await?;
        Ok(parse_worktree_list(&output))
    }

    pub async fn worktree_remove(
        &self,
        cancel: &CancellationToken,
        path: &Path,
        force: bool,
    ) -> Result<()> {
        let mut args: Vec<OsString> = vec!["worktree".into(), "remove".into(), path.into()];
        if force {
            args.push("--force".into());
        }
        self.run(cancel, &args).await?;
        Ok(())
    }

    /// Drop administrative entries for worktrees whose directories are gone.
    pub async fn worktree_prune(&self, cancel: &CancellationToken) -> Result<()> {
        self.run(cancel, ["worktree", "prune"]).await?;
        Ok(())
    }
}
