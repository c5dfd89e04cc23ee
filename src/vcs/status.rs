//! Working tree status from `git status --porcelain=v2 -b`.

use super::repo::Repo;
use crate::error::Result;
use serde::Serialize;
use std::path::Path;
use tokio_util::sync::CancellationToken;

/// Summary of a working tree's status.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RepoStatus {
    pub branch: String,
    pub commit_id: String,
    pub upstream: String,
    pub ahead: u32,
    pub behind: u32,
    pub dirty: bool,
    pub staged: u32,
    pub unstaged: u32,
    pub untracked: u32,
    pub conflicted: u32,
}

impl RepoStatus {
    pub fn is_clean(&self) -> bool {
        !self.dirty
    }
}

/// Parse porcelain v2 output with branch headers.
///
/// Never fails: unknown lines are skipped and malformed numeric fields read as zero.
pub fn parse_status_porcelain_v2(text: &str) -> RepoStatus {
    let mut status = RepoStatus::default();

    for line in text.lines() {
        if let Some(header) = line.strip_prefix("# ") {
            parse_header(header, &mut status);
        } else if let Some(entry) = line
            .strip_prefix("1 ")
            .or_else(|| line.strip_prefix("2 "))
        {
            let mut code = entry.chars();
            let x = code.next().unwrap_or('.');
            let y = code.next().unwrap_or('.');
            if x != '.' {
                status.staged += 1;
            }
            if y != '.' {
                status.unstaged += 1;
            }
            status.dirty = true;
        } else if line.starts_with("u ") {
            status.conflicted += 1;
            status.dirty = true;
        } else if line.starts_with("? ") {
            status.untracked += 1;
            status.dirty = true;
        }
    }

    status
}

fn parse_header(header: &str, status: &mut RepoStatus) {
    if let Some(head) = header.strip_prefix("branch.head ") {
        status.branch = head.to_string();
    } else if let Some(oid) = header.strip_prefix("branch.oid ") {
        status.commit_id = oid.to_string();
    } else if let Some(upstream) = header.strip_prefix("branch.upstream ") {
        status.upstream = upstream.to_string();
    } else if let Some(ab) = header.strip_prefix("branch.ab ") {
        for part in ab.split_whitespace() {
            if let Some(n) = part.strip_prefix('+') {
                status.ahead = n.parse().unwrap_or(0);
            } else if let Some(n) = part.strip_prefix('-') {
                status.behind = n.parse().unwrap_or(0);
            }
        }
    }
}

/// Status of the working tree at `dir`.
pub async fn status_at(dir: &Path, cancel: &CancellationToken) -> Result<RepoStatus> {
    let output = super::repo::run_git_stdout(dir, ["status", "--porcelain=v2", "-b"], cancel).await?;
    Ok(parse_status_porcelain_v2(&output))
}

impl Repo {
    /// Status of this repository's working tree.
    pub async fn status(&self, cancel: &CancellationToken) -> Result<RepoStatus> {
        let output = self
            .run_stdout(cancel, ["status", "--porcelain=v2", "-b"])
            .await?;
        Ok(parse_status_porcelain_v2(&output))
    }
}
