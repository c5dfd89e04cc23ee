//! Diff and log of a context's branch against its base.

use super::repo::run_git_stdout;
use crate::error::Result;
use std::path::Path;
use tokio_util::sync::CancellationToken;

fn diff_args(base: Option<&str>, branch: &str, stat: bool) -> Vec<String> {
    let mut args = vec!["diff".to_string()];
    if stat {
        args.push("--stat".to_string());
    }
    if let Some(base) = base.filter(|b| !b.is_empty()) {
        args.push(format!("{}...{}", base, branch));
    }
    args
}

fn log_args(base: Option<&str>, branch: &str, limit: usize) -> Vec<String> {
    let mut args = vec!["log".to_string(), "--oneline".to_string(), format!("-{}", limit)];
    if let Some(base) = base.filter(|b| !b.is_empty()) {
        args.push(format!("{}..{}", base, branch));
    }
    args
}

/// Changes on `branch` since it left `base`; without a base, the uncommitted changes in `dir`.
pub async fn diff_since_base(
    cancel: &CancellationToken,
    dir: &Path,
    base: Option<&str>,
    branch: &str,
    stat: bool,
) -> Result<String> {
    run_git_stdout(dir, diff_args(base, branch, stat), cancel).await
}

/// Up to `limit` one-line commits on `branch` that `base` does not have.
pub async fn log_since_base(
    cancel: &CancellationToken,
    dir: &Path,
    base: Option<&str>,
    branch: &str,
    limit: usize,
) -> Result<String> {
    run_git_stdout(dir, log_args(base, branch, limit), cancel).await
}
