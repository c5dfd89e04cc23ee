//! Version control gateway
//!
//! Every repository operation shells out to the `git` binary and parses its text output.
//! Commands run against a discovered [`Repo`] and honour a [`CancellationToken`]: when
//! the token fires the child is killed and the call returns `GroveError::Cancelled`.
//!
//! [`CancellationToken`]: tokio_util::sync::CancellationToken

mod history;
mod repo;
pub mod status;
mod worktree;

pub use history::{diff_since_base, log_since_base};
pub use repo::{run_git, Repo};
pub use status::{parse_status_porcelain_v2, status_at, RepoStatus};
pub use worktree::{parse_worktree_list, WorktreeInfo};
