//! grove: branch-scoped working copies of a git repository
//!
//! A context is an isolated working copy (a linked worktree or a shared clone) bound to
//! one branch, so several terminal sessions can work on the same repository at once.
//! Context metadata lives in a lock-guarded JSON file under the repository's common git
//! directory, and an orchestra plan can create many contexts and launch an agent in each,
//! in dependency order.

pub mod agent;
pub mod cli;
pub mod config;
pub mod context;
pub mod doctor;
pub mod error;
pub mod lock;
pub mod logging;
pub mod orchestra;
pub mod session;
pub mod spawn;
pub mod vcs;

pub use error::{GroveError, Result};
