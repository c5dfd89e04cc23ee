//! Orchestration: bulk-create contexts from a plan and launch agents in dependency order.

pub mod plan;
pub mod runner;

pub use plan::{Plan, TaskDef};
pub use runner::{OrchestraRunner, RunSummary, TaskFailure, TaskOutcome};
