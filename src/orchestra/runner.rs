//! Two-phase plan execution.
//!
//! Phase one creates and registers every context in plan order, one at a time. Phase two
//! runs one future per created task: each waits for its dependencies' done signals, then
//! resolves its agent and opens a terminal session. Failures stay inside the task's
//! [`TaskOutcome`]; the run itself only fails when the plan is invalid.

use super::plan::{Plan, TaskDef};
use crate::agent::AgentResolver;
use crate::context::{provisioner_for, Context, ContextStore, CreateOptions, Strategy};
use crate::error::{GroveError, Result};
use crate::spawn::TerminalSpawner;
use crate::vcs::Repo;
use futures::future::join_all;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Why a task did not reach a spawned session.
#[derive(Debug, Error)]
pub enum TaskFailure {
    #[error("create: {0}")]
    Create(GroveError),

    #[error("store: {0}")]
    Register(GroveError),

    #[error("dependency {dependency:?} failed")]
    DependencyFailed { dependency: String },

    #[error("agent: {0}")]
    Agent(GroveError),

    #[error("spawn: {0}")]
    Spawn(GroveError),

    #[error("cancelled")]
    Cancelled,
}

/// Result of one task, reported in plan order.
#[derive(Debug)]
pub struct TaskOutcome {
    pub name: String,
    /// Working copy path when the context was created
    pub path: Option<PathBuf>,
    pub result: std::result::Result<(), TaskFailure>,
}

impl TaskOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Totals over a finished run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub succeeded: usize,
    pub failed: usize,
}

impl RunSummary {
    pub fn from_outcomes(outcomes: &[TaskOutcome]) -> Self {
        let succeeded = outcomes.iter().filter(|o| o.is_success()).count();
        Self {
            succeeded,
            failed: outcomes.len() - succeeded,
        }
    }
}

/// Resolves a task's done signal exactly once. Dropping it unresolved reports failure.
struct DoneSignal {
    sender: Option<watch::Sender<Option<bool>>>,
}

impl DoneSignal {
    fn resolve(mut self, succeeded: bool) {
        if let Some(sender) = self.sender.take() {
            let _ = sender.send(Some(succeeded));
        }
    }
}

impl Drop for DoneSignal {
    fn drop(&mut self) {
        if let Some(sender) = self.sender.take() {
            let _ = sender.send(Some(false));
        }
    }
}

#[derive(Clone)]
struct DoneWaiter {
    receiver: watch::Receiver<Option<bool>>,
}

impl DoneWaiter {
    /// Whether the task succeeded, once it has resolved.
    async fn wait(&self) -> bool {
        let mut receiver = self.receiver.clone();
        let succeeded = match receiver.wait_for(Option::is_some).await {
            Ok(value) => value.unwrap_or(false),
            Err(_) => false,
        };
        succeeded
    }
}

fn done_signal() -> (DoneSignal, DoneWaiter) {
    let (sender, receiver) = watch::channel(None);
    (
        DoneSignal {
            sender: Some(sender),
        },
        DoneWaiter { receiver },
    )
}

pub struct OrchestraRunner {
    repo: Repo,
    store: ContextStore,
    agents: Arc<dyn AgentResolver>,
    spawner: Arc<dyn TerminalSpawner>,
    default_strategy: Strategy,
    title_prefix: String,
}

impl OrchestraRunner {
    pub fn new(
        repo: Repo,
        store: ContextStore,
        agents: Arc<dyn AgentResolver>,
        spawner: Arc<dyn TerminalSpawner>,
    ) -> Self {
        Self {
            repo,
            store,
            agents,
            spawner,
            default_strategy: Strategy::Auto,
            title_prefix: "\u{1f9d9}".to_string(),
        }
    }

    /// Strategy for tasks that do not name one.
    pub fn with_default_strategy(mut self, strategy: Strategy) -> Self {
        self.default_strategy = strategy;
        self
    }

    /// Prefix of session titles (`<prefix> <task> [<agent>]`).
    pub fn with_title_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.title_prefix = prefix.into();
        self
    }

    /// Execute `plan`, returning one outcome per task in plan order.
    ///
    /// Contexts created before a failure or cancellation are left registered.
    pub async fn run(&self, cancel: &CancellationToken, plan: &Plan) -> Result<Vec<TaskOutcome>> {
        plan.validate()?;
        let started = Instant::now();

        let mut created = Vec::with_capacity(plan.tasks.len());
        for task in &plan.tasks {
            created.push(self.create_task(cancel, task).await);
        }
        debug!(elapsed_ms = started.elapsed().as_millis() as u64, "Creation phase finished");

        let index: HashMap<&str, usize> = plan
            .tasks
            .iter()
            .enumerate()
            .map(|(i, t)| (t.name.as_str(), i))
            .collect();
        let (signals, waiters): (Vec<DoneSignal>, Vec<DoneWaiter>) =
            plan.tasks.iter().map(|_| done_signal()).unzip();

        let mut units = Vec::with_capacity(plan.tasks.len());
        let mut pending = Vec::new();
        for ((task, creation), signal) in plan.tasks.iter().zip(created).zip(signals) {
            match creation {
                Err(failure) => {
                    signal.resolve(false);
                    pending.push(Some(TaskOutcome {
                        name: task.name.clone(),
                        path: None,
                        result: Err(failure),
                    }));
                }
                Ok(path) => {
                    pending.push(None);
                    let index = &index;
                    let waiters = &waiters;
                    units.push(async move {
                        let result = self.spawn_task(cancel, task, &path, index, waiters).await;
                        signal.resolve(result.is_ok());
                        TaskOutcome {
                            name: task.name.clone(),
                            path: Some(path),
                            result,
                        }
                    });
                }
            }
        }

        let mut spawned = join_all(units).await.into_iter();
        let outcomes: Vec<TaskOutcome> = pending
            .into_iter()
            .filter_map(|slot| slot.or_else(|| spawned.next()))
            .collect();

        let summary = RunSummary::from_outcomes(&outcomes);
        info!(
            succeeded = summary.succeeded,
            failed = summary.failed,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Orchestra run finished"
        );
        Ok(outcomes)
    }

    /// Provision and register one task's context.
    async fn create_task(
        &self,
        cancel: &CancellationToken,
        task: &TaskDef,
    ) -> std::result::Result<PathBuf, TaskFailure> {
        if cancel.is_cancelled() {
            return Err(TaskFailure::Cancelled);
        }

        let strategy = match Strategy::parse(task.strategy.as_deref().unwrap_or_default()) {
            Strategy::Auto => self.default_strategy,
            explicit => explicit,
        };
        let provisioner = provisioner_for(strategy, &self.repo);
        let branch = task.branch_name();

        let path = provisioner
            .create(
                cancel,
                &CreateOptions {
                    name: &task.name,
                    branch,
                    base_branch: task.base_branch(),
                    repo: &self.repo,
                },
            )
            .await
            .map_err(|e| match e {
                GroveError::Cancelled => TaskFailure::Cancelled,
                other => TaskFailure::Create(other),
            })?;

        let context = Context::new(&task.name, branch, &path, provisioner.strategy())
            .with_base_branch(task.base_branch().map(str::to_string))
            .with_task(Some(task.prompt.clone()))
            .with_agent(Some(task.agent.clone()));

        if let Err(err) = self.store.add(cancel, context).await {
            warn!(task = %task.name, error = %err, "Registration failed, removing working copy");
            if let Err(cleanup) = provisioner.destroy(&CancellationToken::new(), &path, true).await {
                warn!(path = %path.display(), error = %cleanup, "Failed to remove working copy");
            }
            return Err(TaskFailure::Register(err));
        }

        debug!(task = %task.name, path = %path.display(), "Created task context");
        Ok(path)
    }

    /// Wait for dependencies, then launch the task's agent.
    async fn spawn_task(
        &self,
        cancel: &CancellationToken,
        task: &TaskDef,
        path: &Path,
        index: &HashMap<&str, usize>,
        waiters: &[DoneWaiter],
    ) -> std::result::Result<(), TaskFailure> {
        for dependency in &task.depends_on {
            let waiter = index
                .get(dependency.as_str())
                .and_then(|&i| waiters.get(i))
                .ok_or_else(|| TaskFailure::DependencyFailed {
                    dependency: dependency.clone(),
                })?;
            let succeeded = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(TaskFailure::Cancelled),
                succeeded = waiter.wait() => succeeded,
            };
            if !succeeded {
                debug!(task = %task.name, dependency = %dependency, "Dependency failed");
                return Err(TaskFailure::DependencyFailed {
                    dependency: dependency.clone(),
                });
            }
        }
        if cancel.is_cancelled() {
            return Err(TaskFailure::Cancelled);
        }

        let agent = self.agents.resolve(&task.agent).map_err(TaskFailure::Agent)?;
        let command = agent.build_command(&task.prompt);
        let title = format!("{} {} [{}]", self.title_prefix, task.name, task.agent);

        self.spawner
            .open_tab(path, &command, &title)
            .await
            .map_err(TaskFailure::Spawn)?;
        info!(task = %task.name, spawner = self.spawner.name(), "Launched agent");
        Ok(())
    }
}
