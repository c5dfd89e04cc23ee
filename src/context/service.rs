//! Context lifecycle service.
//!
//! Owns the two-step sequences behind single-context commands: provision then register on
//! create, destroy then deregister on delete. CLI parses, calls one method, and formats.

use super::provision::{provisioner_for, CreateOptions};
use super::store::ContextStore;
use super::types::{validate_name, Context, Strategy};
use crate::error::{GroveError, Result};
use crate::vcs::{status_at, Repo, RepoStatus};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Parameters for creating one context.
#[derive(Debug, Clone, Default)]
pub struct CreateRequest {
    pub name: String,
    /// Defaults to the context name
    pub branch: Option<String>,
    pub base_branch: Option<String>,
    pub strategy: Strategy,
    pub task: Option<String>,
    pub agent: Option<String>,
}

impl CreateRequest {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn branch_name(&self) -> &str {
        self.branch
            .as_deref()
            .filter(|b| !b.is_empty())
            .unwrap_or(&self.name)
    }
}

pub struct ContextService {
    repo: Repo,
    store: ContextStore,
    default_strategy: Strategy,
}

impl ContextService {
    pub fn new(repo: Repo, store: ContextStore) -> Self {
        Self {
            repo,
            store,
            default_strategy: Strategy::Auto,
        }
    }

    /// Strategy used when a request leaves it as `Auto`.
    pub fn with_default_strategy(mut self, strategy: Strategy) -> Self {
        self.default_strategy = strategy;
        self
    }

    pub fn repo(&self) -> &Repo {
        &self.repo
    }

    pub fn store(&self) -> &ContextStore {
        &self.store
    }

    /// Provision and register a context.
    ///
    /// When registration fails the freshly provisioned working copy is destroyed.
    pub async fn create(&self, cancel: &CancellationToken, request: CreateRequest) -> Result<Context> {
        validate_name(&request.name)?;
        if self.store.list()?.iter().any(|c| c.name == request.name) {
            return Err(GroveError::context_exists(&request.name));
        }
        if !self.repo.has_commits(cancel).await? {
            return Err(GroveError::validation(
                "repository has no commits; create an initial commit first",
            ));
        }

        let strategy = match request.strategy {
            Strategy::Auto => self.default_strategy.resolve(),
            explicit => explicit,
        };
        let provisioner = provisioner_for(strategy, &self.repo);
        let branch = request.branch_name().to_string();
        let base = request.base_branch.clone().filter(|b| !b.is_empty());

        let path = provisioner
            .create(
                cancel,
                &CreateOptions {
                    name: &request.name,
                    branch: &branch,
                    base_branch: base.as_deref(),
                    repo: &self.repo,
                },
            )
            .await?;

        let context = Context::new(&request.name, &branch, &path, provisioner.strategy())
            .with_base_branch(base)
            .with_task(request.task)
            .with_agent(request.agent);

        if let Err(err) = self.store.add(cancel, context.clone()).await {
            warn!(name = %request.name, error = %err, "Registration failed, removing working copy");
            if let Err(cleanup) = provisioner.destroy(&CancellationToken::new(), &path, true).await {
                warn!(path = %path.display(), error = %cleanup, "Failed to remove working copy");
            }
            return Err(err);
        }

        info!(name = %context.name, strategy = %context.strategy, "Created context");
        Ok(context)
    }

    /// Destroy a context's working copy and deregister it.
    pub async fn delete(&self, cancel: &CancellationToken, name: &str, force: bool) -> Result<Context> {
        let context = self.store.get(name)?;
        let provisioner = provisioner_for(context.strategy, &self.repo);
        provisioner.destroy(cancel, &context.path, force).await?;
        let removed = self.store.remove(cancel, name).await?;
        info!(name, "Deleted context");
        Ok(removed)
    }

    pub async fn rename(&self, cancel: &CancellationToken, old: &str, new: &str) -> Result<Context> {
        self.store.rename(cancel, old, new).await?;
        self.store.get(new)
    }

    pub async fn status(&self, cancel: &CancellationToken, name: &str) -> Result<RepoStatus> {
        let context = self.store.get(name)?;
        status_at(&context.path, cancel).await
    }
}
