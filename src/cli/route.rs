//! CLI route: single route table and run context. Dispatches to domain services and presentation.

use crate::agent::ConfiguredAgents;
use crate::cli::parse::{Commands, TemplateCommands};
use crate::cli::presentation::{
    format_agent_list_json, format_agent_list_text, format_context_json,
    format_context_list_json, format_context_list_text, format_context_sections,
    format_context_text, format_doctor_report, format_orchestra_report, format_plan_preview,
    format_status_json, format_status_text, format_template_list_json, format_template_list_text,
    AgentListEntry,
};
use crate::config::{ConfigLoader, GroveConfig};
use crate::context::{
    Context, ContextService, ContextStore, CreateRequest, StateLayout, Strategy, Template,
    TemplateStore,
};
use crate::doctor::{all_passed, run_checks};
use crate::error::GroveError;
use crate::orchestra::{OrchestraRunner, Plan};
use crate::session::{run_in_context, spawn_in_context, Launch};
use crate::spawn::{ShellSpawner, TerminalSpawner};
use crate::vcs::{diff_since_base, log_since_base, Repo};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Text to print plus whether the command fully succeeded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub text: String,
    pub success: bool,
}

impl CommandOutput {
    fn ok(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            success: true,
        }
    }
}

/// Runtime context for CLI execution: repository, configuration and the context service.
pub struct RunContext {
    config: GroveConfig,
    layout: StateLayout,
    service: ContextService,
    templates: TemplateStore,
    spawner: Arc<dyn TerminalSpawner>,
    cancel: CancellationToken,
}

impl RunContext {
    /// Discover the repository at `repo_path` and load configuration.
    ///
    /// An explicit `config_path` replaces the global and repository config files.
    pub async fn new(
        repo_path: &Path,
        config_path: Option<PathBuf>,
        cancel: CancellationToken,
    ) -> Result<Self, GroveError> {
        let repo = Repo::discover(repo_path, &cancel).await?;
        let layout = StateLayout::for_repo(&repo);
        let config = match config_path {
            Some(path) => ConfigLoader::load_from_file(&path)?,
            None => ConfigLoader::load_validated(Some(layout.root()))?,
        };

        let lock = config.lock.build_lock(&layout.lock_file());
        let templates = TemplateStore::new(layout.templates_file(), lock.clone());
        let store = ContextStore::new(layout.state_file(), lock);
        let service =
            ContextService::new(repo, store).with_default_strategy(config.default_strategy);
        debug!(state_dir = %layout.root().display(), "Run context ready");

        Ok(Self {
            config,
            layout,
            service,
            templates,
            spawner: Arc::new(ShellSpawner::default()),
            cancel,
        })
    }

    /// Open `spawn` and orchestra sessions through `spawner`.
    pub fn with_spawner(mut self, spawner: Arc<dyn TerminalSpawner>) -> Self {
        self.spawner = spawner;
        self
    }

    pub fn config(&self) -> &GroveConfig {
        &self.config
    }

    pub fn layout(&self) -> &StateLayout {
        &self.layout
    }

    pub fn service(&self) -> &ContextService {
        &self.service
    }

    pub fn templates(&self) -> &TemplateStore {
        &self.templates
    }

    /// Execute one command and return its output.
    pub async fn execute(&self, command: &Commands) -> Result<CommandOutput, GroveError> {
        match command {
            Commands::Create {
                name,
                branch,
                base,
                strategy,
                task,
                agent,
                template,
            } => {
                let mut request = CreateRequest {
                    name: name.clone(),
                    branch: branch.clone(),
                    base_branch: base.clone(),
                    strategy: Strategy::parse(strategy),
                    task: task.clone(),
                    agent: agent.clone(),
                };
                if let Some(template) = template {
                    self.templates.get(template)?.apply(&mut request);
                }
                let context = self.service.create(&self.cancel, request).await?;
                Ok(CommandOutput::ok(format!(
                    "Created context {} ({}) at {}",
                    context.name,
                    context.strategy,
                    context.path.display()
                )))
            }
            Commands::List { format } => {
                let contexts = self.service.store().list()?;
                let text = if format == "json" {
                    format_context_list_json(&contexts)?
                } else {
                    format_context_list_text(&contexts)
                };
                Ok(CommandOutput::ok(text))
            }
            Commands::Show { name, format } => {
                let context = self.service.store().get(name)?;
                let text = if format == "json" {
                    format_context_json(&context)?
                } else {
                    format_context_text(&context)
                };
                Ok(CommandOutput::ok(text))
            }
            Commands::Path { name } => {
                let context = self.service.store().get(name)?;
                Ok(CommandOutput::ok(context.path.display().to_string()))
            }
            Commands::Rename { old, new } => {
                let context = self.service.rename(&self.cancel, old, new).await?;
                Ok(CommandOutput::ok(format!("Renamed {} to {}", old, context.name)))
            }
            Commands::Delete { names, force } => self.handle_delete(names, *force).await,
            Commands::Status { name, format } => self.handle_status(name.as_deref(), format).await,
            Commands::Orchestra { file, dry_run } => self.handle_orchestra(file, *dry_run).await,
            Commands::Agents { format } => self.handle_agents(format),
            Commands::Template { command } => self.handle_template(command).await,
            Commands::Run {
                name,
                agent,
                prompt,
                command,
            } => {
                let context = self.service.store().get(name)?;
                let launch = Launch::resolve(
                    &context,
                    agent.as_deref(),
                    prompt.as_deref(),
                    command,
                    &self.agents(),
                )?;
                let status =
                    run_in_context(&self.cancel, &context, &self.service.repo().name(), &launch).await?;
                Ok(CommandOutput {
                    text: String::new(),
                    success: status.success(),
                })
            }
            Commands::Spawn {
                name,
                agent,
                prompt,
            } => {
                let context = self.service.store().get(name)?;
                let launch =
                    Launch::resolve(&context, agent.as_deref(), prompt.as_deref(), &[], &self.agents())?;
                let label = spawn_in_context(
                    self.spawner.as_ref(),
                    &context,
                    &self.service.repo().name(),
                    &launch,
                    &self.config.prompt_emoji,
                )
                .await?;
                Ok(CommandOutput::ok(format!(
                    "Spawned: {} ({})",
                    label,
                    self.spawner.name()
                )))
            }
            Commands::Diff { name, stat, all } => {
                if *all {
                    return self.each_context("diff", "no changes", |c| async move {
                        diff_since_base(&self.cancel, &c.path, c.base_branch.as_deref(), &c.branch, true)
                            .await
                    })
                    .await;
                }
                let context = self.named_context(name.as_deref())?;
                let text = diff_since_base(
                    &self.cancel,
                    &context.path,
                    context.base_branch.as_deref(),
                    &context.branch,
                    *stat,
                )
                .await?;
                Ok(CommandOutput::ok(text))
            }
            Commands::Log { name, number, all } => {
                if *all {
                    return self.each_context("log", "no commits", |c| async move {
                        log_since_base(&self.cancel, &c.path, c.base_branch.as_deref(), &c.branch, *number)
                            .await
                    })
                    .await;
                }
                let context = self.named_context(name.as_deref())?;
                let text = log_since_base(
                    &self.cancel,
                    &context.path,
                    context.base_branch.as_deref(),
                    &context.branch,
                    *number,
                )
                .await?;
                Ok(CommandOutput::ok(text))
            }
            Commands::Doctor => {
                let results = run_checks(&self.cancel, &self.layout, &self.agents()).await;
                Ok(CommandOutput {
                    text: format_doctor_report(&results),
                    success: all_passed(&results),
                })
            }
        }
    }

    async fn handle_template(&self, command: &TemplateCommands) -> Result<CommandOutput, GroveError> {
        match command {
            TemplateCommands::Save {
                name,
                base,
                agent,
                strategy,
            } => {
                let template = Template {
                    name: name.clone(),
                    base: base.clone().filter(|b| !b.is_empty()),
                    strategy: strategy
                        .as_deref()
                        .map(Strategy::parse)
                        .filter(|s| *s != Strategy::Auto),
                    agent: agent.clone().filter(|a| !a.is_empty()),
                };
                self.templates.save(&self.cancel, template).await?;
                Ok(CommandOutput::ok(format!("Template saved: {}", name)))
            }
            TemplateCommands::List { format } => {
                let templates = self.templates.list()?;
                let text = if format == "json" {
                    format_template_list_json(&templates)?
                } else {
                    format_template_list_text(&templates)
                };
                Ok(CommandOutput::ok(text))
            }
            TemplateCommands::Delete { name } => {
                self.templates.delete(&self.cancel, name).await?;
                Ok(CommandOutput::ok(format!("Template deleted: {}", name)))
            }
        }
    }

    fn named_context(&self, name: Option<&str>) -> Result<Context, GroveError> {
        let name = name.ok_or_else(|| GroveError::validation("a context name or --all is required"))?;
        self.service.store().get(name)
    }

    /// Run `query` for every context and collect the output into one section each.
    ///
    /// A failing context gets a placeholder; cancellation stops the whole command.
    async fn each_context<F, Fut>(
        &self,
        what: &str,
        empty: &str,
        query: F,
    ) -> Result<CommandOutput, GroveError>
    where
        F: Fn(Context) -> Fut,
        Fut: std::future::Future<Output = Result<String, GroveError>>,
    {
        let mut sections = Vec::new();
        for context in self.service.store().list()? {
            let result = query(context.clone()).await;
            if matches!(result, Err(GroveError::Cancelled)) {
                return Err(GroveError::Cancelled);
            }
            sections.push((context, result));
        }
        Ok(CommandOutput::ok(format_context_sections(&sections, what, empty)))
    }

    async fn handle_delete(&self, names: &[String], force: bool) -> Result<CommandOutput, GroveError> {
        let mut deleted = Vec::with_capacity(names.len());
        for name in names {
            let context = self.service.delete(&self.cancel, name, force).await?;
            deleted.push(format!("Deleted context {}", context.name));
        }
        Ok(CommandOutput::ok(deleted.join("\n")))
    }

    async fn handle_status(&self, name: Option<&str>, format: &str) -> Result<CommandOutput, GroveError> {
        let (label, status) = match name {
            Some(name) => (name.to_string(), self.service.status(&self.cancel, name).await?),
            None => {
                let repo = self.service.repo();
                let status = repo.status(&self.cancel).await?;
                (repo.work_dir().display().to_string(), status)
            }
        };
        let text = if format == "json" {
            format_status_json(&label, &status)?
        } else {
            format_status_text(&label, &status)
        };
        Ok(CommandOutput::ok(text))
    }

    async fn handle_orchestra(&self, file: &Path, dry_run: bool) -> Result<CommandOutput, GroveError> {
        let plan = Plan::load(file)?;
        if dry_run {
            return Ok(CommandOutput::ok(format_plan_preview(&plan)));
        }

        let runner = OrchestraRunner::new(
            self.service.repo().clone(),
            self.service.store().clone(),
            Arc::new(self.agents()),
            self.spawner.clone(),
        )
        .with_default_strategy(self.config.default_strategy)
        .with_title_prefix(self.config.prompt_emoji.clone());

        let outcomes = runner.run(&self.cancel, &plan).await?;
        let success = outcomes.iter().all(|o| o.is_success());
        info!(tasks = outcomes.len(), success, "Orchestra finished");
        Ok(CommandOutput {
            text: format_orchestra_report(&outcomes),
            success,
        })
    }

    fn handle_agents(&self, format: &str) -> Result<CommandOutput, GroveError> {
        let agents = self.agents();
        let entries: Vec<AgentListEntry> = agents
            .names()
            .into_iter()
            .filter_map(|name| agents.lookup(&name))
            .map(|agent| AgentListEntry {
                configured: self.config.agents.contains_key(&agent.name),
                location: agents.locate(&agent),
                name: agent.name,
                command: agent.command,
                args: agent.args,
            })
            .collect();
        let text = if format == "json" {
            format_agent_list_json(&entries)?
        } else {
            format_agent_list_text(&entries)
        };
        Ok(CommandOutput::ok(text))
    }

    fn agents(&self) -> ConfiguredAgents {
        ConfiguredAgents::new(self.config.agents.clone())
    }
}
