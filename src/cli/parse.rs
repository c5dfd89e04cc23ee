//! CLI parse: clap types for grove. No behavior; definitions only.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// grove - branch-scoped working copies for concurrent terminal sessions
#[derive(Parser, Debug)]
#[command(name = "grove")]
#[command(about = "Manage isolated, branch-scoped working copies of a git repository")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Any directory inside the repository or one of its worktrees
    #[arg(long, short = 'C', default_value = ".")]
    pub repo: PathBuf,

    /// Configuration file path (replaces global and repository config files)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Log at debug level
    #[arg(long, short)]
    pub verbose: bool,

    /// Disable logging
    #[arg(long, short, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long)]
    pub log_format: Option<String>,

    /// Log output (stderr, file)
    #[arg(long)]
    pub log_output: Option<String>,

    /// Log file path (if output is "file")
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Create a context: provision a working copy and register it
    Create {
        /// Context name
        name: String,
        /// Branch to check out (defaults to the name)
        #[arg(long, short)]
        branch: Option<String>,
        /// Start point when the branch does not exist yet
        #[arg(long)]
        base: Option<String>,
        /// Provisioning strategy (auto, worktree, clone)
        #[arg(long, default_value = "auto")]
        strategy: String,
        /// Task description recorded with the context
        #[arg(long)]
        task: Option<String>,
        /// Agent recorded with the context
        #[arg(long)]
        agent: Option<String>,
        /// Saved template supplying defaults for base, strategy and agent
        #[arg(long)]
        template: Option<String>,
    },
    /// List contexts
    List {
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Show one context
    Show {
        name: String,
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Print a context's working copy path
    Path { name: String },
    /// Rename a context (branch and path are unchanged)
    Rename { old: String, new: String },
    /// Delete contexts and their working copies
    Delete {
        #[arg(required = true)]
        names: Vec<String>,
        /// Delete even with uncommitted changes
        #[arg(long, short)]
        force: bool,
    },
    /// Working tree status of a context, or of the current checkout
    Status {
        name: Option<String>,
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Create contexts from a plan file and launch their agents
    Orchestra {
        /// Plan YAML file
        file: PathBuf,
        /// Validate and print the plan without creating anything
        #[arg(long)]
        dry_run: bool,
    },
    /// List known agents
    Agents {
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Manage saved context templates
    Template {
        #[command(subcommand)]
        command: TemplateCommands,
    },
    /// Run an agent or a command inside a context
    Run {
        name: String,
        /// Agent to run (defaults to the context's agent)
        #[arg(long)]
        agent: Option<String>,
        /// Prompt for the agent (defaults to the context's task)
        #[arg(long)]
        prompt: Option<String>,
        /// Command to run instead of an agent
        #[arg(last = true)]
        command: Vec<String>,
    },
    /// Open a terminal session in a context
    Spawn {
        name: String,
        /// Agent to launch (defaults to the context's agent)
        #[arg(long)]
        agent: Option<String>,
        /// Prompt for the agent (defaults to the context's task)
        #[arg(long)]
        prompt: Option<String>,
    },
    /// Diff of a context's branch against its base
    Diff {
        #[arg(required_unless_present = "all")]
        name: Option<String>,
        /// Summarize with --stat
        #[arg(long)]
        stat: bool,
        /// Diffstat of every context
        #[arg(long, conflicts_with = "name")]
        all: bool,
    },
    /// Commits on a context's branch since its base
    Log {
        #[arg(required_unless_present = "all")]
        name: Option<String>,
        /// Number of commits to show
        #[arg(long, short = 'n', default_value_t = 10)]
        number: usize,
        /// Log of every context
        #[arg(long, conflicts_with = "name")]
        all: bool,
    },
    /// Check the environment grove depends on
    Doctor,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum TemplateCommands {
    /// Save a template, replacing one with the same name
    Save {
        name: String,
        /// Default base branch
        #[arg(long)]
        base: Option<String>,
        /// Default agent
        #[arg(long)]
        agent: Option<String>,
        /// Default strategy (worktree or clone)
        #[arg(long)]
        strategy: Option<String>,
    },
    /// List templates
    List {
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Delete a template
    Delete { name: String },
}
