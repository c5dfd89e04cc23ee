//! Repository discovery and git subprocess execution.

use crate::error::{GroveError, Result};
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// A discovered git repository.
///
/// `work_dir` is the top of the working tree the repo was discovered from, `git_dir` its
/// private git directory and `common_dir` the directory shared by all linked worktrees.
/// For a primary checkout `git_dir` and `common_dir` are the same.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Repo {
    work_dir: PathBuf,
    git_dir: PathBuf,
    common_dir: PathBuf,
}

/// Captured output of a finished git command.
struct GitOutput {
    stdout: String,
    stderr: String,
}

impl Repo {
    /// Discover the repository containing `start`.
    ///
    /// The path is made absolute and symlinks are resolved before git is asked for the
    /// worktree top level, git dir and common dir. Relative answers from git are joined
    /// onto the resolved start path.
    pub async fn discover(start: impl AsRef<Path>, cancel: &CancellationToken) -> Result<Self> {
        let start = start.as_ref();
        let absolute = if start.is_absolute() {
            start.to_path_buf()
        } else {
            std::env::current_dir()?.join(start)
        };
        let resolved = dunce::canonicalize(&absolute)?;

        let rev_parse = |flag: &'static str| {
            let resolved = resolved.clone();
            async move {
                match exec(&resolved, ["rev-parse", flag], cancel).await {
                    Ok(output) => Ok(output.stdout.trim().to_string()),
                    Err(GroveError::Subprocess { .. }) => Err(GroveError::NotFound {
                        kind: "git repository",
                        name: resolved.display().to_string(),
                    }),
                    Err(err) => Err(err),
                }
            }
        };

        let top_level = rev_parse("--show-toplevel").await?;
        let git_dir = rev_parse("--git-dir").await?;
        let common_dir = rev_parse("--git-common-dir").await?;

        let repo = Self {
            work_dir: anchor(&resolved, &top_level)?,
            git_dir: anchor(&resolved, &git_dir)?,
            common_dir: anchor(&resolved, &common_dir)?,
        };
        debug!(
            work_dir = %repo.work_dir.display(),
            common_dir = %repo.common_dir.display(),
            "Discovered repository"
        );
        Ok(repo)
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    pub fn git_dir(&self) -> &Path {
        &self.git_dir
    }

    pub fn common_dir(&self) -> &Path {
        &self.common_dir
    }

    /// Directory name of the primary checkout, the same from every worktree.
    pub fn name(&self) -> String {
        let primary = match self.common_dir.file_name() {
            Some(dir) if dir == ".git" => self.common_dir.parent().unwrap_or(&self.work_dir),
            _ => &self.work_dir,
        };
        primary
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Whether this checkout is a linked worktree rather than the primary one.
    pub fn is_linked_worktree(&self) -> bool {
        self.git_dir != self.common_dir
    }

    /// Run git in the working tree and return its combined stdout and stderr.
    pub async fn run<I, S>(&self, cancel: &CancellationToken, args: I) -> Result<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        run_git(&self.work_dir, args, cancel).await
    }

    /// Run git and split stdout into lines.
    pub async fn run_lines<I, S>(&self, cancel: &CancellationToken, args: I) -> Result<Vec<String>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let output = exec(&self.work_dir, args, cancel).await?;
        Ok(output.stdout.lines().map(str::to_string).collect())
    }

    /// Run git and return trimmed stdout only.
    pub(crate) async fn run_stdout<I, S>(&self, cancel: &CancellationToken, args: I) -> Result<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        run_git_stdout(&self.work_dir, args, cancel).await
    }

    /// Whether a local branch named `name` exists.
    pub async fn branch_exists(&self, cancel: &CancellationToken, name: &str) -> Result<bool> {
        self.ref_exists(cancel, &format!("refs/heads/{}", name)).await
    }

    /// Whether `reference` resolves to an object.
    pub async fn ref_exists(&self, cancel: &CancellationToken, reference: &str) -> Result<bool> {
        match exec(&self.work_dir, ["rev-parse", "--verify", "--quiet", reference], cancel).await {
            Ok(_) => Ok(true),
            Err(GroveError::Subprocess { .. }) => Ok(false),
            Err(err) => Err(err),
        }
    }

    /// The checked-out branch name, or `HEAD` when detached.
    pub async fn current_branch(&self, cancel: &CancellationToken) -> Result<String> {
        self.run_stdout(cancel, ["rev-parse", "--abbrev-ref", "HEAD"]).await
    }

    /// Whether HEAD points at a commit. False for a freshly initialised repository.
    pub async fn has_commits(&self, cancel: &CancellationToken) -> Result<bool> {
        self.ref_exists(cancel, "HEAD").await
    }
}

/// Run git in `dir`, returning combined stdout and stderr with trailing newlines trimmed.
///
/// A non-zero exit becomes `GroveError::Subprocess` carrying the exit code and output.
pub async fn run_git<I, S>(dir: &Path, args: I, cancel: &CancellationToken) -> Result<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let output = exec(dir, args, cancel).await?;
    let mut combined = output.stdout;
    combined.push_str(&output.stderr);
    Ok(combined.trim_end().to_string())
}

/// Run git in `dir` and return its stdout with trailing whitespace trimmed.
pub(crate) async fn run_git_stdout<I, S>(
    dir: &Path,
    args: I,
    cancel: &CancellationToken,
) -> Result<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let output = exec(dir, args, cancel).await?;
    Ok(output.stdout.trim_end().to_string())
}

async fn exec<I, S>(dir: &Path, args: I, cancel: &CancellationToken) -> Result<GitOutput>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let args: Vec<OsString> = args.into_iter().map(|a| a.as_ref().to_os_string()).collect();
    let command_line = describe(&args);

    if cancel.is_cancelled() {
        return Err(GroveError::Cancelled);
    }

    let mut command = Command::new("git");
    command
        .args(&args)
        .current_dir(dir)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    debug!(command = %command_line, dir = %dir.display(), "Running git");

    let output = tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            debug!(command = %command_line, "Git command cancelled");
            return Err(GroveError::Cancelled);
        }
        result = command.output() => result
            .map_err(|e| GroveError::subprocess(command_line.clone(), None, e.to_string()))?,
    };

    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

    if !output.status.success() {
        let mut combined = stdout;
        combined.push_str(&stderr);
        return Err(GroveError::subprocess(
            command_line,
            output.status.code(),
            combined.trim_end(),
        ));
    }

    Ok(GitOutput { stdout, stderr })
}

fn describe(args: &[OsString]) -> String {
    let mut line = String::from("git");
    for arg in args {
        line.push(' ');
        line.push_str(&arg.to_string_lossy());
    }
    line
}

fn anchor(base: &Path, reported: &str) -> Result<PathBuf> {
    let path = Path::new(reported);
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    };
    Ok(dunce::canonicalize(&joined)?)
}
