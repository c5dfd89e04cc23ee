//! Persistent context registry.
//!
//! The registry is a JSON file shared by every process working in a repository. Readers
//! take no lock: writers replace the file with an atomic rename, so a reader sees either
//! the old or the new state. Mutations re-read the file while holding the [`Lock`] so that
//! concurrent writers never lose each other's updates.

use super::layout::StateLayout;
use super::types::{validate_name, Context, State, STATE_VERSION};
use crate::error::{GroveError, Result};
use crate::lock::Lock;
use serde::Serialize;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub struct ContextStore {
    state_file: PathBuf,
    lock: Lock,
}

impl ContextStore {
    pub fn new(state_file: impl Into<PathBuf>, lock: Lock) -> Self {
        Self {
            state_file: state_file.into(),
            lock,
        }
    }

    /// Store using the standard layout with a default lock.
    pub fn at(layout: &StateLayout) -> Self {
        Self::new(layout.state_file(), Lock::new(layout.lock_file()))
    }

    pub fn state_file(&self) -> &Path {
        &self.state_file
    }

    pub fn lock(&self) -> &Lock {
        &self.lock
    }

    /// All contexts in insertion order.
    pub fn list(&self) -> Result<Vec<Context>> {
        Ok(self.read_state()?.contexts)
    }

    pub fn get(&self, name: &str) -> Result<Context> {
        self.read_state()?
            .contexts
            .into_iter()
            .find(|c| c.name == name)
            .ok_or_else(|| GroveError::context_not_found(name))
    }

    /// Register a new context. Names and paths must be unique.
    pub async fn add(&self, cancel: &CancellationToken, context: Context) -> Result<()> {
        validate_name(&context.name)?;
        self.lock
            .with_lock(cancel, || async move {
                let mut state = self.read_state()?;
                if state.find(&context.name).is_some() {
                    return Err(GroveError::context_exists(&context.name));
                }
                if let Some(existing) = state.contexts.iter().find(|c| c.path == context.path) {
                    return Err(GroveError::AlreadyExists {
                        kind: "context path",
                        name: format!("{} (used by {})", context.path.display(), existing.name),
                    });
                }
                info!(name = %context.name, path = %context.path.display(), "Registering context");
                state.contexts.push(context);
                self.write_state(&mut state)
            })
            .await
    }

    /// Remove a context record, returning it.
    pub async fn remove(&self, cancel: &CancellationToken, name: &str) -> Result<Context> {
        self.lock
            .with_lock(cancel, || async move {
                let mut state = self.read_state()?;
                let index = state
                    .position(name)
                    .ok_or_else(|| GroveError::context_not_found(name))?;
                let removed = state.contexts.remove(index);
                self.write_state(&mut state)?;
                info!(name, "Removed context");
                Ok(removed)
            })
            .await
    }

    /// Change a context's name. Branch and path stay as they are.
    pub async fn rename(&self, cancel: &CancellationToken, old: &str, new: &str) -> Result<()> {
        validate_name(new)?;
        self.lock
            .with_lock(cancel, || async move {
                let mut state = self.read_state()?;
                if state.find(new).is_some() {
                    return Err(GroveError::context_exists(new));
                }
                let index = state
                    .position(old)
                    .ok_or_else(|| GroveError::context_not_found(old))?;
                state.contexts[index].name = new.to_string();
                self.write_state(&mut state)?;
                info!(old, new, "Renamed context");
                Ok(())
            })
            .await
    }

    /// Apply `mutator` to one context and persist the result.
    ///
    /// Identity fields (`name`, `branch`, `path`, `strategy`, `created_at`) are restored
    /// after the mutator runs.
    pub async fn update<F>(&self, cancel: &CancellationToken, name: &str, mutator: F) -> Result<Context>
    where
        F: FnOnce(&mut Context),
    {
        self.lock
            .with_lock(cancel, || async move {
                let mut state = self.read_state()?;
                let index = state
                    .position(name)
                    .ok_or_else(|| GroveError::context_not_found(name))?;

                let original = state.contexts[index].clone();
                let entry = &mut state.contexts[index];
                mutator(entry);
                entry.name = original.name;
                entry.branch = original.branch;
                entry.path = original.path;
                entry.strategy = original.strategy;
                entry.created_at = original.created_at;

                let updated = entry.clone();
                self.write_state(&mut state)?;
                debug!(name, "Updated context");
                Ok(updated)
            })
            .await
    }

    fn read_state(&self) -> Result<State> {
        let bytes = match fs::read(&self.state_file) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(State::default()),
            Err(err) => return Err(err.into()),
        };
        let state: State = serde_json::from_slice(&bytes).map_err(|e| GroveError::State {
            path: self.state_file.clone(),
            message: e.to_string(),
        })?;
        if state.version > STATE_VERSION {
            return Err(GroveError::State {
                path: self.state_file.clone(),
                message: format!(
                    "unsupported state version {} (newest known is {})",
                    state.version, STATE_VERSION
                ),
            });
        }
        Ok(state)
    }

    fn write_state(&self, state: &mut State) -> Result<()> {
        state.version = STATE_VERSION;
        write_json_atomic(&self.state_file, state)
    }
}

/// Serialize `value` to a temp file next to `path` and rename it into place.
pub(crate) fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let dir = path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    fs::create_dir_all(&dir)?;

    let mut serialized = serde_json::to_vec_pretty(value)?;
    serialized.push(b'\n');

    let mut temp = tempfile::Builder::new()
        .prefix(".state-")
        .suffix(".json")
        .tempfile_in(&dir)?;
    temp.write_all(&serialized)?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| GroveError::State {
        path: path.to_path_buf(),
        message: format!("failed to replace state file: {}", e.error),
    })?;
    Ok(())
}
