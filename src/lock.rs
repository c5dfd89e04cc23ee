//! File-backed exclusive lock.
//!
//! A [`Lock`] serializes critical sections both within one process (an async mutex gate)
//! and across processes (an advisory exclusive lock on a marker file). Holding the lock is
//! represented by a [`LockGuard`]; dropping the guard releases both layers.

use crate::error::{GroveError, Result};
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

/// Default interval between attempts on a contended file lock
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Exclusive lock keyed by a lock file path.
#[derive(Debug, Clone)]
pub struct Lock {
    path: PathBuf,
    gate: Arc<Mutex<()>>,
    poll_interval: Duration,
    timeout: Option<Duration>,
}

/// Proof that a [`Lock`] is held.
#[derive(Debug)]
pub struct LockGuard {
    path: PathBuf,
    file: Option<File>,
    _gate: OwnedMutexGuard<()>,
}

impl Lock {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            gate: Arc::new(Mutex::new(())),
            poll_interval: DEFAULT_POLL_INTERVAL,
            timeout: None,
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Give up with `LockTimeout` once `timeout` has elapsed. `None` waits until cancelled.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Wait until the lock is held.
    ///
    /// Fails with `LockTimeout` when `cancel` fires or the configured timeout elapses, and
    /// with `Lock` when the lock file cannot be created or opened.
    pub async fn acquire(&self, cancel: &CancellationToken) -> Result<LockGuard> {
        let deadline = self.timeout.map(|t| Instant::now() + t);

        let gate = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(GroveError::LockTimeout(self.path.clone())),
            _ = expiry(deadline) => return Err(GroveError::LockTimeout(self.path.clone())),
            gate = self.gate.clone().lock_owned() => gate,
        };

        let file = self.open_lock_file()?;
        let mut attempts: u32 = 0;
        loop {
            match file.try_lock_exclusive() {
                Ok(()) => {
                    debug!(path = %self.path.display(), attempts, "Acquired lock");
                    return Ok(LockGuard {
                        path: self.path.clone(),
                        file: Some(file),
                        _gate: gate,
                    });
                }
                Err(err) if is_contended(&err) => {
                    attempts += 1;
                    trace!(path = %self.path.display(), attempts, "Lock held elsewhere");
                }
                Err(err) => return Err(GroveError::lock(&self.path, err.to_string())),
            }

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(GroveError::LockTimeout(self.path.clone())),
                _ = expiry(deadline) => return Err(GroveError::LockTimeout(self.path.clone())),
                _ = tokio::time::sleep(self.poll_interval) => {}
            }
        }
    }

    /// Take the lock if it is free right now.
    pub fn try_acquire(&self) -> Result<Option<LockGuard>> {
        let Ok(gate) = self.gate.clone().try_lock_owned() else {
            return Ok(None);
        };
        let file = self.open_lock_file()?;
        match file.try_lock_exclusive() {
            Ok(()) => Ok(Some(LockGuard {
                path: self.path.clone(),
                file: Some(file),
                _gate: gate,
            })),
            Err(err) if is_contended(&err) => Ok(None),
            Err(err) => Err(GroveError::lock(&self.path, err.to_string())),
        }
    }

    /// Run `body` while holding the lock.
    ///
    /// The lock is released whether `body` succeeds or fails, and also when the returned
    /// future is dropped before completion.
    pub async fn with_lock<T, F, Fut>(&self, cancel: &CancellationToken, body: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let guard = self.acquire(cancel).await?;
        let result = body().await;
        match (result, guard.release()) {
            (Err(err), _) => Err(err),
            (Ok(_), Err(err)) => Err(err),
            (Ok(value), Ok(())) => Ok(value),
        }
    }

    fn open_lock_file(&self) -> Result<File> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                GroveError::lock(&self.path, format!("cannot create lock directory: {}", e))
            })?;
        }
        OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&self.path)
            .map_err(|e| GroveError::lock(&self.path, format!("cannot open lock file: {}", e)))
    }
}

impl LockGuard {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Release the lock, reporting a failure to unlock the file.
    pub fn release(mut self) -> Result<()> {
        match self.file.take() {
            Some(file) => FileExt::unlock(&file)
                .map_err(|e| GroveError::lock(&self.path, format!("cannot unlock: {}", e))),
            None => Ok(()),
        }
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        if let Some(file) = self.file.take() {
            let _ = FileExt::unlock(&file);
        }
    }
}

fn is_contended(err: &std::io::Error) -> bool {
    err.kind() == fs2::lock_contended_error().kind()
}

async fn expiry(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending::<()>().await,
    }
}
