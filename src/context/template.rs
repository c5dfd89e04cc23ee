//! Saved context templates.
//!
//! A template is a named set of defaults (base branch, strategy, agent) applied by
//! `create --template`. Templates live in `templates.json` next to the context registry and
//! are written under the same lock.

use super::layout::StateLayout;
use super::service::CreateRequest;
use super::store::write_json_atomic;
use super::types::{validate_name, Strategy};
use crate::error::{GroveError, Result};
use crate::lock::Lock;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Template {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strategy: Option<Strategy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent: Option<String>,
}

impl Template {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            base: None,
            strategy: None,
            agent: None,
        }
    }

    /// Fill the fields `request` leaves unset. Explicit request values win.
    pub fn apply(&self, request: &mut CreateRequest) {
        if request.base_branch.as_deref().map_or(true, str::is_empty) {
            request.base_branch = self.base.clone();
        }
        if request.strategy == Strategy::Auto {
            if let Some(strategy) = self.strategy {
                request.strategy = strategy;
            }
        }
        if request.agent.as_deref().map_or(true, str::is_empty) {
            request.agent = self.agent.clone();
        }
    }
}

#[derive(Debug, Clone)]
pub struct TemplateStore {
    path: PathBuf,
    lock: Lock,
}

impl TemplateStore {
    pub fn new(path: impl Into<PathBuf>, lock: Lock) -> Self {
        Self {
            path: path.into(),
            lock,
        }
    }

    pub fn at(layout: &StateLayout) -> Self {
        Self::new(layout.templates_file(), Lock::new(layout.lock_file()))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn list(&self) -> Result<Vec<Template>> {
        self.read()
    }

    pub fn get(&self, name: &str) -> Result<Template> {
        self.read()?
            .into_iter()
            .find(|t| t.name == name)
            .ok_or_else(|| GroveError::template_not_found(name))
    }

    /// Insert `template`, replacing any template with the same name in place.
    pub async fn save(&self, cancel: &CancellationToken, template: Template) -> Result<()> {
        validate_name(&template.name)?;
        self.lock
            .with_lock(cancel, || async move {
                let mut templates = self.read()?;
                match templates.iter_mut().find(|t| t.name == template.name) {
                    Some(existing) => *existing = template.clone(),
                    None => templates.push(template.clone()),
                }
                write_json_atomic(&self.path, &templates)?;
                info!(name = %template.name, "Saved template");
                Ok(())
            })
            .await
    }

    pub async fn delete(&self, cancel: &CancellationToken, name: &str) -> Result<Template> {
        self.lock
            .with_lock(cancel, || async move {
                let mut templates = self.read()?;
                let index = templates
                    .iter()
                    .position(|t| t.name == name)
                    .ok_or_else(|| GroveError::template_not_found(name))?;
                let removed = templates.remove(index);
                write_json_atomic(&self.path, &templates)?;
                info!(name, "Deleted template");
                Ok(removed)
            })
            .await
    }

    fn read(&self) -> Result<Vec<Template>> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };
        serde_json::from_slice(&bytes).map_err(|e| GroveError::State {
            path: self.path.clone(),
            message: e.to_string(),
        })
    }
}
