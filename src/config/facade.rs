//! Config loading entry points.

use super::merge::merge_policy;
use super::sources::{global_file, repo_file};
use super::GroveConfig;
use crate::error::GroveError;
use config::{Environment, File};
use std::path::Path;
use tracing::debug;

/// Prefix of environment overrides, e.g. `GROVE__LOCK__TIMEOUT_MS`
pub const ENV_PREFIX: &str = "GROVE";

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load layered configuration. `state_dir` is the repository's grove directory.
    pub fn load(state_dir: Option<&Path>) -> Result<GroveConfig, GroveError> {
        let builder = merge_policy::builder_with_defaults()?;
        let builder = global_file::add_to_builder(builder)?;
        let builder = match state_dir {
            Some(dir) => repo_file::add_to_builder(builder, dir)?,
            None => builder,
        };
        let builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        );

        let config: GroveConfig = builder.build()?.try_deserialize()?;
        debug!(default_strategy = %config.default_strategy, "Loaded configuration");
        Ok(config)
    }

    /// Load defaults overlaid with a single file; no global, repository or environment
    /// layers.
    pub fn load_from_file(path: &Path) -> Result<GroveConfig, GroveError> {
        let config: GroveConfig = merge_policy::builder_with_defaults()?
            .add_source(File::from(path).required(true))
            .build()?
            .try_deserialize()?;
        Ok(config)
    }

    /// Load and validate in one step.
    pub fn load_validated(state_dir: Option<&Path>) -> Result<GroveConfig, GroveError> {
        let config = Self::load(state_dir)?;
        config.validate().map_err(|errors| {
            let messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            GroveError::Config(format!(
                "Configuration validation failed:\n{}",
                messages.join("\n")
            ))
        })?;
        Ok(config)
    }
}
