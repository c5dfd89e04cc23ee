//! Repository config file source: <git-common-dir>/grove/config.toml

use crate::context::layout::CONFIG_FILE_NAME;
use config::builder::DefaultState;
use config::ConfigBuilder;
use config::ConfigError;
use config::File;
use std::path::Path;

/// Add the repository config file to builder when present.
pub fn add_to_builder(
    builder: ConfigBuilder<DefaultState>,
    state_dir: &Path,
) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    let path = state_dir.join(CONFIG_FILE_NAME);
    if path.exists() {
        return Ok(builder.add_source(File::from(path.as_path()).required(false)));
    }
    Ok(builder)
}
