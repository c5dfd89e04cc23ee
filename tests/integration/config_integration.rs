//! Layered configuration tests: global file, repository file and environment

use crate::integration::test_utils::{env_guard, TestRepo};
use grove::config::{global_config_path, ConfigLoader};
use grove::context::{StateLayout, Strategy};
use tempfile::TempDir;

/// Restores an environment variable when dropped.
struct EnvVar {
    key: &'static str,
    original: Option<std::ffi::OsString>,
}

impl EnvVar {
    fn set(key: &'static str, value: impl AsRef<std::ffi::OsStr>) -> Self {
        let original = std::env::var_os(key);
        std::env::set_var(key, value);
        Self { key, original }
    }
}

impl Drop for EnvVar {
    fn drop(&mut self) {
        match &self.original {
            Some(value) => std::env::set_var(self.key, value),
            None => std::env::remove_var(self.key),
        }
    }
}

#[tokio::test]
async fn test_repository_file_overrides_global_and_env_overrides_both() {
    let _guard = env_guard();
    let config_home = TempDir::new().unwrap();
    let _xdg = EnvVar::set("XDG_CONFIG_HOME", config_home.path());

    let global = global_config_path().unwrap();
    assert_eq!(global, config_home.path().join("grove").join("config.toml"));
    std::fs::create_dir_all(global.parent().unwrap()).unwrap();
    std::fs::write(
        &global,
        r#"
prompt_emoji = "G"

[lock]
timeout_ms = 1000

[agents.aider]
command = "aider"
"#,
    )
    .unwrap();

    let test_repo = TestRepo::new();
    let layout = StateLayout::for_repo(&test_repo.repo().await);
    std::fs::create_dir_all(layout.root()).unwrap();
    std::fs::write(
        layout.config_file(),
        r#"
default_strategy = "clone"
prompt_emoji = "R"
"#,
    )
    .unwrap();

    let config = ConfigLoader::load_validated(Some(layout.root())).unwrap();
    assert_eq!(config.default_strategy, Strategy::Clone);
    assert_eq!(config.prompt_emoji, "R");
    assert_eq!(config.lock.timeout_ms, 1000);
    assert_eq!(config.lock.poll_interval_ms, 50);
    assert_eq!(config.agents["aider"].command, "aider");

    let _emoji = EnvVar::set("GROVE__PROMPT_EMOJI", "E");
    let _poll = EnvVar::set("GROVE__LOCK__POLL_INTERVAL_MS", "7");
    let config = ConfigLoader::load(Some(layout.root())).unwrap();
    assert_eq!(config.prompt_emoji, "E");
    assert_eq!(config.lock.poll_interval_ms, 7);
    assert_eq!(config.default_strategy, Strategy::Clone);
}

#[test]
fn test_missing_files_fall_back_to_defaults() {
    let _guard = env_guard();
    let config_home = TempDir::new().unwrap();
    let _xdg = EnvVar::set("XDG_CONFIG_HOME", config_home.path());
    let state_dir = TempDir::new().unwrap();

    let config = ConfigLoader::load_validated(Some(state_dir.path())).unwrap();
    assert_eq!(config.default_strategy, Strategy::Auto);
    assert_eq!(config.prompt_emoji, "\u{1f9d9}");
    assert_eq!(config.lock.timeout_ms, 30_000);
}

#[test]
fn test_invalid_repository_config_is_reported() {
    let _guard = env_guard();
    let config_home = TempDir::new().unwrap();
    let _xdg = EnvVar::set("XDG_CONFIG_HOME", config_home.path());
    let state_dir = TempDir::new().unwrap();
    std::fs::write(
        state_dir.path().join("config.toml"),
        "[lock]\npoll_interval_ms = 0\n",
    )
    .unwrap();

    let err = ConfigLoader::load_validated(Some(state_dir.path())).unwrap_err();
    assert!(err.to_string().contains("poll_interval_ms"), "unexpected error: {}", err);
}

#[test]
fn test_explicit_file_ignores_environment() {
    let _guard = env_guard();
    let _emoji = EnvVar::set("GROVE__PROMPT_EMOJI", "E");
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("custom.toml");
    std::fs::write(&file, "prompt_emoji = \"F\"\n").unwrap();

    let config = ConfigLoader::load_from_file(&file).unwrap();
    assert_eq!(config.prompt_emoji, "F");

    let missing = ConfigLoader::load_from_file(&dir.path().join("absent.toml"));
    assert!(missing.is_err());
}
