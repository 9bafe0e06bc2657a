pub mod config_cmd;
pub mod route;
pub mod tools;
pub mod validate;

use std::path::{Path, PathBuf};

use turnpike_config::{AppConfig, ConfigError};

/// Load from `--config` when given, otherwise the default location with
/// environment overrides applied.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    match path {
        Some(path) => AppConfig::load_from(path),
        None => AppConfig::load(),
    }
}

pub fn config_path(path: Option<&Path>) -> PathBuf {
    path.map(Path::to_path_buf)
        .unwrap_or_else(|| AppConfig::config_dir().join("config.toml"))
}
