pub mod config;
pub mod session;

use std::path::{Path, PathBuf};

use advanced_pomodoro_core::{Config, ConfigError};

/// The `--config` path, or the default location.
pub fn config_path(custom: Option<&Path>) -> Result<PathBuf, ConfigError> {
    match custom {
        Some(path) => Ok(path.to_path_buf()),
        None => Config::path(),
    }
}
