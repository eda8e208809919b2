mod config;

pub use config::{Config, TimerConfig};

use std::path::PathBuf;

/// Returns `~/.config/advanced-pomodoro[-dev]/` based on ADVANCED_POMODORO_ENV.
///
/// Set ADVANCED_POMODORO_ENV=dev to use development data directory.
///
/// # Errors
/// Returns an error if creating the config directory fails.
pub fn data_dir() -> std::io::Result<PathBuf> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("ADVANCED_POMODORO_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("advanced-pomodoro-dev")
    } else {
        base_dir.join("advanced-pomodoro")
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
