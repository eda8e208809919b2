//! TOML-based application configuration.
//!
//! Stores user preferences including:
//! - Work, short break and long break lengths
//! - Long break cadence, cyclic mode and break auto-start
//! - Session log options
//!
//! Configuration is stored at `~/.config/advanced-pomodoro/config.toml`.
//! Every value is validated here, so the session controller can trust the
//! intervals it is given.

use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use super::data_dir;
use crate::error::ConfigError;
use crate::session::SessionConfig;
use crate::session_log::LogSettings;

/// Timer-specific configuration. Intervals are in minutes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimerConfig {
    #[serde(default = "default_work_interval")]
    pub work_interval: u32,
    #[serde(default = "default_break_interval")]
    pub break_interval: u32,
    #[serde(default = "default_long_break_interval")]
    pub long_break_interval: u32,
    #[serde(default = "default_long_break_interval_count")]
    pub long_break_interval_count: u32,
    #[serde(default)]
    pub cyclic_mode: bool,
    #[serde(default = "default_true")]
    pub auto_start_break: bool,
    #[serde(default = "default_override_timeout_ms")]
    pub override_timeout_ms: u64,
    /// How often a running countdown is refreshed.
    #[serde(default = "default_tick_period_ms")]
    pub tick_period_ms: u64,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/advanced-pomodoro/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Notes folder. Contexts and the log file are relative to it.
    #[serde(default)]
    pub vault_dir: Option<PathBuf>,
    #[serde(default)]
    pub timer: TimerConfig,
    #[serde(default)]
    pub logging: LogSettings,
}

// Default functions
fn default_work_interval() -> u32 {
    25
}
fn default_break_interval() -> u32 {
    5
}
fn default_long_break_interval() -> u32 {
    15
}
fn default_long_break_interval_count() -> u32 {
    4
}
fn default_true() -> bool {
    true
}
fn default_override_timeout_ms() -> u64 {
    2000
}
fn default_tick_period_ms() -> u64 {
    250
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            work_interval: default_work_interval(),
            break_interval: default_break_interval(),
            long_break_interval: default_long_break_interval(),
            long_break_interval_count: default_long_break_interval_count(),
            cyclic_mode: false,
            auto_start_break: true,
            override_timeout_ms: default_override_timeout_ms(),
            tick_period_ms: default_tick_period_ms(),
        }
    }
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let unknown = || ConfigError::UnknownKey(key.to_string());
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        if parts.peek().is_none() || key.is_empty() {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            let is_leaf = parts.peek().is_none();
            if is_leaf {
                let obj = current.as_object_mut().ok_or_else(unknown)?;
                let existing = obj.get(part).ok_or_else(unknown)?;

                let new_value = match existing {
                    serde_json::Value::Bool(_) => serde_json::Value::Bool(
                        value
                            .parse::<bool>()
                            .map_err(|_| invalid(format!("cannot parse '{value}' as bool")))?,
                    ),
                    serde_json::Value::Number(_) => {
                        if let Ok(n) = value.parse::<u64>() {
                            serde_json::Value::Number(n.into())
                        } else if let Ok(n) = value.parse::<f64>() {
                            serde_json::Number::from_f64(n)
                                .map(serde_json::Value::Number)
                                .ok_or_else(|| invalid(format!("cannot parse '{value}' as number")))?
                        } else {
                            return Err(invalid(format!("cannot parse '{value}' as number")));
                        }
                    }
                    serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                        serde_json::from_str(value).map_err(|e| invalid(e.to_string()))?
                    }
                    _ => serde_json::Value::String(value.into()),
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current.get_mut(part).ok_or_else(unknown)?;
        }

        Err(unknown())
    }

    /// Default location of the config file.
    pub fn path() -> Result<PathBuf, ConfigError> {
        let dir = data_dir().map_err(|e| ConfigError::LoadFailed {
            path: PathBuf::from("~/.config"),
            message: e.to_string(),
        })?;
        Ok(dir.join("config.toml"))
    }

    /// Load from `path`, writing defaults there if the file is missing.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => {
                let cfg: Config = toml::from_str(&content)?;
                cfg.validate()?;
                Ok(cfg)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                let cfg = Self::default();
                cfg.save_to(path)?;
                Ok(cfg)
            }
            Err(e) => Err(ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
        }
    }

    /// Persist to `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written to disk.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| failed(e.to_string()))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| failed(e.to_string()))?;
        }
        std::fs::write(path, content).map_err(|e| failed(e.to_string()))
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Change one value by dot-separated key, in memory only.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown, the value cannot be parsed
    /// into the field's type, or the result fails validation. `self` is left
    /// unchanged on error.
    pub fn apply(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut json = serde_json::to_value(&*self).map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Config = serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        updated.validate()?;
        *self = updated;
        Ok(())
    }

    /// Reject values the session controller cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("timer.work_interval", u64::from(self.timer.work_interval)),
            ("timer.break_interval", u64::from(self.timer.break_interval)),
            ("timer.long_break_interval", u64::from(self.timer.long_break_interval)),
            (
                "timer.long_break_interval_count",
                u64::from(self.timer.long_break_interval_count),
            ),
            ("timer.override_timeout_ms", self.timer.override_timeout_ms),
            ("timer.tick_period_ms", self.timer.tick_period_ms),
        ];
        for (key, value) in positive {
            if value == 0 {
                return Err(ConfigError::InvalidValue {
                    key: key.to_string(),
                    message: "must be a positive integer".into(),
                });
            }
        }
        if self.logging.log_file.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "logging.log_file".into(),
                message: "must not be empty".into(),
            });
        }
        Ok(())
    }

    /// The settings a session controller runs with.
    pub fn session(&self) -> SessionConfig {
        SessionConfig {
            work_interval: self.timer.work_interval,
            break_interval: self.timer.break_interval,
            long_break_interval: self.timer.long_break_interval,
            long_break_interval_count: self.timer.long_break_interval_count,
            cyclic_mode: self.timer.cyclic_mode,
            auto_start_break: self.timer.auto_start_break,
            log_trigger: self.logging.log_on,
            override_timeout_ms: self.timer.override_timeout_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::LogTrigger;

    #[test]
    fn default_config_roundtrip() {
        let cfg = Config::default();
        let toml_str = toml::to_string_pretty(&cfg).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.timer.work_interval, 25);
        assert_eq!(parsed.logging.log_on, LogTrigger::Start);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let parsed: Config = toml::from_str("[timer]\nwork_interval = 50\n").unwrap();
        assert_eq!(parsed.timer.work_interval, 50);
        assert_eq!(parsed.timer.break_interval, 5);
        assert!(parsed.timer.auto_start_break);
        assert!(parsed.logging.enabled);
    }

    #[test]
    fn get_supports_dot_path_keys() {
        let cfg = Config::default();
        assert_eq!(cfg.get("timer.cyclic_mode").as_deref(), Some("false"));
        assert_eq!(cfg.get("timer.work_interval").as_deref(), Some("25"));
        assert_eq!(cfg.get("logging.log_on").as_deref(), Some("start"));
        assert!(cfg.get("timer.missing_key").is_none());
    }

    #[test]
    fn set_json_value_by_path_updates_nested_bool() {
        let mut json = serde_json::to_value(Config::default()).unwrap();
        Config::set_json_value_by_path(&mut json, "timer.cyclic_mode", "true").unwrap();
        assert_eq!(
            Config::get_json_value_by_path(&json, "timer.cyclic_mode").unwrap(),
            &serde_json::Value::Bool(true)
        );
    }

    #[test]
    fn set_json_value_by_path_updates_nested_number() {
        let mut json = serde_json::to_value(Config::default()).unwrap();
        Config::set_json_value_by_path(&mut json, "timer.break_interval", "10").unwrap();
        assert_eq!(
            Config::get_json_value_by_path(&json, "timer.break_interval").unwrap(),
            &serde_json::Value::Number(10.into())
        );
    }

    #[test]
    fn set_json_value_by_path_rejects_unknown_key() {
        let mut json = serde_json::to_value(Config::default()).unwrap();
        let result = Config::set_json_value_by_path(&mut json, "timer.nonexistent_key", "value");
        assert!(matches!(result, Err(ConfigError::UnknownKey(_))));
    }

    #[test]
    fn apply_switches_log_trigger() {
        let mut cfg = Config::default();
        cfg.apply("logging.log_on", "end").unwrap();
        assert_eq!(cfg.session().log_trigger, LogTrigger::End);
    }

    #[test]
    fn apply_rejects_invalid_values_and_keeps_old_ones() {
        let mut cfg = Config::default();
        assert!(cfg.apply("timer.work_interval", "0").is_err());
        assert!(cfg.apply("timer.work_interval", "-5").is_err());
        assert!(cfg.apply("timer.work_interval", "2.5").is_err());
        assert!(cfg.apply("timer.cyclic_mode", "not_a_bool").is_err());
        assert!(cfg.apply("logging.log_on", "sometimes").is_err());
        assert_eq!(cfg.timer.work_interval, 25);
        assert!(!cfg.timer.cyclic_mode);
    }

    #[test]
    fn apply_sets_optional_vault_dir() {
        let mut cfg = Config::default();
        cfg.apply("vault_dir", "/notes").unwrap();
        assert_eq!(cfg.vault_dir, Some(PathBuf::from("/notes")));
    }

    #[test]
    fn validate_rejects_zero_long_break_count() {
        let mut cfg = Config::default();
        cfg.timer.long_break_interval_count = 0;
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::InvalidValue { key, .. }) if key == "timer.long_break_interval_count"
        ));
    }

    #[test]
    fn session_mirrors_timer_section() {
        let mut cfg = Config::default();
        cfg.timer.cyclic_mode = true;
        cfg.timer.long_break_interval = 30;
        let session = cfg.session();
        assert!(session.cyclic_mode);
        assert_eq!(session.long_break_interval, 30);
        assert_eq!(session.work_interval, 25);
        assert_eq!(session.override_timeout_ms, 2000);
    }

    #[test]
    fn load_from_missing_file_writes_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/config.toml");
        let cfg = Config::load_from(&path).unwrap();
        assert_eq!(cfg.timer.work_interval, 25);
        assert!(path.exists());

        std::fs::write(&path, "[timer]\nbreak_interval = 0\n").unwrap();
        assert!(Config::load_from(&path).is_err());
    }
}
