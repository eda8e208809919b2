//! Session log sink.
//!
//! Appends one line per pomodoro to a Markdown file:
//!
//! ```text
//! 🍅 [[2025-03-14]] 09:30 25m [[Projects/Thesis.md]] drafting #writing
//! ```
//!
//! Whether a line is written at the start or the end of a work interval is
//! decided by the session controller, not here.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;

use crate::error::LogError;
use crate::session::LogTrigger;

/// One work interval to record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub duration_min: u32,
    /// The context (note path) active when the interval started.
    pub context: Option<String>,
    pub notes: Option<String>,
    pub tags: Option<String>,
    pub at: DateTime<Utc>,
}

/// Where log lines go.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogTarget {
    /// The daily note for the day of the entry.
    Daily,
    /// The note the interval was worked on; falls back to the custom file.
    Current,
    /// A fixed file.
    Custom,
}

/// `[logging]` section of the configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_log_on")]
    pub log_on: LogTrigger,
    #[serde(default = "default_log_to")]
    pub log_to: LogTarget,
    #[serde(default = "default_log_file")]
    pub log_file: String,
    #[serde(default = "default_daily_note_format")]
    pub daily_note_format: String,
    /// chrono strftime format, rendered in local time.
    #[serde(default = "default_timestamp_format")]
    pub timestamp_format: String,
    #[serde(default = "default_true")]
    pub append_duration: bool,
    #[serde(default = "default_true")]
    pub append_context: bool,
}

fn default_true() -> bool {
    true
}
fn default_log_on() -> LogTrigger {
    LogTrigger::Start
}
fn default_log_to() -> LogTarget {
    LogTarget::Custom
}
fn default_log_file() -> String {
    "Pomodoro Log.md".into()
}
fn default_daily_note_format() -> String {
    "%Y-%m-%d.md".into()
}
fn default_timestamp_format() -> String {
    "🍅 [[%Y-%m-%d]] %H:%M".into()
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            log_on: default_log_on(),
            log_to: default_log_to(),
            log_file: default_log_file(),
            daily_note_format: default_daily_note_format(),
            timestamp_format: default_timestamp_format(),
            append_duration: true,
            append_context: true,
        }
    }
}

/// Records finished or started work intervals.
///
/// The controller logs and swallows any error returned here.
#[allow(async_fn_in_trait)]
pub trait SessionLog {
    async fn record(&self, entry: &LogEntry) -> Result<(), LogError>;
}

/// Sink that discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoLog;

impl SessionLog for NoLog {
    async fn record(&self, _entry: &LogEntry) -> Result<(), LogError> {
        Ok(())
    }
}

/// Appends formatted lines to Markdown files under `root`.
#[derive(Debug, Clone)]
pub struct MarkdownLog {
    root: PathBuf,
    settings: LogSettings,
}

impl MarkdownLog {
    pub fn new(root: impl Into<PathBuf>, settings: LogSettings) -> Self {
        Self {
            root: root.into(),
            settings,
        }
    }

    /// File the entry would be appended to.
    pub fn target_path(&self, entry: &LogEntry) -> Result<PathBuf, LogError> {
        let relative = match (self.settings.log_to, entry.context.as_deref()) {
            (LogTarget::Current, Some(context)) => context.to_string(),
            (LogTarget::Daily, _) => {
                render_time(entry.at, &self.settings.daily_note_format)?
            }
            _ => self.settings.log_file.clone(),
        };
        Ok(self.root.join(relative))
    }

    /// The line for `entry`, without the leading newline.
    pub fn format_line(&self, entry: &LogEntry) -> Result<String, LogError> {
        let mut line = render_time(entry.at, &self.settings.timestamp_format)?;
        if self.settings.append_duration {
            line.push_str(&format!(" {}m", entry.duration_min));
        }
        if self.settings.append_context {
            if let Some(context) = &entry.context {
                line.push_str(&format!(" [[{context}]]"));
            }
        }
        for extra in [&entry.notes, &entry.tags].into_iter().flatten() {
            line.push(' ');
            line.push_str(extra);
        }
        Ok(line)
    }
}

impl SessionLog for MarkdownLog {
    async fn record(&self, entry: &LogEntry) -> Result<(), LogError> {
        if !self.settings.enabled {
            return Ok(());
        }
        let line = self.format_line(entry)?;
        let path = self.target_path(entry)?;
        append_line(&path, &line)
            .await
            .map_err(|source| LogError::WriteFailed { path, source })
    }
}

async fn append_line(path: &Path, line: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let mut file = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await?;
    file.write_all(format!("\n{line}").as_bytes()).await?;
    file.flush().await
}

fn render_time(at: DateTime<Utc>, format: &str) -> Result<String, LogError> {
    let mut out = String::new();
    write!(out, "{}", at.with_timezone(&Local).format(format))
        .map_err(|_| LogError::InvalidFormat(format.to_string()))?;
    Ok(out)
}
