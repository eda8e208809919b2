//! Overrides read from a note's YAML frontmatter.
//!
//! Recognised keys:
//!
//! ```yaml
//! ---
//! pomodoroWorkInterval: 50
//! pomodoroBreakInterval: 10
//! pomodoroLogNotes: [drafting, outline]
//! pomodoroLogTags: "#writing"
//! ---
//! ```
//!
//! Interval values must be positive whole numbers (numeric strings are
//! accepted). Anything else is ignored, never reported as an error.

use std::io::ErrorKind;
use std::path::PathBuf;

use serde_yaml::Value;

use super::{ContextOverride, OverrideSource};
use crate::error::OverrideError;

const WORK_KEY: &str = "pomodoroWorkInterval";
const BREAK_KEY: &str = "pomodoroBreakInterval";
const NOTES_KEY: &str = "pomodoroLogNotes";
const TAGS_KEY: &str = "pomodoroLogTags";

/// Resolves contexts as note paths relative to `root`.
#[derive(Debug, Clone)]
pub struct FrontmatterOverrides {
    root: PathBuf,
}

impl FrontmatterOverrides {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl OverrideSource for FrontmatterOverrides {
    async fn resolve(&self, context: &str) -> Result<ContextOverride, OverrideError> {
        let path = self.root.join(context);
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(ContextOverride::default()),
            Err(source) => return Err(OverrideError::ReadFailed { path, source }),
        };
        parse_frontmatter(&content).map_err(|message| OverrideError::Malformed { path, message })
    }
}

/// Parse the overrides out of a note's text.
///
/// A note without a frontmatter block yields an empty override; only YAML
/// that fails to parse is an error.
pub fn parse_frontmatter(content: &str) -> Result<ContextOverride, String> {
    let Some(block) = frontmatter_block(content) else {
        return Ok(ContextOverride::default());
    };
    let value: Value = serde_yaml::from_str(block).map_err(|e| e.to_string())?;
    let Value::Mapping(map) = value else {
        return Ok(ContextOverride::default());
    };

    Ok(ContextOverride {
        work_interval: map.get(WORK_KEY).and_then(positive_minutes),
        break_interval: map.get(BREAK_KEY).and_then(positive_minutes),
        log_notes: map.get(NOTES_KEY).and_then(|v| joined_text(v, ", ")),
        log_tags: map.get(TAGS_KEY).and_then(|v| joined_text(v, " ")),
    })
}

/// The text between the opening `---` line and the closing `---`/`...`.
fn frontmatter_block(content: &str) -> Option<&str> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);
    let mut lines = content.split_inclusive('\n');
    let first = lines.next()?;
    if first.trim_end() != "---" {
        return None;
    }
    let start = first.len();
    let mut end = start;
    for line in lines {
        let trimmed = line.trim_end();
        if trimmed == "---" || trimmed == "..." {
            return Some(&content[start..end]);
        }
        end += line.len();
    }
    None
}

fn positive_minutes(value: &Value) -> Option<u32> {
    let number = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    if number.fract() != 0.0 || number < 1.0 || number > f64::from(u32::MAX) {
        return None;
    }
    Some(number as u32)
}

fn joined_text(value: &Value, separator: &str) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim()).filter(|s| !s.is_empty()).map(str::to_string),
        Value::Sequence(items) => {
            let parts: Vec<&str> = items
                .iter()
                .filter_map(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .collect();
            (!parts.is_empty()).then(|| parts.join(separator))
        }
        _ => None,
    }
}
