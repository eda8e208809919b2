//! Per-context interval overrides.
//!
//! A context is an opaque handle chosen by the presentation layer, usually
//! the path of the note being worked on. An [`OverrideSource`] maps it to
//! optional work/break lengths that replace the configured defaults for one
//! phase start. The session controller only sees [`ContextOverride`]; the
//! metadata format stays inside the source.

mod frontmatter;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::OverrideError;

pub use frontmatter::{parse_frontmatter, FrontmatterOverrides};

/// Overrides resolved for one context. Absent fields mean "use the default".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextOverride {
    /// Work interval in minutes.
    pub work_interval: Option<u32>,
    /// Short break interval in minutes. Never applies to long breaks.
    pub break_interval: Option<u32>,
    /// Free text appended to session log lines.
    pub log_notes: Option<String>,
    /// Tags appended to session log lines.
    pub log_tags: Option<String>,
}

impl ContextOverride {
    /// Work minutes, treating zero as absent.
    pub fn work_minutes(&self) -> Option<u32> {
        self.work_interval.filter(|m| *m > 0)
    }

    /// Break minutes, treating zero as absent.
    pub fn break_minutes(&self) -> Option<u32> {
        self.break_interval.filter(|m| *m > 0)
    }
}

/// Looks up overrides for a context.
///
/// Implementations report failures as errors; the controller logs them and
/// falls back to the configured intervals.
#[allow(async_fn_in_trait)]
pub trait OverrideSource {
    async fn resolve(&self, context: &str) -> Result<ContextOverride, OverrideError>;
}

/// Source for sessions without any per-context metadata.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOverrides;

impl OverrideSource for NoOverrides {
    async fn resolve(&self, _context: &str) -> Result<ContextOverride, OverrideError> {
        Ok(ContextOverride::default())
    }
}

/// In-memory overrides keyed by context.
#[derive(Debug, Clone, Default)]
pub struct StaticOverrides {
    entries: HashMap<String, ContextOverride>,
}

impl StaticOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, context: impl Into<String>, value: ContextOverride) -> Self {
        self.entries.insert(context.into(), value);
        self
    }
}

impl OverrideSource for StaticOverrides {
    async fn resolve(&self, context: &str) -> Result<ContextOverride, OverrideError> {
        Ok(self.entries.get(context).cloned().unwrap_or_default())
    }
}
