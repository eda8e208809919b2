use serde::{Deserialize, Serialize};

/// When the session log is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogTrigger {
    /// As a work interval starts, with the duration about to run.
    Start,
    /// As a work interval completes, with the duration that just ran.
    End,
}

/// Interval settings fixed for the lifetime of one controller.
///
/// Durations are whole minutes and are validated as positive by the
/// configuration layer before they get here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    pub work_interval: u32,
    pub break_interval: u32,
    pub long_break_interval: u32,
    /// Every Nth completed work interval is followed by a long break.
    pub long_break_interval_count: u32,
    /// Break completion starts the next work interval.
    pub cyclic_mode: bool,
    /// Outside cyclic mode, work completion starts the break.
    pub auto_start_break: bool,
    pub log_trigger: LogTrigger,
    /// Upper bound on a context override lookup.
    pub override_timeout_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            work_interval: 25,
            break_interval: 5,
            long_break_interval: 15,
            long_break_interval_count: 4,
            cyclic_mode: false,
            auto_start_break: true,
            log_trigger: LogTrigger::Start,
            override_timeout_ms: 2000,
        }
    }
}
