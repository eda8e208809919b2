//! # Advanced Pomodoro Core Library
//!
//! This library provides the core logic for a work/break interval timer
//! that follows the note being worked on. The CLI binary is a thin layer
//! over the same library.
//!
//! ## Architecture
//!
//! - **Countdown Timer**: A deadline-based state machine that requires the
//!   caller (or an armed ticker) to periodically invoke `tick()`
//! - **Session Controller**: The work/break cycle, long-break cadence,
//!   per-note overrides and the session log trigger
//! - **Runtime**: A single command loop with a tokio tick registration
//! - **Storage**: TOML-based configuration
//!
//! ## Key Components
//!
//! - [`CountdownTimer`]: Core timer state machine
//! - [`SessionController`]: Work/break cycle on top of the timer
//! - [`Config`]: Application configuration management
//! - [`OverrideSource`]: Trait for per-context interval overrides
//! - [`SessionLog`]: Trait for the session log sink

pub mod error;
pub mod events;
pub mod overrides;
pub mod runtime;
pub mod session;
pub mod session_log;
pub mod storage;
pub mod timer;

pub use error::{ConfigError, CoreError, LogError, OverrideError};
pub use events::{Event, Observer};
pub use overrides::{ContextOverride, FrontmatterOverrides, NoOverrides, OverrideSource, StaticOverrides};
pub use runtime::{Command, IntervalTicker, SessionRuntime};
pub use session::{LogTrigger, Phase, SessionConfig, SessionController};
pub use session_log::{LogEntry, LogSettings, LogTarget, MarkdownLog, NoLog, SessionLog};
pub use storage::Config;
pub use timer::{Clock, CountdownTimer, ManualClock, ManualTicker, SystemClock, Ticker, TimerState};
