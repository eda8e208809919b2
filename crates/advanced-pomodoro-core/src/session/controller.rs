//! Session controller.
//!
//! Owns the countdown and decides what follows each completion:
//!
//! | phase | cyclic | auto-start break | next        |
//! |-------|--------|------------------|-------------|
//! | Work  | yes    | -                | start break |
//! | Work  | no     | yes              | start break |
//! | Work  | no     | no               | idle        |
//! | Break | yes    | -                | start work  |
//! | Break | no     | -                | idle        |
//!
//! All operations take `&mut self`, so a completion cascade always runs to
//! the end before the next command or tick is looked at.

use std::mem;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::settings::{LogTrigger, SessionConfig};
use crate::error::OverrideError;
use crate::events::{Event, Observer};
use crate::overrides::{ContextOverride, NoOverrides, OverrideSource};
use crate::session_log::{LogEntry, NoLog, SessionLog};
use crate::timer::{CountdownTimer, TimerState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Idle,
    Work,
    Break,
}

/// What the controller does after the countdown finishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextStep {
    StartBreak,
    StartWork,
    GoIdle,
}

/// The completion decision table.
pub fn next_step(phase: Phase, config: &SessionConfig) -> NextStep {
    match phase {
        Phase::Work if config.cyclic_mode || config.auto_start_break => NextStep::StartBreak,
        Phase::Break if config.cyclic_mode => NextStep::StartWork,
        _ => NextStep::GoIdle,
    }
}

pub struct SessionController<S = NoOverrides, L = NoLog> {
    config: SessionConfig,
    timer: CountdownTimer,
    phase: Phase,
    completed_work_intervals: u32,
    active_context: Option<String>,
    /// The work interval in progress, kept for end-of-interval logging.
    current_work: Option<LogEntry>,
    overrides: S,
    log: L,
    observers: Vec<Box<dyn Observer>>,
}

impl<S: OverrideSource, L: SessionLog> SessionController<S, L> {
    pub fn new(config: SessionConfig, timer: CountdownTimer, overrides: S, log: L) -> Self {
        Self {
            config,
            timer,
            phase: Phase::Idle,
            completed_work_intervals: 0,
            active_context: None,
            current_work: None,
            overrides,
            log,
            observers: Vec::new(),
        }
    }

    pub fn subscribe(&mut self, observer: impl Observer + 'static) {
        self.observers.push(Box::new(observer));
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn completed_work_intervals(&self) -> u32 {
        self.completed_work_intervals
    }

    pub fn timer(&self) -> &CountdownTimer {
        &self.timer
    }

    pub fn active_context(&self) -> Option<&str> {
        self.active_context.as_deref()
    }

    /// Whether the next break will be a long one.
    pub fn next_break_is_long(&self) -> bool {
        is_long_break(self.completed_work_intervals + 1, &self.config)
    }

    pub fn snapshot(&self) -> Event {
        Event::StateSnapshot {
            phase: self.phase,
            timer_state: self.timer.state(),
            remaining_ms: self.timer.remaining_ms(),
            remaining: self.timer.formatted_remaining(),
            completed_work_intervals: self.completed_work_intervals,
            next_break_long: self.next_break_is_long(),
            context: self.active_context.clone(),
            at: self.timer.now(),
        }
    }

    /// Send a snapshot to every observer.
    pub fn publish_snapshot(&mut self) {
        let event = self.snapshot();
        self.emit(Some(event));
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Set the context used for overrides and logging at the next phase start.
    pub fn set_active_context(&mut self, context: Option<String>) {
        self.active_context = context;
    }

    /// Begin a work interval. Ignored unless idle.
    pub async fn start(&mut self) {
        if self.phase == Phase::Idle {
            self.start_work().await;
        }
    }

    pub async fn toggle_pause(&mut self) {
        let event = match self.timer.state() {
            TimerState::Running => self.timer.pause(),
            TimerState::Paused => self.timer.resume(),
            TimerState::Idle | TimerState::Finished => None,
        };
        self.dispatch(event).await;
    }

    /// End the current interval now, as if it had elapsed.
    pub async fn force_finish(&mut self) {
        let event = self.timer.finish();
        self.dispatch(event).await;
    }

    pub fn stop(&mut self) {
        self.go_idle();
    }

    /// Refresh the countdown; runs the completion cascade once it elapses.
    pub async fn tick(&mut self) {
        let event = self.timer.tick();
        self.dispatch(event).await;
    }

    /// Teardown: leave the cycle and release the tick registration.
    pub fn shutdown(&mut self) {
        self.go_idle();
    }

    pub fn go_idle(&mut self) {
        self.completed_work_intervals = 0;
        self.current_work = None;
        let from = mem::replace(&mut self.phase, Phase::Idle);
        if from != Phase::Idle {
            self.emit_phase(from, 0, false);
        }
        let event = self.timer.stop();
        self.emit(event);
    }

    pub async fn start_work(&mut self) {
        let from = mem::replace(&mut self.phase, Phase::Work);
        let context = self.active_context.clone();
        let found = self.lookup(context.as_deref()).await;
        let minutes = found.work_minutes().unwrap_or(self.config.work_interval);

        self.emit_phase(from, minutes, false);
        let event = self.timer.start(minutes_to_ms(minutes));
        self.emit(event);

        let entry = LogEntry {
            duration_min: minutes,
            context,
            notes: found.log_notes,
            tags: found.log_tags,
            at: self.timer.now(),
        };
        if self.config.log_trigger == LogTrigger::Start {
            self.record(&entry).await;
        }
        self.current_work = Some(entry);
    }

    pub async fn start_break(&mut self) {
        self.completed_work_intervals += 1;
        let from = mem::replace(&mut self.phase, Phase::Break);
        let long = is_long_break(self.completed_work_intervals, &self.config);
        let minutes = if long {
            self.config.long_break_interval
        } else {
            let context = self.active_context.clone();
            self.lookup(context.as_deref())
                .await
                .break_minutes()
                .unwrap_or(self.config.break_interval)
        };

        self.emit_phase(from, minutes, long);
        let event = self.timer.start(minutes_to_ms(minutes));
        self.emit(event);
    }

    // ── Internal ─────────────────────────────────────────────────────

    async fn dispatch(&mut self, event: Option<Event>) {
        let Some(event) = event else { return };
        let finished = event.is_timer_finished();
        self.emit(Some(event));
        if finished {
            self.on_finished().await;
        }
    }

    async fn on_finished(&mut self) {
        if self.phase == Phase::Work {
            if let Some(mut entry) = self.current_work.take() {
                if self.config.log_trigger == LogTrigger::End {
                    entry.at = self.timer.now();
                    self.record(&entry).await;
                }
            }
        }

        let step = next_step(self.phase, &self.config);
        debug!(phase = ?self.phase, ?step, "interval finished");
        match step {
            NextStep::StartBreak => self.start_break().await,
            NextStep::StartWork => self.start_work().await,
            NextStep::GoIdle => self.go_idle(),
        }
    }

    /// Best-effort override lookup. Every failure means "no override".
    async fn lookup(&self, context: Option<&str>) -> ContextOverride {
        let Some(context) = context else {
            return ContextOverride::default();
        };
        let limit = Duration::from_millis(self.config.override_timeout_ms);
        match tokio::time::timeout(limit, self.overrides.resolve(context)).await {
            Ok(Ok(found)) => found,
            Ok(Err(e)) => {
                debug!(error = %e, context, "override lookup failed, using defaults");
                ContextOverride::default()
            }
            Err(_) => {
                let e = OverrideError::TimedOut {
                    timeout_ms: self.config.override_timeout_ms,
                };
                warn!(error = %e, context, "override lookup abandoned, using defaults");
                ContextOverride::default()
            }
        }
    }

    async fn record(&self, entry: &LogEntry) {
        if let Err(e) = self.log.record(entry).await {
            warn!(error = %e, "failed to write session log");
        }
    }

    fn emit_phase(&mut self, from: Phase, duration_min: u32, long_break: bool) {
        info!(
            ?from,
            to = ?self.phase,
            duration_min,
            long_break,
            completed = self.completed_work_intervals,
            "phase changed"
        );
        let event = Event::PhaseChanged {
            from,
            to: self.phase,
            duration_min,
            long_break,
            completed_work_intervals: self.completed_work_intervals,
            at: self.timer.now(),
        };
        self.emit(Some(event));
    }

    fn emit(&mut self, event: Option<Event>) {
        if let Some(event) = event {
            for observer in &mut self.observers {
                observer.notify(&event);
            }
        }
    }
}

fn is_long_break(completed: u32, config: &SessionConfig) -> bool {
    completed.is_multiple_of(config.long_break_interval_count)
}

fn minutes_to_ms(minutes: u32) -> u64 {
    u64::from(minutes).saturating_mul(60).saturating_mul(1000)
}
