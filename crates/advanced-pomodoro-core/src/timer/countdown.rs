//! Countdown timer implementation.
//!
//! The countdown is a deadline-based state machine. It does not use internal
//! threads - the caller (or an armed [`Ticker`]) is responsible for calling
//! `tick()` periodically. Remaining time is always recomputed from the
//! absolute deadline, so late or irregular ticks never accumulate drift.
//!
//! ## State Transitions
//!
//! ```text
//! Idle -> Running -> Paused -> Running
//!            |
//!            +-> Finished (elapsed or forced) -> Running (start)
//! any non-Idle -> Idle (stop)
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! let mut timer = CountdownTimer::default();
//! timer.start(25 * 60 * 1000);
//! // In a loop:
//! timer.tick(); // Returns Some(Event) with the new remaining time or the finish
//! ```

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::clock::{Clock, SystemClock};
use super::ticker::{ManualTicker, Ticker};
use crate::events::Event;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerState {
    Idle,
    Running,
    Paused,
    /// Reached zero, either by elapsing or by a forced finish.
    Finished,
}

impl TimerState {
    /// Idle and Finished are both resting states.
    pub fn is_stopped(self) -> bool {
        matches!(self, TimerState::Idle | TimerState::Finished)
    }
}

/// Countdown timer.
///
/// Invariant: `deadline` is `Some` exactly when the state is `Running`, and
/// the ticker is armed exactly when the state is `Running`.
pub struct CountdownTimer {
    state: TimerState,
    /// Remaining time in milliseconds. Authoritative unless running.
    remaining_ms: u64,
    deadline: Option<DateTime<Utc>>,
    clock: Box<dyn Clock>,
    ticker: Box<dyn Ticker>,
    ticking: bool,
}

impl CountdownTimer {
    pub fn new(clock: impl Clock + 'static, ticker: impl Ticker + 'static) -> Self {
        Self {
            state: TimerState::Idle,
            remaining_ms: 0,
            deadline: None,
            clock: Box::new(clock),
            ticker: Box::new(ticker),
            ticking: false,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> TimerState {
        self.state
    }

    pub fn remaining_ms(&self) -> u64 {
        self.remaining_ms
    }

    pub fn deadline(&self) -> Option<DateTime<Utc>> {
        self.deadline
    }

    /// Whether a tick registration is currently live.
    pub fn is_ticking(&self) -> bool {
        self.ticking
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Remaining time as `MM:SS`, rounded down to the second.
    pub fn formatted_remaining(&self) -> String {
        let secs = self.remaining_ms / 1000;
        format!("{:02}:{:02}", secs / 60, secs % 60)
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Start counting down `duration_ms`. No-op while already running.
    pub fn start(&mut self, duration_ms: u64) -> Option<Event> {
        if self.state == TimerState::Running {
            return None;
        }
        self.remaining_ms = duration_ms;
        Some(self.run())
    }

    /// Freeze the countdown. A deadline that has already passed finishes the
    /// timer instead.
    pub fn pause(&mut self) -> Option<Event> {
        if self.state != TimerState::Running {
            return None;
        }
        if self.deadline.is_some_and(|deadline| deadline <= self.clock.now()) {
            return self.finish();
        }
        self.flush_remaining();
        self.deadline = None;
        Some(self.transition(TimerState::Paused))
    }

    pub fn resume(&mut self) -> Option<Event> {
        if self.state != TimerState::Paused {
            return None;
        }
        Some(self.run())
    }

    /// Forced early completion. No-op when Idle or already Finished.
    pub fn finish(&mut self) -> Option<Event> {
        if self.state.is_stopped() {
            return None;
        }
        self.deadline = None;
        self.remaining_ms = 0;
        Some(self.transition(TimerState::Finished))
    }

    /// Full reset to Idle. Returns `None` when the timer was already Idle.
    pub fn stop(&mut self) -> Option<Event> {
        self.deadline = None;
        self.remaining_ms = 0;
        if self.state == TimerState::Idle {
            self.release_ticker();
            return None;
        }
        Some(self.transition(TimerState::Idle))
    }

    /// Call periodically while running.
    ///
    /// Returns `TimerTicked` with the refreshed remaining time, or the
    /// `Running -> Finished` transition once the deadline has passed.
    pub fn tick(&mut self) -> Option<Event> {
        if self.state != TimerState::Running {
            return None;
        }
        let deadline = self.deadline?;
        let left = deadline - self.clock.now();
        if left <= Duration::zero() {
            return self.finish();
        }
        self.remaining_ms = self.remaining_ms.min(millis(left));
        Some(Event::TimerTicked {
            remaining_ms: self.remaining_ms,
            at: self.clock.now(),
        })
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn run(&mut self) -> Event {
        let now = self.clock.now();
        let span = Duration::milliseconds(i64::try_from(self.remaining_ms).unwrap_or(i64::MAX));
        self.deadline = Some(now.checked_add_signed(span).unwrap_or(DateTime::<Utc>::MAX_UTC));
        self.transition(TimerState::Running)
    }

    /// Refresh `remaining_ms` from the deadline without changing state.
    fn flush_remaining(&mut self) {
        if let Some(deadline) = self.deadline {
            let left = deadline - self.clock.now();
            self.remaining_ms = self.remaining_ms.min(millis(left));
        }
    }

    fn transition(&mut self, to: TimerState) -> Event {
        let from = self.state;
        if to != TimerState::Running {
            self.release_ticker();
        }
        self.state = to;
        if to == TimerState::Running && !self.ticking {
            self.ticker.arm();
            self.ticking = true;
        }
        debug!(?from, ?to, remaining_ms = self.remaining_ms, "timer transition");
        Event::TimerStateChanged {
            from,
            to,
            remaining_ms: self.remaining_ms,
            at: self.clock.now(),
        }
    }

    fn release_ticker(&mut self) {
        if self.ticking {
            self.ticker.disarm();
            self.ticking = false;
        }
    }
}

impl Default for CountdownTimer {
    fn default() -> Self {
        Self::new(SystemClock, ManualTicker::new())
    }
}

impl Drop for CountdownTimer {
    fn drop(&mut self) {
        self.release_ticker();
    }
}

impl fmt::Debug for CountdownTimer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CountdownTimer")
            .field("state", &self.state)
            .field("remaining_ms", &self.remaining_ms)
            .field("deadline", &self.deadline)
            .field("ticking", &self.ticking)
            .finish()
    }
}

fn millis(span: Duration) -> u64 {
    u64::try_from(span.num_milliseconds()).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timer::ManualClock;
    use proptest::prelude::*;

    const MIN: u64 = 60 * 1000;

    fn timer() -> (CountdownTimer, ManualClock, ManualTicker) {
        let clock = ManualClock::default();
        let ticker = ManualTicker::new();
        let timer = CountdownTimer::new(clock.clone(), ticker.clone());
        (timer, clock, ticker)
    }

    #[test]
    fn start_pause_resume() {
        let (mut timer, _, _) = timer();
        assert_eq!(timer.state(), TimerState::Idle);

        assert!(timer.start(25 * MIN).is_some());
        assert_eq!(timer.state(), TimerState::Running);

        assert!(timer.pause().is_some());
        assert_eq!(timer.state(), TimerState::Paused);

        assert!(timer.resume().is_some());
        assert_eq!(timer.state(), TimerState::Running);
    }

    #[test]
    fn start_while_running_is_ignored() {
        let (mut timer, clock, _) = timer();
        timer.start(25 * MIN);
        clock.advance_ms(1000);
        assert!(timer.start(5 * MIN).is_none());
        timer.tick();
        assert_eq!(timer.remaining_ms(), 25 * MIN - 1000);
    }

    #[test]
    fn tick_recomputes_from_deadline() {
        let (mut timer, clock, _) = timer();
        timer.start(10 * MIN);
        clock.advance(Duration::minutes(3));
        match timer.tick() {
            Some(Event::TimerTicked { remaining_ms, .. }) => assert_eq!(remaining_ms, 7 * MIN),
            other => panic!("Expected TimerTicked, got {other:?}"),
        }
        // One late tick catches up without drift.
        clock.advance(Duration::minutes(6) + Duration::seconds(30));
        timer.tick();
        assert_eq!(timer.remaining_ms(), 30 * 1000);
    }

    #[test]
    fn tick_past_deadline_finishes() {
        let (mut timer, clock, ticker) = timer();
        timer.start(MIN);
        clock.advance(Duration::seconds(61));
        let event = timer.tick().unwrap();
        assert!(event.is_timer_finished());
        assert_eq!(timer.state(), TimerState::Finished);
        assert_eq!(timer.remaining_ms(), 0);
        assert!(timer.deadline().is_none());
        assert_eq!(ticker.live(), 0);
    }

    #[test]
    fn zero_duration_finishes_on_next_tick() {
        let (mut timer, _, _) = timer();
        timer.start(0);
        assert_eq!(timer.state(), TimerState::Running);
        assert!(timer.tick().unwrap().is_timer_finished());
    }

    #[test]
    fn pause_freezes_remaining_and_clears_deadline() {
        let (mut timer, clock, ticker) = timer();
        timer.start(10 * MIN);
        clock.advance(Duration::minutes(4));
        timer.pause();
        assert!(timer.deadline().is_none());
        assert_eq!(timer.remaining_ms(), 6 * MIN);
        assert_eq!(ticker.live(), 0);

        clock.advance(Duration::hours(2));
        assert!(timer.tick().is_none());
        assert_eq!(timer.remaining_ms(), 6 * MIN);

        timer.resume();
        let deadline = timer.deadline().unwrap();
        assert_eq!(deadline - clock.now(), Duration::minutes(6));
        assert_eq!(ticker.live(), 1);
    }

    #[test]
    fn pause_past_deadline_finishes() {
        let (mut timer, clock, ticker) = timer();
        timer.start(MIN);
        clock.advance(Duration::seconds(90));
        let event = timer.pause().unwrap();
        assert!(event.is_timer_finished());
        assert_eq!(timer.state(), TimerState::Finished);
        assert_eq!(timer.remaining_ms(), 0);
        assert_eq!(ticker.live(), 0);
    }

    #[test]
    fn finish_is_noop_when_stopped() {
        let (mut timer, _, _) = timer();
        assert!(timer.finish().is_none());
        timer.start(MIN);
        assert!(timer.finish().is_some());
        assert!(timer.finish().is_none());
    }

    #[test]
    fn finish_from_paused() {
        let (mut timer, _, _) = timer();
        timer.start(MIN);
        timer.pause();
        match timer.finish() {
            Some(Event::TimerStateChanged { from, to, .. }) => {
                assert_eq!(from, TimerState::Paused);
                assert_eq!(to, TimerState::Finished);
            }
            other => panic!("Expected TimerStateChanged, got {other:?}"),
        }
    }

    #[test]
    fn stop_while_running_releases_tick() {
        let (mut timer, clock, ticker) = timer();
        timer.start(25 * MIN);
        assert_eq!(ticker.live(), 1);
        timer.stop();
        assert_eq!(timer.state(), TimerState::Idle);
        assert_eq!(timer.remaining_ms(), 0);
        assert_eq!(ticker.live(), 0);
        clock.advance(Duration::minutes(30));
        assert!(timer.tick().is_none());
        assert!(timer.stop().is_none());
    }

    #[test]
    fn restart_after_finish_rearms_once() {
        let (mut timer, _, ticker) = timer();
        timer.start(MIN);
        timer.finish();
        timer.start(MIN);
        assert_eq!(ticker.live(), 1);
        assert_eq!(ticker.armed_total(), 2);
    }

    #[test]
    fn drop_releases_tick() {
        let ticker = ManualTicker::new();
        {
            let mut timer = CountdownTimer::new(ManualClock::default(), ticker.clone());
            timer.start(MIN);
            assert_eq!(ticker.live(), 1);
        }
        assert_eq!(ticker.live(), 0);
    }

    #[test]
    fn formatted_remaining_rounds_down() {
        let (mut timer, clock, _) = timer();
        timer.start(25 * MIN);
        assert_eq!(timer.formatted_remaining(), "25:00");
        clock.advance_ms(1500);
        timer.tick();
        assert_eq!(timer.formatted_remaining(), "24:58");
    }

    proptest! {
        #[test]
        fn start_then_tick_reports_full_duration(duration in 1u64..(24 * 60 * MIN)) {
            let (mut timer, _, _) = timer();
            timer.start(duration);
            timer.tick();
            prop_assert_eq!(timer.state(), TimerState::Running);
            prop_assert_eq!(timer.remaining_ms(), duration);
        }

        #[test]
        fn pause_resume_cycles_preserve_remaining(
            duration in 1u64..(3 * 60 * MIN),
            elapsed in 0u64..MIN,
            cycles in 1usize..50,
        ) {
            let (mut timer, clock, ticker) = timer();
            let duration = duration + MIN;
            timer.start(duration);
            clock.advance_ms(elapsed as i64);
            timer.tick();
            let before = timer.remaining_ms();
            for _ in 0..cycles {
                timer.pause();
                timer.resume();
            }
            timer.tick();
            prop_assert_eq!(timer.remaining_ms(), before);
            prop_assert_eq!(ticker.live(), 1);
        }
    }
}
