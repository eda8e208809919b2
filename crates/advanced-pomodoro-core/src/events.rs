use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::session::Phase;
use crate::timer::TimerState;

/// Every state change in the system produces an Event.
/// Presentation layers subscribe to them through an [`Observer`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    /// The countdown moved between lifecycle states.
    TimerStateChanged {
        from: TimerState,
        to: TimerState,
        remaining_ms: u64,
        at: DateTime<Utc>,
    },
    /// A tick refreshed the remaining time without a transition.
    TimerTicked {
        remaining_ms: u64,
        at: DateTime<Utc>,
    },
    /// The work/break cycle moved to a new phase.
    PhaseChanged {
        from: Phase,
        to: Phase,
        /// Length of the interval just started; 0 when going idle.
        duration_min: u32,
        long_break: bool,
        completed_work_intervals: u32,
        at: DateTime<Utc>,
    },
    /// Full state, produced on request rather than on change.
    StateSnapshot {
        phase: Phase,
        timer_state: TimerState,
        remaining_ms: u64,
        /// Remaining time as `MM:SS`.
        remaining: String,
        completed_work_intervals: u32,
        /// Whether the next break will be a long one.
        next_break_long: bool,
        context: Option<String>,
        at: DateTime<Utc>,
    },
}

impl Event {
    /// True for the timer transition that drives the completion handler.
    pub fn is_timer_finished(&self) -> bool {
        matches!(
            self,
            Event::TimerStateChanged {
                to: TimerState::Finished,
                ..
            }
        )
    }
}

/// Receives every event the session produces.
///
/// Delivery is synchronous and in transition order. Observers cannot push
/// back on the session.
pub trait Observer: Send {
    fn notify(&mut self, event: &Event);
}

impl<F> Observer for F
where
    F: FnMut(&Event) + Send,
{
    fn notify(&mut self, event: &Event) {
        self(event)
    }
}

impl Observer for tokio::sync::mpsc::UnboundedSender<Event> {
    fn notify(&mut self, event: &Event) {
        // A closed receiver just means nobody is watching any more.
        let _ = self.send(event.clone());
    }
}
