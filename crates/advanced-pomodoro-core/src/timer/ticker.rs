//! Periodic tick registrations.
//!
//! The countdown arms its ticker when it enters `Running` and disarms it
//! before leaving `Running` or being dropped. It never arms twice without a
//! disarm in between, so a ticker holds at most one live registration.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

pub trait Ticker: Send {
    /// Start delivering ticks.
    fn arm(&mut self);

    /// Stop delivering ticks. Must be idempotent.
    fn disarm(&mut self);
}

/// A ticker for callers that poll `tick()` themselves.
///
/// It delivers nothing, but counts registrations so a caller can check that
/// none is left behind. Clones share the counters.
#[derive(Debug, Clone, Default)]
pub struct ManualTicker {
    live: Arc<AtomicUsize>,
    armed_total: Arc<AtomicUsize>,
}

impl ManualTicker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registrations currently live (0 or 1).
    pub fn live(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    /// How many times the ticker has been armed.
    pub fn armed_total(&self) -> usize {
        self.armed_total.load(Ordering::SeqCst)
    }
}

impl Ticker for ManualTicker {
    fn arm(&mut self) {
        self.live.fetch_add(1, Ordering::SeqCst);
        self.armed_total.fetch_add(1, Ordering::SeqCst);
    }

    fn disarm(&mut self) {
        let _ = self
            .live
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
    }
}
