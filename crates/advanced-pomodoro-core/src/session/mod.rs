//! Work/break cycle on top of the countdown timer.

mod controller;
mod settings;

pub use controller::{next_step, NextStep, Phase, SessionController};
pub use settings::{LogTrigger, SessionConfig};
