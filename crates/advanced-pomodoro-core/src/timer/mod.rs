mod clock;
mod countdown;
mod ticker;

pub use clock::{Clock, ManualClock, SystemClock};
pub use countdown::{CountdownTimer, TimerState};
pub use ticker::{ManualTicker, Ticker};
