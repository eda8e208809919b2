//! Async driver for a session.
//!
//! Commands and ticks arrive on one channel and are applied one at a time,
//! so a completion cascade can never interleave with a `stop`. The tick
//! registration is a tokio interval task that posts [`Command::Tick`] into
//! the same channel; the countdown arms it on entering `Running` and aborts
//! it on leaving.
//!
//! ```ignore
//! let (runtime, commands) = SessionRuntime::with_interval_ticker(
//!     config.session(), tick_period, overrides, log,
//! );
//! commands.send(Command::Start)?;
//! let controller = runtime.run().await; // until Command::Shutdown
//! ```

use std::time::Duration;

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender, WeakUnboundedSender};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::debug;

use crate::overrides::OverrideSource;
use crate::session::{SessionConfig, SessionController};
use crate::session_log::SessionLog;
use crate::timer::{CountdownTimer, SystemClock, Ticker};

/// Everything the runtime loop reacts to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start,
    TogglePause,
    ForceFinish,
    Stop,
    /// Change the context used at the next phase start.
    SetContext(Option<String>),
    /// Publish a state snapshot to observers.
    Status,
    Tick,
    Shutdown,
}

/// Ticker backed by a tokio interval task.
///
/// The task only holds a weak sender, so it never keeps the command channel
/// open on its own.
#[derive(Debug)]
pub struct IntervalTicker {
    commands: WeakUnboundedSender<Command>,
    period: Duration,
    task: Option<JoinHandle<()>>,
}

impl IntervalTicker {
    pub fn new(commands: &UnboundedSender<Command>, period: Duration) -> Self {
        Self {
            commands: commands.downgrade(),
            period,
            task: None,
        }
    }

    pub fn is_armed(&self) -> bool {
        self.task.is_some()
    }
}

impl Ticker for IntervalTicker {
    fn arm(&mut self) {
        self.disarm();
        let commands = self.commands.clone();
        let period = self.period;
        self.task = Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately.
            interval.tick().await;
            loop {
                interval.tick().await;
                let Some(sender) = commands.upgrade() else {
                    break;
                };
                if sender.send(Command::Tick).is_err() {
                    break;
                }
            }
        }));
    }

    fn disarm(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for IntervalTicker {
    fn drop(&mut self) {
        self.disarm();
    }
}

pub struct SessionRuntime<S, L> {
    controller: SessionController<S, L>,
    commands: UnboundedReceiver<Command>,
}

impl<S: OverrideSource, L: SessionLog> SessionRuntime<S, L> {
    pub fn new(controller: SessionController<S, L>, commands: UnboundedReceiver<Command>) -> Self {
        Self {
            controller,
            commands,
        }
    }

    /// Build a runtime on the system clock with an [`IntervalTicker`].
    pub fn with_interval_ticker(
        config: SessionConfig,
        tick_period: Duration,
        overrides: S,
        log: L,
    ) -> (Self, UnboundedSender<Command>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let ticker = IntervalTicker::new(&tx, tick_period);
        let timer = CountdownTimer::new(SystemClock, ticker);
        let controller = SessionController::new(config, timer, overrides, log);
        (Self::new(controller, rx), tx)
    }

    pub fn controller_mut(&mut self) -> &mut SessionController<S, L> {
        &mut self.controller
    }

    /// Apply commands until `Shutdown` or until every sender is gone, then
    /// tear the session down and hand the controller back.
    pub async fn run(mut self) -> SessionController<S, L> {
        while let Some(command) = self.commands.recv().await {
            if command != Command::Tick {
                debug!(?command, "session command");
            }
            match command {
                Command::Start => self.controller.start().await,
                Command::TogglePause => self.controller.toggle_pause().await,
                Command::ForceFinish => self.controller.force_finish().await,
                Command::Stop => self.controller.stop(),
                Command::SetContext(context) => self.controller.set_active_context(context),
                Command::Status => self.controller.publish_snapshot(),
                Command::Tick => self.controller.tick().await,
                Command::Shutdown => break,
            }
        }
        self.controller.shutdown();
        self.controller
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::Event;
    use crate::overrides::NoOverrides;
    use crate::session::Phase;
    use crate::session_log::NoLog;
    use crate::timer::TimerState;

    fn count_ticks(events: &mut mpsc::UnboundedReceiver<Event>) -> usize {
        let mut ticks = 0;
        while let Ok(event) = events.try_recv() {
            if matches!(event, Event::TimerTicked { .. }) {
                ticks += 1;
            }
        }
        ticks
    }

    #[tokio::test]
    async fn ticks_flow_while_running_and_stop_after_stop() {
        let (mut runtime, commands) = SessionRuntime::with_interval_ticker(
            SessionConfig::default(),
            Duration::from_millis(5),
            NoOverrides,
            NoLog,
        );
        let (event_tx, mut events) = mpsc::unbounded_channel();
        runtime.controller_mut().subscribe(event_tx);

        let driver = async {
            commands.send(Command::Start).unwrap();
            tokio::time::sleep(Duration::from_millis(60)).await;
            let while_running = count_ticks(&mut events);

            commands.send(Command::Stop).unwrap();
            tokio::time::sleep(Duration::from_millis(20)).await;
            count_ticks(&mut events);
            tokio::time::sleep(Duration::from_millis(40)).await;
            let after_stop = count_ticks(&mut events);

            commands.send(Command::Shutdown).unwrap();
            (while_running, after_stop)
        };

        let (controller, (while_running, after_stop)) = tokio::join!(runtime.run(), driver);
        assert!(while_running > 0, "expected ticks while running");
        assert_eq!(after_stop, 0);
        assert_eq!(controller.phase(), Phase::Idle);
        assert_eq!(controller.timer().state(), TimerState::Idle);
        assert!(!controller.timer().is_ticking());
    }

    #[tokio::test]
    async fn interval_ticker_posts_ticks_until_disarmed() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut ticker = IntervalTicker::new(&tx, Duration::from_millis(5));
        assert!(!ticker.is_armed());

        ticker.arm();
        assert!(ticker.is_armed());
        let first = tokio::time::timeout(Duration::from_secs(1), rx.recv()).await;
        assert_eq!(first.unwrap(), Some(Command::Tick));

        ticker.disarm();
        assert!(!ticker.is_armed());
        tokio::time::sleep(Duration::from_millis(20)).await;
        while rx.try_recv().is_ok() {}
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn shutdown_releases_running_timer() {
        let (runtime, commands) = SessionRuntime::with_interval_ticker(
            SessionConfig::default(),
            Duration::from_millis(5),
            NoOverrides,
            NoLog,
        );
        commands.send(Command::SetContext(Some("A.md".into()))).unwrap();
        commands.send(Command::Start).unwrap();
        commands.send(Command::Shutdown).unwrap();

        let controller = runtime.run().await;
        assert_eq!(controller.phase(), Phase::Idle);
        assert_eq!(controller.active_context(), Some("A.md"));
        assert!(!controller.timer().is_ticking());
    }

    #[tokio::test]
    async fn dropping_senders_ends_the_loop() {
        let (runtime, commands) = SessionRuntime::with_interval_ticker(
            SessionConfig::default(),
            Duration::from_millis(5),
            NoOverrides,
            NoLog,
        );
        commands.send(Command::Start).unwrap();
        drop(commands);
        let controller = runtime.run().await;
        assert_eq!(controller.phase(), Phase::Idle);
    }
}
