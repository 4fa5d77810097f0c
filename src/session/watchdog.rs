//! Periodic watchdog task
//!
//! A cancelable task that invokes a tick closure once per period. The first
//! tick fires one full period after spawning. Dropping or cancelling the
//! watchdog aborts the task.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

/// Handle to a running watchdog task
#[derive(Debug)]
pub struct Watchdog {
    handle: JoinHandle<()>,
    period: Duration,
}

impl Watchdog {
    /// Spawn a watchdog calling `tick` every `period`
    ///
    /// The task ends when `tick` returns false. Must be called from within a
    /// tokio runtime.
    pub fn spawn<F>(period: Duration, mut tick: F) -> Self
    where
        F: FnMut() -> bool + Send + 'static,
    {
        let handle = tokio::spawn(async move {
            let mut ticker = time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if !tick() {
                    break;
                }
            }
        });

        Self { handle, period }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    #[cfg(test)]
    fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Stop the task; no tick runs after this returns
    pub fn cancel(self) {
        drop(self);
    }
}

impl Drop for Watchdog {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
