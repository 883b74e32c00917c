//! Delayed and repeating background tasks with cancellable handles.

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

/// Handle to a scheduled task. Cancelling is idempotent and a no-op once the
/// task has already started running.
#[derive(Debug, Clone)]
pub struct TimerHandle {
    token: CancellationToken,
}

impl TimerHandle {
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

/// Spawns timers on the current tokio runtime.
#[derive(Debug, Clone, Default)]
pub struct Scheduler {
    shutdown: CancellationToken,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `task` once after `delay` unless cancelled first.
    pub fn schedule<F, Fut>(&self, delay: Duration, task: F) -> TimerHandle
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let token = self.shutdown.child_token();
        let cancelled = token.clone();
        tokio::spawn(async move {
            tokio::select! {
                biased;
                _ = cancelled.cancelled() => {}
                _ = tokio::time::sleep(delay) => task().await,
            }
        });
        TimerHandle { token }
    }

    /// Run `task` every `interval` until cancelled. The first run happens one
    /// full interval after scheduling.
    pub fn schedule_repeating<F, Fut>(&self, interval: Duration, mut task: F) -> TimerHandle
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let token = self.shutdown.child_token();
        let cancelled = token.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // The first tick completes immediately.
            ticker.tick().await;
            loop {
                tokio::select! {
                    biased;
                    _ = cancelled.cancelled() => break,
                    _ = ticker.tick() => task().await,
                }
            }
        });
        TimerHandle { token }
    }

    /// Cancel every task this scheduler has spawned.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }
}
