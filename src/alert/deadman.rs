//! Dead-man switch: alerts when file events stop arriving.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::notifier::Alerter;

/// Resets the switch timer from any task.
#[derive(Debug, Clone)]
pub struct DeadManHandle {
    reset: Arc<Notify>,
}

impl DeadManHandle {
    /// Record activity; restarts the silence timer.
    pub fn reset(&self) {
        self.reset.notify_one();
    }
}

/// Timer task that alerts after a period without activity.
///
/// After alerting, the timer re-arms, so a long outage alerts once per
/// silence period.
#[derive(Debug)]
pub struct DeadManSwitch {
    handle: DeadManHandle,
    task: JoinHandle<()>,
}

impl DeadManSwitch {
    /// Start the timer task.
    #[must_use]
    pub fn spawn(
        alerter: Arc<dyn Alerter>,
        silence: Duration,
        cancel: CancellationToken,
    ) -> Self {
        let reset = Arc::new(Notify::new());
        let handle = DeadManHandle {
            reset: reset.clone(),
        };
        let minutes = silence.as_secs() / 60;

        let task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    () = cancel.cancelled() => {
                        tracing::debug!("Dead-man switch stopped");
                        break;
                    }
                    () = reset.notified() => {}
                    () = tokio::time::sleep(silence) => {
                        tracing::warn!(minutes, "No file events within silence period");
                        if let Err(e) = alerter.notify_silence(minutes).await {
                            tracing::error!(error = %e, "Failed to deliver silence alert");
                        }
                    }
                }
            }
        });

        Self { handle, task }
    }

    #[must_use]
    pub fn handle(&self) -> DeadManHandle {
        self.handle.clone()
    }

    /// Wait for the timer task to end after cancellation.
    pub async fn join(self) {
        if let Err(e) = self.task.await {
            tracing::error!(error = %e, "Dead-man switch task failed");
        }
    }
}
