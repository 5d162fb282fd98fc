use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use eventtail_types::EventBatch;

use crate::reader::EventLog;

/// Polls the event log from a cursor and forwards new batches
pub struct EventFollower {
    /// Cancellation token for stopping the poll loop
    cancel: CancellationToken,

    /// Active poll task handle
    task: Option<tokio::task::JoinHandle<()>>,
}

impl EventFollower {
    /// Create a new, idle follower
    pub fn new() -> Self {
        Self {
            cancel: CancellationToken::new(),
            task: None,
        }
    }

    /// Start polling `log` from byte `offset` every `interval`
    ///
    /// Only non-empty batches are sent. Any running poll loop is stopped first.
    pub fn start(
        &mut self,
        log: EventLog,
        offset: u64,
        interval: Duration,
        batch_tx: mpsc::UnboundedSender<EventBatch>,
    ) {
        self.stop();

        let cancel = self.cancel.clone();
        self.task = Some(tokio::spawn(async move {
            let mut cursor = offset;
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,

                    _ = ticker.tick() => {
                        match log.read_since(cursor).await {
                            Ok(batch) => {
                                if batch.offset < cursor {
                                    tracing::info!(cursor, size = batch.offset, "event log shrank, resetting cursor");
                                }
                                cursor = batch.offset;

                                if batch.is_empty() {
                                    continue;
                                }
                                if batch_tx.send(batch).is_err() {
                                    // Receiver gone, stop polling
                                    break;
                                }
                            }
                            Err(err) => {
                                // Transient; the next tick retries from the same cursor
                                tracing::warn!(error = %err, cursor, "event log read failed");
                            }
                        }
                    }
                }
            }
        }));
    }

    /// Stop the poll loop
    pub fn stop(&mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            task.abort();
        }
        // Create a fresh cancellation token for future runs
        self.cancel = CancellationToken::new();
    }

    /// Check if the poll loop is still running
    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }
}

impl Default for EventFollower {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for EventFollower {
    fn drop(&mut self) {
        self.stop();
    }
}
