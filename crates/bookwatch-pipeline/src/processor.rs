//! Sequential message processor.
//!
//! A cooperative, single-flight drain loop: exactly one message is applied
//! to the engine at a time, in arrival order, with control yielded back to
//! the scheduler between messages. A burst of N queued messages takes N
//! scheduling turns, never one blocking loop.

use crate::engine::{ApplyOutcome, SharedEngine};
use crate::publisher::BookPublisher;
use crate::queue::SharedQueue;
use parking_lot::RwLock;
use std::sync::Arc;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Processor drain state. At most one message is in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessorState {
    /// No message in flight.
    Idle,
    /// Exactly one message being applied.
    Processing,
}

/// Drains the session's queue through the engine collaborator.
pub struct MessageProcessor {
    queue: SharedQueue,
    engine: SharedEngine,
    publisher: Arc<BookPublisher>,
    generation: u64,
    depth: usize,
    live: CancellationToken,
    wake: Arc<Notify>,
    state: Arc<RwLock<ProcessorState>>,
}

impl MessageProcessor {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        queue: SharedQueue,
        engine: SharedEngine,
        publisher: Arc<BookPublisher>,
        generation: u64,
        depth: usize,
        live: CancellationToken,
        wake: Arc<Notify>,
    ) -> Self {
        Self {
            queue,
            engine,
            publisher,
            generation,
            depth,
            live,
            wake,
            state: Arc::new(RwLock::new(ProcessorState::Idle)),
        }
    }

    /// Observable drain state, valid for the lifetime of the task.
    pub fn state_handle(&self) -> Arc<RwLock<ProcessorState>> {
        self.state.clone()
    }

    /// Run until the session's liveness token is invalidated.
    pub async fn run(self) {
        loop {
            tokio::select! {
                () = self.live.cancelled() => {
                    debug!("Processor cancelled");
                    return;
                }
                () = self.wake.notified() => {}
            }
            if !self.drain().await {
                return;
            }
        }
    }

    /// Drain pending messages one at a time.
    ///
    /// Returns false once the session is retired: the in-flight result (if
    /// any) has been discarded and no further drain should be attempted.
    async fn drain(&self) -> bool {
        loop {
            if self.live.is_cancelled() {
                return false;
            }
            let Some(raw) = self.queue.lock().pop_front() else {
                return true;
            };

            *self.state.write() = ProcessorState::Processing;
            let outcome = self.engine.lock().apply(&raw, self.depth);
            let still_live = match outcome {
                ApplyOutcome::Applied(update) => {
                    debug!(
                        kind = ?update.kind,
                        bids = update.bids.len(),
                        asks = update.asks.len(),
                        "Book update applied"
                    );
                    // The publisher re-checks liveness atomically with the write.
                    self.publisher.apply_update(self.generation, update, self.depth)
                }
                ApplyOutcome::IntegrityFailure => {
                    warn!("Checksum mismatch reported by engine");
                    self.publisher.mark_integrity_failure(self.generation)
                }
                ApplyOutcome::Ignored => true,
                ApplyOutcome::Failed(reason) => {
                    debug!(%reason, "Message dropped by engine");
                    true
                }
            };
            *self.state.write() = ProcessorState::Idle;

            if !still_live {
                return false;
            }
            tokio::task::yield_now().await;
        }
    }
}
