//! Bounded message queue with a lossy overflow policy.
//!
//! Holds raw feed payloads pending processing. When an append exceeds
//! capacity, only the most recent entries survive; the engine's checksum
//! verification catches any book divergence the gap may cause.

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

/// Maximum number of pending messages.
pub const CAPACITY: usize = 100;

/// Entries retained (most recent first-in order) after an overflow.
pub const RETAIN_ON_OVERFLOW: usize = 50;

/// FIFO of raw feed payloads pending processing. One queue exists per
/// session and is owned exclusively by it.
#[derive(Debug, Default)]
pub struct MessageQueue {
    items: VecDeque<String>,
}

impl MessageQueue {
    pub fn new() -> Self {
        Self {
            items: VecDeque::with_capacity(CAPACITY),
        }
    }

    /// Append a payload, applying the drop-oldest-batch policy when the
    /// append exceeds capacity. Returns how many entries were discarded.
    pub fn push(&mut self, raw: String) -> usize {
        self.items.push_back(raw);
        if self.items.len() > CAPACITY {
            let dropped = self.items.len() - RETAIN_ON_OVERFLOW;
            self.items.drain(..dropped);
            dropped
        } else {
            0
        }
    }

    /// Remove and return the oldest pending payload.
    pub fn pop_front(&mut self) -> Option<String> {
        self.items.pop_front()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Queue shared between the session's ingest side and the processor.
pub type SharedQueue = Arc<Mutex<MessageQueue>>;
