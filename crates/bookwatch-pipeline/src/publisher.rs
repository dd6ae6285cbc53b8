//! Consumer-facing state projection.
//!
//! The publisher is the sole writer of the observable snapshot. Writes go
//! through a `tokio::sync::watch` channel, so consumers only ever read a
//! fully formed state, never a partial one. Every write is fenced by the
//! session generation: a result computed for a retired session is discarded
//! atomically with the check, on any runtime flavor.

use crate::engine::BookUpdate;
use bookwatch_core::{DepthView, Instrument, Price};
use bookwatch_ws::ConnectionState;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::watch;
use tracing::debug;

/// Render-ready published state.
#[derive(Debug, Clone, Serialize)]
pub struct BookState {
    /// Instrument bound to the current session, if any.
    pub instrument: Option<Instrument>,
    /// Bids descending, asks ascending, at most the configured depth.
    pub book: DepthView,
    /// Best ask minus best bid; undefined unless both sides have a
    /// strictly positive best level.
    pub spread: Option<Price>,
    /// Midpoint of the best levels, under the same definedness rule.
    pub mid_price: Option<Price>,
    /// Number of applied updates this session.
    pub update_count: u64,
    /// False after a checksum mismatch, until the next applied update.
    pub checksum_ok: bool,
    /// Feed connection state.
    pub connection: ConnectionState,
    /// When this state was last written.
    pub updated_at: DateTime<Utc>,
}

impl Default for BookState {
    fn default() -> Self {
        Self {
            instrument: None,
            book: DepthView::default(),
            spread: None,
            mid_price: None,
            update_count: 0,
            checksum_ok: true,
            connection: ConnectionState::Disconnected,
            updated_at: Utc::now(),
        }
    }
}

struct Inner {
    generation: u64,
    state: BookState,
}

/// Sole writer of the externally observable book state.
pub struct BookPublisher {
    inner: Mutex<Inner>,
    tx: watch::Sender<BookState>,
}

impl BookPublisher {
    pub fn new() -> Self {
        let state = BookState::default();
        let (tx, _rx) = watch::channel(state.clone());
        Self {
            inner: Mutex::new(Inner {
                generation: 0,
                state,
            }),
            tx,
        }
    }

    /// Subscribe to published states.
    pub fn subscribe(&self) -> watch::Receiver<BookState> {
        self.tx.subscribe()
    }

    /// Read the current state.
    pub fn state(&self) -> BookState {
        self.tx.borrow().clone()
    }

    /// Start a new session: bump the generation and reset all derived state.
    /// Returns the generation that fences this session's writes.
    pub(crate) fn begin_session(&self, instrument: Instrument) -> u64 {
        let mut inner = self.inner.lock();
        inner.generation += 1;
        inner.state = BookState {
            instrument: Some(instrument),
            ..BookState::default()
        };
        self.tx.send_replace(inner.state.clone());
        inner.generation
    }

    /// Retire the active session without starting a new one.
    pub(crate) fn reset(&self) {
        let mut inner = self.inner.lock();
        inner.generation += 1;
        inner.state = BookState::default();
        self.tx.send_replace(inner.state.clone());
    }

    /// Publish an applied update. Returns false if the session is retired.
    pub(crate) fn apply_update(&self, generation: u64, update: BookUpdate, depth: usize) -> bool {
        self.write(generation, |state| {
            let mut book = DepthView::new(update.bids, update.asks);
            book.truncate(depth);
            state.spread = book.spread();
            state.mid_price = book.mid_price();
            state.book = book;
            state.update_count += 1;
            state.checksum_ok = true;
        })
    }

    /// Flag an integrity failure, leaving the book itself untouched.
    pub(crate) fn mark_integrity_failure(&self, generation: u64) -> bool {
        self.write(generation, |state| {
            state.checksum_ok = false;
        })
    }

    /// Update the connection state.
    pub(crate) fn set_connection(&self, generation: u64, connection: ConnectionState) -> bool {
        self.write(generation, |state| {
            state.connection = connection;
        })
    }

    fn write(&self, generation: u64, mutate: impl FnOnce(&mut BookState)) -> bool {
        let mut inner = self.inner.lock();
        if generation != inner.generation {
            debug!(
                stale = generation,
                current = inner.generation,
                "Publish for retired session discarded"
            );
            return false;
        }
        mutate(&mut inner.state);
        inner.state.updated_at = Utc::now();
        self.tx.send_replace(inner.state.clone());
        true
    }
}

impl Default for BookPublisher {
    fn default() -> Self {
        Self::new()
    }
}
