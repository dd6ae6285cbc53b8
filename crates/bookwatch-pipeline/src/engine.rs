//! Order-book engine collaborator seam.
//!
//! The engine maintains the actual book (price-level storage, checksum
//! verification) and is consumed as an opaque capability. Every call returns
//! a classified outcome; nothing the engine does may escape the pipeline as
//! an unhandled fault, so the processor matches on `ApplyOutcome`
//! exhaustively instead of catching errors.

use bookwatch_core::BookLevel;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::debug;

/// Kind of book result produced by an applied message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateKind {
    /// Full replacement of the book state.
    Snapshot,
    /// Incremental change to one or more price levels.
    Delta,
}

/// Levels returned by the engine's apply-and-query operation.
///
/// The engine is trusted to return both sides already sorted (bids
/// descending, asks ascending) and limited to the requested depth.
#[derive(Debug, Clone)]
pub struct BookUpdate {
    pub kind: UpdateKind,
    pub bids: Vec<BookLevel>,
    pub asks: Vec<BookLevel>,
}

/// Classified outcome of handing one raw message to the engine.
#[derive(Debug)]
pub enum ApplyOutcome {
    /// Recognized update or snapshot; the book changed.
    Applied(BookUpdate),
    /// Checksum mismatch: the local book diverged from the source.
    IntegrityFailure,
    /// Message not relevant to book state.
    Ignored,
    /// Generic processing failure; the message is dropped.
    Failed(String),
}

/// Opaque order-book engine capability.
pub trait BookEngine: Send {
    /// Configure decimal precision used for integrity checking.
    fn set_precision(&mut self, price_decimals: u32, qty_decimals: u32);

    /// Apply one raw message and query the resulting top-`depth` levels.
    fn apply(&mut self, raw: &str, depth: usize) -> ApplyOutcome;

    /// Free any resources held by the handle. Called exactly once, before
    /// the handle is discarded.
    fn release(&mut self);
}

/// Factory for engine instances, one per session.
pub trait EngineFactory: Send + Sync {
    fn build(&self, symbol: &str, depth: usize) -> Box<dyn BookEngine>;
}

/// Arc wrapper for factory trait objects.
pub type DynEngineFactory = Arc<dyn EngineFactory>;

/// Owning wrapper around an engine instance.
///
/// Guards the at-most-once `release` contract and refuses work after
/// release, so a retired handle can never corrupt shared state.
pub struct EngineHandle {
    engine: Box<dyn BookEngine>,
    released: bool,
}

impl EngineHandle {
    pub fn new(engine: Box<dyn BookEngine>) -> Self {
        Self {
            engine,
            released: false,
        }
    }

    pub fn apply(&mut self, raw: &str, depth: usize) -> ApplyOutcome {
        if self.released {
            debug!("Apply on released engine handle ignored");
            return ApplyOutcome::Ignored;
        }
        self.engine.apply(raw, depth)
    }

    pub fn release(&mut self) {
        if !self.released {
            self.released = true;
            self.engine.release();
        }
    }

    pub fn is_released(&self) -> bool {
        self.released
    }
}

/// Engine handle shared between the session manager and the processor.
pub type SharedEngine = Arc<Mutex<EngineHandle>>;
