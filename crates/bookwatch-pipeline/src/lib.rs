//! Ordered order-book ingestion pipeline.
//!
//! Turns a bursty stream of raw feed messages for one instrument into a
//! strictly-ordered sequence of render-ready book snapshots:
//! - `MessageQueue`: bounded FIFO with a lossy drop-oldest overflow policy
//! - `MessageProcessor`: single-flight drain loop over the engine collaborator
//! - `SessionManager`: lifecycle of "one instrument being watched"
//! - `BookPublisher`: consistent, race-free projection consumers read
//!
//! The order-book maintenance algorithm itself lives behind the opaque
//! `BookEngine` trait; this crate owns everything around it.

pub mod config;
pub mod engine;
pub mod error;
pub mod processor;
pub mod publisher;
pub mod queue;
pub mod session;

pub use config::WatchConfig;
pub use engine::{
    ApplyOutcome, BookEngine, BookUpdate, DynEngineFactory, EngineFactory, EngineHandle,
    SharedEngine, UpdateKind,
};
pub use error::{PipelineError, PipelineResult};
pub use processor::{MessageProcessor, ProcessorState};
pub use publisher::{BookPublisher, BookState};
pub use queue::MessageQueue;
pub use session::SessionManager;
