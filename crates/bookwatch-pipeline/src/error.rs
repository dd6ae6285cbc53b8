//! Pipeline error types.
//!
//! Runtime failure modes (transport loss, integrity failure, unrecognized
//! messages, overflow) never surface as errors; they map to fields of the
//! published state. Only configuration loading is fallible.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Invalid configuration: {0}")]
    Config(String),
}

pub type PipelineResult<T> = Result<T, PipelineError>;
