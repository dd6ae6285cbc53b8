//! Core domain types for the bookwatch order-book pipeline.
//!
//! This crate provides the fundamental types shared by the transport and
//! pipeline crates:
//! - `Price`, `Qty`: precision-safe numeric types
//! - `Instrument`: symbol plus statically known precision digits
//! - `BookLevel`, `DepthView`: render-ready book shape with top-of-book
//!   derivations (spread, mid price)

pub mod book;
pub mod decimal;
pub mod error;
pub mod instrument;

pub use book::{BookLevel, DepthView};
pub use decimal::{Price, Qty};
pub use error::{CoreError, Result};
pub use instrument::Instrument;
