//! Instrument identity and the supported-instrument catalog.
//!
//! Each instrument carries the precision digits the order-book engine needs
//! for correct integrity checking. The set of supported instruments is fixed
//! and statically known.

use crate::error::{CoreError, Result};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A tradable instrument with statically known precision.
///
/// Immutable once a session is built from it; equality is structural, and
/// catalog entries are the only source of instances in normal operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instrument {
    /// Feed symbol (e.g., "BTC/USD").
    pub symbol: String,
    /// Number of decimal digits in prices.
    pub price_decimals: u32,
    /// Number of decimal digits in quantities.
    pub qty_decimals: u32,
}

impl Instrument {
    pub fn new(symbol: impl Into<String>, price_decimals: u32, qty_decimals: u32) -> Self {
        Self {
            symbol: symbol.into(),
            price_decimals,
            qty_decimals,
        }
    }

    /// The fixed set of supported instruments.
    pub fn supported() -> &'static [Instrument] {
        &CATALOG
    }

    /// Look up an instrument by its feed symbol.
    pub fn lookup(symbol: &str) -> Result<Instrument> {
        CATALOG
            .iter()
            .find(|i| i.symbol == symbol)
            .cloned()
            .ok_or_else(|| CoreError::UnknownInstrument(symbol.to_string()))
    }
}

impl fmt::Display for Instrument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol)
    }
}

static CATALOG: Lazy<Vec<Instrument>> = Lazy::new(|| {
    vec![
        Instrument::new("BTC/USD", 1, 8),
        Instrument::new("ETH/USD", 2, 8),
        Instrument::new("SOL/USD", 2, 8),
        Instrument::new("XRP/USD", 5, 8),
        Instrument::new("LTC/USD", 2, 8),
    ]
});
