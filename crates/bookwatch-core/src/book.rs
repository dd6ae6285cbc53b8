//! Render-ready order-book shape and top-of-book derivations.
//!
//! The pipeline trusts the engine collaborator to return levels already
//! sorted and depth-limited; this module only holds the resulting shape and
//! derives spread and mid price from the best levels.

use crate::{Price, Qty};
use serde::{Deserialize, Serialize};

/// A single (price, aggregate quantity) level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookLevel {
    pub price: Price,
    pub qty: Qty,
}

impl BookLevel {
    pub fn new(price: Price, qty: Qty) -> Self {
        Self { price, qty }
    }

    /// A level counts toward derived metrics only when both fields are
    /// strictly positive.
    pub fn is_positive(&self) -> bool {
        self.price.is_positive() && self.qty.is_positive()
    }
}

/// Both sides of the book, bids descending and asks ascending by price.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DepthView {
    pub bids: Vec<BookLevel>,
    pub asks: Vec<BookLevel>,
}

impl DepthView {
    pub fn new(bids: Vec<BookLevel>, asks: Vec<BookLevel>) -> Self {
        Self { bids, asks }
    }

    pub fn is_empty(&self) -> bool {
        self.bids.is_empty() && self.asks.is_empty()
    }

    /// Best bid, if present and strictly positive.
    pub fn best_bid(&self) -> Option<&BookLevel> {
        self.bids.first().filter(|l| l.is_positive())
    }

    /// Best ask, if present and strictly positive.
    pub fn best_ask(&self) -> Option<&BookLevel> {
        self.asks.first().filter(|l| l.is_positive())
    }

    /// Spread: best ask minus best bid.
    ///
    /// Defined only when both sides have a strictly positive best level.
    pub fn spread(&self) -> Option<Price> {
        let bid = self.best_bid()?;
        let ask = self.best_ask()?;
        Some(ask.price - bid.price)
    }

    /// Mid price: arithmetic mean of best bid and best ask.
    ///
    /// Defined only when both sides have a strictly positive best level.
    pub fn mid_price(&self) -> Option<Price> {
        let bid = self.best_bid()?;
        let ask = self.best_ask()?;
        Some(Price::midpoint(bid.price, ask.price))
    }

    /// Keep at most `depth` levels per side.
    pub fn truncate(&mut self, depth: usize) {
        self.bids.truncate(depth);
        self.asks.truncate(depth);
    }
}
