//! Outbound feed request types.

use serde::Serialize;

/// Subscription request sent once per session, after the socket opens.
#[derive(Debug, Clone, Serialize)]
pub struct SubscribeRequest {
    /// Method is always "subscribe".
    pub method: String,
    /// Channel parameters.
    pub params: BookParams,
}

/// Parameters for a book-channel subscription.
#[derive(Debug, Clone, Serialize)]
pub struct BookParams {
    /// Channel is always "book".
    pub channel: String,
    /// Instrument symbols; one per watch session.
    pub symbol: Vec<String>,
    /// Requested book depth per side.
    pub depth: usize,
}

impl SubscribeRequest {
    /// Build a book subscription for one instrument at the given depth.
    pub fn book(symbol: &str, depth: usize) -> Self {
        Self {
            method: "subscribe".to_string(),
            params: BookParams {
                channel: "book".to_string(),
                symbol: vec![symbol.to_string()],
                depth,
            },
        }
    }
}
