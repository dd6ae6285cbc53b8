//! WebSocket feed transport for bookwatch.
//!
//! Provides a single-connection transport for one watch session:
//! - Connects and emits the book subscription once the socket is ready
//! - Forwards raw feed payloads upstream without interpreting them
//! - Honors session cancellation at every await point
//!
//! There is deliberately no reconnection here: a failed or closed connection
//! surfaces as a terminal event, and retry policy belongs to the caller.

pub mod connection;
pub mod error;
pub mod message;

pub use connection::{ConnectionState, FeedTransport, TransportConfig, TransportEvent};
pub use error::{WsError, WsResult};
pub use message::{BookParams, SubscribeRequest};

use std::sync::Once;

static INIT_CRYPTO: Once = Once::new();

/// Initialize the TLS crypto provider.
/// Must be called once by the composition root before any WebSocket
/// connections are made.
pub fn init_crypto() {
    INIT_CRYPTO.call_once(|| {
        let _ = rustls::crypto::ring::default_provider().install_default();
    });
}
