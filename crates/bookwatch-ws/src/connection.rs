//! Feed connection for a single watch session.
//!
//! Handles exactly one connection lifecycle: connect, subscribe, forward
//! frames, close. Teardown is driven by the session's cancellation token;
//! a server-side close or read error ends the feed and is reported as a
//! terminal `Closed` event, never retried here.

use crate::error::WsResult;
use crate::message::SubscribeRequest;
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Transport configuration.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// WebSocket URL of the feed endpoint.
    pub url: String,
}

/// Connection state as observed by consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Disconnected => write!(f, "disconnected"),
            Self::Connecting => write!(f, "connecting"),
            Self::Connected => write!(f, "connected"),
        }
    }
}

/// Events emitted by the transport to the owning session.
#[derive(Debug)]
pub enum TransportEvent {
    /// Socket is open and the subscription request has been sent.
    Open,
    /// Raw text payload from the feed.
    Frame(String),
    /// Connection ended: connect failure, server close, or read error.
    Closed,
}

/// Single-connection feed transport.
pub struct FeedTransport {
    config: TransportConfig,
    subscription: SubscribeRequest,
}

impl FeedTransport {
    pub fn new(config: TransportConfig, subscription: SubscribeRequest) -> Self {
        Self {
            config,
            subscription,
        }
    }

    /// Run the connection until it ends or the token is cancelled.
    ///
    /// Emits `Open` once the subscription is on the wire, `Frame` per text
    /// payload, and a final `Closed` unless the session was cancelled (a
    /// cancelled session has already moved on and ignores stragglers).
    pub async fn run(self, events: mpsc::Sender<TransportEvent>, cancel: CancellationToken) {
        if let Err(e) = self.drive(&events, &cancel).await {
            warn!(error = %e, "Feed connection ended with error");
        }
        if !cancel.is_cancelled() {
            let _ = events.send(TransportEvent::Closed).await;
        }
    }

    async fn drive(
        &self,
        events: &mpsc::Sender<TransportEvent>,
        cancel: &CancellationToken,
    ) -> WsResult<()> {
        info!(url = %self.config.url, "Connecting to feed");

        let (ws_stream, _response) = tokio::select! {
            res = connect_async(&self.config.url) => res?,
            () = cancel.cancelled() => {
                debug!("Cancelled while connecting");
                return Ok(());
            }
        };
        let (mut write, mut read) = ws_stream.split();

        let request = serde_json::to_string(&self.subscription)?;
        write.send(Message::Text(request)).await?;
        info!(
            symbol = %self.subscription.params.symbol.join(","),
            depth = self.subscription.params.depth,
            "Book subscription sent"
        );

        if events.send(TransportEvent::Open).await.is_err() {
            // Receiver dropped: session already torn down.
            return Ok(());
        }

        loop {
            tokio::select! {
                () = cancel.cancelled() => {
                    // Graceful teardown: tell the server we are leaving. The
                    // socket may drain asynchronously; late frames are dropped
                    // with the receiver.
                    if let Err(e) = write.send(Message::Close(None)).await {
                        debug!(error = %e, "Close frame not delivered");
                    }
                    return Ok(());
                }

                msg = read.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => {
                            if events.send(TransportEvent::Frame(text)).await.is_err() {
                                return Ok(());
                            }
                        }
                        Some(Ok(Message::Ping(data))) => {
                            write.send(Message::Pong(data)).await?;
                        }
                        Some(Ok(Message::Close(frame))) => {
                            let (code, reason) = frame
                                .map(|f| (u16::from(f.code), f.reason.to_string()))
                                .unwrap_or((1000, "Normal close".to_string()));
                            warn!(code, %reason, "Feed closed by server");
                            return Ok(());
                        }
                        Some(Err(e)) => {
                            return Err(e.into());
                        }
                        None => {
                            warn!("Feed stream ended");
                            return Ok(());
                        }
                        _ => {}
                    }
                }
            }
        }
    }
}
