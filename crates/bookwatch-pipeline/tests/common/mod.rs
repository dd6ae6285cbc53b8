//! Shared fixtures for pipeline integration tests.
//!
//! - `ScriptedFactory`/`ScriptedEngine`: a stand-in for the external book
//!   engine that interprets small JSON scripts and records every lifecycle
//!   call, including an overlap guard proving single-flight processing.
//! - `MockFeedServer`: a local WebSocket server that accepts the book
//!   subscription and lets tests push frames to a connected session.

#![allow(dead_code)]

use bookwatch_core::{BookLevel, Price, Qty};
use bookwatch_pipeline::{
    ApplyOutcome, BookEngine, BookState, BookUpdate, EngineFactory, UpdateKind,
};
use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::{accept_async, tungstenite::Message};

// ============================================================================
// Scripted engine
// ============================================================================

/// Shared log of engine lifecycle events ("build:SYM", "apply:SYM:op",
/// "release:SYM").
#[derive(Clone, Default)]
pub struct EngineLog {
    events: Arc<Mutex<Vec<String>>>,
}

impl EngineLog {
    pub fn push(&self, event: impl Into<String>) {
        self.events.lock().push(event.into());
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().clone()
    }

    /// Events of one kind, e.g. all "apply:..." entries.
    pub fn with_prefix(&self, prefix: &str) -> Vec<String> {
        self.events
            .lock()
            .iter()
            .filter(|e| e.starts_with(prefix))
            .cloned()
            .collect()
    }
}

pub struct ScriptedEngine {
    symbol: String,
    log: EngineLog,
    in_flight: Arc<AtomicBool>,
}

impl BookEngine for ScriptedEngine {
    fn set_precision(&mut self, _price_decimals: u32, _qty_decimals: u32) {}

    fn apply(&mut self, raw: &str, depth: usize) -> ApplyOutcome {
        assert!(
            !self.in_flight.swap(true, Ordering::SeqCst),
            "overlapping engine apply"
        );
        let outcome = self.interpret(raw, depth);
        self.in_flight.store(false, Ordering::SeqCst);
        outcome
    }

    fn release(&mut self) {
        self.log.push(format!("release:{}", self.symbol));
    }
}

impl ScriptedEngine {
    fn interpret(&self, raw: &str, depth: usize) -> ApplyOutcome {
        let value: serde_json::Value = match serde_json::from_str(raw) {
            Ok(value) => value,
            Err(e) => return ApplyOutcome::Failed(e.to_string()),
        };
        let op = value.get("op").and_then(|v| v.as_str()).unwrap_or("");
        self.log.push(format!("apply:{}:{op}", self.symbol));

        match op {
            "snapshot" | "delta" => {
                let kind = if op == "snapshot" {
                    UpdateKind::Snapshot
                } else {
                    UpdateKind::Delta
                };
                let mut bids = parse_levels(&value["bids"]);
                let mut asks = parse_levels(&value["asks"]);
                bids.truncate(depth);
                asks.truncate(depth);
                ApplyOutcome::Applied(BookUpdate { kind, bids, asks })
            }
            "bad_checksum" => ApplyOutcome::IntegrityFailure,
            "noise" => ApplyOutcome::Ignored,
            _ => ApplyOutcome::Failed(format!("unknown op: {op}")),
        }
    }
}

fn parse_levels(value: &serde_json::Value) -> Vec<BookLevel> {
    value
        .as_array()
        .map(|levels| {
            levels
                .iter()
                .filter_map(|level| {
                    let price: Price = level[0].as_str()?.parse().ok()?;
                    let qty: Qty = level[1].as_str()?.parse().ok()?;
                    Some(BookLevel::new(price, qty))
                })
                .collect()
        })
        .unwrap_or_default()
}

#[derive(Clone, Default)]
pub struct ScriptedFactory {
    pub log: EngineLog,
    in_flight: Arc<AtomicBool>,
}

impl EngineFactory for ScriptedFactory {
    fn build(&self, symbol: &str, depth: usize) -> Box<dyn BookEngine> {
        self.log.push(format!("build:{symbol}:{depth}"));
        Box::new(ScriptedEngine {
            symbol: symbol.to_string(),
            log: self.log.clone(),
            in_flight: self.in_flight.clone(),
        })
    }
}

/// Frame helpers producing the scripted wire format.
pub fn snapshot_frame(bids: &[(&str, &str)], asks: &[(&str, &str)]) -> String {
    frame("snapshot", bids, asks)
}

pub fn delta_frame(bids: &[(&str, &str)], asks: &[(&str, &str)]) -> String {
    frame("delta", bids, asks)
}

pub fn bad_checksum_frame() -> String {
    r#"{"op":"bad_checksum"}"#.to_string()
}

pub fn noise_frame() -> String {
    r#"{"op":"noise"}"#.to_string()
}

fn frame(op: &str, bids: &[(&str, &str)], asks: &[(&str, &str)]) -> String {
    let levels = |side: &[(&str, &str)]| {
        side.iter()
            .map(|(p, q)| serde_json::json!([p, q]))
            .collect::<Vec<_>>()
    };
    serde_json::json!({
        "op": op,
        "bids": levels(bids),
        "asks": levels(asks),
    })
    .to_string()
}

// ============================================================================
// Mock feed server
// ============================================================================

type FrameSenders = Arc<Mutex<HashMap<String, mpsc::Sender<String>>>>;

/// A mock WebSocket feed for integration tests.
///
/// Records client subscriptions and routes test-pushed frames to the
/// connection subscribed to a given symbol.
pub struct MockFeedServer {
    addr: SocketAddr,
    shutdown_tx: mpsc::Sender<()>,
    subscriptions: Arc<Mutex<Vec<String>>>,
    senders: FrameSenders,
}

impl MockFeedServer {
    /// Start a new mock feed on an available port.
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let subscriptions: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
        let senders: FrameSenders = Arc::new(Mutex::new(HashMap::new()));
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);

        let subscriptions_clone = subscriptions.clone();
        let senders_clone = senders.clone();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    Ok((stream, _)) = listener.accept() => {
                        let subscriptions = subscriptions_clone.clone();
                        let senders = senders_clone.clone();
                        tokio::spawn(handle_connection(stream, subscriptions, senders));
                    }
                    _ = shutdown_rx.recv() => break,
                }
            }
        });

        Self {
            addr,
            shutdown_tx,
            subscriptions,
            senders,
        }
    }

    /// The server's WebSocket URL.
    pub fn url(&self) -> String {
        format!("ws://{}", self.addr)
    }

    /// Subscription symbols received so far, in arrival order.
    pub fn subscriptions(&self) -> Vec<String> {
        self.subscriptions.lock().clone()
    }

    /// Wait until a connection has subscribed to `symbol`.
    pub async fn wait_for_subscription(&self, symbol: &str) {
        let deadline = Duration::from_secs(2);
        tokio::time::timeout(deadline, async {
            loop {
                if self.senders.lock().contains_key(symbol) {
                    return;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap_or_else(|_| panic!("no subscription for {symbol} within {deadline:?}"));
    }

    /// Push a raw frame to the connection subscribed to `symbol`.
    pub async fn send_frame(&self, symbol: &str, frame: String) {
        let sender = self
            .senders
            .lock()
            .get(symbol)
            .cloned()
            .unwrap_or_else(|| panic!("no connection subscribed to {symbol}"));
        sender.send(frame).await.expect("connection gone");
    }

    /// Close the connection subscribed to `symbol` from the server side.
    pub fn disconnect(&self, symbol: &str) {
        // Dropping the sole strong sender ends the handler's frame loop,
        // which closes the socket.
        self.senders.lock().remove(symbol);
    }

    /// Shut the server down.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
    }
}

async fn handle_connection(
    stream: TcpStream,
    subscriptions: Arc<Mutex<Vec<String>>>,
    senders: FrameSenders,
) {
    let ws_stream = match accept_async(stream).await {
        Ok(ws) => ws,
        Err(_) => return,
    };
    let (mut write, mut read) = ws_stream.split();
    let (frame_tx, mut frame_rx) = mpsc::channel::<String>(64);
    // The map owns the only strong sender once subscribed, so removing it
    // (see `disconnect`) ends this loop via `recv() == None`.
    let weak_tx = frame_tx.downgrade();
    let mut frame_tx = Some(frame_tx);
    let mut symbol: Option<String> = None;

    loop {
        tokio::select! {
            msg = read.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        if let Some(sym) = parse_subscription(&text) {
                            if let Some(tx) = frame_tx.take() {
                                subscriptions.lock().push(sym.clone());
                                senders.lock().insert(sym.clone(), tx);
                                symbol = Some(sym);
                            }
                        }
                    }
                    Some(Ok(Message::Ping(data))) => {
                        let _ = write.send(Message::Pong(data)).await;
                    }
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    _ => {}
                }
            }
            frame = frame_rx.recv() => {
                match frame {
                    Some(frame) => {
                        if write.send(Message::Text(frame)).await.is_err() {
                            break;
                        }
                    }
                    None => {
                        let _ = write.send(Message::Close(None)).await;
                        break;
                    }
                }
            }
        }
    }

    if let Some(sym) = symbol {
        let mut senders = senders.lock();
        // Only deregister if this connection still owns the slot (a newer
        // connection for the same symbol may have replaced it).
        let owns_slot = weak_tx
            .upgrade()
            .zip(senders.get(&sym))
            .is_some_and(|(strong, tx)| tx.same_channel(&strong));
        if owns_slot {
            senders.remove(&sym);
        }
    }
}

/// Install a test subscriber so `RUST_LOG` surfaces pipeline tracing.
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Wait (bounded) until the published state satisfies `predicate`.
pub async fn wait_for_state(
    rx: &mut tokio::sync::watch::Receiver<BookState>,
    predicate: impl Fn(&BookState) -> bool,
) -> BookState {
    tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            if predicate(&rx.borrow()) {
                return rx.borrow().clone();
            }
            rx.changed().await.expect("publisher dropped");
        }
    })
    .await
    .expect("expected state not observed in time")
}

fn parse_subscription(text: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(text).ok()?;
    if value.get("method")?.as_str()? != "subscribe" {
        return None;
    }
    let params = value.get("params")?;
    if params.get("channel")?.as_str()? != "book" {
        return None;
    }
    params.get("symbol")?.get(0)?.as_str().map(String::from)
}
