//! Session lifecycle for "one instrument being watched".
//!
//! The manager is the only component allowed to create or destroy engine
//! instances and transport connections, and the only one that invalidates a
//! session's liveness token. The processor never initiates lifecycle
//! changes. Exactly one session is active at a time; retiring the previous
//! one completes (logically) before the next begins handling messages,
//! while the socket itself may drain asynchronously behind the fence.

use crate::engine::{DynEngineFactory, EngineHandle, SharedEngine};
use crate::processor::MessageProcessor;
use crate::publisher::{BookPublisher, BookState};
use crate::queue::{MessageQueue, SharedQueue};
use bookwatch_core::Instrument;
use bookwatch_ws::{
    ConnectionState, FeedTransport, SubscribeRequest, TransportConfig, TransportEvent,
};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::{mpsc, watch, Notify};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Buffer for transport events in flight toward a session's queue.
const TRANSPORT_EVENT_BUFFER: usize = 64;

/// One live binding of instrument, engine, queue, and transport.
struct Session {
    instrument: Instrument,
    live: CancellationToken,
    engine: SharedEngine,
    tasks: Vec<JoinHandle<()>>,
}

/// Owns the active session and the published state across sessions.
pub struct SessionManager {
    transport: TransportConfig,
    depth: usize,
    factory: DynEngineFactory,
    publisher: Arc<BookPublisher>,
    active: Option<Session>,
}

impl SessionManager {
    pub fn new(transport: TransportConfig, depth: usize, factory: DynEngineFactory) -> Self {
        Self {
            transport,
            depth,
            factory,
            publisher: Arc::new(BookPublisher::new()),
            active: None,
        }
    }

    /// Subscribe to the published book state. The receiver stays valid
    /// across instrument switches.
    pub fn subscribe(&self) -> watch::Receiver<BookState> {
        self.publisher.subscribe()
    }

    /// Read the current published state.
    pub fn state(&self) -> BookState {
        self.publisher.state()
    }

    /// The instrument currently being watched, if any.
    pub fn active_instrument(&self) -> Option<&Instrument> {
        self.active.as_ref().map(|s| &s.instrument)
    }

    /// Switch the watched instrument.
    ///
    /// A no-op when `instrument` is already active. Otherwise the previous
    /// session is retired (liveness invalidated, engine released, transport
    /// winding down), derived state is reset, and a fresh engine, queue, and
    /// connection are brought up for the new instrument.
    pub fn switch_instrument(&mut self, instrument: Instrument) {
        if self
            .active
            .as_ref()
            .is_some_and(|s| s.instrument == instrument)
        {
            debug!(instrument = %instrument, "Instrument unchanged, keeping session");
            return;
        }

        self.retire_active();

        info!(instrument = %instrument, depth = self.depth, "Starting session");
        let generation = self.publisher.begin_session(instrument.clone());

        let mut engine = self.factory.build(&instrument.symbol, self.depth);
        engine.set_precision(instrument.price_decimals, instrument.qty_decimals);
        let engine: SharedEngine = Arc::new(Mutex::new(EngineHandle::new(engine)));

        let live = CancellationToken::new();
        let queue: SharedQueue = Arc::new(Mutex::new(MessageQueue::new()));
        let wake = Arc::new(Notify::new());

        let processor = MessageProcessor::new(
            queue.clone(),
            engine.clone(),
            self.publisher.clone(),
            generation,
            self.depth,
            live.clone(),
            wake.clone(),
        );
        let processor_task = tokio::spawn(processor.run());

        let (events_tx, events_rx) = mpsc::channel(TRANSPORT_EVENT_BUFFER);
        let transport = FeedTransport::new(
            self.transport.clone(),
            SubscribeRequest::book(&instrument.symbol, self.depth),
        );
        let transport_task = tokio::spawn(transport.run(events_tx, live.clone()));

        self.publisher
            .set_connection(generation, ConnectionState::Connecting);
        let ingest_task = tokio::spawn(ingest(
            events_rx,
            queue,
            wake,
            self.publisher.clone(),
            generation,
            live.clone(),
        ));

        self.active = Some(Session {
            instrument,
            live,
            engine,
            tasks: vec![processor_task, transport_task, ingest_task],
        });
    }

    /// Tear the whole pipeline down: retire the active session and clear
    /// the published state.
    pub fn shutdown(&mut self) {
        self.retire_active();
        self.publisher.reset();
    }

    fn retire_active(&mut self) {
        let Some(session) = self.active.take() else {
            return;
        };
        info!(instrument = %session.instrument, "Retiring session");

        // Pending continuations of this session observe the token (or the
        // publisher's generation fence) and abort silently.
        session.live.cancel();

        // Acquiring the engine lock waits out any in-flight apply, so the
        // old pair is logically torn down before the new one starts.
        session.engine.lock().release();

        // The transport task closes the socket on its own schedule; its
        // tasks are detached and exit via the cancelled token.
        drop(session.tasks);
    }
}

impl Drop for SessionManager {
    fn drop(&mut self) {
        self.retire_active();
    }
}

/// Route transport events into the session's queue and connection state.
async fn ingest(
    mut events: mpsc::Receiver<TransportEvent>,
    queue: SharedQueue,
    wake: Arc<Notify>,
    publisher: Arc<BookPublisher>,
    generation: u64,
    live: CancellationToken,
) {
    loop {
        let event = tokio::select! {
            () = live.cancelled() => return,
            event = events.recv() => match event {
                Some(event) => event,
                None => return,
            },
        };

        match event {
            TransportEvent::Open => {
                publisher.set_connection(generation, ConnectionState::Connected);
            }
            TransportEvent::Frame(raw) => {
                let dropped = queue.lock().push(raw);
                if dropped > 0 {
                    warn!(dropped, "Queue overflow, oldest pending messages discarded");
                }
                wake.notify_one();
            }
            TransportEvent::Closed => {
                publisher.set_connection(generation, ConnectionState::Disconnected);
            }
        }
    }
}
