// src/transport/native/transport.rs

//! Native in-process transport implementation.
//!
//! This file contains the concrete implementation of the domain-level
//! [`Transport`] trait on top of paired in-memory queues. It provides the
//! same external contract a network transport would — asynchronous
//! connect/disconnect, ordered delivery, pause/resume backpressure, graceful
//! handler detach — without a socket anywhere underneath.
//!
//! ## Semantics
//!
//! - `connect()` registers this side with the connector and completes once
//!   the opposite role arrives on the same link identity.
//! - Each connection owns a fresh inbound queue, drained by a dedicated
//!   delivery pump task. All handler invocations for one transport happen on
//!   that task, serialized, in FIFO order.
//! - `send()` enqueues onto the *peer's* inbound queue and wakes the peer's
//!   pump; it never invokes handler code on the caller's stack.
//! - Backpressure is an explicit protocol: an in-process queue cannot fill a
//!   socket buffer, so `pause()` gates the local pump and travels to the
//!   peer as a signal, giving the producing side a hook to stop enqueueing.
//!
//! ## Non-goals
//!
//! No wire encoding, no routing, no delivery acknowledgment. Reliability
//! beyond ordered best-effort delivery is an application-layer concern.

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, Mutex};

use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::transport::native::connector::{EndpointPair, NativeConnector};
use crate::transport::native::endpoint::NativeEndpoint;
use crate::transport::native::lock_ignore_poison;
use crate::transport::native::queue::{MessageQueue, QueueItem};
use crate::{
    // ---
    ConnectionState,
    EndpointRole,
    Error,
    FlowHandler,
    HandlerPtr,
    LinkConfig,
    Message,
    Result,
    Transport,
    TransportPtr,
};

const DISCONNECTED: u8 = 0;
const CONNECTING: u8 = 1;
const CONNECTED: u8 = 2;
const DISCONNECTING: u8 = 3;

fn state_of(raw: u8) -> ConnectionState {
    // ---
    match raw {
        CONNECTING => ConnectionState::Connecting,
        CONNECTED => ConnectionState::Connected,
        DISCONNECTING => ConnectionState::Disconnecting,
        _ => ConnectionState::Disconnected,
    }
}

/// Native transport.
///
/// One side of an in-process link, paired with its counterpart through a
/// shared [`NativeConnector`]. Constructed via
/// [`create_transport`]; consumers hold it as a
/// [`TransportPtr`].
struct NativeTransport {
    // ---
    inner: Arc<Inner>,
}

struct Inner {
    link_id: String,
    identity: String,
    role: EndpointRole,
    connector: Arc<NativeConnector>,

    /// Committed connection state; transitions by compare-and-swap so that
    /// concurrent same-kind lifecycle calls fail fast instead of racing.
    state: AtomicU8,

    /// Inbound queue for the current connection; replaced on every connect
    /// so a stale pump can never drain a live connection's traffic.
    receive_queue: Mutex<Arc<MessageQueue>>,

    /// Attached handler. The pump holds this lock across each single-message
    /// delivery, which is what makes detach wait for an in-flight call.
    handler_slot: tokio::sync::Mutex<Option<HandlerPtr>>,
    has_handler: AtomicBool,

    /// Local backpressure gate: while set, the pump leaves the queue alone.
    paused: AtomicBool,
    pause_handler: Mutex<Option<FlowHandler>>,
    resume_handler: Mutex<Option<FlowHandler>>,

    endpoints: Mutex<Option<EndpointPair>>,
    pump_task: Mutex<Option<JoinHandle<()>>>,
}

impl Inner {
    fn transition(&self, from: u8, to: u8) -> std::result::Result<(), u8> {
        // ---
        self.state
            .compare_exchange(from, to, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| ())
    }

    fn current_queue(&self) -> Arc<MessageQueue> {
        lock_ignore_poison(&self.receive_queue).clone()
    }

    fn peer_endpoint(&self) -> Option<Arc<NativeEndpoint>> {
        // ---
        lock_ignore_poison(&self.endpoints)
            .as_ref()
            .map(|pair| pair.peer_of(self.role).clone())
    }

    fn signal_peer(&self, item: QueueItem) {
        // ---
        let Some(peer) = self.peer_endpoint() else {
            return;
        };
        if peer.signal(item).is_err() {
            debug!("{}: flow signal dropped, peer queue closed", self.link_id);
        }
    }

    fn spawn_pump(inner: Arc<Inner>, queue: Arc<MessageQueue>) -> JoinHandle<()> {
        // ---
        tokio::spawn(async move {
            debug!("{}: delivery pump started", inner.link_id);
            loop {
                inner.drain(&queue).await;
                if queue.is_closed() {
                    break;
                }
                queue.pumped().await;
            }
            debug!("{}: delivery pump stopped", inner.link_id);
        })
    }

    /// Drain the receive queue, one item at a time.
    ///
    /// Stops (leaving the remainder queued) when the transport is no longer
    /// connected, the local side is paused, or a message is at the head with
    /// no handler attached. Each message delivery runs to completion before
    /// the next item is popped.
    async fn drain(&self, queue: &Arc<MessageQueue>) {
        // ---
        loop {
            if self.state.load(Ordering::Acquire) != CONNECTED {
                return;
            }
            if self.paused.load(Ordering::Acquire) {
                return;
            }

            // Holding the slot across the delivery serializes detach()
            // behind the in-flight call.
            let slot = self.handler_slot.lock().await;

            let Some(item) = queue.pop() else {
                return;
            };

            match item {
                QueueItem::Message(message) => {
                    // ---
                    let Some(handler) = slot.as_ref() else {
                        // No handler: the message stays queued until one
                        // attaches or the transport disconnects.
                        queue.requeue_front(QueueItem::Message(message));
                        return;
                    };
                    if let Err(err) = handler.on_message(message).await {
                        warn!("{}: handler failed to process message: {err}", self.link_id);
                    }
                }
                QueueItem::Pause => {
                    // ---
                    debug!("{}: peer paused", self.link_id);
                    {
                        let callback = lock_ignore_poison(&self.pause_handler);
                        if let Some(callback) = callback.as_ref() {
                            callback();
                        }
                    }
                    if let Some(handler) = slot.as_ref() {
                        handler.on_pause().await;
                    }
                }
                QueueItem::Resume => {
                    // ---
                    debug!("{}: peer resumed", self.link_id);
                    {
                        let callback = lock_ignore_poison(&self.resume_handler);
                        if let Some(callback) = callback.as_ref() {
                            callback();
                        }
                    }
                    if let Some(handler) = slot.as_ref() {
                        handler.on_resume().await;
                    }
                }
            }
        }
    }
}

#[async_trait::async_trait]
impl Transport for NativeTransport {
    // ---

    async fn connect(&self) -> Result<()> {
        // ---
        let inner = &self.inner;

        inner
            .transition(DISCONNECTED, CONNECTING)
            .map_err(|_| Error::InvalidState("connect() requires a disconnected transport"))?;

        debug!(
            "{}: connecting as {} side of '{}'",
            inner.link_id, inner.role, inner.identity
        );

        // Fresh inbound queue scoped to this connection attempt.
        let queue = Arc::new(MessageQueue::new());
        let endpoint = NativeEndpoint::new(&inner.identity, inner.role, queue.clone());
        *lock_ignore_poison(&inner.receive_queue) = queue.clone();

        let pairing = inner.connector.establish(endpoint.clone());

        // A disconnect() that won the state race before our registration
        // landed has nothing to abort; cancel the registration ourselves so
        // it cannot pair a peer against a dead transport.
        if inner.state.load(Ordering::Acquire) != CONNECTING {
            inner.connector.abort(&inner.identity, inner.role);
        }

        let outcome = match pairing.await {
            Ok(outcome) => outcome,
            // Connector dropped the waiter without resolving it.
            Err(_) => Err(Error::ConnectionAborted),
        };

        let pair = match outcome {
            Ok(pair) => pair,
            Err(err) => {
                // Nothing was established. A racing disconnect() owns the
                // state if it already moved us past Connecting.
                let _ = inner.transition(CONNECTING, DISCONNECTED);
                debug!("{}: connect failed: {err}", inner.link_id);
                return Err(err);
            }
        };

        // disconnect() may have raced us between pairing and commit; if so,
        // hand the established pair straight back.
        if inner.transition(CONNECTING, CONNECTED).is_err() {
            inner.connector.release(&endpoint);
            debug!("{}: connect aborted during pairing", inner.link_id);
            return Err(Error::ConnectionAborted);
        }

        *lock_ignore_poison(&inner.endpoints) = Some(pair);
        let pump = Inner::spawn_pump(inner.clone(), queue);
        *lock_ignore_poison(&inner.pump_task) = Some(pump);

        debug!("{}: connected", inner.link_id);
        Ok(())
    }

    async fn disconnect(&self) -> Result<()> {
        // ---
        let inner = &self.inner;

        loop {
            match inner.state.load(Ordering::Acquire) {
                DISCONNECTED => return Ok(()),
                DISCONNECTING => {
                    return Err(Error::InvalidState("disconnect() already in progress"));
                }
                CONNECTING => {
                    // ---
                    if inner.transition(CONNECTING, DISCONNECTING).is_ok() {
                        debug!("{}: cancelling pending connect", inner.link_id);
                        inner.connector.abort(&inner.identity, inner.role);
                        inner.current_queue().close();
                        inner.paused.store(false, Ordering::Release);
                        inner.state.store(DISCONNECTED, Ordering::Release);
                        return Ok(());
                    }
                }
                _ => {
                    // ---
                    if inner.transition(CONNECTED, DISCONNECTING).is_ok() {
                        break;
                    }
                }
            }
        }

        debug!("{}: disconnecting", inner.link_id);

        // Closing the queue discards anything still queued and wakes the
        // pump so it can observe the closure and stop.
        let queue = inner.current_queue();
        let dropped = queue.close();
        if dropped > 0 {
            debug!("{}: discarded {dropped} undelivered queue item(s)", inner.link_id);
        }

        let pump = lock_ignore_poison(&inner.pump_task).take();
        if let Some(pump) = pump {
            if pump.await.is_err() {
                warn!("{}: delivery pump task panicked", inner.link_id);
            }
        }

        // Release our half of the pair; the peer's sends now fail with
        // QueueClosed, and the link identity frees once both sides release.
        let pair = lock_ignore_poison(&inner.endpoints).take();
        if let Some(pair) = pair {
            inner.connector.release(pair.side(inner.role));
        }

        // Disconnect clears the handler without an on_detach notification;
        // detach is a distinct operation.
        {
            let mut slot = inner.handler_slot.lock().await;
            slot.take();
            inner.has_handler.store(false, Ordering::Release);
        }

        inner.paused.store(false, Ordering::Release);
        inner.state.store(DISCONNECTED, Ordering::Release);

        debug!("{}: disconnected", inner.link_id);
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.inner.state.load(Ordering::Acquire) == CONNECTED
    }

    fn connection_state(&self) -> ConnectionState {
        state_of(self.inner.state.load(Ordering::Acquire))
    }

    fn send(&self, message: Message) -> Result<()> {
        // ---
        let inner = &self.inner;

        if inner.state.load(Ordering::Acquire) != CONNECTED {
            return Err(Error::InvalidState("send() requires a connected transport"));
        }

        let peer = inner
            .peer_endpoint()
            .ok_or(Error::InvalidState("send() requires a connected transport"))?;

        peer.enqueue(message)
    }

    fn pause(&self) {
        // ---
        let inner = &self.inner;

        if inner.paused.swap(true, Ordering::AcqRel) {
            return;
        }

        debug!("{}: pausing", inner.link_id);
        inner.signal_peer(QueueItem::Pause);
    }

    fn resume(&self) {
        // ---
        let inner = &self.inner;

        if !inner.paused.swap(false, Ordering::AcqRel) {
            return;
        }

        debug!("{}: resuming", inner.link_id);
        inner.signal_peer(QueueItem::Resume);

        // Drain whatever accumulated while paused.
        inner.current_queue().wake();
    }

    fn set_pause_handler(&self, handler: Option<FlowHandler>) {
        *lock_ignore_poison(&self.inner.pause_handler) = handler;
    }

    fn set_resume_handler(&self, handler: Option<FlowHandler>) {
        *lock_ignore_poison(&self.inner.resume_handler) = handler;
    }

    async fn attach(&self, handler: HandlerPtr) -> Result<()> {
        // ---
        let inner = &self.inner;

        {
            let mut slot = inner.handler_slot.lock().await;
            if slot.is_some() {
                return Err(Error::AlreadyAttached);
            }
            *slot = Some(handler);
            inner.has_handler.store(true, Ordering::Release);
        }

        debug!("{}: handler attached", inner.link_id);

        // Anything already queued starts draining into the new handler.
        inner.current_queue().wake();
        Ok(())
    }

    async fn detach(&self) -> Result<()> {
        // ---
        let inner = &self.inner;

        // Waits for an in-flight delivery to return before taking effect.
        let detached = {
            let mut slot = inner.handler_slot.lock().await;
            let detached = slot.take();
            inner.has_handler.store(false, Ordering::Release);
            detached
        };

        if let Some(handler) = detached {
            debug!("{}: handler detached", inner.link_id);
            handler.on_detach().await;
        }

        Ok(())
    }

    fn has_handler(&self) -> bool {
        self.inner.has_handler.load(Ordering::Acquire)
    }
}

/// Create a new native transport connecting through the given connector.
///
/// The transport starts out [`ConnectionState::Disconnected`]; call
/// [`Transport::connect`] to pair it with its counterpart. All transports
/// that should be able to reach each other must share one connector.
///
/// # Errors
///
/// Currently infallible — always returns `Ok`.
pub async fn create_transport(
    config: LinkConfig,
    connector: Arc<NativeConnector>,
) -> Result<TransportPtr> {
    // ---
    debug!("{}: create native transport", config.link_id);

    let transport = NativeTransport {
        inner: Arc::new(Inner {
            link_id: config.link_id,
            identity: config.identity,
            role: config.role,
            connector,
            state: AtomicU8::new(DISCONNECTED),
            receive_queue: Mutex::new(Arc::new(MessageQueue::new())),
            handler_slot: tokio::sync::Mutex::new(None),
            has_handler: AtomicBool::new(false),
            paused: AtomicBool::new(false),
            pause_handler: Mutex::new(None),
            resume_handler: Mutex::new(None),
            endpoints: Mutex::new(None),
            pump_task: Mutex::new(None),
        }),
    };

    Ok(Arc::new(transport))
}
