// src/domain/transport.rs

//! Transport domain abstractions.
//!
//! This module defines the domain-level transport interface used by router
//! and component code to exchange protocol messages. It intentionally avoids
//! any reference to concrete queueing or scheduling machinery.
//!
//! The transport layer is responsible only for carrying opaque messages
//! between two connected parties, in order, with explicit flow control.
//! Higher-level semantics such as session establishment, routing, or RPC
//! correlation are handled elsewhere.
//!
//! Concrete implementations of this interface live under `src/transport/`.

use crate::{Message, Result};
use std::sync::Arc;

/// Connection lifecycle state of a transport.
///
/// Transitions follow a strict cycle:
///
/// ```text
/// Disconnected --connect()--> Connecting --success--> Connected
/// Connected --disconnect()--> Disconnecting --teardown--> Disconnected
/// Connecting --failure-or-disconnect()--> Disconnected
/// ```
///
/// No reachable sequence of operations skips `Connecting` or
/// `Disconnecting`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    // ---
    /// No endpoint pair held; connect() is legal.
    Disconnected,

    /// A connect() is in flight, waiting for the connector to pair.
    Connecting,

    /// Endpoint pair established; send() and delivery are live.
    Connected,

    /// A disconnect() is in flight, tearing the pair down.
    Disconnecting,
}

/// Which side of a connected pair an endpoint represents.
///
/// A link always pairs exactly one `Server` endpoint with exactly one
/// `Component` endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EndpointRole {
    // ---
    /// Router-side endpoint.
    Server,

    /// Component (client) side endpoint.
    Component,
}

impl EndpointRole {
    /// The opposite side of the pair.
    pub fn peer(self) -> Self {
        // ---
        match self {
            EndpointRole::Server => EndpointRole::Component,
            EndpointRole::Component => EndpointRole::Server,
        }
    }

    /// Lowercase label used in link ids and log lines.
    pub fn as_str(self) -> &'static str {
        // ---
        match self {
            EndpointRole::Server => "server",
            EndpointRole::Component => "component",
        }
    }
}

impl std::fmt::Display for EndpointRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Flow-control callback invoked when the peer signals backpressure.
///
/// Registered via [`Transport::set_pause_handler`] /
/// [`Transport::set_resume_handler`]. Callbacks are invoked by the delivery
/// pump, never from the caller's stack, and must not block.
pub type FlowHandler = Box<dyn Fn() + Send + Sync>;

/// Consumer of delivered messages and flow-control notifications.
///
/// A handler is attached to a transport dynamically and detached without
/// tearing the connection down. The transport guarantees:
///
/// - messages arrive one at a time, in the order the peer sent them, and
///   each `on_message()` call runs to completion before the next begins
/// - no callback is invoked after `detach()` has returned
/// - `on_detach()` is the final call a handler observes, invoked exactly
///   once when it is detached (but not when the transport disconnects)
#[async_trait::async_trait]
pub trait TransportHandler: Send + Sync {
    /// Handle a single delivered message.
    ///
    /// Returning an error indicates the message could not be processed, but
    /// does not stop delivery of subsequent messages. Errors are logged and
    /// the pump continues, mirroring message-oriented middleware behavior.
    async fn on_message(&self, message: Message) -> Result<()>;

    /// The peer has requested a pause in message production.
    async fn on_pause(&self) {}

    /// The peer is ready to receive messages again.
    async fn on_resume(&self) {}

    /// The handler has been detached from its transport.
    async fn on_detach(&self) {}
}

/// Transport abstraction.
///
/// A `Transport` carries opaque protocol messages between two connected
/// parties. Implementations must ensure that:
///
/// - messages sent while connected are delivered to the peer's attached
///   handler in the exact order sent
/// - connect() / disconnect() completions are delivered asynchronously,
///   never inline from an arbitrary caller's stack
/// - a handler is never invoked through a stale reference after detach
///
/// # Reentrancy
///
/// `detach()` and `disconnect()` wait for any in-flight message delivery to
/// return, so they must not be called from within the attached handler's own
/// callbacks.
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    // ---

    /// Establish the endpoint pair for this transport's link identity.
    ///
    /// Legal only while [`ConnectionState::Disconnected`]; any other state
    /// fails fast with [`Error::InvalidState`](crate::Error::InvalidState)
    /// without contacting the connector. The returned future completes
    /// exactly once: `Ok` when the pair is established, or an error when the
    /// connector reports no peer available or a concurrent `disconnect()`
    /// cancelled the attempt.
    async fn connect(&self) -> Result<()>;

    /// Tear down the connection and release the endpoint pair.
    ///
    /// Idempotent from `Disconnected` (completed no-op success). Cancels an
    /// in-flight connect. Discards any undelivered queued messages and
    /// clears the attached handler *without* an `on_detach` notification;
    /// detach is a distinct operation from disconnect. Completes only once
    /// teardown (including pump shutdown) is finished.
    ///
    /// A second disconnect issued *concurrently* with one already in flight
    /// fails fast with an invalid-state error rather than racing teardown.
    async fn disconnect(&self) -> Result<()>;

    /// Whether the transport is currently connected.
    ///
    /// Safe to call from any thread without blocking; reflects the most
    /// recently committed state, never a snapshot mid-transition.
    fn is_connected(&self) -> bool;

    /// The most recently committed connection state.
    fn connection_state(&self) -> ConnectionState;

    /// Enqueue a message for delivery to the peer.
    ///
    /// Fire-and-forget: no delivery acknowledgment is returned. Reliability,
    /// if any, is an application-layer concern.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidState`](crate::Error::InvalidState) when not connected
    /// - [`Error::QueueClosed`](crate::Error::QueueClosed) when the peer has
    ///   disconnected and its queue is closed
    fn send(&self, message: Message) -> Result<()>;

    /// Apply backpressure: stop local delivery and signal the peer.
    ///
    /// Messages continue to accumulate in the receive queue but none are
    /// handed to the attached handler until [`resume()`](Transport::resume).
    /// The peer's delivery pump observes the signal in order with messages
    /// and invokes the peer's registered pause callback. Idempotent and
    /// non-blocking.
    fn pause(&self);

    /// Lift backpressure: resume local delivery and signal the peer.
    ///
    /// Any backlog accumulated while paused drains in FIFO order. Idempotent
    /// and non-blocking.
    fn resume(&self);

    /// Register the callback invoked when the peer pauses.
    ///
    /// Overwrites any previously registered callback; `None` clears it. May
    /// be registered in any connection state, including before `connect()`.
    fn set_pause_handler(&self, handler: Option<FlowHandler>);

    /// Register the callback invoked when the peer resumes.
    ///
    /// Same registration semantics as
    /// [`set_pause_handler`](Transport::set_pause_handler).
    fn set_resume_handler(&self, handler: Option<FlowHandler>);

    /// Attach a handler to receive delivered messages.
    ///
    /// Fails with [`Error::AlreadyAttached`](crate::Error::AlreadyAttached)
    /// if a handler is present; the existing handler is left attached. If
    /// messages are already queued and the transport is connected, draining
    /// into the new handler begins immediately. Attachment is independent of
    /// connection state, but delivery only occurs while connected.
    async fn attach(&self, handler: HandlerPtr) -> Result<()>;

    /// Detach the current handler, if any.
    ///
    /// Idempotent. Takes effect only after any in-flight single-message
    /// delivery returns; the handler is never interrupted mid-call and never
    /// invoked again afterwards, apart from its final `on_detach()`
    /// notification. Messages still queued remain queued for a future
    /// handler.
    async fn detach(&self) -> Result<()>;

    /// Whether a handler is currently attached. Non-blocking.
    fn has_handler(&self) -> bool;
}

/// Shared transport pointer.
///
/// This is an `Arc<dyn Transport>`, which means:
/// - `.clone()` is cheap (only increments a reference count)
/// - Multiple clones share the same underlying connection
/// - Used to erase concrete transport types behind a stable domain interface.
pub type TransportPtr = Arc<dyn Transport>;

/// Shared handler pointer.
///
/// The transport holds this reference only while attached; `detach()` drops
/// it so the handler's owner can safely destroy the handler afterwards.
pub type HandlerPtr = Arc<dyn TransportHandler>;
