// src/transport/native/endpoint.rs

//! Native endpoint: one side of a paired in-process link.
//!
//! An endpoint is the enqueue handle onto its owning transport's inbound
//! queue. The connector creates both endpoints of a link at pairing time;
//! each transport then holds references to both and sends by enqueueing
//! through the *peer's* endpoint.
//!
//! Endpoints are reference-counted. The underlying queue is torn down only
//! once both sides have released their references during disconnect.

use std::sync::Arc;

use crate::transport::native::queue::{MessageQueue, QueueItem};
use crate::{EndpointRole, Message, Result};

/// One side of a connected native link.
pub struct NativeEndpoint {
    // ---
    identity: String,
    role: EndpointRole,

    /// Inbound queue of the transport that owns this endpoint. Peers
    /// enqueue here; only the owner drains.
    queue: Arc<MessageQueue>,
}

impl NativeEndpoint {
    pub(crate) fn new(
        identity: impl Into<String>,
        role: EndpointRole,
        queue: Arc<MessageQueue>,
    ) -> Arc<Self> {
        // ---
        Arc::new(Self {
            identity: identity.into(),
            role,
            queue,
        })
    }

    /// Link identity this endpoint was paired under.
    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// Which side of the pair this endpoint represents.
    pub fn role(&self) -> EndpointRole {
        self.role
    }

    /// Enqueue a message for the owning transport.
    ///
    /// # Errors
    ///
    /// [`Error::QueueClosed`](crate::Error::QueueClosed) once the owning
    /// transport has disconnected.
    pub fn enqueue(&self, message: Message) -> Result<()> {
        self.queue.push(QueueItem::Message(message))
    }

    /// Enqueue a flow-control signal for the owning transport.
    pub(crate) fn signal(&self, item: QueueItem) -> Result<()> {
        self.queue.push(item)
    }

    /// Close the owning transport's inbound queue, discarding any
    /// undelivered items. Returns the discarded count.
    pub(crate) fn close_queue(&self) -> usize {
        self.queue.close()
    }
}

impl std::fmt::Debug for NativeEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NativeEndpoint")
            .field("identity", &self.identity)
            .field("role", &self.role)
            .field("queued", &self.queue.len())
            .finish()
    }
}
