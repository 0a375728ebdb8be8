// src/domain/message.rs

//! Protocol message payload type.
//!
//! The transport layer carries already-encoded protocol messages between two
//! connected parties. It never inspects their contents; it is responsible
//! only for ordering and ownership.

use bytes::Bytes;

/// An opaque protocol message.
///
/// A `Message` is the unit of transfer between two connected transports. It
/// wraps an encoded application payload whose interpretation is defined
/// entirely by higher-level protocol logic.
///
/// Messages are moved, not copied: `send()` takes the message by value and
/// ownership passes to the receiving side's queue.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Message(Bytes);

impl Message {
    /// Borrow the encoded payload.
    pub fn payload(&self) -> &Bytes {
        &self.0
    }

    /// Consume the message, yielding the encoded payload.
    pub fn into_payload(self) -> Bytes {
        self.0
    }

    /// Payload length in bytes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the payload is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Bytes> for Message {
    fn from(payload: Bytes) -> Self {
        // ---
        Message(payload)
    }
}

impl From<Vec<u8>> for Message {
    fn from(payload: Vec<u8>) -> Self {
        // ---
        Message(Bytes::from(payload))
    }
}

impl From<&'static str> for Message {
    fn from(payload: &'static str) -> Self {
        // ---
        Message(Bytes::from_static(payload.as_bytes()))
    }
}

impl From<String> for Message {
    fn from(payload: String) -> Self {
        // ---
        Message(Bytes::from(payload.into_bytes()))
    }
}
