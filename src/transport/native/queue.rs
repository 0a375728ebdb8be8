// src/transport/native/queue.rs

//! Message queue shared between the two sides of a native link.
//!
//! Each transport owns exactly one inbound queue per connection. The owning
//! side drains it from its delivery pump; the peer side enqueues into it
//! from `send()`. Because the two sides run on different execution contexts,
//! every queue operation is synchronized by an internal mutex.
//!
//! Flow-control signals travel through the same queue as messages, so a
//! signal issued before a message is always observed before that message is
//! delivered.

use std::collections::VecDeque;
use std::sync::Mutex;

use tokio::sync::Notify;

use crate::transport::native::lock_ignore_poison;
use crate::{Error, Message, Result};

/// One unit of work awaiting delivery to the owning transport's pump.
#[derive(Debug)]
pub(crate) enum QueueItem {
    // ---
    /// An opaque protocol message bound for the attached handler.
    Message(Message),

    /// The peer is applying backpressure.
    Pause,

    /// The peer has lifted backpressure.
    Resume,
}

struct Inner {
    items: VecDeque<QueueItem>,
    closed: bool,
}

/// Thread-safe FIFO queue of messages and flow-control signals.
///
/// The queue is unbounded; backpressure is exercised through the pause/
/// resume protocol rather than a hard capacity. Closing the queue discards
/// everything still enqueued and makes further pushes fail with
/// [`Error::QueueClosed`].
pub(crate) struct MessageQueue {
    // ---
    inner: Mutex<Inner>,
    pump: Notify,
}

impl MessageQueue {
    pub fn new() -> Self {
        // ---
        Self {
            inner: Mutex::new(Inner {
                items: VecDeque::new(),
                closed: false,
            }),
            pump: Notify::new(),
        }
    }

    /// Append an item and wake the owning pump.
    pub fn push(&self, item: QueueItem) -> Result<()> {
        // ---
        {
            let mut inner = lock_ignore_poison(&self.inner);
            if inner.closed {
                return Err(Error::QueueClosed);
            }
            inner.items.push_back(item);
        }
        self.pump.notify_one();
        Ok(())
    }

    /// Remove and return the oldest item, if any.
    pub fn pop(&self) -> Option<QueueItem> {
        // ---
        lock_ignore_poison(&self.inner).items.pop_front()
    }

    /// Put an item back at the head of the queue.
    ///
    /// Used by the pump when it pops a message but cannot deliver it (no
    /// handler attached). The pump is the queue's only consumer, so this
    /// preserves FIFO order. Dropped silently if the queue closed meanwhile.
    pub fn requeue_front(&self, item: QueueItem) {
        // ---
        let mut inner = lock_ignore_poison(&self.inner);
        if !inner.closed {
            inner.items.push_front(item);
        }
    }

    /// Close the queue, discarding everything still enqueued.
    ///
    /// Returns the number of discarded items. Wakes the pump so it can
    /// observe the closure and stop. Idempotent.
    pub fn close(&self) -> usize {
        // ---
        let dropped = {
            let mut inner = lock_ignore_poison(&self.inner);
            inner.closed = true;
            let dropped = inner.items.len();
            inner.items.clear();
            dropped
        };
        self.pump.notify_one();
        dropped
    }

    pub fn is_closed(&self) -> bool {
        lock_ignore_poison(&self.inner).closed
    }

    pub fn len(&self) -> usize {
        lock_ignore_poison(&self.inner).items.len()
    }

    /// Wake the owning pump without enqueueing anything.
    ///
    /// Used when delivery becomes possible again for reasons other than a
    /// new item: a handler attaching, or a local resume().
    pub fn wake(&self) {
        self.pump.notify_one();
    }

    /// Wait until the pump is woken.
    ///
    /// A wakeup issued while nobody is waiting is stored and completes the
    /// next call immediately, so pushes between drains are never lost.
    pub async fn pumped(&self) {
        self.pump.notified().await;
    }
}
