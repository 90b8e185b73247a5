//! Outgoing message queue with batched socket writes.
//!
//! Requests are encoded immediately and queued; nothing touches the socket
//! until the connection is flushed. Flushing drains the queue in batches, each
//! batch one contiguous buffer sent in a single `sendmsg`:
//!
//! ```text
//! request ─┐
//! request ─┼─► OutgoingQueue ─► take_batch() ─► write_batch() ─► socket
//! request ─┘       (≤ 4096 bytes, ≤ 28 fds per batch)
//! ```
//!
//! Descriptors of a batch are attached to its first byte; the receiver pulls
//! them in order while decoding, so coalescing keeps them correctly paired.

use std::collections::VecDeque;
use std::os::fd::OwnedFd;

use bytes::{BufMut, Bytes, BytesMut};

use crate::codec::EncodedMessage;
use crate::error::Result;
use crate::protocol::{MAX_BYTES_OUT, MAX_FDS_OUT};
use crate::transport::Transport;

/// Limits applied when coalescing messages into one write.
#[derive(Debug, Clone, Copy)]
pub struct BatchLimits {
    /// Maximum bytes per write.
    pub max_bytes: usize,
    /// Maximum descriptors per write.
    pub max_fds: usize,
}

impl Default for BatchLimits {
    fn default() -> Self {
        Self {
            max_bytes: MAX_BYTES_OUT,
            max_fds: MAX_FDS_OUT,
        }
    }
}

/// Several encoded messages coalesced for a single write.
#[derive(Debug)]
pub struct Batch {
    /// Concatenated message bytes.
    pub bytes: Bytes,
    /// Descriptors of all messages, in order.
    pub fds: Vec<OwnedFd>,
    /// Number of messages in the batch.
    pub messages: usize,
}

/// FIFO of encoded messages waiting to be flushed.
#[derive(Debug, Default)]
pub struct OutgoingQueue {
    queue: VecDeque<EncodedMessage>,
    pending_bytes: usize,
    limits: BatchLimits,
}

impl OutgoingQueue {
    /// Create an empty queue with default limits.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty queue with custom limits.
    pub fn with_limits(limits: BatchLimits) -> Self {
        Self {
            limits,
            ..Self::default()
        }
    }

    /// Queue one message.
    pub fn push(&mut self, message: EncodedMessage) {
        self.pending_bytes += message.len();
        self.queue.push_back(message);
    }

    /// Number of queued messages.
    #[inline]
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Whether nothing is queued.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Total queued bytes.
    #[inline]
    pub fn pending_bytes(&self) -> usize {
        self.pending_bytes
    }

    /// Drop every queued message, closing their descriptors.
    pub fn clear(&mut self) {
        self.queue.clear();
        self.pending_bytes = 0;
    }

    /// Remove the next batch from the front of the queue.
    ///
    /// A batch always holds at least one message, then takes following messages
    /// while both limits hold.
    pub fn take_batch(&mut self) -> Option<Batch> {
        let first = self.queue.pop_front()?;

        let mut bytes = BytesMut::with_capacity(self.limits.max_bytes.max(first.len()));
        let mut fds = Vec::new();
        let mut messages = 0;
        let mut next = Some(first);

        while let Some(message) = next.take() {
            bytes.put_slice(&message.bytes);
            fds.extend(message.fds);
            messages += 1;

            if let Some(peek) = self.queue.front() {
                let fits_bytes = bytes.len() + peek.len() <= self.limits.max_bytes;
                let fits_fds = fds.len() + peek.fds.len() <= self.limits.max_fds;
                if fits_bytes && fits_fds {
                    next = self.queue.pop_front();
                }
            }
        }

        self.pending_bytes -= bytes.len();
        Some(Batch {
            bytes: bytes.freeze(),
            fds,
            messages,
        })
    }
}

/// Write one batch through the transport.
pub async fn write_batch(transport: &dyn Transport, batch: &Batch) -> Result<()> {
    if batch.bytes.is_empty() {
        return Ok(());
    }
    transport.send(&batch.bytes, &batch.fds).await
}
