//! Event queues and dispatch.
//!
//! Incoming events are decoded as soon as they are read and appended to the
//! queue of the object they address. Nothing runs until a queue is
//! dispatched, at which point its events are handed to the object handlers in
//! the order the compositor sent them. Ordering across queues is unspecified.
//!
//! # Example
//!
//! ```ignore
//! let queue = conn.new_event_queue();
//! let callback = conn.display().sync_on(&queue)?;
//! callback.on_event(|_, _, _| println!("done"));
//!
//! // only the private queue is dispatched
//! queue.roundtrip().await?;
//! ```

use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tracing::debug;

use crate::codec::Message;
use crate::connection::{Connection, ConnectionInner};
use crate::error::{Result, WaywireError};
use crate::object::{ObjectData, ObjectHandle, Proxy};
use crate::protocol::DISPLAY_ID;

/// One decoded event waiting for dispatch.
pub(crate) type QueuedEvent = (Arc<ObjectData>, Message);

pub(crate) struct QueueInner {
    id: usize,
    pending: Mutex<VecDeque<QueuedEvent>>,
    conn: Weak<ConnectionInner>,
}

impl QueueInner {
    pub(crate) fn new(id: usize, conn: Weak<ConnectionInner>) -> Self {
        Self {
            id,
            pending: Mutex::new(VecDeque::new()),
            conn,
        }
    }

    /// Append an event. Never blocks on I/O.
    pub(crate) fn enqueue(&self, object: Arc<ObjectData>, message: Message) {
        self.pending.lock().push_back((object, message));
    }

    pub(crate) fn len(&self) -> usize {
        self.pending.lock().len()
    }

    pub(crate) fn clear(&self) {
        self.pending.lock().clear();
    }
}

/// FIFO of decoded events awaiting dispatch.
///
/// Cloning yields another handle to the same queue.
#[derive(Clone)]
pub struct EventQueue {
    inner: Arc<QueueInner>,
}

impl EventQueue {
    pub(crate) fn from_inner(inner: Arc<QueueInner>) -> Self {
        Self { inner }
    }

    pub(crate) fn inner(&self) -> &Arc<QueueInner> {
        &self.inner
    }

    /// Owning connection.
    pub fn connection(&self) -> Result<Connection> {
        self.inner
            .conn
            .upgrade()
            .map(Connection::from_inner)
            .ok_or(WaywireError::ConnectionClosed)
    }

    /// Number of events waiting.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Whether no events are waiting.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append an event for `object`.
    pub fn enqueue(&self, object: &ObjectHandle, message: Message) {
        self.inner.enqueue(object.data().clone(), message);
    }

    /// Read and dispatch one batch of events.
    ///
    /// If the queue is empty this flushes outgoing requests and waits until
    /// at least one event for this queue has been read. Otherwise it only
    /// picks up what the socket already holds. Returns the number of events
    /// dispatched.
    pub async fn dispatch(&self) -> Result<usize> {
        let conn = self.connection()?;

        if self.is_empty() {
            conn.flush().await?;
            while self.is_empty() {
                conn.read_events(true).await?;
            }
        } else if conn.last_error().is_none() {
            conn.read_events(false).await?;
        }

        self.dispatch_pending()
    }

    /// Dispatch already queued events without reading the socket.
    ///
    /// Events for objects dropped since they were queued are skipped. A
    /// `wl_display.error` is returned as [`WaywireError::Server`] after its
    /// handler ran; once the connection has failed every call returns an
    /// error.
    pub fn dispatch_pending(&self) -> Result<usize> {
        let conn = self.connection()?;
        let batch = std::mem::take(&mut *self.inner.pending.lock());
        // a wl_display.error decoded into this batch already failed the
        // connection; it still has to be delivered and returned as `Server`
        let failed_before = conn.last_error().is_some();
        let mut dispatched = 0;

        for (object, message) in batch {
            if !object.is_alive() {
                debug!(
                    object = %format_args!("{}@{}", object.interface.name, object.id),
                    opcode = message.opcode,
                    "Skipping event for destroyed object"
                );
                continue;
            }

            let opcode = message.opcode;
            let server_error = if object.id == DISPLAY_ID {
                conn.handle_display_event(&message)
            } else {
                None
            };

            deliver(&conn, &object, message);

            if object
                .interface
                .event(opcode)
                .map_or(false, |desc| desc.is_destructor)
            {
                object.mark_dropped();
            }
            dispatched += 1;

            if let Some(err) = server_error {
                return Err(err);
            }
            if !failed_before {
                if let Some(reason) = conn.last_error() {
                    return Err(WaywireError::Defunct(reason));
                }
            }
        }

        if let Some(reason) = conn.last_error() {
            return Err(WaywireError::Defunct(reason));
        }
        Ok(dispatched)
    }

    /// Block until the compositor has processed every request sent so far.
    ///
    /// Sends `wl_display.sync` with its callback on this queue, flushes, then
    /// dispatches this queue until the callback fires. Every event caused by
    /// earlier requests has been dispatched when this returns. Returns the
    /// number of events dispatched.
    pub async fn roundtrip(&self) -> Result<usize> {
        let conn = self.connection()?;
        let done = Arc::new(AtomicBool::new(false));

        let callback = conn.display().sync_on(self)?;
        let flag = done.clone();
        callback.on_event(move |_, _, _| flag.store(true, Ordering::Release));

        conn.flush().await?;

        let mut dispatched = 0;
        while !done.load(Ordering::Acquire) {
            dispatched += self.dispatch().await?;
        }
        Ok(dispatched)
    }
}

/// Hand one event to its object's handler.
///
/// The handler is taken out of its slot for the call so it may freely send
/// requests or replace itself. It is put back unless it was replaced or the
/// object was dropped meanwhile.
fn deliver(conn: &Connection, object: &Arc<ObjectData>, message: Message) {
    let handler = object.handler.lock().take();
    let Some(mut handler) = handler else {
        debug!(
            object = %format_args!("{}@{}", object.interface.name, object.id),
            opcode = message.opcode,
            "No handler for event"
        );
        return;
    };

    let handle = ObjectHandle::new(object.clone(), conn.downgrade());
    handler(conn, handle, message);

    if object.is_alive() {
        let mut slot = object.handler.lock();
        if slot.is_none() {
            *slot = Some(handler);
        }
    }
}

impl PartialEq for EventQueue {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for EventQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventQueue")
            .field("id", &self.inner.id)
            .field("pending", &self.len())
            .finish()
    }
}
