//! Connection to a compositor.
//!
//! A [`Connection`] owns the transport, the object registry, the outgoing
//! message queue and the main event queue, and always contains the display
//! object (id 1). All protocol traffic goes through it:
//!
//! 1. Requests are validated, encoded and queued ([`Connection::send_request`])
//! 2. [`Connection::flush`] writes queued requests to the socket
//! 3. [`EventQueue::dispatch`] reads, decodes and delivers events
//!
//! Transport and decode failures are fatal: the connection records the first
//! one and every later operation returns [`WaywireError::Defunct`].
//!
//! # Example
//!
//! ```ignore
//! use waywire_client::{Connection, Globals};
//!
//! #[tokio::main]
//! async fn main() -> waywire_client::Result<()> {
//!     let conn = Connection::connect_to_env().await?;
//!     let globals = Globals::init(&conn).await?;
//!     for global in globals.list() {
//!         println!("{} v{}", global.interface, global.version);
//!     }
//!     Ok(())
//! }
//! ```

mod builder;
mod inbound;

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tokio::net::UnixStream;
use tracing::{debug, error, trace};

use crate::codec::{check_signature, encode_message, ArgList, Argument, Message, ObjectId};
use crate::error::{Result, WaywireError};
use crate::interface::{Interface, MessageDesc};
use crate::object::{ObjectData, ObjectHandle, ObjectRegistry, Proxy};
use crate::protocol::DISPLAY_ID;
use crate::queue::{EventQueue, QueueInner};
use crate::transport::{Transport, UnixTransport};
use crate::wl::{WlDisplay, WL_DISPLAY_INTERFACE};
use crate::writer::{write_batch, OutgoingQueue};

pub use builder::{ConnectionBuilder, DEFAULT_DISPLAY, DEFAULT_READ_BUFFER_SIZE};
use inbound::Inbound;

/// Mutable connection state guarded by one lock.
///
/// Never held across an `.await`.
pub(crate) struct ConnectionState {
    objects: ObjectRegistry,
    outgoing: OutgoingQueue,
    /// First fatal failure, if any.
    fatal: Option<String>,
}

impl ConnectionState {
    fn check_usable(&self) -> Result<()> {
        match &self.fatal {
            Some(reason) => Err(WaywireError::Defunct(reason.clone())),
            None => Ok(()),
        }
    }
}

pub(crate) struct ConnectionInner {
    transport: Box<dyn Transport>,
    state: Mutex<ConnectionState>,
    /// Read side; held across socket reads so only one task decodes at a time.
    inbound: tokio::sync::Mutex<Inbound>,
    /// Serializes flushes so batches leave in queue order.
    flush_lock: tokio::sync::Mutex<()>,
    main_queue: Arc<QueueInner>,
    display: Arc<ObjectData>,
    next_queue_id: AtomicUsize,
}

/// Client connection to a compositor.
///
/// Cloning yields another handle to the same connection.
#[derive(Clone)]
pub struct Connection {
    inner: Arc<ConnectionInner>,
}

impl Connection {
    /// Create a new connection builder.
    pub fn builder() -> ConnectionBuilder {
        ConnectionBuilder::new()
    }

    /// Connect using `WAYLAND_DISPLAY` and `XDG_RUNTIME_DIR`.
    pub async fn connect_to_env() -> Result<Self> {
        ConnectionBuilder::new().connect().await
    }

    /// Wrap an already connected socket.
    pub fn from_stream(stream: UnixStream) -> Self {
        Self::from_transport(UnixTransport::new(stream))
    }

    /// Run the protocol over any transport.
    pub fn from_transport<T: Transport + 'static>(transport: T) -> Self {
        Self::with_transport(Box::new(transport), DEFAULT_READ_BUFFER_SIZE)
    }

    pub(crate) fn with_transport(transport: Box<dyn Transport>, read_buffer_size: usize) -> Self {
        let inner = Arc::new_cyclic(|weak: &Weak<ConnectionInner>| {
            let main_queue = Arc::new(QueueInner::new(0, weak.clone()));
            let display = Arc::new(ObjectData::new(
                DISPLAY_ID,
                &WL_DISPLAY_INTERFACE,
                WL_DISPLAY_INTERFACE.version,
                Arc::downgrade(&main_queue),
            ));

            ConnectionInner {
                transport,
                state: Mutex::new(ConnectionState {
                    objects: ObjectRegistry::with_display(display.clone()),
                    outgoing: OutgoingQueue::new(),
                    fatal: None,
                }),
                inbound: tokio::sync::Mutex::new(Inbound::new(read_buffer_size)),
                flush_lock: tokio::sync::Mutex::new(()),
                main_queue,
                display,
                next_queue_id: AtomicUsize::new(1),
            }
        });

        debug!(transport = ?inner.transport, "Connection created");
        Self { inner }
    }

    pub(crate) fn from_inner(inner: Arc<ConnectionInner>) -> Self {
        Self { inner }
    }

    pub(crate) fn downgrade(&self) -> Weak<ConnectionInner> {
        Arc::downgrade(&self.inner)
    }

    /// The display object (id 1).
    pub fn display(&self) -> WlDisplay {
        WlDisplay::from_handle(ObjectHandle::new(self.inner.display.clone(), self.downgrade()))
    }

    /// The default event queue.
    pub fn main_queue(&self) -> EventQueue {
        EventQueue::from_inner(self.inner.main_queue.clone())
    }

    /// Create an additional event queue.
    pub fn new_event_queue(&self) -> EventQueue {
        let id = self.inner.next_queue_id.fetch_add(1, Ordering::Relaxed);
        EventQueue::from_inner(Arc::new(QueueInner::new(id, self.downgrade())))
    }

    /// Dispatch the main queue. See [`EventQueue::dispatch`].
    pub async fn dispatch(&self) -> Result<usize> {
        self.main_queue().dispatch().await
    }

    /// Dispatch queued events on the main queue without reading.
    pub fn dispatch_pending(&self) -> Result<usize> {
        self.main_queue().dispatch_pending()
    }

    /// Roundtrip on the main queue. See [`EventQueue::roundtrip`].
    pub async fn roundtrip(&self) -> Result<usize> {
        self.main_queue().roundtrip().await
    }

    /// Write every queued request to the socket.
    pub async fn flush(&self) -> Result<()> {
        let _guard = self.inner.flush_lock.lock().await;

        loop {
            let batch = {
                let mut state = self.inner.state.lock();
                state.check_usable()?;
                state.outgoing.take_batch()
            };
            let Some(batch) = batch else {
                return Ok(());
            };

            trace!(
                bytes = batch.bytes.len(),
                fds = batch.fds.len(),
                messages = batch.messages,
                "Flushing batch"
            );
            write_batch(self.inner.transport.as_ref(), &batch)
                .await
                .map_err(|e| self.fail(e))?;
        }
    }

    /// Number of requests queued and not yet flushed.
    pub fn pending_requests(&self) -> usize {
        self.inner.state.lock().outgoing.len()
    }

    /// Look up a live object by id.
    pub fn object(&self, id: ObjectId) -> Option<ObjectHandle> {
        let data = self.inner.state.lock().objects.get(id)?;
        Some(ObjectHandle::new(data, self.downgrade()))
    }

    /// Allocate a client id and register an object for it without sending
    /// anything. The caller sends the creating request.
    pub fn create_object(
        &self,
        interface: &'static Interface,
        version: u32,
        queue: Option<&EventQueue>,
    ) -> Result<ObjectHandle> {
        let queue = self.queue_or_main(queue);
        let mut state = self.inner.state.lock();
        state.check_usable()?;

        let id = state.objects.allocate_id()?;
        let data = Arc::new(ObjectData::new(id, interface, version, queue));
        state.objects.insert(data.clone())?;
        Ok(ObjectHandle::new(data, self.downgrade()))
    }

    /// Mark an object dropped and forget its id.
    ///
    /// Sends nothing; use the interface's destructor request to tell the
    /// compositor.
    pub fn remove_object(&self, id: ObjectId) -> Option<ObjectHandle> {
        let data = self.inner.state.lock().objects.remove(id)?;
        data.mark_dropped();
        Some(ObjectHandle::new(data, self.downgrade()))
    }

    /// Validate, encode and queue a request.
    ///
    /// Fails with [`WaywireError::Defunct`] once the connection has failed,
    /// otherwise with a usage error if the object cannot take the request.
    /// A destructor request marks the object dropped once queued.
    pub fn send_request(
        &self,
        object: &ObjectHandle,
        opcode: u16,
        args: Vec<Argument>,
    ) -> Result<()> {
        let data = object.data();
        let mut state = self.inner.state.lock();
        state.check_usable()?;

        let desc = validate_request(data, opcode)?;
        check_signature(desc.signature, &args)?;

        trace!(
            target: "waywire::wire",
            "-> {}@{}.{}{}",
            data.interface.name,
            data.id,
            desc.name,
            ArgList(&args)
        );
        let encoded = encode_message(data.id, opcode, args)?;
        state.outgoing.push(encoded);

        if desc.is_destructor {
            data.mark_dropped();
            state.objects.retire(data.id);
        }
        Ok(())
    }

    /// Queue a request creating an object of `interface`.
    ///
    /// The id is allocated and registered before encoding, and unregistered
    /// again if encoding fails.
    pub(crate) fn send_constructor<F>(
        &self,
        parent: &ObjectHandle,
        opcode: u16,
        interface: &'static Interface,
        version: u32,
        queue: Option<&EventQueue>,
        args: F,
    ) -> Result<ObjectHandle>
    where
        F: FnOnce(ObjectId) -> Vec<Argument>,
    {
        let parent_data = parent.data();
        let queue = match queue {
            Some(queue) => Arc::downgrade(queue.inner()),
            None => parent_data.queue.clone(),
        };

        let mut state = self.inner.state.lock();
        state.check_usable()?;
        let desc = validate_request(parent_data, opcode)?;

        let id = state.objects.allocate_id()?;
        let data = Arc::new(ObjectData::new(id, interface, version, queue));
        state.objects.insert(data.clone())?;

        let args = args(id);
        trace!(
            target: "waywire::wire",
            "-> {}@{}.{}{}",
            parent_data.interface.name,
            parent_data.id,
            desc.name,
            ArgList(&args)
        );
        let encoded = check_signature(desc.signature, &args)
            .and_then(|_| encode_message(parent_data.id, opcode, args));
        match encoded {
            Ok(encoded) => state.outgoing.push(encoded),
            Err(e) => {
                state.objects.remove(id);
                data.mark_dropped();
                return Err(e);
            }
        }

        Ok(ObjectHandle::new(data, self.downgrade()))
    }

    /// Shut the socket down and drop every object.
    ///
    /// Queued requests that were not flushed are discarded.
    pub fn disconnect(&self) {
        {
            let mut state = self.inner.state.lock();
            if state.fatal.is_none() {
                state.fatal = Some("Connection closed by client".to_string());
            }
            state.objects.clear();
            state.outgoing.clear();
        }
        self.inner.main_queue.clear();

        if let Err(e) = self.inner.transport.shutdown() {
            debug!(error = %e, "Socket shutdown failed");
        }
        debug!("Disconnected");
    }

    /// First fatal failure, if the connection is no longer usable.
    pub fn last_error(&self) -> Option<String> {
        self.inner.state.lock().fatal.clone()
    }

    /// Whether the connection has failed or was disconnected.
    pub fn is_closed(&self) -> bool {
        self.last_error().is_some()
    }

    /// Record a failure. Fatal errors make the connection defunct.
    ///
    /// Returns the error for propagation.
    pub(crate) fn fail(&self, err: WaywireError) -> WaywireError {
        if err.is_fatal() {
            let mut state = self.inner.state.lock();
            if state.fatal.is_none() {
                error!(error = %err, "Connection failed");
                state.fatal = Some(err.to_string());
            }
        }
        err
    }

    fn queue_or_main(&self, queue: Option<&EventQueue>) -> Weak<QueueInner> {
        match queue {
            Some(queue) => Arc::downgrade(queue.inner()),
            None => Arc::downgrade(&self.inner.main_queue),
        }
    }

    /// Internal handling of `wl_display` events at dispatch time.
    ///
    /// `delete_id` releases the id; `error` is returned as a server error.
    pub(crate) fn handle_display_event(&self, message: &Message) -> Option<WaywireError> {
        match message.opcode {
            0 => self.server_error(&message.args),
            1 => {
                if let [Argument::Uint(id)] = message.args.as_slice() {
                    let removed = self.inner.state.lock().objects.remove(*id);
                    match removed {
                        Some(object) => object.mark_dropped(),
                        None => debug!(id, "delete_id for unknown object"),
                    }
                }
                None
            }
            _ => None,
        }
    }

    fn server_error(&self, args: &[Argument]) -> Option<WaywireError> {
        let [Argument::Object(object_id), Argument::Uint(code), Argument::Str(message)] = args
        else {
            return None;
        };
        let interface = self
            .inner
            .state
            .lock()
            .objects
            .get_any(*object_id)
            .map_or_else(|| "unknown".to_string(), |o| o.interface.name.to_string());

        Some(WaywireError::Server {
            object_id: *object_id,
            interface,
            code: *code,
            message: message.clone(),
        })
    }
}

/// Check that `opcode` may be sent on `object` right now.
fn validate_request(object: &ObjectData, opcode: u16) -> Result<&'static MessageDesc> {
    let interface = object.interface;
    if !object.is_alive() {
        return Err(WaywireError::Destroyed {
            interface: interface.name,
            id: object.id,
        });
    }

    let desc = interface
        .request(opcode)
        .ok_or(WaywireError::UnknownOpcode {
            interface: interface.name,
            opcode,
        })?;

    if desc.since > object.version {
        return Err(WaywireError::UnsupportedVersion {
            interface: interface.name,
            request: desc.name,
            current: object.version,
            required: desc.since,
        });
    }
    Ok(desc)
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("transport", &self.inner.transport)
            .field("closed", &self.is_closed())
            .finish()
    }
}
