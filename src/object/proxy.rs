//! Object handles and the typed proxy contract.

use std::fmt;
use std::sync::{Arc, Weak};

use super::ObjectData;
use crate::codec::{Argument, Message, ObjectId};
use crate::connection::{Connection, ConnectionInner};
use crate::error::{Result, WaywireError};
use crate::interface::Interface;
use crate::queue::EventQueue;

/// Untyped reference to one protocol object.
///
/// Cheap to clone. Holds the object state and a weak reference to the
/// connection, so a handle never keeps a connection alive.
#[derive(Clone)]
pub struct ObjectHandle {
    data: Arc<ObjectData>,
    conn: Weak<ConnectionInner>,
}

impl ObjectHandle {
    pub(crate) fn new(data: Arc<ObjectData>, conn: Weak<ConnectionInner>) -> Self {
        Self { data, conn }
    }

    pub(crate) fn data(&self) -> &Arc<ObjectData> {
        &self.data
    }

    /// Object id.
    #[inline]
    pub fn id(&self) -> ObjectId {
        self.data.id
    }

    /// Interface schema.
    #[inline]
    pub fn interface(&self) -> &'static Interface {
        self.data.interface
    }

    /// Negotiated version.
    #[inline]
    pub fn version(&self) -> u32 {
        self.data.version
    }

    /// Whether the object is still `alive`.
    #[inline]
    pub fn is_alive(&self) -> bool {
        self.data.is_alive()
    }

    /// Owning connection, if it still exists.
    pub fn connection(&self) -> Option<Connection> {
        self.conn.upgrade().map(Connection::from_inner)
    }

    /// Queue this object's events are delivered through.
    pub fn queue(&self) -> Option<EventQueue> {
        self.data.queue.upgrade().map(EventQueue::from_inner)
    }

    fn require_connection(&self) -> Result<Connection> {
        self.connection().ok_or(WaywireError::ConnectionClosed)
    }

    /// Queue a request on this object.
    ///
    /// Fails without touching the wire if the object is dropped or the request
    /// is newer than the object's version.
    pub fn send_request(&self, opcode: u16, args: Vec<Argument>) -> Result<()> {
        self.require_connection()?.send_request(self, opcode, args)
    }

    /// Queue a request that creates a new object of `P`'s interface.
    ///
    /// The new id is registered before the request is encoded. `queue` defaults
    /// to this object's queue.
    pub fn send_constructor<P, F>(
        &self,
        opcode: u16,
        version: u32,
        queue: Option<&EventQueue>,
        args: F,
    ) -> Result<P>
    where
        P: Proxy,
        F: FnOnce(ObjectId) -> Vec<Argument>,
    {
        let conn = self.require_connection()?;
        let handle = conn.send_constructor(self, opcode, P::INTERFACE, version, queue, args)?;
        Ok(P::from_handle(handle))
    }

    /// Install (or replace) the untyped event handler.
    pub fn set_handler<F>(&self, handler: F)
    where
        F: FnMut(&Connection, ObjectHandle, Message) + Send + 'static,
    {
        if self.is_alive() {
            *self.data.handler.lock() = Some(Box::new(handler));
        }
    }

    /// Remove the event handler.
    pub fn clear_handler(&self) {
        self.data.handler.lock().take();
    }
}

impl PartialEq for ObjectHandle {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.data, &other.data)
    }
}

impl Eq for ObjectHandle {}

impl fmt::Debug for ObjectHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.data.interface.name, self.data.id)
    }
}

/// Contract implemented by every typed proxy.
///
/// A proxy is a thin typed wrapper around an [`ObjectHandle`]; its request
/// methods encode arguments and call [`ObjectHandle::send_request`], and
/// [`Proxy::parse_event`] turns an untyped [`Message`] into `Self::Event`.
pub trait Proxy: Clone + Send + Sync + 'static {
    /// Typed event enum.
    type Event: Send;

    /// Interface schema.
    const INTERFACE: &'static Interface;

    /// Wrap a handle. The handle's interface must be `Self::INTERFACE`.
    fn from_handle(handle: ObjectHandle) -> Self;

    /// Underlying handle.
    fn handle(&self) -> &ObjectHandle;

    /// Parse an event addressed to this interface.
    fn parse_event(conn: &Connection, message: Message) -> Result<Self::Event>;

    /// Object id.
    fn id(&self) -> ObjectId {
        self.handle().id()
    }

    /// Negotiated version.
    fn version(&self) -> u32 {
        self.handle().version()
    }

    /// Whether the proxy is still `alive`.
    fn is_alive(&self) -> bool {
        self.handle().is_alive()
    }

    /// Install a typed event callback, replacing any previous one.
    ///
    /// An event that fails to parse is a protocol error and makes the
    /// connection unusable.
    fn on_event<F>(&self, mut callback: F)
    where
        F: FnMut(&Connection, &Self, Self::Event) + Send + 'static,
    {
        self.handle().set_handler(move |conn, handle, message| {
            let proxy = Self::from_handle(handle);
            match Self::parse_event(conn, message) {
                Ok(event) => callback(conn, &proxy, event),
                Err(e) => {
                    conn.fail(e);
                }
            }
        });
    }
}

/// Look up a registered object and wrap it as `P`.
///
/// Used by event parsers to resolve `object` and `new_id` arguments. Fails if
/// the id is unknown or belongs to a different interface.
pub fn resolve<P: Proxy>(conn: &Connection, id: ObjectId) -> Result<P> {
    let handle = conn
        .object(id)
        .ok_or_else(|| WaywireError::Protocol(format!("Unknown object id {}", id)))?;
    if handle.interface() != P::INTERFACE {
        return Err(WaywireError::Protocol(format!(
            "Object {:?} is not a {}",
            handle,
            P::INTERFACE.name
        )));
    }
    Ok(P::from_handle(handle))
}
