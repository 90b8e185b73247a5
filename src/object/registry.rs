//! Object registry mapping ids to object state.
//!
//! Client ids are allocated sequentially starting from 2 (1 is the display)
//! and are never reused. Server ids are whatever the compositor announces in
//! `new_id` event arguments, always at or above [`SERVER_ID_START`].
//!
//! A client-created object destroyed locally stays in the map as a zombie
//! until the compositor confirms with `wl_display.delete_id`, so late events
//! addressed to it can still be decoded (their descriptors consumed) and then
//! dropped.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use super::ObjectHandle;
use crate::codec::{Message, ObjectId};
use crate::connection::Connection;
use crate::error::{Result, WaywireError};
use crate::interface::Interface;
use crate::protocol::{is_server_id, DISPLAY_ID, SERVER_ID_START};
use crate::queue::QueueInner;

/// Untyped event callback stored on an object.
pub type Handler = Box<dyn FnMut(&Connection, ObjectHandle, Message) + Send>;

/// Shared state of one protocol object.
pub struct ObjectData {
    pub(crate) id: ObjectId,
    pub(crate) interface: &'static Interface,
    pub(crate) version: u32,
    alive: AtomicBool,
    pub(crate) handler: Mutex<Option<Handler>>,
    pub(crate) queue: Weak<QueueInner>,
}

impl ObjectData {
    /// Create live object state, delivering events through `queue`.
    pub(crate) fn new(
        id: ObjectId,
        interface: &'static Interface,
        version: u32,
        queue: Weak<QueueInner>,
    ) -> Self {
        Self {
            id,
            interface,
            version,
            alive: AtomicBool::new(true),
            handler: Mutex::new(None),
            queue,
        }
    }

    /// Object id.
    #[inline]
    pub fn id(&self) -> ObjectId {
        self.id
    }

    /// Interface schema.
    #[inline]
    pub fn interface(&self) -> &'static Interface {
        self.interface
    }

    /// Negotiated version.
    #[inline]
    pub fn version(&self) -> u32 {
        self.version
    }

    /// Whether requests may still be sent and events delivered.
    #[inline]
    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }

    /// Transition to `dropped`. One-way; also releases the event handler.
    pub(crate) fn mark_dropped(&self) {
        if self.alive.swap(false, Ordering::AcqRel) {
            self.handler.lock().take();
        }
    }
}

impl fmt::Debug for ObjectData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectData")
            .field("id", &self.id)
            .field("interface", &self.interface.name)
            .field("version", &self.version)
            .field("alive", &self.is_alive())
            .finish()
    }
}

/// Map from object id to object state for one connection.
#[derive(Debug)]
pub struct ObjectRegistry {
    /// Live objects and zombies, by id.
    objects: HashMap<ObjectId, Arc<ObjectData>>,
    /// Next client id to hand out.
    next_id: ObjectId,
}

impl ObjectRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            objects: HashMap::new(),
            next_id: DISPLAY_ID + 1,
        }
    }

    /// Create a registry holding only the display object.
    pub(crate) fn with_display(display: Arc<ObjectData>) -> Self {
        let mut registry = Self::new();
        registry.objects.insert(DISPLAY_ID, display);
        registry
    }

    /// Reserve the next client-side id.
    pub fn allocate_id(&mut self) -> Result<ObjectId> {
        if self.next_id >= SERVER_ID_START {
            return Err(WaywireError::IdsExhausted);
        }
        let id = self.next_id;
        self.next_id += 1;
        Ok(id)
    }

    /// Register an object. An id already in use is a protocol error.
    pub fn insert(&mut self, object: Arc<ObjectData>) -> Result<()> {
        let id = object.id;
        if id == 0 {
            return Err(WaywireError::Protocol(
                "Cannot register the null object id".to_string(),
            ));
        }
        if self.objects.contains_key(&id) {
            return Err(WaywireError::Protocol(format!(
                "Object id {} is already in use",
                id
            )));
        }
        self.objects.insert(id, object);
        Ok(())
    }

    /// Look up a live object.
    pub fn get(&self, id: ObjectId) -> Option<Arc<ObjectData>> {
        self.objects.get(&id).filter(|o| o.is_alive()).cloned()
    }

    /// Look up an object, live or zombie.
    pub fn get_any(&self, id: ObjectId) -> Option<Arc<ObjectData>> {
        self.objects.get(&id).cloned()
    }

    /// Remove an id from the map entirely.
    pub fn remove(&mut self, id: ObjectId) -> Option<Arc<ObjectData>> {
        self.objects.remove(&id)
    }

    /// Forget a locally destroyed object.
    ///
    /// Client ids stay as zombies until `delete_id`; server ids are removed
    /// immediately.
    pub fn retire(&mut self, id: ObjectId) {
        if is_server_id(id) {
            self.objects.remove(&id);
        }
    }

    /// Number of registered ids, zombies included.
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Whether nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Mark every object dropped and empty the map.
    pub fn clear(&mut self) {
        for (_, object) in self.objects.drain() {
            object.mark_dropped();
        }
    }
}

impl Default for ObjectRegistry {
    fn default() -> Self {
        Self::new()
    }
}
