//! Global discovery and capability-checked binding.
//!
//! [`Globals`] owns a registry object and keeps a live list of what the
//! compositor advertises. The list is updated whenever the registry's queue is
//! dispatched, so `global_remove` events arriving long after startup are
//! still observed.
//!
//! # Example
//!
//! ```ignore
//! let conn = Connection::connect_to_env().await?;
//! let globals = Globals::init(&conn).await?;
//!
//! // any version from 1 to 4, whichever is highest on offer
//! let compositor: WlCompositor = globals.bind(1..=4)?;
//! ```

use std::ops::RangeInclusive;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use tracing::debug;

use crate::connection::Connection;
use crate::error::{BindError, Result};
use crate::object::Proxy;
use crate::queue::EventQueue;
use crate::wl::{RegistryEvent, WlRegistry};

/// One advertised global.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Global {
    /// Numeric name, unique for the life of the global.
    pub name: u32,
    /// Interface name, e.g. `wl_compositor`.
    pub interface: String,
    /// Highest version the compositor supports.
    pub version: u32,
}

/// Tracked list of globals plus the registry used to bind them.
#[derive(Debug, Clone)]
pub struct Globals {
    registry: WlRegistry,
    list: Arc<Mutex<Vec<Global>>>,
}

impl Globals {
    /// Create a registry and start tracking globals.
    ///
    /// The list stays empty until the main queue is dispatched; see
    /// [`Globals::init`].
    pub fn new(conn: &Connection) -> Result<Self> {
        Ok(Self::track(conn.display().get_registry()?))
    }

    /// Like [`Globals::new`], delivering registry events through `queue`.
    pub fn new_on(conn: &Connection, queue: &EventQueue) -> Result<Self> {
        Ok(Self::track(conn.display().get_registry_on(queue)?))
    }

    /// Create a registry and roundtrip once, so the list holds every global
    /// advertised at connection time.
    pub async fn init(conn: &Connection) -> Result<Self> {
        let globals = Self::new(conn)?;
        conn.roundtrip().await?;
        debug!(count = globals.len(), "Initial globals received");
        Ok(globals)
    }

    fn track(registry: WlRegistry) -> Self {
        let list = Arc::new(Mutex::new(Vec::new()));
        let tracked = list.clone();

        registry.on_event(move |_, _, event| match event {
            RegistryEvent::Global {
                name,
                interface,
                version,
            } => {
                debug!(name, interface = %interface, version, "Global added");
                tracked.lock().push(Global {
                    name,
                    interface,
                    version,
                });
            }
            RegistryEvent::GlobalRemove { name } => {
                debug!(name, "Global removed");
                tracked.lock().retain(|g: &Global| g.name != name);
            }
        });

        Self { registry, list }
    }

    /// Snapshot of the currently advertised globals, in announcement order.
    pub fn list(&self) -> Vec<Global> {
        self.list.lock().clone()
    }

    /// Number of advertised globals.
    pub fn len(&self) -> usize {
        self.list.lock().len()
    }

    /// Whether nothing is advertised.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether a global with this interface name is advertised.
    pub fn contains(&self, interface: &str) -> bool {
        self.find(interface).is_some()
    }

    /// First advertised global with this interface name.
    pub fn find(&self, interface: &str) -> Option<Global> {
        self.list
            .lock()
            .iter()
            .find(|g| g.interface == interface)
            .cloned()
    }

    /// Registry object used for binding.
    pub fn registry(&self) -> &WlRegistry {
        &self.registry
    }

    /// Bind the global implementing `P`, negotiating a version in `version`.
    ///
    /// The negotiated version is the upper bound of the range, capped at what
    /// the compositor advertises: a `1..=4` request against a compositor
    /// offering version 3 binds version 3, not 4. Events go through the
    /// registry's queue.
    ///
    /// # Errors
    ///
    /// - [`BindError::NotPresent`] if no such global is advertised
    /// - [`BindError::UnsupportedVersion`] if it is older than the range start
    ///
    /// # Panics
    ///
    /// If the range reaches past `P::INTERFACE.version`. That is a mismatch
    /// between the caller and its interface tables, not a runtime condition.
    pub fn bind<P: Proxy>(&self, version: RangeInclusive<u32>) -> std::result::Result<P, BindError> {
        self.bind_with(None, version)
    }

    /// Like [`Globals::bind`], delivering the new object's events through `queue`.
    pub fn bind_on<P: Proxy>(
        &self,
        queue: &EventQueue,
        version: RangeInclusive<u32>,
    ) -> std::result::Result<P, BindError> {
        self.bind_with(Some(queue), version)
    }

    fn bind_with<P: Proxy>(
        &self,
        queue: Option<&EventQueue>,
        version: RangeInclusive<u32>,
    ) -> std::result::Result<P, BindError> {
        let interface = P::INTERFACE;
        assert!(
            *version.end() <= interface.version,
            "Requested {} version {} but the interface table only goes up to {}",
            interface.name,
            version.end(),
            interface.version
        );

        let global = self.find(interface.name).ok_or(BindError::NotPresent)?;
        if global.version < *version.start() {
            return Err(BindError::UnsupportedVersion {
                advertised: global.version,
                required: *version.start(),
            });
        }

        let negotiated = global.version.min(*version.end());
        debug!(
            name = global.name,
            interface = interface.name,
            version = negotiated,
            "Binding global"
        );
        Ok(self.registry.bind(global.name, negotiated, queue)?)
    }
}
