//! Core protocol objects.
//!
//! Interface tables and typed proxies for the objects every session needs to
//! bootstrap (`wl_display`, `wl_registry`, `wl_callback`) plus the handful of
//! core interfaces most clients bind first. Each proxy is a thin wrapper over
//! an [`ObjectHandle`](crate::object::ObjectHandle): request methods encode
//! their arguments, and events are parsed into one enum per interface.

/// Define a proxy struct wrapping an `ObjectHandle` and implement `Proxy` for it.
///
/// Without an event type the interface has no events and `Event` is
/// uninhabited.
macro_rules! proxy {
    (@struct $(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, PartialEq, Eq)]
        pub struct $name {
            handle: $crate::object::ObjectHandle,
        }

        impl ::std::fmt::Debug for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                ::std::fmt::Debug::fmt(&self.handle, f)
            }
        }
    };

    ($(#[$meta:meta])* $name:ident, $iface:ident, $event:ty, $parse:path) => {
        proxy!(@struct $(#[$meta])* $name);

        impl $crate::object::Proxy for $name {
            type Event = $event;
            const INTERFACE: &'static $crate::interface::Interface = &$iface;

            fn from_handle(handle: $crate::object::ObjectHandle) -> Self {
                Self { handle }
            }

            fn handle(&self) -> &$crate::object::ObjectHandle {
                &self.handle
            }

            fn parse_event(
                conn: &$crate::connection::Connection,
                message: $crate::codec::Message,
            ) -> $crate::error::Result<$event> {
                $parse(conn, message)
            }
        }
    };

    ($(#[$meta:meta])* $name:ident, $iface:ident) => {
        proxy!(@struct $(#[$meta])* $name);

        impl $crate::object::Proxy for $name {
            type Event = ::std::convert::Infallible;
            const INTERFACE: &'static $crate::interface::Interface = &$iface;

            fn from_handle(handle: $crate::object::ObjectHandle) -> Self {
                Self { handle }
            }

            fn handle(&self) -> &$crate::object::ObjectHandle {
                &self.handle
            }

            fn parse_event(
                _conn: &$crate::connection::Connection,
                message: $crate::codec::Message,
            ) -> $crate::error::Result<Self::Event> {
                Err($crate::wl::unknown_event(&$iface, message.opcode))
            }
        }
    };
}

mod callback;
mod compositor;
mod display;
mod interfaces;
mod registry;
mod shm;

pub use callback::{CallbackEvent, WlCallback};
pub use compositor::{SurfaceEvent, WlCompositor, WlRegion, WlSurface};
pub use display::{DisplayEvent, WlDisplay};
pub use interfaces::{
    WL_BUFFER_INTERFACE, WL_CALLBACK_INTERFACE, WL_COMPOSITOR_INTERFACE, WL_DISPLAY_INTERFACE,
    WL_REGION_INTERFACE, WL_REGISTRY_INTERFACE, WL_SHM_INTERFACE, WL_SHM_POOL_INTERFACE,
    WL_SURFACE_INTERFACE,
};
pub use registry::{RegistryEvent, WlRegistry};
pub use shm::{BufferEvent, ShmEvent, WlBuffer, WlShm, WlShmPool};

use crate::codec::Argument;
use crate::error::WaywireError;
use crate::interface::Interface;
use crate::object::Proxy;

/// Error for an event opcode a parser does not know.
pub(crate) fn unknown_event(interface: &'static Interface, opcode: u16) -> WaywireError {
    WaywireError::UnknownOpcode {
        interface: interface.name,
        opcode,
    }
}

/// Encode a nullable object argument.
fn nullable<P: Proxy>(object: Option<&P>) -> Argument {
    Argument::Object(object.map_or(0, |p| p.id()))
}
