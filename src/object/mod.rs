//! Object module - id registry, handles and typed proxies.
//!
//! Lifecycle of every object is `alive → dropped`, one way:
//! - created `alive` when the client allocates an id for a constructor request,
//!   or when an incoming event carries a `new_id`
//! - `dropped` after a destructor request is queued, a destructor event is
//!   delivered, the compositor confirms `delete_id`, or the connection closes
//!
//! Requests through a dropped object fail with
//! [`WaywireError::Destroyed`](crate::WaywireError::Destroyed) and never reach
//! the socket.

mod guard;
mod proxy;
mod registry;

pub use guard::DropGuard;
pub use proxy::{resolve, ObjectHandle, Proxy};
pub use registry::{Handler, ObjectData, ObjectRegistry};
