//! Static interface schemas.
//!
//! An [`Interface`] is the data a protocol description compiles down to: a name,
//! a maximum version, and the request and event tables, each entry listing its
//! argument kinds. The connection consults these tables to encode requests,
//! decode events and register objects created by `new_id` arguments.
//!
//! # Example
//!
//! ```
//! use waywire_client::codec::ArgKind;
//! use waywire_client::interface::{Interface, MessageDesc};
//!
//! static PING: Interface = Interface {
//!     name: "test_ping",
//!     version: 1,
//!     requests: &[MessageDesc::new("ping", &[ArgKind::Uint])],
//!     events: &[MessageDesc::new("pong", &[ArgKind::Uint])],
//! };
//!
//! assert_eq!(PING.request(0).unwrap().name, "ping");
//! assert!(PING.event(1).is_none());
//! ```

use std::fmt;

use crate::codec::ArgKind;

/// Description of one interface.
pub struct Interface {
    /// Protocol name, e.g. `wl_compositor`.
    pub name: &'static str,
    /// Highest version this schema describes.
    pub version: u32,
    /// Requests, indexed by opcode.
    pub requests: &'static [MessageDesc],
    /// Events, indexed by opcode.
    pub events: &'static [MessageDesc],
}

impl Interface {
    /// Look up a request by opcode.
    #[inline]
    pub fn request(&self, opcode: u16) -> Option<&'static MessageDesc> {
        self.requests.get(usize::from(opcode))
    }

    /// Look up an event by opcode.
    #[inline]
    pub fn event(&self, opcode: u16) -> Option<&'static MessageDesc> {
        self.events.get(usize::from(opcode))
    }

    /// Opcode of the first argument-less destructor request, if any.
    pub fn destructor(&self) -> Option<u16> {
        self.requests
            .iter()
            .position(|r| r.is_destructor && r.signature.is_empty())
            .map(|i| i as u16)
    }
}

impl fmt::Debug for Interface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} v{}", self.name, self.version)
    }
}

impl PartialEq for Interface {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self, other) || self.name == other.name
    }
}

/// Description of one request or event.
#[derive(Debug)]
pub struct MessageDesc {
    /// Message name.
    pub name: &'static str,
    /// Version the message was introduced in.
    pub since: u32,
    /// Whether the message destroys the object it is sent on (or by).
    pub is_destructor: bool,
    /// Argument kinds, in wire order.
    pub signature: &'static [ArgKind],
    /// Interface of the object created by a typed `new_id` argument.
    pub child_interface: Option<&'static Interface>,
}

impl MessageDesc {
    /// A plain version-1 message with no child interface.
    pub const fn new(name: &'static str, signature: &'static [ArgKind]) -> Self {
        Self {
            name,
            since: 1,
            is_destructor: false,
            signature,
            child_interface: None,
        }
    }

    /// Set the version the message was introduced in.
    pub const fn since(mut self, version: u32) -> Self {
        self.since = version;
        self
    }

    /// Mark the message as a destructor.
    pub const fn destructor(mut self) -> Self {
        self.is_destructor = true;
        self
    }

    /// Set the interface of the object created by the `new_id` argument.
    pub const fn child(mut self, interface: &'static Interface) -> Self {
        self.child_interface = Some(interface);
        self
    }

    /// Index of the `new_id` argument, if the message creates an object.
    pub fn new_id_position(&self) -> Option<usize> {
        self.signature.iter().position(|k| *k == ArgKind::NewId)
    }
}
