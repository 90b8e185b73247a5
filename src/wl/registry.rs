use super::interfaces::WL_REGISTRY_INTERFACE;
use super::unknown_event;
use crate::codec::{Argument, Message};
use crate::connection::Connection;
use crate::error::Result;
use crate::object::Proxy;
use crate::queue::EventQueue;

proxy!(
    /// Global registry. Announces every global once on creation, then
    /// additions and removals as they happen.
    WlRegistry,
    WL_REGISTRY_INTERFACE,
    RegistryEvent,
    parse_event
);

/// Events of `wl_registry`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryEvent {
    /// A global is available.
    Global {
        name: u32,
        interface: String,
        version: u32,
    },
    /// A global went away. Objects already bound to it keep working.
    GlobalRemove { name: u32 },
}

fn parse_event(_conn: &Connection, message: Message) -> Result<RegistryEvent> {
    let opcode = message.opcode;
    let mut args = message.into_args();
    match opcode {
        0 => Ok(RegistryEvent::Global {
            name: args.uint()?,
            interface: args.string()?,
            version: args.uint()?,
        }),
        1 => Ok(RegistryEvent::GlobalRemove { name: args.uint()? }),
        _ => Err(unknown_event(&WL_REGISTRY_INTERFACE, opcode)),
    }
}

impl WlRegistry {
    /// Bind global `name` as a `P` at exactly `version`.
    ///
    /// No range checks happen here; [`Globals::bind`](crate::Globals::bind)
    /// negotiates the version against what was advertised. Events of the new
    /// object go through `queue`, or the registry's queue.
    pub fn bind<P: Proxy>(&self, name: u32, version: u32, queue: Option<&EventQueue>) -> Result<P> {
        self.handle.send_constructor(0, version, queue, |id| {
            vec![
                Argument::Uint(name),
                Argument::Str(P::INTERFACE.name.to_string()),
                Argument::Uint(version),
                Argument::NewId(id),
            ]
        })
    }
}
