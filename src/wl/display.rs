use super::interfaces::WL_DISPLAY_INTERFACE;
use super::{unknown_event, WlCallback, WlRegistry};
use crate::codec::{Argument, Message, ObjectId};
use crate::connection::Connection;
use crate::error::Result;
use crate::queue::EventQueue;

proxy!(
    /// The display object, id 1, present for the whole life of a connection.
    ///
    /// Its events are also handled by the connection itself: `error` makes the
    /// connection defunct and `delete_id` releases client ids.
    WlDisplay,
    WL_DISPLAY_INTERFACE,
    DisplayEvent,
    parse_event
);

/// Events of `wl_display`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisplayEvent {
    /// Fatal error. The connection is unusable afterwards.
    Error {
        object_id: ObjectId,
        code: u32,
        message: String,
    },
    /// The compositor has released a client id.
    DeleteId { id: u32 },
}

fn parse_event(_conn: &Connection, message: Message) -> Result<DisplayEvent> {
    let opcode = message.opcode;
    let mut args = message.into_args();
    match opcode {
        0 => Ok(DisplayEvent::Error {
            object_id: args.object()?,
            code: args.uint()?,
            message: args.string()?,
        }),
        1 => Ok(DisplayEvent::DeleteId { id: args.uint()? }),
        _ => Err(unknown_event(&WL_DISPLAY_INTERFACE, opcode)),
    }
}

impl WlDisplay {
    /// Request a callback that fires once every earlier request is processed.
    pub fn sync(&self) -> Result<WlCallback> {
        self.handle
            .send_constructor(0, 1, None, |id| vec![Argument::NewId(id)])
    }

    /// Like [`WlDisplay::sync`], delivering the callback through `queue`.
    pub fn sync_on(&self, queue: &EventQueue) -> Result<WlCallback> {
        self.handle
            .send_constructor(0, 1, Some(queue), |id| vec![Argument::NewId(id)])
    }

    /// Create a registry object. It announces every global right away.
    pub fn get_registry(&self) -> Result<WlRegistry> {
        self.handle
            .send_constructor(1, 1, None, |id| vec![Argument::NewId(id)])
    }

    /// Like [`WlDisplay::get_registry`], delivering registry events through `queue`.
    pub fn get_registry_on(&self, queue: &EventQueue) -> Result<WlRegistry> {
        self.handle
            .send_constructor(1, 1, Some(queue), |id| vec![Argument::NewId(id)])
    }
}
