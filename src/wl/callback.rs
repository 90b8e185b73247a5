use super::interfaces::WL_CALLBACK_INTERFACE;
use super::unknown_event;
use crate::codec::Message;
use crate::connection::Connection;
use crate::error::Result;

proxy!(
    /// One-shot completion callback. Dropped after `done` is delivered.
    WlCallback,
    WL_CALLBACK_INTERFACE,
    CallbackEvent,
    parse_event
);

/// Events of `wl_callback`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackEvent {
    /// The operation finished. `callback_data` is request-specific.
    Done { callback_data: u32 },
}

fn parse_event(_conn: &Connection, message: Message) -> Result<CallbackEvent> {
    let opcode = message.opcode;
    let mut args = message.into_args();
    match opcode {
        0 => Ok(CallbackEvent::Done {
            callback_data: args.uint()?,
        }),
        _ => Err(unknown_event(&WL_CALLBACK_INTERFACE, opcode)),
    }
}
