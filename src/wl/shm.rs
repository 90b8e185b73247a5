use std::os::fd::OwnedFd;

use super::interfaces::{WL_BUFFER_INTERFACE, WL_SHM_INTERFACE, WL_SHM_POOL_INTERFACE};
use super::unknown_event;
use crate::codec::{Argument, Message};
use crate::connection::Connection;
use crate::error::Result;
use crate::object::Proxy;

proxy!(
    /// Shared memory support. Sends one `format` event per supported pixel
    /// format right after binding.
    WlShm,
    WL_SHM_INTERFACE,
    ShmEvent,
    parse_shm_event
);

proxy!(
    /// Memory pool backed by a file descriptor shared with the compositor.
    WlShmPool,
    WL_SHM_POOL_INTERFACE
);

proxy!(
    /// Pixel buffer that can be attached to a surface.
    WlBuffer,
    WL_BUFFER_INTERFACE,
    BufferEvent,
    parse_buffer_event
);

impl WlShm {
    /// 32-bit ARGB, premultiplied alpha. Always supported.
    pub const FORMAT_ARGB8888: u32 = 0;
    /// 32-bit RGB with an unused byte. Always supported.
    pub const FORMAT_XRGB8888: u32 = 1;

    /// Create a pool over `size` bytes of the memory behind `fd`.
    ///
    /// The descriptor is passed to the compositor on the next flush and
    /// closed locally after it has been sent.
    pub fn create_pool(&self, fd: OwnedFd, size: i32) -> Result<WlShmPool> {
        self.handle.send_constructor(0, self.version(), None, |id| {
            vec![Argument::NewId(id), Argument::Fd(fd), Argument::Int(size)]
        })
    }

    /// Since version 2.
    pub fn release(&self) -> Result<()> {
        self.handle.send_request(1, Vec::new())
    }
}

/// Events of `wl_shm`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShmEvent {
    /// A supported pixel format.
    Format { format: u32 },
}

fn parse_shm_event(_conn: &Connection, message: Message) -> Result<ShmEvent> {
    let opcode = message.opcode;
    let mut args = message.into_args();
    match opcode {
        0 => Ok(ShmEvent::Format {
            format: args.enum_value()?,
        }),
        _ => Err(unknown_event(&WL_SHM_INTERFACE, opcode)),
    }
}

impl WlShmPool {
    /// Create a buffer from a region of the pool.
    pub fn create_buffer(
        &self,
        offset: i32,
        width: i32,
        height: i32,
        stride: i32,
        format: u32,
    ) -> Result<WlBuffer> {
        self.handle.send_constructor(0, 1, None, |id| {
            vec![
                Argument::NewId(id),
                Argument::Int(offset),
                Argument::Int(width),
                Argument::Int(height),
                Argument::Int(stride),
                Argument::Enum(format),
            ]
        })
    }

    /// Destroy the pool. Buffers created from it stay valid.
    pub fn destroy(&self) -> Result<()> {
        self.handle.send_request(1, Vec::new())
    }

    /// Grow the pool. Shrinking is not allowed.
    pub fn resize(&self, size: i32) -> Result<()> {
        self.handle.send_request(2, vec![Argument::Int(size)])
    }
}

/// Events of `wl_buffer`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferEvent {
    /// The compositor no longer reads from the buffer.
    Release,
}

fn parse_buffer_event(_conn: &Connection, message: Message) -> Result<BufferEvent> {
    match message.opcode {
        0 => Ok(BufferEvent::Release),
        opcode => Err(unknown_event(&WL_BUFFER_INTERFACE, opcode)),
    }
}

impl WlBuffer {
    /// Destroy the buffer.
    pub fn destroy(&self) -> Result<()> {
        self.handle.send_request(0, Vec::new())
    }
}
