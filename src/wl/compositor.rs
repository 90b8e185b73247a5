use super::interfaces::{WL_COMPOSITOR_INTERFACE, WL_REGION_INTERFACE, WL_SURFACE_INTERFACE};
use super::{nullable, unknown_event, WlBuffer, WlCallback};
use crate::codec::{Argument, Message, ObjectId};
use crate::connection::Connection;
use crate::error::Result;
use crate::object::Proxy;

proxy!(
    /// Surface and region factory.
    WlCompositor,
    WL_COMPOSITOR_INTERFACE
);

proxy!(
    /// Rectangular area that can display content.
    WlSurface,
    WL_SURFACE_INTERFACE,
    SurfaceEvent,
    parse_surface_event
);

proxy!(WlRegion, WL_REGION_INTERFACE);

impl WlCompositor {
    pub fn create_surface(&self) -> Result<WlSurface> {
        self.handle
            .send_constructor(0, self.version(), None, |id| vec![Argument::NewId(id)])
    }

    pub fn create_region(&self) -> Result<WlRegion> {
        self.handle
            .send_constructor(1, self.version(), None, |id| vec![Argument::NewId(id)])
    }
}

/// Events of `wl_surface`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceEvent {
    /// The surface became visible on an output.
    Enter { output: ObjectId },
    /// The surface left an output.
    Leave { output: ObjectId },
    PreferredBufferScale { factor: i32 },
    PreferredBufferTransform { transform: u32 },
}

fn parse_surface_event(_conn: &Connection, message: Message) -> Result<SurfaceEvent> {
    let opcode = message.opcode;
    let mut args = message.into_args();
    match opcode {
        0 => Ok(SurfaceEvent::Enter {
            output: args.object()?,
        }),
        1 => Ok(SurfaceEvent::Leave {
            output: args.object()?,
        }),
        2 => Ok(SurfaceEvent::PreferredBufferScale {
            factor: args.int()?,
        }),
        3 => Ok(SurfaceEvent::PreferredBufferTransform {
            transform: args.enum_value()?,
        }),
        _ => Err(unknown_event(&WL_SURFACE_INTERFACE, opcode)),
    }
}

impl WlSurface {
    /// Destroy the surface. The proxy is dropped once queued.
    pub fn destroy(&self) -> Result<()> {
        self.handle.send_request(0, Vec::new())
    }

    /// Set the pending buffer. `None` unmaps the surface on commit.
    pub fn attach(&self, buffer: Option<&WlBuffer>, x: i32, y: i32) -> Result<()> {
        self.handle.send_request(
            1,
            vec![nullable(buffer), Argument::Int(x), Argument::Int(y)],
        )
    }

    pub fn damage(&self, x: i32, y: i32, width: i32, height: i32) -> Result<()> {
        self.handle.send_request(2, rect(x, y, width, height))
    }

    /// Request a callback for when it is a good time to draw the next frame.
    pub fn frame(&self) -> Result<WlCallback> {
        self.handle
            .send_constructor(3, 1, None, |id| vec![Argument::NewId(id)])
    }

    pub fn set_opaque_region(&self, region: Option<&WlRegion>) -> Result<()> {
        self.handle.send_request(4, vec![nullable(region)])
    }

    pub fn set_input_region(&self, region: Option<&WlRegion>) -> Result<()> {
        self.handle.send_request(5, vec![nullable(region)])
    }

    /// Apply all pending state atomically.
    pub fn commit(&self) -> Result<()> {
        self.handle.send_request(6, Vec::new())
    }

    /// Since version 2.
    pub fn set_buffer_transform(&self, transform: i32) -> Result<()> {
        self.handle.send_request(7, vec![Argument::Int(transform)])
    }

    /// Since version 3.
    pub fn set_buffer_scale(&self, scale: i32) -> Result<()> {
        self.handle.send_request(8, vec![Argument::Int(scale)])
    }

    /// Since version 4.
    pub fn damage_buffer(&self, x: i32, y: i32, width: i32, height: i32) -> Result<()> {
        self.handle.send_request(9, rect(x, y, width, height))
    }

    /// Since version 5.
    pub fn offset(&self, x: i32, y: i32) -> Result<()> {
        self.handle
            .send_request(10, vec![Argument::Int(x), Argument::Int(y)])
    }
}

impl WlRegion {
    /// Destroy the region.
    pub fn destroy(&self) -> Result<()> {
        self.handle.send_request(0, Vec::new())
    }

    pub fn add(&self, x: i32, y: i32, width: i32, height: i32) -> Result<()> {
        self.handle.send_request(1, rect(x, y, width, height))
    }

    pub fn subtract(&self, x: i32, y: i32, width: i32, height: i32) -> Result<()> {
        self.handle.send_request(2, rect(x, y, width, height))
    }
}

fn rect(x: i32, y: i32, width: i32, height: i32) -> Vec<Argument> {
    vec![
        Argument::Int(x),
        Argument::Int(y),
        Argument::Int(width),
        Argument::Int(height),
    ]
}
