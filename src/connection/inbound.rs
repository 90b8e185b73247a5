//! Read side: socket reads, framing and event decoding.

use std::sync::Arc;

use tracing::{debug, trace, warn};

use super::Connection;
use crate::codec::{decode_args, ArgList, Argument, Message};
use crate::error::{Result, WaywireError};
use crate::interface::MessageDesc;
use crate::object::ObjectData;
use crate::protocol::{is_server_id, FrameBuffer, RawFrame, DISPLAY_ID, MAX_BYTES_OUT};

/// Buffered inbound bytes and descriptors.
pub(super) struct Inbound {
    buffer: FrameBuffer,
    scratch: Vec<u8>,
}

impl Inbound {
    pub(super) fn new(read_buffer_size: usize) -> Self {
        Self {
            buffer: FrameBuffer::new(),
            scratch: vec![0u8; read_buffer_size.max(MAX_BYTES_OUT)],
        }
    }
}

impl Connection {
    /// Read from the socket and decode every complete message onto its queue.
    ///
    /// With `wait` set, waits for at least one read; afterwards (or without
    /// `wait`) keeps reading only while the socket is readable. Returns the
    /// number of messages decoded.
    pub(crate) async fn read_events(&self, wait: bool) -> Result<usize> {
        self.inner.state.lock().check_usable()?;

        let mut inbound = self.inner.inbound.lock().await;
        let Inbound { buffer, scratch } = &mut *inbound;
        let mut decoded = 0;
        let mut wait = wait;

        loop {
            if !wait {
                let readable = self
                    .inner
                    .transport
                    .poll_readable()
                    .map_err(|e| self.fail(e))?;
                if !readable {
                    break;
                }
            }

            let mut fds = Vec::new();
            let n = self
                .inner
                .transport
                .receive(scratch, &mut fds)
                .await
                .map_err(|e| self.fail(e))?;
            if n == 0 {
                debug!("Compositor closed the connection");
                return Err(self.fail(WaywireError::ConnectionClosed));
            }

            buffer.push(&scratch[..n], fds);
            decoded += self.decode_buffered(buffer)?;
            wait = false;

            // a decoded wl_display.error stops reading; the event is still queued
            if self.is_closed() {
                break;
            }
        }

        Ok(decoded)
    }

    fn decode_buffered(&self, buffer: &mut FrameBuffer) -> Result<usize> {
        let mut count = 0;
        while let Some(frame) = buffer.next_frame().map_err(|e| self.fail(e))? {
            self.decode_frame(frame, buffer)?;
            count += 1;
        }
        Ok(count)
    }

    fn decode_frame(&self, frame: RawFrame, buffer: &mut FrameBuffer) -> Result<()> {
        let id = frame.object_id();
        let opcode = frame.opcode();

        let target = self.inner.state.lock().objects.get_any(id);
        let Some(target) = target else {
            // its signature is unknown, so descriptors it carried stay queued
            // and the descriptor stream may now be out of step
            warn!(id, opcode, "Event for unknown object, skipping");
            return Ok(());
        };

        let interface = target.interface;
        let desc = interface.event(opcode).ok_or_else(|| {
            self.fail(WaywireError::UnknownOpcode {
                interface: interface.name,
                opcode,
            })
        })?;

        let args = decode_args(desc.signature, frame.body, || buffer.take_fd())
            .map_err(|e| self.fail(e))?;

        trace!(
            target: "waywire::wire",
            "<- {}@{}.{}{}",
            interface.name,
            id,
            desc.name,
            ArgList(&args)
        );

        self.register_children(&target, desc, &args)
            .map_err(|e| self.fail(e))?;

        if !target.is_alive() {
            debug!(
                object = %format_args!("{}@{}", interface.name, id),
                event = desc.name,
                "Discarding event for destroyed object"
            );
            return Ok(());
        }

        if id == DISPLAY_ID && opcode == 0 {
            if let Some(err) = self.server_error(&args) {
                self.fail(err);
            }
        }

        let queue = target
            .queue
            .upgrade()
            .unwrap_or_else(|| self.inner.main_queue.clone());
        queue.enqueue(target, Message::new(id, opcode, args));
        Ok(())
    }

    /// Register objects announced by `new_id` arguments, and forget the sender
    /// if the event is a destructor. Runs before the event is queued.
    ///
    /// A child announced by a destroyed sender is registered already dropped,
    /// so its own events are still decoded and their descriptors consumed.
    fn register_children(
        &self,
        target: &Arc<ObjectData>,
        desc: &MessageDesc,
        args: &[Argument],
    ) -> Result<()> {
        let mut state = self.inner.state.lock();

        if let (Some(child), Some(pos)) = (desc.child_interface, desc.new_id_position()) {
            if let Some(Argument::NewId(new_id)) = args.get(pos) {
                if !is_server_id(*new_id) {
                    return Err(WaywireError::Protocol(format!(
                        "Compositor created object with client id {}",
                        new_id
                    )));
                }
                let object = ObjectData::new(*new_id, child, target.version, target.queue.clone());
                if !target.is_alive() {
                    object.mark_dropped();
                }
                state.objects.insert(Arc::new(object))?;
            }
        }

        if desc.is_destructor {
            state.objects.remove(target.id);
        }
        Ok(())
    }
}
