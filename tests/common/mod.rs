//! Scripted compositor for integration tests.
//!
//! Runs on the server end of a real socket pair and speaks the wire format
//! with the crate's own codec, so descriptor passing goes through the kernel.

#![allow(dead_code)]

use std::os::fd::OwnedFd;

use waywire_client::codec::{decode_args, encode_message, ArgKind, Argument, ObjectId};
use waywire_client::protocol::{FrameBuffer, RawFrame, DISPLAY_ID};
use waywire_client::transport::{Transport, UnixTransport};
use waywire_client::Connection;

/// First id a compositor hands out.
pub const SERVER_ID: ObjectId = 0xFF00_0000;

/// One decoded request.
#[derive(Debug)]
pub struct Request {
    pub object_id: ObjectId,
    pub opcode: u16,
    pub args: Vec<Argument>,
}

impl Request {
    /// The `new_id` argument, panicking if there is none.
    pub fn new_id(&self) -> ObjectId {
        self.args
            .iter()
            .find_map(|a| match a {
                Argument::NewId(id) => Some(*id),
                _ => None,
            })
            .expect("request has no new_id")
    }
}

pub struct MockCompositor {
    transport: UnixTransport,
    buffer: FrameBuffer,
    scratch: Vec<u8>,
}

/// Connection plus the compositor on the other end.
pub fn connect() -> (Connection, MockCompositor) {
    let (client, server) = UnixTransport::pair().unwrap();
    (Connection::from_transport(client), MockCompositor::new(server))
}

impl MockCompositor {
    pub fn new(transport: UnixTransport) -> Self {
        Self {
            transport,
            buffer: FrameBuffer::new(),
            scratch: vec![0u8; 8192],
        }
    }

    /// Next raw frame, reading from the socket as needed.
    pub async fn frame(&mut self) -> RawFrame {
        loop {
            if let Some(frame) = self.buffer.next_frame().unwrap() {
                return frame;
            }
            let mut fds = Vec::new();
            let n = self
                .transport
                .receive(&mut self.scratch, &mut fds)
                .await
                .unwrap();
            assert!(n > 0, "client closed the socket");
            self.buffer.push(&self.scratch[..n], fds);
        }
    }

    /// Next request, decoded with `signature`.
    pub async fn request(&mut self, signature: &[ArgKind]) -> Request {
        let frame = self.frame().await;
        let object_id = frame.object_id();
        let opcode = frame.opcode();
        let buffer = &mut self.buffer;
        let args = decode_args(signature, frame.body, || buffer.take_fd()).unwrap();
        Request {
            object_id,
            opcode,
            args,
        }
    }

    /// Expect a request on `object_id` with `opcode`.
    pub async fn expect(&mut self, object_id: ObjectId, opcode: u16, signature: &[ArgKind]) -> Request {
        let request = self.request(signature).await;
        assert_eq!(
            (request.object_id, request.opcode),
            (object_id, opcode),
            "unexpected request {:?}",
            request
        );
        request
    }

    /// Expect `wl_display.get_registry`, returning the registry id.
    pub async fn expect_get_registry(&mut self) -> ObjectId {
        self.expect(DISPLAY_ID, 1, &[ArgKind::NewId]).await.new_id()
    }

    /// Expect `wl_display.sync`, returning the callback id.
    pub async fn expect_sync(&mut self) -> ObjectId {
        self.expect(DISPLAY_ID, 0, &[ArgKind::NewId]).await.new_id()
    }

    /// Expect `wl_registry.bind`.
    pub async fn expect_bind(&mut self, registry: ObjectId) -> Request {
        self.expect(
            registry,
            0,
            &[ArgKind::Uint, ArgKind::String, ArgKind::Uint, ArgKind::NewId],
        )
        .await
    }

    /// Send one event.
    pub async fn send(&self, object_id: ObjectId, opcode: u16, args: Vec<Argument>) {
        let message = encode_message(object_id, opcode, args).unwrap();
        self.transport.send(&message.bytes, &message.fds).await.unwrap();
    }

    /// Send several events in a single write.
    pub async fn send_batch(&self, events: Vec<(ObjectId, u16, Vec<Argument>)>) {
        let mut bytes = Vec::new();
        let mut fds = Vec::new();
        for (object_id, opcode, args) in events {
            let message = encode_message(object_id, opcode, args).unwrap();
            bytes.extend_from_slice(&message.bytes);
            fds.extend(message.fds);
        }
        self.transport.send(&bytes, &fds).await.unwrap();
    }

    /// Send raw bytes.
    pub async fn send_raw(&self, bytes: &[u8], fds: &[OwnedFd]) {
        self.transport.send(bytes, fds).await.unwrap();
    }

    /// `wl_registry.global`.
    pub async fn global(&self, registry: ObjectId, name: u32, interface: &str, version: u32) {
        self.send(
            registry,
            0,
            vec![
                Argument::Uint(name),
                Argument::Str(interface.into()),
                Argument::Uint(version),
            ],
        )
        .await;
    }

    /// `wl_registry.global_remove`.
    pub async fn global_remove(&self, registry: ObjectId, name: u32) {
        self.send(registry, 1, vec![Argument::Uint(name)]).await;
    }

    /// Fire a callback the way a compositor does: `done`, then `delete_id`.
    pub async fn done(&self, callback: ObjectId, data: u32) {
        self.send(callback, 0, vec![Argument::Uint(data)]).await;
        self.delete_id(callback).await;
    }

    /// `wl_display.delete_id`.
    pub async fn delete_id(&self, id: ObjectId) {
        self.send(DISPLAY_ID, 1, vec![Argument::Uint(id)]).await;
    }

    /// `wl_display.error`.
    pub async fn error(&self, object_id: ObjectId, code: u32, message: &str) {
        self.send(
            DISPLAY_ID,
            0,
            vec![
                Argument::Object(object_id),
                Argument::Uint(code),
                Argument::Str(message.into()),
            ],
        )
        .await;
    }

    /// Answer the initial registry roundtrip with `globals`.
    pub async fn advertise(&mut self, globals: &[(u32, &str, u32)]) -> ObjectId {
        let registry = self.expect_get_registry().await;
        let callback = self.expect_sync().await;
        for (name, interface, version) in globals {
            self.global(registry, *name, interface, *version).await;
        }
        self.done(callback, 0).await;
        registry
    }

    /// Whether the client has sent anything not yet read.
    pub fn has_pending(&self) -> bool {
        !self.buffer.is_empty() || self.transport.poll_readable().unwrap()
    }

    /// Close the compositor end.
    pub fn close(self) {
        drop(self);
    }
}
