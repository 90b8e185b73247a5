//! Raw message framing.
//!
//! A [`RawFrame`] is one complete message as it sits on the wire: the decoded
//! header plus the undecoded argument payload. Turning the payload into typed
//! arguments needs the target interface schema and lives in [`crate::codec`].
//!
//! # Example
//!
//! ```
//! use waywire_client::protocol::{build_frame, MessageHeader, RawFrame};
//! use bytes::Bytes;
//!
//! let body = 2u32.to_ne_bytes();
//! let bytes = build_frame(1, 1, &body).unwrap();
//! let header = MessageHeader::decode(&bytes).unwrap();
//! let frame = RawFrame::new(header, Bytes::copy_from_slice(&bytes[8..]));
//!
//! assert_eq!(frame.object_id(), 1);
//! assert_eq!(frame.body(), &body);
//! ```

use bytes::Bytes;

use super::wire_format::{MessageHeader, HEADER_SIZE, MAX_MESSAGE_SIZE};
use crate::codec::ObjectId;
use crate::error::{Result, WaywireError};

/// A complete message: header and argument payload.
#[derive(Debug, Clone)]
pub struct RawFrame {
    /// Decoded header.
    pub header: MessageHeader,
    /// Argument payload (zero-copy via `bytes::Bytes`).
    pub body: Bytes,
}

impl RawFrame {
    /// Create a new frame from header and body.
    pub fn new(header: MessageHeader, body: Bytes) -> Self {
        Self { header, body }
    }

    /// Get a reference to the body bytes.
    #[inline]
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Sender (events) or target (requests) object.
    #[inline]
    pub fn object_id(&self) -> ObjectId {
        self.header.object_id
    }

    /// Opcode of the message.
    #[inline]
    pub fn opcode(&self) -> u16 {
        self.header.opcode
    }
}

/// Build a complete message as a single byte vector.
///
/// Fails if header plus body does not fit the 16-bit size field.
pub fn build_frame(object_id: ObjectId, opcode: u16, body: &[u8]) -> Result<Vec<u8>> {
    let size = HEADER_SIZE + body.len();
    if size > MAX_MESSAGE_SIZE {
        return Err(WaywireError::MessageTooLarge {
            size,
            max: MAX_MESSAGE_SIZE,
        });
    }

    let mut buf = Vec::with_capacity(size);
    buf.extend_from_slice(&MessageHeader::new(object_id, opcode, size as u16).encode());
    buf.extend_from_slice(body);
    Ok(buf)
}
