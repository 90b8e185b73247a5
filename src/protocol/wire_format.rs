//! Wire format encoding and decoding.
//!
//! Implements the 8-byte message header:
//! ```text
//! ┌───────────┬──────────────────────────────┐
//! │ Object ID │ Size << 16 | Opcode          │
//! │ 4 bytes   │ 4 bytes                      │
//! │ uint32 NE │ uint32 NE                    │
//! └───────────┴──────────────────────────────┘
//! ```
//!
//! Both words are in host byte order. On little-endian hosts this is the
//! object id, then a 16-bit opcode, then the 16-bit total size.

use crate::codec::ObjectId;
use crate::error::{Result, WaywireError};

/// Header size in bytes (fixed, exactly 8).
pub const HEADER_SIZE: usize = 8;

/// Maximum number of bytes sent in a single socket write.
pub const MAX_BYTES_OUT: usize = 4096;

/// Maximum number of file descriptors sent in a single socket write.
pub const MAX_FDS_OUT: usize = 28;

/// Largest message the size field can describe.
pub const MAX_MESSAGE_SIZE: usize = u16::MAX as usize;

/// Object id of the display, the only object that exists before any request.
pub const DISPLAY_ID: ObjectId = 1;

/// Null object id (absent optional object).
pub const NULL_ID: ObjectId = 0;

/// First id of the range the compositor allocates from.
pub const SERVER_ID_START: ObjectId = 0xFF00_0000;

/// Decoded message header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageHeader {
    /// Target (requests) or sender (events) object.
    pub object_id: ObjectId,
    /// Index into the interface's request or event table.
    pub opcode: u16,
    /// Total message size including this header.
    pub size: u16,
}

impl MessageHeader {
    /// Create a new header.
    pub fn new(object_id: ObjectId, opcode: u16, size: u16) -> Self {
        Self {
            object_id,
            opcode,
            size,
        }
    }

    /// Encode header to bytes (host byte order).
    ///
    /// # Example
    ///
    /// ```
    /// use waywire_client::protocol::MessageHeader;
    ///
    /// let header = MessageHeader::new(1, 0, 12);
    /// assert_eq!(header.encode().len(), 8);
    /// ```
    pub fn encode(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        self.encode_into(&mut buf);
        buf
    }

    /// Encode header into an existing buffer.
    ///
    /// # Panics
    ///
    /// Panics if buffer is smaller than `HEADER_SIZE` (8 bytes).
    pub fn encode_into(&self, buf: &mut [u8]) {
        let word = (u32::from(self.size) << 16) | u32::from(self.opcode);
        buf[0..4].copy_from_slice(&self.object_id.to_ne_bytes());
        buf[4..8].copy_from_slice(&word.to_ne_bytes());
    }

    /// Decode header from bytes.
    ///
    /// Returns `None` if buffer is too short.
    pub fn decode(buf: &[u8]) -> Option<Self> {
        if buf.len() < HEADER_SIZE {
            return None;
        }
        let object_id = u32::from_ne_bytes([buf[0], buf[1], buf[2], buf[3]]);
        let word = u32::from_ne_bytes([buf[4], buf[5], buf[6], buf[7]]);
        Some(Self {
            object_id,
            opcode: (word & 0xFFFF) as u16,
            size: (word >> 16) as u16,
        })
    }

    /// Validate the header for protocol compliance.
    ///
    /// Checks:
    /// - Size covers at least the header
    /// - Size is 32-bit aligned
    /// - Object id is not null
    pub fn validate(&self) -> Result<()> {
        if usize::from(self.size) < HEADER_SIZE {
            return Err(WaywireError::Protocol(format!(
                "Message size {} is smaller than the header",
                self.size
            )));
        }

        if self.size % 4 != 0 {
            return Err(WaywireError::Protocol(format!(
                "Message size {} is not 32-bit aligned",
                self.size
            )));
        }

        if self.object_id == NULL_ID {
            return Err(WaywireError::Protocol(
                "Message targets the null object".to_string(),
            ));
        }

        Ok(())
    }

    /// Size of the argument payload following the header.
    #[inline]
    pub fn body_len(&self) -> usize {
        usize::from(self.size).saturating_sub(HEADER_SIZE)
    }
}

/// Whether an id lies in the range allocated by the compositor.
#[inline]
pub fn is_server_id(id: ObjectId) -> bool {
    id >= SERVER_ID_START
}
