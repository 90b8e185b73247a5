//! Frame buffer for accumulating partial reads.
//!
//! Uses `bytes::BytesMut` for the byte stream and a FIFO for file descriptors
//! received as ancillary data. Message boundaries are only known once the
//! header is parsed, so extraction is peek-then-commit: the header is read
//! in place and nothing is consumed until the whole message is buffered.
//!
//! File descriptors are not tied to a message by the kernel. The decoder pulls
//! them from [`FrameBuffer::take_fd`] in argument order while decoding.
//!
//! # Example
//!
//! ```
//! use waywire_client::protocol::{build_frame, FrameBuffer};
//!
//! let mut buffer = FrameBuffer::new();
//! let bytes = build_frame(1, 0, &[]).unwrap();
//!
//! buffer.push(&bytes[..4], Vec::new());
//! assert!(buffer.next_frame().unwrap().is_none());
//!
//! buffer.push(&bytes[4..], Vec::new());
//! assert_eq!(buffer.next_frame().unwrap().unwrap().object_id(), 1);
//! ```

use std::collections::VecDeque;
use std::os::fd::OwnedFd;

use bytes::BytesMut;

use super::wire_format::{MessageHeader, HEADER_SIZE};
use super::RawFrame;
use crate::error::Result;

/// Default initial capacity of the byte buffer.
pub const DEFAULT_CAPACITY: usize = 16 * 1024;

/// Buffer for accumulating incoming bytes and fds and extracting complete frames.
#[derive(Debug)]
pub struct FrameBuffer {
    /// Accumulated bytes from socket reads.
    buffer: BytesMut,
    /// File descriptors received and not yet claimed by a decoded argument.
    fds: VecDeque<OwnedFd>,
}

impl FrameBuffer {
    /// Create a new frame buffer with default capacity.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Create a new frame buffer with a custom initial capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: BytesMut::with_capacity(capacity),
            fds: VecDeque::new(),
        }
    }

    /// Append bytes and descriptors from one socket read.
    pub fn push(&mut self, data: &[u8], fds: impl IntoIterator<Item = OwnedFd>) {
        self.buffer.extend_from_slice(data);
        self.fds.extend(fds);
    }

    /// Peek at the header of the next message without consuming anything.
    pub fn peek_header(&self) -> Option<MessageHeader> {
        MessageHeader::decode(&self.buffer)
    }

    /// Extract the next complete message.
    ///
    /// Returns:
    /// - `Ok(Some(frame))` if a complete message was buffered (and is now consumed)
    /// - `Ok(None)` if more data is needed (nothing is consumed)
    /// - `Err(...)` if the header is invalid; the stream cannot be resynchronized
    pub fn next_frame(&mut self) -> Result<Option<RawFrame>> {
        let Some(header) = self.peek_header() else {
            return Ok(None);
        };
        header.validate()?;

        let size = usize::from(header.size);
        if self.buffer.len() < size {
            return Ok(None);
        }

        let mut message = self.buffer.split_to(size);
        let body = message.split_off(HEADER_SIZE).freeze();
        Ok(Some(RawFrame::new(header, body)))
    }

    /// Take the oldest unclaimed file descriptor.
    pub fn take_fd(&mut self) -> Option<OwnedFd> {
        self.fds.pop_front()
    }

    /// Get the number of buffered bytes.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Check if the byte buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Number of descriptors waiting to be claimed.
    pub fn pending_fds(&self) -> usize {
        self.fds.len()
    }

    /// Clear the buffer, closing any unclaimed descriptors.
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.fds.clear();
    }
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::build_frame;

    fn make_frame_bytes(object_id: u32, opcode: u16, body: &[u8]) -> Vec<u8> {
        build_frame(object_id, opcode, body).unwrap()
    }

    fn test_fd() -> OwnedFd {
        std::fs::File::open("/dev/null").unwrap().into()
    }

    #[test]
    fn test_single_complete_frame() {
        let mut buffer = FrameBuffer::new();
        buffer.push(&make_frame_bytes(2, 0, &[1, 0, 0, 0]), Vec::new());

        let frame = buffer.next_frame().unwrap().unwrap();
        assert_eq!(frame.object_id(), 2);
        assert_eq!(frame.opcode(), 0);
        assert_eq!(frame.body(), &[1, 0, 0, 0]);
        assert!(buffer.is_empty());
        assert!(buffer.next_frame().unwrap().is_none());
    }

    #[test]
    fn test_multiple_frames_in_one_push() {
        let mut buffer = FrameBuffer::new();
        let mut combined = make_frame_bytes(1, 0, &[]);
        combined.extend(make_frame_bytes(2, 1, &[0; 4]));
        combined.extend(make_frame_bytes(3, 2, &[0; 8]));
        buffer.push(&combined, Vec::new());

        let ids: Vec<_> = std::iter::from_fn(|| buffer.next_frame().unwrap())
            .map(|f| f.object_id())
            .collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_fragmented_header_not_consumed() {
        let mut buffer = FrameBuffer::new();
        let bytes = make_frame_bytes(1, 0, &[0; 4]);

        buffer.push(&bytes[..5], Vec::new());
        assert!(buffer.next_frame().unwrap().is_none());
        assert_eq!(buffer.len(), 5);

        buffer.push(&bytes[5..], Vec::new());
        assert!(buffer.next_frame().unwrap().is_some());
    }

    #[test]
    fn test_partial_body_not_consumed() {
        let mut buffer = FrameBuffer::new();
        let bytes = make_frame_bytes(4, 1, &[7; 16]);

        buffer.push(&bytes[..HEADER_SIZE + 10], Vec::new());
        assert!(buffer.next_frame().unwrap().is_none());
        // peek-then-commit: header bytes are still there
        assert_eq!(buffer.len(), HEADER_SIZE + 10);
        assert_eq!(buffer.peek_header().unwrap().object_id, 4);

        buffer.push(&bytes[HEADER_SIZE + 10..], Vec::new());
        let frame = buffer.next_frame().unwrap().unwrap();
        assert_eq!(frame.body(), &[7; 16]);
    }

    #[test]
    fn test_byte_at_a_time() {
        let mut buffer = FrameBuffer::new();
        let bytes = make_frame_bytes(1, 1, &[9, 9, 9, 9]);
        let mut frames = Vec::new();

        for byte in &bytes {
            buffer.push(&[*byte], Vec::new());
            if let Some(frame) = buffer.next_frame().unwrap() {
                frames.push(frame);
            }
        }

        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].body(), &[9, 9, 9, 9]);
    }

    #[test]
    fn test_invalid_header_is_error() {
        let mut buffer = FrameBuffer::new();
        let mut bytes = MessageHeader::new(1, 0, 4).encode().to_vec();
        bytes.extend_from_slice(&[0; 4]);
        buffer.push(&bytes, Vec::new());

        assert!(buffer.next_frame().is_err());
    }

    #[test]
    fn test_fds_are_fifo() {
        let mut buffer = FrameBuffer::new();
        let first = test_fd();
        let second = test_fd();
        let (a, b) = {
            use std::os::fd::AsRawFd;
            (first.as_raw_fd(), second.as_raw_fd())
        };

        buffer.push(&[], vec![first]);
        buffer.push(&[], vec![second]);
        assert_eq!(buffer.pending_fds(), 2);

        use std::os::fd::AsRawFd;
        assert_eq!(buffer.take_fd().unwrap().as_raw_fd(), a);
        assert_eq!(buffer.take_fd().unwrap().as_raw_fd(), b);
        assert!(buffer.take_fd().is_none());
    }

    #[test]
    fn test_clear_resets_state() {
        let mut buffer = FrameBuffer::new();
        buffer.push(&[1, 2, 3], vec![test_fd()]);

        buffer.clear();

        assert!(buffer.is_empty());
        assert_eq!(buffer.pending_fds(), 0);
    }
}
