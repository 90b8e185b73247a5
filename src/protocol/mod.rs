//! Protocol module - wire format, framing, and frame types.
//!
//! This module implements the binary framing layer:
//! - 8-byte header encoding/decoding
//! - Frame buffer for accumulating partial reads and received descriptors
//! - Raw frame struct with header accessors

mod frame;
mod frame_buffer;
mod wire_format;

pub use frame::{build_frame, RawFrame};
pub use frame_buffer::FrameBuffer;
pub use wire_format::{
    is_server_id, MessageHeader, DISPLAY_ID, HEADER_SIZE, MAX_BYTES_OUT, MAX_FDS_OUT,
    MAX_MESSAGE_SIZE, NULL_ID, SERVER_ID_START,
};
