//! Codec module - typed argument serialization.
//!
//! This module turns `(object id, opcode, arguments)` into message bytes plus
//! out-of-band file descriptors, and decodes payloads back given a schema
//! signature:
//!
//! - [`encode_message`] - header + arguments, descriptors split out
//! - [`decode_args`] - strict left-to-right decode against `&[ArgKind]`
//! - [`ArgCursor`] - the underlying reader, usable for hand-written parsing
//!
//! # Example
//!
//! ```
//! use waywire_client::codec::{decode_args, encode_message, ArgKind, Argument};
//!
//! let encoded = encode_message(2, 0, vec![
//!     Argument::Uint(1),
//!     Argument::Str("wl_shm".into()),
//! ]).unwrap();
//!
//! let args = decode_args(
//!     &[ArgKind::Uint, ArgKind::String],
//!     encoded.bytes.slice(8..),
//!     || None,
//! ).unwrap();
//! assert_eq!(args[1], Argument::Str("wl_shm".into()));
//! ```

mod args;
mod wire;

pub(crate) use args::ArgList;
pub use args::{ArgKind, Args, Argument, Fixed, Message};
pub use wire::{
    check_signature, decode_args, encode_message, padded_len, ArgCursor, EncodedMessage,
};

/// Protocol object identifier.
pub type ObjectId = u32;
