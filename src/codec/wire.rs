//! Argument encoding and decoding.

use std::os::fd::OwnedFd;

use bytes::{Buf, BufMut, Bytes, BytesMut};

use super::{ArgKind, Argument, Fixed, ObjectId};
use crate::error::{Result, WaywireError};
use crate::protocol::{MessageHeader, HEADER_SIZE, MAX_BYTES_OUT};

/// Round a byte count up to the next 32-bit boundary.
#[inline]
pub fn padded_len(len: usize) -> usize {
    (len + 3) & !3
}

/// An encoded message ready to be queued for sending.
#[derive(Debug)]
pub struct EncodedMessage {
    /// Header and argument payload.
    pub bytes: Bytes,
    /// Descriptors to send alongside, in argument order.
    pub fds: Vec<OwnedFd>,
}

impl EncodedMessage {
    /// Total size in bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Always false; every message carries at least a header.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Encode one message.
///
/// Descriptors are moved out of the argument list into [`EncodedMessage::fds`].
/// Fails with `MessageTooLarge` if the message cannot be sent in a single write.
pub fn encode_message(
    object_id: ObjectId,
    opcode: u16,
    args: Vec<Argument>,
) -> Result<EncodedMessage> {
    let body_len: usize = args.iter().map(encoded_len).sum();
    let size = HEADER_SIZE + body_len;
    if size > MAX_BYTES_OUT {
        return Err(WaywireError::MessageTooLarge {
            size,
            max: MAX_BYTES_OUT,
        });
    }

    let mut buf = BytesMut::with_capacity(size);
    buf.put_slice(&MessageHeader::new(object_id, opcode, size as u16).encode());

    let mut fds = Vec::new();
    for arg in args {
        match arg {
            Argument::Int(v) => buf.put_i32_ne(v),
            Argument::Uint(v) | Argument::Enum(v) => buf.put_u32_ne(v),
            Argument::Fixed(v) => buf.put_i32_ne(v.as_raw()),
            Argument::Object(id) | Argument::NewId(id) => buf.put_u32_ne(id),
            Argument::Str(s) => {
                let len = s.len() + 1;
                buf.put_u32_ne(len as u32);
                buf.put_slice(s.as_bytes());
                buf.put_bytes(0, padded_len(len) - s.len());
            }
            Argument::Array(a) => {
                buf.put_u32_ne(a.len() as u32);
                buf.put_slice(&a);
                buf.put_bytes(0, padded_len(a.len()) - a.len());
            }
            Argument::Fd(fd) => fds.push(fd),
        }
    }
    debug_assert_eq!(buf.len(), size);

    Ok(EncodedMessage {
        bytes: buf.freeze(),
        fds,
    })
}

/// Bytes an argument occupies in the payload (descriptors occupy none).
fn encoded_len(arg: &Argument) -> usize {
    match arg {
        Argument::Str(s) => 4 + padded_len(s.len() + 1),
        Argument::Array(a) => 4 + padded_len(a.len()),
        Argument::Fd(_) => 0,
        _ => 4,
    }
}

/// Check that an argument list matches a schema signature.
pub fn check_signature(signature: &[ArgKind], args: &[Argument]) -> Result<()> {
    if signature.len() != args.len() {
        return Err(WaywireError::Protocol(format!(
            "Expected {} arguments, got {}",
            signature.len(),
            args.len()
        )));
    }
    for (i, (kind, arg)) in signature.iter().zip(args).enumerate() {
        if arg.kind() != *kind {
            return Err(WaywireError::Protocol(format!(
                "Argument {} should be {}, got {}",
                i,
                kind.name(),
                arg.kind().name()
            )));
        }
    }
    Ok(())
}

/// Decode a payload against a signature.
///
/// `next_fd` is called once per `Fd` argument, in order. The whole payload
/// must be consumed; trailing bytes are a protocol error.
pub fn decode_args<F>(signature: &[ArgKind], body: Bytes, mut next_fd: F) -> Result<Vec<Argument>>
where
    F: FnMut() -> Option<OwnedFd>,
{
    let mut cursor = ArgCursor::new(body);
    let mut args = Vec::with_capacity(signature.len());

    for kind in signature {
        let arg = match kind {
            ArgKind::Int => Argument::Int(cursor.int()?),
            ArgKind::Uint => Argument::Uint(cursor.uint()?),
            ArgKind::Enum => Argument::Enum(cursor.uint()?),
            ArgKind::Fixed => Argument::Fixed(cursor.fixed()?),
            ArgKind::String => Argument::Str(cursor.string()?),
            ArgKind::Array => Argument::Array(cursor.array()?),
            ArgKind::Object => Argument::Object(cursor.object()?),
            ArgKind::NewId => Argument::NewId(cursor.new_id()?),
            ArgKind::Fd => Argument::Fd(next_fd().ok_or_else(|| {
                WaywireError::Protocol("Missing file descriptor for fd argument".to_string())
            })?),
        };
        args.push(arg);
    }

    if cursor.remaining() != 0 {
        return Err(WaywireError::Protocol(format!(
            "{} trailing bytes after last argument",
            cursor.remaining()
        )));
    }

    Ok(args)
}

/// Left-to-right reader over an argument payload.
///
/// Every read checks the remaining length first; padding is skipped
/// transparently for strings and arrays.
#[derive(Debug)]
pub struct ArgCursor {
    buf: Bytes,
}

impl ArgCursor {
    /// Wrap a payload.
    pub fn new(buf: Bytes) -> Self {
        Self { buf }
    }

    /// Bytes left to read.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.buf.remaining()
    }

    fn need(&self, n: usize, what: &str) -> Result<()> {
        if self.buf.remaining() < n {
            return Err(WaywireError::Protocol(format!(
                "Truncated {}: need {} bytes, have {}",
                what,
                n,
                self.buf.remaining()
            )));
        }
        Ok(())
    }

    /// Read an unsigned integer.
    pub fn uint(&mut self) -> Result<u32> {
        self.need(4, "uint")?;
        Ok(self.buf.get_u32_ne())
    }

    /// Read a signed integer.
    pub fn int(&mut self) -> Result<i32> {
        self.need(4, "int")?;
        Ok(self.buf.get_i32_ne())
    }

    /// Read a fixed-point number.
    pub fn fixed(&mut self) -> Result<Fixed> {
        Ok(Fixed::from_raw(self.int()?))
    }

    /// Read an object reference.
    pub fn object(&mut self) -> Result<ObjectId> {
        self.uint()
    }

    /// Read a new object id. Zero is never a valid new id.
    pub fn new_id(&mut self) -> Result<ObjectId> {
        let id = self.uint()?;
        if id == 0 {
            return Err(WaywireError::Protocol("new_id argument is null".to_string()));
        }
        Ok(id)
    }

    /// Read an enum value.
    pub fn enum_value(&mut self) -> Result<u32> {
        self.uint()
    }

    /// Read a string. A null string (length 0) reads as empty.
    pub fn string(&mut self) -> Result<String> {
        let len = self.uint()? as usize;
        if len == 0 {
            return Ok(String::new());
        }
        let padded = padded_len(len);
        self.need(padded, "string")?;

        let raw = self.buf.split_to(padded);
        if raw[len - 1] != 0 {
            return Err(WaywireError::Protocol(
                "String is not NUL-terminated".to_string(),
            ));
        }
        String::from_utf8(raw[..len - 1].to_vec())
            .map_err(|e| WaywireError::Protocol(format!("String is not valid UTF-8: {}", e)))
    }

    /// Read a byte array.
    pub fn array(&mut self) -> Result<Vec<u8>> {
        let len = self.uint()? as usize;
        let padded = padded_len(len);
        self.need(padded, "array")?;

        let raw = self.buf.split_to(padded);
        Ok(raw[..len].to_vec())
    }
}
