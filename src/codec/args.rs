//! Argument kinds and values.

use std::fmt;
use std::os::fd::{AsRawFd, OwnedFd};

use super::ObjectId;
use crate::error::{Result, WaywireError};

/// Primitive kind of one message argument, as listed in an interface schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArgKind {
    /// Signed 32-bit integer.
    Int,
    /// Unsigned 32-bit integer.
    Uint,
    /// 24.8 fixed-point number.
    Fixed,
    /// Length-prefixed, NUL-terminated UTF-8 string.
    String,
    /// Length-prefixed opaque byte array.
    Array,
    /// Reference to an existing object.
    Object,
    /// Id of an object created by this message.
    NewId,
    /// File descriptor, sent out-of-band.
    Fd,
    /// Enumerated value, wire-encoded as an unsigned integer.
    Enum,
}

impl ArgKind {
    /// Short name used in wire traces.
    pub fn name(self) -> &'static str {
        match self {
            ArgKind::Int => "int",
            ArgKind::Uint => "uint",
            ArgKind::Fixed => "fixed",
            ArgKind::String => "string",
            ArgKind::Array => "array",
            ArgKind::Object => "object",
            ArgKind::NewId => "new_id",
            ArgKind::Fd => "fd",
            ArgKind::Enum => "enum",
        }
    }
}

/// Signed 24.8 fixed-point number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Fixed(i32);

impl Fixed {
    /// Convert from a float by scaling by 256 and truncating.
    #[inline]
    pub fn from_f64(value: f64) -> Self {
        Self((value * 256.0) as i32)
    }

    /// Convert back to a float.
    #[inline]
    pub fn to_f64(self) -> f64 {
        f64::from(self.0) / 256.0
    }

    /// Wrap a raw wire value.
    #[inline]
    pub const fn from_raw(raw: i32) -> Self {
        Self(raw)
    }

    /// The raw wire value.
    #[inline]
    pub const fn as_raw(self) -> i32 {
        self.0
    }
}

impl From<f64> for Fixed {
    fn from(value: f64) -> Self {
        Self::from_f64(value)
    }
}

impl From<Fixed> for f64 {
    fn from(value: Fixed) -> Self {
        value.to_f64()
    }
}

/// One decoded or to-be-encoded argument value.
///
/// File descriptors are owned: a decoded `Fd` belongs to whoever holds the
/// argument, and an encoded one is closed once it has been sent.
#[derive(Debug)]
pub enum Argument {
    /// Signed 32-bit integer.
    Int(i32),
    /// Unsigned 32-bit integer.
    Uint(u32),
    /// Fixed-point number.
    Fixed(Fixed),
    /// UTF-8 string. A null string on the wire decodes as empty.
    Str(String),
    /// Opaque bytes.
    Array(Vec<u8>),
    /// Existing object (0 for null).
    Object(ObjectId),
    /// Newly created object.
    NewId(ObjectId),
    /// File descriptor.
    Fd(OwnedFd),
    /// Enum value.
    Enum(u32),
}

impl Argument {
    /// Kind of this value.
    pub fn kind(&self) -> ArgKind {
        match self {
            Argument::Int(_) => ArgKind::Int,
            Argument::Uint(_) => ArgKind::Uint,
            Argument::Fixed(_) => ArgKind::Fixed,
            Argument::Str(_) => ArgKind::String,
            Argument::Array(_) => ArgKind::Array,
            Argument::Object(_) => ArgKind::Object,
            Argument::NewId(_) => ArgKind::NewId,
            Argument::Fd(_) => ArgKind::Fd,
            Argument::Enum(_) => ArgKind::Enum,
        }
    }
}

impl PartialEq for Argument {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Argument::Int(a), Argument::Int(b)) => a == b,
            (Argument::Uint(a), Argument::Uint(b)) => a == b,
            (Argument::Fixed(a), Argument::Fixed(b)) => a == b,
            (Argument::Str(a), Argument::Str(b)) => a == b,
            (Argument::Array(a), Argument::Array(b)) => a == b,
            (Argument::Object(a), Argument::Object(b)) => a == b,
            (Argument::NewId(a), Argument::NewId(b)) => a == b,
            (Argument::Fd(a), Argument::Fd(b)) => a.as_raw_fd() == b.as_raw_fd(),
            (Argument::Enum(a), Argument::Enum(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for Argument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Argument::Int(v) => write!(f, "{v}"),
            Argument::Uint(v) | Argument::Enum(v) => write!(f, "{v}"),
            Argument::Fixed(v) => write!(f, "{}", v.to_f64()),
            Argument::Str(s) => write!(f, "{s:?}"),
            Argument::Array(a) => write!(f, "array[{}]", a.len()),
            Argument::Object(0) => f.write_str("nil"),
            Argument::Object(id) => write!(f, "object {id}"),
            Argument::NewId(id) => write!(f, "new_id {id}"),
            Argument::Fd(fd) => write!(f, "fd {}", fd.as_raw_fd()),
        }
    }
}

/// A message with decoded arguments.
#[derive(Debug, PartialEq)]
pub struct Message {
    /// Target (request) or sender (event).
    pub object_id: ObjectId,
    /// Opcode within the interface's request or event table.
    pub opcode: u16,
    /// Arguments in schema order.
    pub args: Vec<Argument>,
}

impl Message {
    /// Create a new message.
    pub fn new(object_id: ObjectId, opcode: u16, args: Vec<Argument>) -> Self {
        Self {
            object_id,
            opcode,
            args,
        }
    }

    /// Consume the message into a typed argument reader.
    pub fn into_args(self) -> Args {
        Args {
            inner: self.args.into_iter(),
            position: 0,
        }
    }
}

/// Typed, in-order access to a decoded argument list.
///
/// Used by proxy event parsers. A kind mismatch means the schema and the
/// parser disagree, and is reported as a protocol error.
#[derive(Debug)]
pub struct Args {
    inner: std::vec::IntoIter<Argument>,
    position: usize,
}

macro_rules! take_arg {
    ($(#[$meta:meta])* $fn:ident, $variant:ident, $ty:ty, $kind:literal) => {
        $(#[$meta])*
        pub fn $fn(&mut self) -> Result<$ty> {
            match self.next_arg()? {
                Argument::$variant(v) => Ok(v),
                other => Err(self.mismatch($kind, &other)),
            }
        }
    };
}

impl Args {
    fn next_arg(&mut self) -> Result<Argument> {
        self.position += 1;
        self.inner.next().ok_or_else(|| {
            WaywireError::Protocol(format!("Missing argument {}", self.position - 1))
        })
    }

    fn mismatch(&self, expected: &str, got: &Argument) -> WaywireError {
        WaywireError::Protocol(format!(
            "Argument {} should be {}, got {}",
            self.position - 1,
            expected,
            got.kind().name()
        ))
    }

    take_arg!(
        /// Next argument as a signed integer.
        int, Int, i32, "int"
    );
    take_arg!(
        /// Next argument as an unsigned integer.
        uint, Uint, u32, "uint"
    );
    take_arg!(
        /// Next argument as a fixed-point number.
        fixed, Fixed, Fixed, "fixed"
    );
    take_arg!(
        /// Next argument as a string.
        string, Str, String, "string"
    );
    take_arg!(
        /// Next argument as a byte array.
        array, Array, Vec<u8>, "array"
    );
    take_arg!(
        /// Next argument as an object reference (0 for null).
        object, Object, ObjectId, "object"
    );
    take_arg!(
        /// Next argument as a new object id.
        new_id, NewId, ObjectId, "new_id"
    );
    take_arg!(
        /// Next argument as a file descriptor.
        fd, Fd, OwnedFd, "fd"
    );
    take_arg!(
        /// Next argument as an enum value.
        enum_value, Enum, u32, "enum"
    );
}

/// Lazily rendered argument list for wire traces: `(1, "wl_compositor", new_id 4)`.
pub(crate) struct ArgList<'a>(pub &'a [Argument]);

impl fmt::Display for ArgList<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        for (i, arg) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{arg}")?;
        }
        f.write_str(")")
    }
}
