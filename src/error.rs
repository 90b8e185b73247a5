//! Error types for waywire-client.

use std::path::PathBuf;

use thiserror::Error;

use crate::codec::ObjectId;

/// Main error type for all wire-protocol operations.
#[derive(Debug, Error)]
pub enum WaywireError {
    /// I/O error during socket operations (carries the OS error code).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// `XDG_RUNTIME_DIR` is not set and the display name is not an absolute path.
    #[error("XDG_RUNTIME_DIR is not set")]
    NoRuntimeDir,

    /// The compositor socket could not be opened or refused the connection.
    #[error("Failed to connect to {}: {source}", path.display())]
    Connect {
        /// Socket path that was tried.
        path: PathBuf,
        /// Underlying OS error.
        #[source]
        source: std::io::Error,
    },

    /// The peer closed the socket.
    #[error("Connection closed")]
    ConnectionClosed,

    /// Malformed message or argument stream.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Opcode is not part of the interface schema.
    #[error("Unknown opcode {opcode} for interface {interface}")]
    UnknownOpcode {
        /// Interface name.
        interface: &'static str,
        /// Offending opcode.
        opcode: u16,
    },

    /// A request was issued through a proxy that has been destroyed.
    #[error("Object {interface}@{id} has been destroyed")]
    Destroyed {
        /// Interface name.
        interface: &'static str,
        /// Object id the proxy used to have.
        id: ObjectId,
    },

    /// The request is newer than the version negotiated for the proxy.
    #[error("{interface}.{request} requires version {required}, object has version {current}")]
    UnsupportedVersion {
        /// Interface name.
        interface: &'static str,
        /// Request name.
        request: &'static str,
        /// Version of the proxy.
        current: u32,
        /// Version the request was introduced in.
        required: u32,
    },

    /// Fatal error reported by the compositor through `wl_display.error`.
    #[error("Compositor error on {interface}@{object_id} (code {code}): {message}")]
    Server {
        /// Object the error refers to.
        object_id: ObjectId,
        /// Interface of that object, if it was known.
        interface: String,
        /// Interface-specific error code.
        code: u32,
        /// Human-readable description.
        message: String,
    },

    /// Every client-side object id is in use.
    #[error("Object id space exhausted")]
    IdsExhausted,

    /// Encoded message does not fit the 16-bit size field / socket write limit.
    #[error("Message of {size} bytes exceeds maximum {max}")]
    MessageTooLarge {
        /// Encoded size.
        size: usize,
        /// Allowed maximum.
        max: usize,
    },

    /// The connection already failed; carries the first failure.
    #[error("Connection is no longer usable: {0}")]
    Defunct(String),
}

impl WaywireError {
    /// Whether this error leaves the connection unusable.
    ///
    /// Usage errors (destroyed proxy, version gating) are reported to the caller only.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            WaywireError::Destroyed { .. }
                | WaywireError::UnsupportedVersion { .. }
                | WaywireError::IdsExhausted
                | WaywireError::MessageTooLarge { .. }
        )
    }
}

/// Errors returned by [`Globals::bind`](crate::Globals::bind).
#[derive(Debug, Error)]
pub enum BindError {
    /// No global with the requested interface is currently advertised.
    #[error("Requested global is not present")]
    NotPresent,

    /// The advertised global is older than the lowest acceptable version.
    #[error("Global version {advertised} is below required version {required}")]
    UnsupportedVersion {
        /// Version the compositor advertises.
        advertised: u32,
        /// Lower bound requested by the caller.
        required: u32,
    },

    /// Sending the bind request failed.
    #[error(transparent)]
    Wire(#[from] WaywireError),
}

/// Result type alias using WaywireError.
pub type Result<T> = std::result::Result<T, WaywireError>;
