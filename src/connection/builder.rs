//! Connection configuration.
//!
//! The socket path is resolved the way every Wayland client does it:
//! - `WAYLAND_DISPLAY` names the socket, `wayland-0` if unset
//! - an absolute display name is used as-is
//! - otherwise it is joined onto `XDG_RUNTIME_DIR`, which must then be set
//!
//! Values set on the builder take precedence over the environment.

use std::ffi::OsString;
use std::path::PathBuf;

use tracing::debug;

use super::Connection;
use crate::error::{Result, WaywireError};
use crate::transport::{Transport, UnixTransport};

/// Display name used when `WAYLAND_DISPLAY` is unset.
pub const DEFAULT_DISPLAY: &str = "wayland-0";

/// Default size of the socket read buffer.
pub const DEFAULT_READ_BUFFER_SIZE: usize = 16 * 1024;

/// Builder for configuring and opening a [`Connection`].
#[derive(Debug, Clone)]
pub struct ConnectionBuilder {
    runtime_dir: Option<PathBuf>,
    display: Option<OsString>,
    read_buffer_size: usize,
}

impl ConnectionBuilder {
    /// Create a new builder using the environment for everything.
    pub fn new() -> Self {
        Self {
            runtime_dir: None,
            display: None,
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
        }
    }

    /// Use this runtime directory instead of `XDG_RUNTIME_DIR`.
    pub fn runtime_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.runtime_dir = Some(dir.into());
        self
    }

    /// Use this display name (or absolute socket path) instead of `WAYLAND_DISPLAY`.
    pub fn display(mut self, name: impl Into<OsString>) -> Self {
        self.display = Some(name.into());
        self
    }

    /// Set the size of the buffer each socket read fills.
    ///
    /// Never smaller than one maximum-size write. Default: 16 KiB
    pub fn read_buffer_size(mut self, size: usize) -> Self {
        self.read_buffer_size = size;
        self
    }

    /// Resolve the socket path from the builder and the process environment.
    pub fn socket_path(&self) -> Result<PathBuf> {
        self.socket_path_with(|name| std::env::var_os(name))
    }

    /// Resolve the socket path with a custom environment lookup.
    ///
    /// Empty variables count as unset.
    pub fn socket_path_with<F>(&self, lookup: F) -> Result<PathBuf>
    where
        F: Fn(&str) -> Option<OsString>,
    {
        let lookup = |name: &str| lookup(name).filter(|value| !value.is_empty());

        let display = self
            .display
            .clone()
            .or_else(|| lookup("WAYLAND_DISPLAY"))
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DISPLAY));
        if display.is_absolute() {
            return Ok(display);
        }

        let runtime_dir = self
            .runtime_dir
            .clone()
            .or_else(|| lookup("XDG_RUNTIME_DIR").map(PathBuf::from))
            .ok_or(WaywireError::NoRuntimeDir)?;
        Ok(runtime_dir.join(display))
    }

    /// Resolve the socket path and connect.
    pub async fn connect(self) -> Result<Connection> {
        let path = self.socket_path()?;
        debug!(path = %path.display(), "Connecting");
        let transport = UnixTransport::connect(&path).await?;
        Ok(self.build(transport))
    }

    /// Build a connection over an existing transport, applying buffer settings.
    pub fn build<T: Transport + 'static>(self, transport: T) -> Connection {
        Connection::with_transport(Box::new(transport), self.read_buffer_size)
    }
}

impl Default for ConnectionBuilder {
    fn default() -> Self {
        Self::new()
    }
}
