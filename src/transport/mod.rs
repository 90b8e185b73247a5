//! Transport module - byte and file descriptor delivery.
//!
//! Provides the [`Transport`] seam the connection talks through, and its only
//! in-tree implementation:
//! - [`UnixTransport`] - Unix domain stream socket with `SCM_RIGHTS` passing
//!
//! Any other backend (a socket handed over by a parent process, an in-memory
//! test double) plugs in behind the same trait.

mod socket;

use std::future::Future;
use std::os::fd::OwnedFd;
use std::pin::Pin;

use crate::error::Result;

pub use socket::UnixTransport;

/// Boxed future type used by [`Transport`] methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Reliable, ordered delivery of bytes plus out-of-band descriptors.
pub trait Transport: Send + Sync + std::fmt::Debug {
    /// Send `bytes` with `fds` attached to the first byte.
    ///
    /// Resolves once every byte has been handed to the kernel. A failed or
    /// zero-length write is an error carrying the OS error code.
    fn send<'a>(&'a self, bytes: &'a [u8], fds: &'a [OwnedFd]) -> BoxFuture<'a, Result<()>>;

    /// Read into `buf`, appending any received descriptors to `fds`.
    ///
    /// Waits until data is available. Returns the number of bytes read; 0 means
    /// the peer closed the connection.
    fn receive<'a>(
        &'a self,
        buf: &'a mut [u8],
        fds: &'a mut Vec<OwnedFd>,
    ) -> BoxFuture<'a, Result<usize>>;

    /// Non-blocking check whether a read would return immediately.
    fn poll_readable(&self) -> Result<bool>;

    /// Shut down both directions. Pending reads resolve with 0.
    fn shutdown(&self) -> Result<()>;
}
