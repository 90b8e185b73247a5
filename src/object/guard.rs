//! RAII destruction for proxies.
//!
//! # Example
//!
//! ```ignore
//! use waywire_client::object::DropGuard;
//!
//! let surface = DropGuard::new(compositor.create_surface()?);
//! surface.commit()?;
//! // wl_surface.destroy is queued here
//! drop(surface);
//! ```

use std::ops::Deref;

use tracing::debug;

use super::Proxy;

/// Sends the interface's destructor request exactly once when dropped.
///
/// Only interfaces with an argument-less destructor request are supported;
/// for others the guard does nothing on drop. An already dropped proxy is
/// left alone.
#[derive(Debug)]
pub struct DropGuard<P: Proxy> {
    proxy: P,
    armed: bool,
}

impl<P: Proxy> DropGuard<P> {
    /// Take ownership of `proxy`.
    pub fn new(proxy: P) -> Self {
        Self { proxy, armed: true }
    }

    /// Release the proxy without destroying it.
    pub fn into_inner(mut self) -> P {
        self.armed = false;
        self.proxy.clone()
    }
}

impl<P: Proxy> Deref for DropGuard<P> {
    type Target = P;

    fn deref(&self) -> &P {
        &self.proxy
    }
}

impl<P: Proxy> Drop for DropGuard<P> {
    fn drop(&mut self) {
        if !self.armed || !self.proxy.is_alive() {
            return;
        }
        let Some(opcode) = P::INTERFACE.destructor() else {
            return;
        };
        if let Err(e) = self.proxy.handle().send_request(opcode, Vec::new()) {
            debug!(object = ?self.proxy.handle(), error = %e, "Destructor request on drop failed");
        }
    }
}
