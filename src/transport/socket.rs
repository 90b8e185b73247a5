//! Unix domain socket transport.
//!
//! # Example
//!
//! ```ignore
//! use waywire_client::transport::{Transport, UnixTransport};
//!
//! let transport = UnixTransport::connect("/run/user/1000/wayland-0").await?;
//! transport.send(&bytes, &[]).await?;
//! ```

use std::io::{self, IoSlice, IoSliceMut};
use std::os::fd::{AsFd, AsRawFd, FromRawFd, OwnedFd, RawFd};
use std::path::Path;

use nix::poll::{poll, PollFd, PollFlags, PollTimeout};
use nix::sys::socket::{
    recvmsg, sendmsg, shutdown, ControlMessage, ControlMessageOwned, MsgFlags, Shutdown,
    UnixAddr,
};
use tokio::io::Interest;
use tokio::net::UnixStream;
use tracing::{debug, warn};

use super::{BoxFuture, Transport};
use crate::error::{Result, WaywireError};
use crate::protocol::MAX_FDS_OUT;

/// Connected Unix domain stream socket.
#[derive(Debug)]
pub struct UnixTransport {
    stream: UnixStream,
}

impl UnixTransport {
    /// Connect to the socket at `path`.
    ///
    /// Fails with [`WaywireError::Connect`] if the socket is missing or refuses
    /// the connection.
    pub async fn connect(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let stream = UnixStream::connect(path)
            .await
            .map_err(|source| WaywireError::Connect {
                path: path.to_path_buf(),
                source,
            })?;

        debug!(path = %path.display(), "Connected to compositor socket");
        Ok(Self { stream })
    }

    /// Wrap an already connected stream.
    pub fn new(stream: UnixStream) -> Self {
        Self { stream }
    }

    /// Create a connected pair, e.g. a client and a test compositor.
    pub fn pair() -> Result<(Self, Self)> {
        let (a, b) = UnixStream::pair()?;
        Ok((Self::new(a), Self::new(b)))
    }

    /// Get a reference to the underlying stream.
    pub fn inner(&self) -> &UnixStream {
        &self.stream
    }

    async fn send_all(&self, bytes: &[u8], fds: &[OwnedFd]) -> Result<()> {
        let raw_fds: Vec<RawFd> = fds.iter().map(AsRawFd::as_raw_fd).collect();
        let mut offset = 0;

        while offset < bytes.len() {
            self.stream.writable().await?;

            // descriptors ride on the first chunk only
            let attach: &[RawFd] = if offset == 0 { &raw_fds } else { &[] };
            let result = self.stream.try_io(Interest::WRITABLE, || {
                send_with_fds(self.stream.as_raw_fd(), &bytes[offset..], attach)
            });

            match result {
                Ok(0) => {
                    return Err(WaywireError::Io(io::Error::new(
                        io::ErrorKind::WriteZero,
                        "sendmsg returned 0",
                    )));
                }
                Ok(n) => offset += n,
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => continue,
                Err(e) => return Err(e.into()),
            }
        }

        Ok(())
    }

    async fn receive_some(&self, buf: &mut [u8], fds: &mut Vec<OwnedFd>) -> Result<usize> {
        loop {
            self.stream.readable().await?;

            let result = self.stream.try_io(Interest::READABLE, || {
                recv_with_fds(self.stream.as_raw_fd(), buf, fds)
            });

            match result {
                Ok(n) => return Ok(n),
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => continue,
                Err(e) if e.kind() == io::ErrorKind::ConnectionReset => return Ok(0),
                Err(e) => return Err(e.into()),
            }
        }
    }
}

impl Transport for UnixTransport {
    fn send<'a>(&'a self, bytes: &'a [u8], fds: &'a [OwnedFd]) -> BoxFuture<'a, Result<()>> {
        Box::pin(self.send_all(bytes, fds))
    }

    fn receive<'a>(
        &'a self,
        buf: &'a mut [u8],
        fds: &'a mut Vec<OwnedFd>,
    ) -> BoxFuture<'a, Result<usize>> {
        Box::pin(self.receive_some(buf, fds))
    }

    fn poll_readable(&self) -> Result<bool> {
        let mut pfds = [PollFd::new(self.stream.as_fd(), PollFlags::POLLIN)];
        let ready = poll(&mut pfds, PollTimeout::ZERO).map_err(io::Error::from)?;
        let readable = ready > 0
            && pfds[0].revents().map_or(false, |r| {
                r.intersects(PollFlags::POLLIN | PollFlags::POLLHUP | PollFlags::POLLERR)
            });
        Ok(readable)
    }

    fn shutdown(&self) -> Result<()> {
        match shutdown(self.stream.as_raw_fd(), Shutdown::Both) {
            Ok(()) | Err(nix::errno::Errno::ENOTCONN) => Ok(()),
            Err(e) => Err(io::Error::from(e).into()),
        }
    }
}

/// One `sendmsg` call. No ancillary data is built when `fds` is empty.
fn send_with_fds(socket: RawFd, bytes: &[u8], fds: &[RawFd]) -> io::Result<usize> {
    let iov = [IoSlice::new(bytes)];
    let rights = [ControlMessage::ScmRights(fds)];
    let cmsgs: &[ControlMessage] = if fds.is_empty() { &[] } else { &rights };
    let sent = sendmsg::<()>(
        socket,
        &iov,
        cmsgs,
        MsgFlags::MSG_DONTWAIT | MsgFlags::MSG_NOSIGNAL,
        None,
    )?;
    Ok(sent)
}

/// One `recvmsg` call, taking ownership of every received descriptor.
fn recv_with_fds(socket: RawFd, buf: &mut [u8], fds: &mut Vec<OwnedFd>) -> io::Result<usize> {
    let mut iov = [IoSliceMut::new(buf)];
    // room for more than the per-message maximum so nothing is dropped
    let mut cmsg_buf = nix::cmsg_space!([RawFd; MAX_FDS_OUT * 2]);

    let msg = recvmsg::<UnixAddr>(
        socket,
        &mut iov,
        Some(&mut cmsg_buf),
        MsgFlags::MSG_CMSG_CLOEXEC | MsgFlags::MSG_DONTWAIT,
    )?;

    for cmsg in msg.cmsgs()? {
        match cmsg {
            ControlMessageOwned::ScmRights(received) => {
                for fd in received {
                    // SAFETY: the kernel just installed this descriptor for us and
                    // nothing else refers to it
                    fds.push(unsafe { OwnedFd::from_raw_fd(fd) });
                }
            }
            other => warn!(?other, "Ignoring unexpected control message"),
        }
    }

    if msg.flags.contains(MsgFlags::MSG_CTRUNC) {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "ancillary data was truncated",
        ));
    }

    Ok(msg.bytes)
}
