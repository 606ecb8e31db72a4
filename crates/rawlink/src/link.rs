//! Layer 2 view: whole Ethernet frames over a `SOCK_RAW` packet socket.

use std::os::unix::io::{AsRawFd, RawFd};
use std::time::Instant;

use super::error::Result;
use super::filter::SockFilter;
use super::hwaddr::HardwareAddr;
use super::socket::{RawSocket, SocketKind};

/// A packet socket exchanging complete link-layer frames.
///
/// Frames are written with their link-layer header already in place, so
/// sending needs no destination.
#[derive(Debug)]
pub struct LinkSocket {
    inner: RawSocket,
}

impl LinkSocket {
    /// Open a raw packet socket on `ifname` for `protocol` (host byte order).
    pub fn open(ifname: &str, protocol: u16) -> Result<Self> {
        RawSocket::open(ifname, SocketKind::Raw, protocol).map(|inner| Self { inner })
    }

    /// Read one frame.
    pub async fn read(&self, buf: &mut [u8]) -> Result<usize> {
        self.inner.read(buf).await
    }

    /// Receive one frame and its source hardware address.
    pub async fn recv_from(&self, buf: &mut [u8]) -> Result<(usize, Option<HardwareAddr>)> {
        self.inner.recv_from(buf).await
    }

    /// Write one frame.
    pub async fn write(&self, frame: &[u8]) -> Result<usize> {
        self.inner.write(frame).await
    }

    /// Send one frame out of the bound interface.
    pub async fn send(&self, frame: &[u8]) -> Result<()> {
        self.inner.send_to(frame, None).await
    }

    /// See [`RawSocket::set_deadline`].
    pub fn set_deadline(&self, deadline: Option<Instant>) {
        self.inner.set_deadline(deadline);
    }

    /// See [`RawSocket::set_read_deadline`].
    pub fn set_read_deadline(&self, deadline: Option<Instant>) {
        self.inner.set_read_deadline(deadline);
    }

    /// See [`RawSocket::set_write_deadline`].
    pub fn set_write_deadline(&self, deadline: Option<Instant>) {
        self.inner.set_write_deadline(deadline);
    }

    /// See [`RawSocket::set_filter`].
    pub fn set_filter(&self, program: &[SockFilter]) -> Result<()> {
        self.inner.set_filter(program)
    }

    /// See [`RawSocket::set_promiscuous`].
    pub fn set_promiscuous(&self, enable: bool) -> Result<()> {
        self.inner.set_promiscuous(enable)
    }

    /// Close the socket.
    pub fn close(self) -> Result<()> {
        self.inner.close()
    }

    /// Get the underlying transport.
    pub fn get_ref(&self) -> &RawSocket {
        &self.inner
    }

    /// Unwrap into the underlying transport.
    pub fn into_inner(self) -> RawSocket {
        self.inner
    }
}

impl AsRef<RawSocket> for LinkSocket {
    fn as_ref(&self) -> &RawSocket {
        &self.inner
    }
}

impl AsRawFd for LinkSocket {
    fn as_raw_fd(&self) -> RawFd {
        self.inner.as_raw_fd()
    }
}
