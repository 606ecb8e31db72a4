//! Layer 3 view: network-layer packets over a `SOCK_DGRAM` packet socket.
//!
//! The kernel strips the link-layer header on receive and builds it on send,
//! which is why every write names its destination hardware address.

use std::os::unix::io::{AsRawFd, RawFd};
use std::time::Instant;

use super::error::Result;
use super::filter::SockFilter;
use super::hwaddr::HardwareAddr;
use super::socket::{RawSocket, SocketKind};

pub use super::hwaddr::BROADCAST;

/// A packet socket exchanging network-layer packets.
#[derive(Debug)]
pub struct NetworkSocket {
    inner: RawSocket,
}

impl NetworkSocket {
    /// Open a datagram packet socket on `ifname` for `protocol` (host byte
    /// order).
    pub fn open(ifname: &str, protocol: u16) -> Result<Self> {
        RawSocket::open(ifname, SocketKind::Datagram, protocol).map(|inner| Self { inner })
    }

    /// Read one packet.
    pub async fn read(&self, buf: &mut [u8]) -> Result<usize> {
        self.inner.read(buf).await
    }

    /// Receive one packet and the hardware address it came from.
    pub async fn recv_from(&self, buf: &mut [u8]) -> Result<(usize, Option<HardwareAddr>)> {
        self.inner.recv_from(buf).await
    }

    /// Send one packet to `dst`, e.g. [`BROADCAST`].
    pub async fn write(&self, packet: &[u8], dst: &HardwareAddr) -> Result<()> {
        self.inner.send_to(packet, Some(dst)).await
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

impl AsRef<RawSocket> for NetworkSocket {
    fn as_ref(&self) -> &RawSocket {
        &self.inner
    }
}

impl AsRawFd for NetworkSocket {
    fn as_raw_fd(&self) -> RawFd {
        self.inner.as_raw_fd()
    }
}
