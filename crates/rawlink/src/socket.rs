//! Async packet (`AF_PACKET`) socket bound to a single interface.
//!
//! The descriptor is non-blocking and registered with the tokio reactor.
//! Every I/O call first waits for readiness, then performs exactly one system
//! call; `EAGAIN` clears the readiness and the task parks again instead of
//! spinning. Read and write deadlines bound each wait.

use std::fmt;
use std::io;
use std::os::unix::io::{AsFd, AsRawFd, BorrowedFd, FromRawFd, IntoRawFd, OwnedFd, RawFd};
use std::str::FromStr;
use std::sync::{Mutex, PoisonError};
use std::time::Instant;

use tokio::io::Interest;
use tokio::io::unix::AsyncFd;
use tokio::sync::watch;

use super::error::{Error, Result};
use super::filter::{self, SockFilter};
use super::hwaddr::{HARDWARE_ADDR_LEN, HardwareAddr};
use super::iface::Interface;

/// Every protocol.
pub const ETH_P_ALL: u16 = 0x0003;
/// Internet Protocol v4.
pub const ETH_P_IP: u16 = 0x0800;
/// Address Resolution Protocol.
pub const ETH_P_ARP: u16 = 0x0806;
/// Internet Protocol v6.
pub const ETH_P_IPV6: u16 = 0x86dd;

// Packet socket options (from linux/if_packet.h)
const PACKET_ADD_MEMBERSHIP: libc::c_int = 1;
const PACKET_DROP_MEMBERSHIP: libc::c_int = 2;
const PACKET_MR_PROMISC: libc::c_ushort = 1;

/// Mirrors `struct packet_mreq`.
#[repr(C)]
struct PacketMreq {
    mr_ifindex: libc::c_int,
    mr_type: libc::c_ushort,
    mr_alen: libc::c_ushort,
    mr_address: [libc::c_uchar; 8],
}

/// Packet socket type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SocketKind {
    /// `SOCK_RAW` - whole link-layer frames, header included.
    Raw,
    /// `SOCK_DGRAM` - the kernel adds and strips the link-layer header.
    Datagram,
}

impl SocketKind {
    /// Get the `socket(2)` type value.
    pub fn as_raw(&self) -> libc::c_int {
        match self {
            SocketKind::Raw => libc::SOCK_RAW,
            SocketKind::Datagram => libc::SOCK_DGRAM,
        }
    }

    /// Get the kind name.
    pub fn name(&self) -> &'static str {
        match self {
            SocketKind::Raw => "raw",
            SocketKind::Datagram => "dgram",
        }
    }
}

impl fmt::Display for SocketKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl TryFrom<libc::c_int> for SocketKind {
    type Error = Error;

    fn try_from(typ: libc::c_int) -> Result<Self> {
        match typ {
            libc::SOCK_RAW => Ok(SocketKind::Raw),
            libc::SOCK_DGRAM => Ok(SocketKind::Datagram),
            other => Err(Error::NotSupported(format!("socket type {}", other))),
        }
    }
}

impl FromStr for SocketKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "raw" => Ok(SocketKind::Raw),
            "dgram" | "datagram" => Ok(SocketKind::Datagram),
            other => Err(Error::NotSupported(format!("socket type {:?}", other))),
        }
    }
}

/// Async packet socket.
pub struct RawSocket {
    /// The underlying async file descriptor.
    fd: AsyncFd<OwnedFd>,
    /// Interface the socket is bound to.
    interface: Interface,
    /// Protocol in host byte order.
    protocol: u16,
    kind: SocketKind,
    /// Serializes socket option changes.
    control: Mutex<()>,
    read_deadline: watch::Sender<Option<Instant>>,
    write_deadline: watch::Sender<Option<Instant>>,
}

impl RawSocket {
    /// Open a packet socket on `ifname` for `protocol` (host byte order).
    ///
    /// `kind` is a [`SocketKind`] or a raw `libc::SOCK_*` value; anything
    /// other than `SOCK_RAW` or `SOCK_DGRAM` fails with
    /// [`Error::NotSupported`] before any resource is allocated.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Example
    ///
    /// ```ignore
    /// use rawlink::{RawSocket, SocketKind, ETH_P_IP};
    ///
    /// let sock = RawSocket::open("eth0", SocketKind::Raw, ETH_P_IP)?;
    /// let mut buf = [0u8; 1514];
    /// let (n, from) = sock.recv_from(&mut buf).await?;
    /// ```
    pub fn open<K>(ifname: &str, kind: K, protocol: u16) -> Result<Self>
    where
        K: TryInto<SocketKind>,
        Error: From<K::Error>,
    {
        let kind = kind.try_into()?;
        let interface = Interface::by_name(ifname)?;

        // SAFETY: plain socket(2) call, result checked below.
        let raw = unsafe { libc::socket(libc::AF_PACKET, kind.as_raw() | libc::SOCK_CLOEXEC, 0) };
        if raw < 0 {
            return Err(Error::last_os_error());
        }
        // SAFETY: raw is a freshly created descriptor owned by nobody else.
        // From here on every early return closes it.
        let fd = unsafe { OwnedFd::from_raw_fd(raw) };

        let addr = link_addr(interface.index(), protocol, None);
        // SAFETY: addr is a fully initialized sockaddr_ll of the given length.
        let ret = unsafe {
            libc::bind(
                fd.as_raw_fd(),
                &addr as *const libc::sockaddr_ll as *const libc::sockaddr,
                std::mem::size_of::<libc::sockaddr_ll>() as libc::socklen_t,
            )
        };
        if ret < 0 {
            return Err(Error::last_os_error());
        }

        set_nonblocking(fd.as_raw_fd())?;

        let socket = Self::from_parts(fd, interface, kind, protocol)?;
        tracing::debug!(
            interface = %socket.interface,
            kind = %kind,
            protocol = format_args!("{:#06x}", protocol),
            "opened packet socket"
        );
        Ok(socket)
    }

    /// Create a builder for configuring a socket before it is opened.
    pub fn builder(ifname: impl Into<String>) -> RawSocketBuilder {
        RawSocketBuilder::new(ifname)
    }

    /// Register an already bound, non-blocking descriptor with the reactor.
    pub(crate) fn from_parts(
        fd: OwnedFd,
        interface: Interface,
        kind: SocketKind,
        protocol: u16,
    ) -> Result<Self> {
        let fd = AsyncFd::with_interest(fd, Interest::READABLE | Interest::WRITABLE)?;
        let (read_deadline, _) = watch::channel(None);
        let (write_deadline, _) = watch::channel(None);

        Ok(Self {
            fd,
            interface,
            protocol,
            kind,
            control: Mutex::new(()),
            read_deadline,
            write_deadline,
        })
    }

    /// Get the interface this socket is bound to.
    pub fn interface(&self) -> &Interface {
        &self.interface
    }

    /// Get the bound protocol (host byte order).
    pub fn protocol(&self) -> u16 {
        self.protocol
    }

    /// Get the socket type.
    pub fn kind(&self) -> SocketKind {
        self.kind
    }

    /// Close the socket, reporting any error from `close(2)`.
    ///
    /// Dropping the socket also closes it, silently.
    pub fn close(self) -> Result<()> {
        let Self { fd, interface, .. } = self;
        let raw = fd.into_inner().into_raw_fd();

        // SAFETY: raw was owned by the OwnedFd released above; nothing else
        // refers to it.
        let ret = unsafe { libc::close(raw) };
        if ret < 0 {
            return Err(Error::last_os_error());
        }

        tracing::debug!(interface = %interface, "closed packet socket");
        Ok(())
    }

    /// Set both the read and the write deadline.
    ///
    /// `None` disables the timeout.
    pub fn set_deadline(&self, deadline: Option<Instant>) {
        self.set_read_deadline(deadline);
        self.set_write_deadline(deadline);
    }

    /// Set the deadline for `read` and `recv_from`.
    ///
    /// A pending read observes the new deadline immediately.
    pub fn set_read_deadline(&self, deadline: Option<Instant>) {
        self.read_deadline.send_replace(deadline);
    }

    /// Set the deadline for `write` and `send_to`.
    pub fn set_write_deadline(&self, deadline: Option<Instant>) {
        self.write_deadline.send_replace(deadline);
    }

    /// Run `f` against the descriptor while holding the control lock.
    ///
    /// Use this for socket options this type does not wrap. Option changes
    /// made through here never interleave with each other.
    pub fn control<R>(&self, f: impl FnOnce(BorrowedFd<'_>) -> io::Result<R>) -> Result<R> {
        let _guard = self.control.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(f(self.fd.get_ref().as_fd())?)
    }

    /// Attach a classic BPF program, or detach the current one if `program`
    /// is empty.
    pub fn set_filter(&self, program: &[SockFilter]) -> Result<()> {
        self.control(|fd| {
            if program.is_empty() {
                filter::detach(fd.as_raw_fd())
            } else {
                filter::attach(fd.as_raw_fd(), program)
            }
        })?;

        tracing::debug!(
            interface = %self.interface,
            instructions = program.len(),
            "updated socket filter"
        );
        Ok(())
    }

    /// Enable or disable promiscuous mode on the bound interface for as long
    /// as this socket is open.
    pub fn set_promiscuous(&self, enable: bool) -> Result<()> {
        let mreq = PacketMreq {
            mr_ifindex: self.interface.index() as libc::c_int,
            mr_type: PACKET_MR_PROMISC,
            mr_alen: 0,
            mr_address: [0; 8],
        };
        let opt = if enable {
            PACKET_ADD_MEMBERSHIP
        } else {
            PACKET_DROP_MEMBERSHIP
        };

        self.control(|fd| {
            // SAFETY: mreq is a live packet_mreq of the given size.
            let ret = unsafe {
                libc::setsockopt(
                    fd.as_raw_fd(),
                    libc::SOL_PACKET,
                    opt,
                    &mreq as *const PacketMreq as *const libc::c_void,
                    std::mem::size_of::<PacketMreq>() as libc::socklen_t,
                )
            };
            if ret < 0 {
                return Err(io::Error::last_os_error());
            }
            Ok(())
        })?;

        tracing::debug!(interface = %self.interface, enable, "set promiscuous mode");
        Ok(())
    }

    /// Read one frame (raw) or packet (datagram) into `buf`.
    pub async fn read(&self, buf: &mut [u8]) -> Result<usize> {
        self.io(Interest::READABLE, &self.read_deadline, |fd| {
            // SAFETY: buf is valid for writes of buf.len() bytes.
            retry_eintr(|| unsafe { libc::read(fd, buf.as_mut_ptr().cast(), buf.len()) })
        })
        .await
    }

    /// Write one frame (raw) or packet (datagram) from `buf`.
    pub async fn write(&self, buf: &[u8]) -> Result<usize> {
        self.io(Interest::WRITABLE, &self.write_deadline, |fd| {
            // SAFETY: buf is valid for reads of buf.len() bytes.
            retry_eintr(|| unsafe { libc::write(fd, buf.as_ptr().cast(), buf.len()) })
        })
        .await
    }

    /// Receive one frame or packet along with its link-layer source.
    ///
    /// The source is `None` when the kernel reports no 6-byte hardware
    /// address for it.
    pub async fn recv_from(&self, buf: &mut [u8]) -> Result<(usize, Option<HardwareAddr>)> {
        self.io(Interest::READABLE, &self.read_deadline, |fd| {
            // SAFETY: sockaddr_ll is plain data; all-zero is a valid value.
            let mut from: libc::sockaddr_ll = unsafe { std::mem::zeroed() };
            let mut from_len = std::mem::size_of::<libc::sockaddr_ll>() as libc::socklen_t;

            // SAFETY: buf and from are valid for writes of the lengths passed.
            let n = retry_eintr(|| unsafe {
                libc::recvfrom(
                    fd,
                    buf.as_mut_ptr().cast(),
                    buf.len(),
                    0,
                    &mut from as *mut libc::sockaddr_ll as *mut libc::sockaddr,
                    &mut from_len,
                )
            })?;

            Ok((n, source_addr(&from, from_len)))
        })
        .await
    }

    /// Send `buf` out of the bound interface.
    ///
    /// With `Some(dst)` the kernel builds the link-layer header towards `dst`
    /// (datagram sockets need this). With `None` the frame is sent as-is.
    pub async fn send_to(&self, buf: &[u8], dst: Option<&HardwareAddr>) -> Result<()> {
        let addr = link_addr(self.interface.index(), self.protocol, dst);

        self.io(Interest::WRITABLE, &self.write_deadline, |fd| {
            // SAFETY: buf and addr are valid for reads of the lengths passed.
            retry_eintr(|| unsafe {
                libc::sendto(
                    fd,
                    buf.as_ptr().cast(),
                    buf.len(),
                    0,
                    &addr as *const libc::sockaddr_ll as *const libc::sockaddr,
                    std::mem::size_of::<libc::sockaddr_ll>() as libc::socklen_t,
                )
            })
        })
        .await?;
        Ok(())
    }

    /// Wait for `interest`, then run `op` once; repeat on `EAGAIN` until the
    /// deadline held by `deadline` passes.
    async fn io<R>(
        &self,
        interest: Interest,
        deadline: &watch::Sender<Option<Instant>>,
        mut op: impl FnMut(RawFd) -> io::Result<R>,
    ) -> Result<R> {
        let mut deadline = deadline.subscribe();

        loop {
            let expires_at = *deadline.borrow_and_update();
            if expires_at.is_some_and(|at| at <= Instant::now()) {
                return Err(Error::Timeout);
            }

            let mut guard = tokio::select! {
                guard = self.fd.ready(interest) => guard?,
                () = sleep_until(expires_at) => return Err(Error::Timeout),
                Ok(()) = deadline.changed() => continue,
            };

            match guard.try_io(|inner| op(inner.as_raw_fd())) {
                Ok(result) => return Ok(result?),
                Err(_would_block) => {
                    tracing::trace!(interface = %self.interface, ?interest, "would block");
                    continue;
                }
            }
        }
    }
}

impl fmt::Debug for RawSocket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawSocket")
            .field("fd", &self.fd.as_raw_fd())
            .field("interface", &self.interface)
            .field("kind", &self.kind)
            .field("protocol", &format_args!("{:#06x}", self.protocol))
            .finish()
    }
}

impl AsRawFd for RawSocket {
    fn as_raw_fd(&self) -> RawFd {
        self.fd.as_raw_fd()
    }
}

impl AsFd for RawSocket {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.fd.get_ref().as_fd()
    }
}

/// Builder for opening a configured [`RawSocket`].
///
/// Defaults to a raw socket receiving every protocol, with no filter, no
/// promiscuous mode and no deadlines.
#[derive(Debug, Clone)]
pub struct RawSocketBuilder {
    interface: String,
    kind: SocketKind,
    protocol: u16,
    promiscuous: bool,
    filter: Vec<SockFilter>,
    read_deadline: Option<Instant>,
    write_deadline: Option<Instant>,
}

impl RawSocketBuilder {
    /// Create a new builder for the named interface.
    pub fn new(interface: impl Into<String>) -> Self {
        Self {
            interface: interface.into(),
            kind: SocketKind::Raw,
            protocol: ETH_P_ALL,
            promiscuous: false,
            filter: Vec::new(),
            read_deadline: None,
            write_deadline: None,
        }
    }

    /// Set the socket type.
    pub fn kind(mut self, kind: SocketKind) -> Self {
        self.kind = kind;
        self
    }

    /// Set the protocol (host byte order), e.g. [`ETH_P_IP`].
    pub fn protocol(mut self, protocol: u16) -> Self {
        self.protocol = protocol;
        self
    }

    /// Put the interface into promiscuous mode once opened.
    pub fn promiscuous(mut self, value: bool) -> Self {
        self.promiscuous = value;
        self
    }

    /// Attach a classic BPF program once opened.
    pub fn filter(mut self, program: impl Into<Vec<SockFilter>>) -> Self {
        self.filter = program.into();
        self
    }

    /// Set the initial read deadline.
    pub fn read_deadline(mut self, deadline: Instant) -> Self {
        self.read_deadline = Some(deadline);
        self
    }

    /// Set the initial write deadline.
    pub fn write_deadline(mut self, deadline: Instant) -> Self {
        self.write_deadline = Some(deadline);
        self
    }

    /// Open the socket and apply the configuration.
    ///
    /// If a later step fails the socket is dropped (and closed) before the
    /// error is returned.
    pub fn open(self) -> Result<RawSocket> {
        let socket = RawSocket::open(&self.interface, self.kind, self.protocol)?;

        if !self.filter.is_empty() {
            socket.set_filter(&self.filter)?;
        }
        if self.promiscuous {
            socket.set_promiscuous(true)?;
        }
        socket.set_read_deadline(self.read_deadline);
        socket.set_write_deadline(self.write_deadline);

        Ok(socket)
    }
}

/// Build the `sockaddr_ll` used for bind and send.
pub(crate) fn link_addr(
    ifindex: u32,
    protocol: u16,
    dst: Option<&HardwareAddr>,
) -> libc::sockaddr_ll {
    // SAFETY: sockaddr_ll is plain data; all-zero is a valid value.
    let mut addr: libc::sockaddr_ll = unsafe { std::mem::zeroed() };
    addr.sll_family = libc::AF_PACKET as libc::c_ushort;
    addr.sll_protocol = protocol.to_be();
    addr.sll_ifindex = ifindex as libc::c_int;
    if let Some(dst) = dst {
        addr.sll_halen = HARDWARE_ADDR_LEN as libc::c_uchar;
        addr.sll_addr[..HARDWARE_ADDR_LEN].copy_from_slice(dst.as_ref());
    }
    addr
}

/// Decode the source hardware address reported by `recvfrom(2)`.
fn source_addr(from: &libc::sockaddr_ll, from_len: libc::socklen_t) -> Option<HardwareAddr> {
    if from_len == 0
        || from.sll_family != libc::AF_PACKET as libc::c_ushort
        || usize::from(from.sll_halen) < HARDWARE_ADDR_LEN
    {
        return None;
    }
    HardwareAddr::from_slice(&from.sll_addr)
}

fn set_nonblocking(fd: RawFd) -> Result<()> {
    // SAFETY: fcntl on a descriptor we own; results checked.
    let flags = unsafe { libc::fcntl(fd, libc::F_GETFL) };
    if flags < 0 {
        return Err(Error::last_os_error());
    }
    let ret = unsafe { libc::fcntl(fd, libc::F_SETFL, flags | libc::O_NONBLOCK) };
    if ret < 0 {
        return Err(Error::last_os_error());
    }
    Ok(())
}

/// Run a byte-count returning system call, retrying on `EINTR`.
fn retry_eintr(mut f: impl FnMut() -> libc::ssize_t) -> io::Result<usize> {
    loop {
        let ret = f();
        if ret >= 0 {
            return Ok(ret as usize);
        }
        let err = io::Error::last_os_error();
        if err.kind() != io::ErrorKind::Interrupted {
            return Err(err);
        }
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(at.into()).await,
        None => std::future::pending().await,
    }
}
