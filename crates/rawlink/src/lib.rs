//! Async link-layer sockets and packet builders for Linux.
//!
//! This crate opens `AF_PACKET` sockets bound to a single interface and
//! drives them through the tokio reactor with per-direction deadlines. It
//! also builds checksummed IPv4 and UDP headers to send through them.
//!
//! - [`RawSocket`] - the transport: `SOCK_RAW` or `SOCK_DGRAM`, deadlines,
//!   classic BPF filters, promiscuous mode
//! - [`LinkSocket`] - whole Ethernet frames, destination implied by the frame
//! - [`NetworkSocket`] - network-layer packets, explicit destination address
//! - [`packet`] - [`Ipv4Packet`] and [`UdpPacket`] marshaling
//!
//! Opening a packet socket needs `CAP_NET_RAW`.
//!
//! # Example
//!
//! ```ignore
//! use std::net::Ipv4Addr;
//! use rawlink::network::{NetworkSocket, BROADCAST};
//! use rawlink::packet::{Ipv4Header, Ipv4Packet, UdpPacket, IPPROTO_UDP};
//! use rawlink::ETH_P_IP;
//!
//! #[tokio::main]
//! async fn main() -> rawlink::Result<()> {
//!     let sock = NetworkSocket::open("eth0", ETH_P_IP)?;
//!
//!     let src = Ipv4Addr::UNSPECIFIED;
//!     let dst = Ipv4Addr::BROADCAST;
//!     let udp = UdpPacket::new(src, 68, dst, 67, &b"hello"[..]).marshal();
//!     let ip = Ipv4Packet::new(Ipv4Header::new(IPPROTO_UDP, src, dst), udp).marshal()?;
//!
//!     sock.write(&ip, &BROADCAST).await
//! }
//! ```

pub mod checksum;
pub mod error;
pub mod filter;
pub mod hwaddr;
pub mod iface;
pub mod link;
pub mod network;
pub mod packet;
pub mod socket;

pub use checksum::checksum;
pub use error::{Error, Result};
pub use filter::SockFilter;
pub use hwaddr::{BROADCAST, HardwareAddr};
pub use iface::Interface;
pub use link::LinkSocket;
pub use network::NetworkSocket;
pub use packet::{Ipv4Header, Ipv4Packet, UdpPacket};
pub use socket::{
    ETH_P_ALL, ETH_P_ARP, ETH_P_IP, ETH_P_IPV6, RawSocket, RawSocketBuilder, SocketKind,
};
