//! Outbound packet builders.
//!
//! These produce wire-ready bytes to hand to a socket's write path; they
//! never touch a socket themselves.

pub mod ipv4;
pub mod udp;

pub use ipv4::{Ipv4Header, Ipv4Packet};
pub use udp::UdpPacket;

/// Internet Control Message Protocol.
pub const IPPROTO_ICMP: u8 = 1;
/// Transmission Control Protocol.
pub const IPPROTO_TCP: u8 = 6;
/// User Datagram Protocol.
pub const IPPROTO_UDP: u8 = 17;
