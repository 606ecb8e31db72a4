//! UDP header marshaling with the IPv4 pseudo-header checksum.

use std::net::Ipv4Addr;

use bytes::{BufMut, Bytes, BytesMut};
use zerocopy::byteorder::network_endian::U16;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

use super::IPPROTO_UDP;
use crate::checksum::checksum;

/// Length of the UDP header.
pub const UDP_HEADER_LEN: usize = 8;

/// Largest payload whose length still fits the 16-bit length field.
pub const UDP_MAX_PAYLOAD_LEN: usize = u16::MAX as usize - UDP_HEADER_LEN;

const PSEUDO_HEADER_LEN: usize = 12;

/// IPv4 pseudo-header, only ever fed to the checksum.
#[repr(C)]
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
struct PseudoHeader {
    src: [u8; 4],
    dst: [u8; 4],
    zero: u8,
    protocol: u8,
    udp_len: U16,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
struct UdpWire {
    src_port: U16,
    dst_port: U16,
    len: U16,
    checksum: U16,
}

const _: () = assert!(std::mem::size_of::<PseudoHeader>() == PSEUDO_HEADER_LEN);
const _: () = assert!(std::mem::size_of::<UdpWire>() == UDP_HEADER_LEN);

/// A UDP datagram addressed between two IPv4 endpoints.
///
/// `len` and `checksum` are outputs of [`UdpPacket::marshal`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UdpPacket {
    /// Source address (pseudo-header only).
    pub src_ip: Ipv4Addr,
    /// Destination address (pseudo-header only).
    pub dst_ip: Ipv4Addr,
    /// Source port.
    pub src_port: u16,
    /// Destination port.
    pub dst_port: u16,
    /// Header plus payload length.
    pub len: u16,
    /// Checksum over pseudo-header, header and payload.
    pub checksum: u16,
    /// Payload.
    pub payload: Bytes,
}

impl UdpPacket {
    /// Create a datagram; length and checksum are filled in by `marshal`.
    pub fn new(
        src_ip: Ipv4Addr,
        src_port: u16,
        dst_ip: Ipv4Addr,
        dst_port: u16,
        payload: impl Into<Bytes>,
    ) -> Self {
        Self {
            src_ip,
            dst_ip,
            src_port,
            dst_port,
            len: 0,
            checksum: 0,
            payload: payload.into(),
        }
    }

    /// Serialize the UDP header and payload.
    ///
    /// The checksum covers the IPv4 pseudo-header, which is not part of the
    /// output. `len` and `checksum` are stored back into `self`.
    ///
    /// The payload must not exceed [`UDP_MAX_PAYLOAD_LEN`] bytes.
    pub fn marshal(&mut self) -> Bytes {
        debug_assert!(
            self.payload.len() <= UDP_MAX_PAYLOAD_LEN,
            "UDP payload of {} bytes overflows the length field",
            self.payload.len()
        );

        self.checksum = 0;
        self.len = (UDP_HEADER_LEN + self.payload.len()) as u16;

        let pseudo = PseudoHeader {
            src: self.src_ip.octets(),
            dst: self.dst_ip.octets(),
            zero: 0,
            protocol: IPPROTO_UDP,
            udp_len: U16::new(self.len),
        };
        let header = UdpWire {
            src_port: U16::new(self.src_port),
            dst_port: U16::new(self.dst_port),
            len: U16::new(self.len),
            checksum: U16::ZERO,
        };

        let mut buf = BytesMut::with_capacity(PSEUDO_HEADER_LEN + usize::from(self.len));
        buf.put_slice(pseudo.as_bytes());
        buf.put_slice(header.as_bytes());
        buf.put_slice(&self.payload);

        self.checksum = checksum(&buf);
        let at = PSEUDO_HEADER_LEN + 6;
        buf[at..at + 2].copy_from_slice(&self.checksum.to_be_bytes());

        buf.split_off(PSEUDO_HEADER_LEN).freeze()
    }
}
