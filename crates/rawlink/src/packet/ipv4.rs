//! IPv4 header marshaling.

use std::net::Ipv4Addr;

use bytes::{BufMut, Bytes, BytesMut};
use zerocopy::byteorder::network_endian::U16;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

use crate::checksum::checksum;
use crate::error::{Error, Result};

/// IP version written by [`Ipv4Packet::marshal`].
pub const IPV4_VERSION: u8 = 4;

/// Length of an IPv4 header without options.
pub const IPV4_HEADER_LEN: usize = 20;

/// Maximum length of IPv4 options (IHL is at most 15 words).
pub const IPV4_MAX_OPTIONS_LEN: usize = 40;

/// More fragments follow.
pub const FLAG_MORE_FRAGMENTS: u8 = 0x1;
/// Do not fragment.
pub const FLAG_DONT_FRAGMENT: u8 = 0x2;

/// Fixed part of the IPv4 header as it appears on the wire.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
struct Ipv4Wire {
    version_ihl: u8,
    tos: u8,
    total_len: U16,
    id: U16,
    flags_frag_off: U16,
    ttl: u8,
    protocol: u8,
    checksum: U16,
    src: [u8; 4],
    dst: [u8; 4],
}

const _: () = assert!(std::mem::size_of::<Ipv4Wire>() == IPV4_HEADER_LEN);

/// Byte offset of the checksum field.
const CHECKSUM_OFFSET: usize = 10;

/// IPv4 header fields.
///
/// `version`, `header_len`, `total_len` and `checksum` are outputs: they are
/// overwritten by [`Ipv4Packet::marshal`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ipv4Header {
    /// Protocol version.
    pub version: u8,
    /// Header length in bytes, options included.
    pub header_len: usize,
    /// Type of service.
    pub tos: u8,
    /// Header plus payload length in bytes.
    pub total_len: u16,
    /// Identification.
    pub id: u16,
    /// `FLAG_*` bits.
    pub flags: u8,
    /// Fragment offset in 8-byte units.
    pub frag_offset: u16,
    /// Time to live.
    pub ttl: u8,
    /// Next level protocol, e.g. [`IPPROTO_UDP`](super::IPPROTO_UDP).
    pub protocol: u8,
    /// Header checksum.
    pub checksum: u16,
    /// Source address.
    pub src: Ipv4Addr,
    /// Destination address.
    pub dst: Ipv4Addr,
    /// Raw options, a multiple of 4 bytes.
    pub options: Vec<u8>,
}

impl Ipv4Header {
    /// Create a header with a TTL of 64 and no options.
    pub fn new(protocol: u8, src: Ipv4Addr, dst: Ipv4Addr) -> Self {
        Self {
            protocol,
            src,
            dst,
            ..Default::default()
        }
    }
}

impl Default for Ipv4Header {
    fn default() -> Self {
        Self {
            version: IPV4_VERSION,
            header_len: IPV4_HEADER_LEN,
            tos: 0,
            total_len: 0,
            id: 0,
            flags: 0,
            frag_offset: 0,
            ttl: 64,
            protocol: 0,
            checksum: 0,
            src: Ipv4Addr::UNSPECIFIED,
            dst: Ipv4Addr::UNSPECIFIED,
            options: Vec::new(),
        }
    }
}

/// An IPv4 header and its payload.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Ipv4Packet {
    /// Header fields.
    pub header: Ipv4Header,
    /// Payload, copied verbatim after the header.
    pub payload: Bytes,
}

impl Ipv4Packet {
    /// Create a packet from a header and payload.
    pub fn new(header: Ipv4Header, payload: impl Into<Bytes>) -> Self {
        Self {
            header,
            payload: payload.into(),
        }
    }

    /// Serialize header and payload with lengths and checksum filled in.
    ///
    /// The computed `version`, `header_len`, `total_len` and `checksum` are
    /// also stored back into `self.header`.
    pub fn marshal(&mut self) -> Result<Bytes> {
        let options_len = self.header.options.len();
        if options_len % 4 != 0 {
            return Err(Error::InvalidOptions(format!(
                "length {} is not a multiple of 4",
                options_len
            )));
        }
        if options_len > IPV4_MAX_OPTIONS_LEN {
            return Err(Error::InvalidOptions(format!(
                "length {} exceeds {}",
                options_len, IPV4_MAX_OPTIONS_LEN
            )));
        }

        let header_len = IPV4_HEADER_LEN + options_len;
        let total_len = header_len + self.payload.len();
        let total_len_field =
            u16::try_from(total_len).map_err(|_| Error::PacketTooLarge { len: total_len })?;

        let header = &mut self.header;
        header.version = IPV4_VERSION;
        header.header_len = header_len;
        header.total_len = total_len_field;
        header.checksum = 0;

        let wire = Ipv4Wire {
            version_ihl: (IPV4_VERSION << 4) | (header_len / 4) as u8,
            tos: header.tos,
            total_len: U16::new(total_len_field),
            id: U16::new(header.id),
            flags_frag_off: U16::new(
                (u16::from(header.flags & 0x7) << 13) | (header.frag_offset & 0x1fff),
            ),
            ttl: header.ttl,
            protocol: header.protocol,
            checksum: U16::ZERO,
            src: header.src.octets(),
            dst: header.dst.octets(),
        };

        let mut buf = BytesMut::with_capacity(total_len);
        buf.put_slice(wire.as_bytes());
        buf.put_slice(&header.options);

        let sum = checksum(&buf[..header_len]);
        buf[CHECKSUM_OFFSET..CHECKSUM_OFFSET + 2].copy_from_slice(&sum.to_be_bytes());
        header.checksum = sum;

        buf.put_slice(&self.payload);
        Ok(buf.freeze())
    }
}
