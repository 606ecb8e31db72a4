//! Link-layer (MAC) addresses.

use std::fmt;
use std::str::FromStr;

use super::error::{Error, Result};

/// Length of an Ethernet hardware address.
pub const HARDWARE_ADDR_LEN: usize = 6;

/// A 6-byte link-layer hardware address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct HardwareAddr([u8; HARDWARE_ADDR_LEN]);

/// The broadcast hardware address `ff:ff:ff:ff:ff:ff`.
pub const BROADCAST: HardwareAddr = HardwareAddr::BROADCAST;

impl HardwareAddr {
    /// The broadcast address `ff:ff:ff:ff:ff:ff`.
    pub const BROADCAST: Self = Self([0xff; HARDWARE_ADDR_LEN]);

    /// The all-zero address.
    pub const ZERO: Self = Self([0; HARDWARE_ADDR_LEN]);

    /// Create an address from its octets.
    #[inline]
    pub const fn new(octets: [u8; HARDWARE_ADDR_LEN]) -> Self {
        Self(octets)
    }

    /// Build an address from the first six bytes of a slice.
    ///
    /// Returns `None` if the slice is shorter than six bytes.
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        let octets = bytes.get(..HARDWARE_ADDR_LEN)?.try_into().ok()?;
        Some(Self(octets))
    }

    /// Get the address octets.
    #[inline]
    pub const fn octets(&self) -> [u8; HARDWARE_ADDR_LEN] {
        self.0
    }

    /// Check if this is the broadcast address.
    pub fn is_broadcast(&self) -> bool {
        *self == Self::BROADCAST
    }

    /// Check if the group bit is set (multicast or broadcast).
    pub fn is_multicast(&self) -> bool {
        self.0[0] & 0x01 != 0
    }

    /// Check if this is the all-zero address.
    pub fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }
}

impl AsRef<[u8]> for HardwareAddr {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; HARDWARE_ADDR_LEN]> for HardwareAddr {
    fn from(octets: [u8; HARDWARE_ADDR_LEN]) -> Self {
        Self(octets)
    }
}

impl From<HardwareAddr> for [u8; HARDWARE_ADDR_LEN] {
    fn from(addr: HardwareAddr) -> Self {
        addr.0
    }
}

impl fmt::Display for HardwareAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let b = &self.0;
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            b[0], b[1], b[2], b[3], b[4], b[5]
        )
    }
}

impl FromStr for HardwareAddr {
    type Err = Error;

    /// Parse `aa:bb:cc:dd:ee:ff` (or `-` separated) notation.
    fn from_str(s: &str) -> Result<Self> {
        let sep = if s.contains('-') { '-' } else { ':' };
        let parts: Vec<&str> = s.split(sep).collect();
        if parts.len() != HARDWARE_ADDR_LEN {
            return Err(Error::InvalidHardwareAddr(s.to_string()));
        }

        let mut octets = [0u8; HARDWARE_ADDR_LEN];
        for (octet, part) in octets.iter_mut().zip(&parts) {
            if part.is_empty() || part.len() > 2 {
                return Err(Error::InvalidHardwareAddr(s.to_string()));
            }
            *octet = u8::from_str_radix(part, 16)
                .map_err(|_| Error::InvalidHardwareAddr(s.to_string()))?;
        }

        Ok(Self(octets))
    }
}
