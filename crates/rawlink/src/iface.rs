//! Network interface resolution.

use std::ffi::CString;
use std::fmt;

use super::error::{Error, Result};
use super::hwaddr::HardwareAddr;

/// Maximum interface name length (including null terminator).
pub const IFNAMSIZ: usize = libc::IFNAMSIZ;

/// A resolved network interface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interface {
    name: String,
    index: u32,
    hardware_addr: Option<HardwareAddr>,
}

impl Interface {
    /// Resolve an interface by name.
    ///
    /// The hardware address is read from sysfs; interfaces without a 6-byte
    /// link-layer address (tun devices, some tunnels) resolve with `None`.
    pub fn by_name(name: &str) -> Result<Self> {
        let index = name_to_index(name)?;
        let hardware_addr = std::fs::read_to_string(format!("/sys/class/net/{}/address", name))
            .ok()
            .and_then(|s| s.trim().parse().ok());

        Ok(Self {
            name: name.to_string(),
            index,
            hardware_addr,
        })
    }

    #[cfg(test)]
    pub(crate) fn from_parts(name: &str, index: u32, hardware_addr: Option<HardwareAddr>) -> Self {
        Self {
            name: name.to_string(),
            index,
            hardware_addr,
        }
    }

    /// Get the interface name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the kernel interface index.
    pub fn index(&self) -> u32 {
        self.index
    }

    /// Get the interface's own hardware address, if it has one.
    pub fn hardware_addr(&self) -> Option<HardwareAddr> {
        self.hardware_addr
    }
}

impl fmt::Display for Interface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (ifindex {})", self.name, self.index)
    }
}

/// Validate an interface name.
pub fn validate(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::InvalidInterfaceName("empty name".to_string()));
    }

    if name.len() >= IFNAMSIZ {
        return Err(Error::InvalidInterfaceName(format!(
            "name too long (max {} chars)",
            IFNAMSIZ - 1
        )));
    }

    if name.contains('/') || name.contains('\0') {
        return Err(Error::InvalidInterfaceName(
            "name contains invalid characters".to_string(),
        ));
    }

    if name.chars().any(|c| c.is_whitespace()) {
        return Err(Error::InvalidInterfaceName(
            "name contains whitespace".to_string(),
        ));
    }

    Ok(())
}

/// Convert an interface name to its index.
pub fn name_to_index(name: &str) -> Result<u32> {
    validate(name)?;

    let c_name = CString::new(name).map_err(|_| Error::InvalidInterfaceName(name.to_string()))?;

    // SAFETY: c_name is a valid NUL-terminated string for the duration of the call.
    let index = unsafe { libc::if_nametoindex(c_name.as_ptr()) };
    if index == 0 {
        return Err(Error::InterfaceNotFound {
            name: name.to_string(),
        });
    }

    Ok(index)
}
