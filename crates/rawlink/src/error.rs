//! Error types for packet socket and marshaling operations.

use std::convert::Infallible;
use std::io;

/// Result type for rawlink operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while opening, driving or marshaling for a packet socket.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O error from a system call, errno preserved.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Requested configuration is not supported (e.g. a socket type other
    /// than `SOCK_RAW` or `SOCK_DGRAM`).
    #[error("operation not supported: {0}")]
    NotSupported(String),

    /// Interface not found.
    #[error("interface not found: {name}")]
    InterfaceNotFound {
        /// The interface name that was not found.
        name: String,
    },

    /// Interface name is not a valid kernel interface name.
    #[error("invalid interface name: {0}")]
    InvalidInterfaceName(String),

    /// Hardware address could not be parsed.
    #[error("invalid hardware address: {0}")]
    InvalidHardwareAddr(String),

    /// The read or write deadline passed before the operation completed.
    #[error("i/o timeout")]
    Timeout,

    /// IPv4 options cannot be encoded in the header length field.
    #[error("invalid IPv4 options: {0}")]
    InvalidOptions(String),

    /// Packet does not fit in a 16-bit total length field.
    #[error("packet too large: {len} bytes exceeds 65535")]
    PacketTooLarge {
        /// The length that would have been encoded.
        len: usize,
    },
}

impl Error {
    /// Check if this error is a deadline expiry.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout)
    }

    /// Check if this is a "not found" error (ENOENT, ENODEV, ENXIO, or an
    /// unresolved interface).
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::Io(e) => matches!(
                e.raw_os_error(),
                Some(libc::ENOENT | libc::ENODEV | libc::ENXIO)
            ),
            Self::InterfaceNotFound { .. } => true,
            _ => false,
        }
    }

    /// Check if this is a permission error (EPERM, EACCES).
    ///
    /// Opening a packet socket needs `CAP_NET_RAW`; without it the kernel
    /// answers with EPERM.
    pub fn is_permission_denied(&self) -> bool {
        match self {
            Self::Io(e) => matches!(e.raw_os_error(), Some(libc::EPERM | libc::EACCES)),
            _ => false,
        }
    }

    /// Get the errno value if this error came from a system call.
    pub fn errno(&self) -> Option<i32> {
        match self {
            Self::Io(e) => e.raw_os_error(),
            _ => None,
        }
    }

    /// Capture the calling thread's errno.
    pub(crate) fn last_os_error() -> Self {
        Self::Io(io::Error::last_os_error())
    }
}

impl From<Infallible> for Error {
    fn from(never: Infallible) -> Self {
        match never {}
    }
}
