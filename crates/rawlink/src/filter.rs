//! Classic BPF socket filters.
//!
//! Programs are opaque to this crate: they are handed to the kernel with
//! `SO_ATTACH_FILTER` and removed with `SO_DETACH_FILTER`. Build them with a
//! tool such as `tcpdump -dd` or by hand.

use std::io;
use std::os::unix::io::RawFd;

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

/// Maximum number of instructions the kernel accepts in one program.
pub const BPF_MAXINSNS: usize = 4096;

/// A single classic BPF instruction (mirrors `struct sock_filter`).
#[repr(C)]
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, FromBytes, IntoBytes, Immutable, KnownLayout,
)]
pub struct SockFilter {
    /// Opcode.
    pub code: u16,
    /// Jump offset if true.
    pub jt: u8,
    /// Jump offset if false.
    pub jf: u8,
    /// Generic multiuse field.
    pub k: u32,
}

const _: () = assert!(std::mem::size_of::<SockFilter>() == 8);

impl SockFilter {
    /// Create an instruction from its raw fields.
    #[inline]
    pub const fn new(code: u16, jt: u8, jf: u8, k: u32) -> Self {
        Self { code, jt, jf, k }
    }

    /// Decode a program from the raw `struct sock_filter` array layout.
    ///
    /// Returns `None` if `bytes` is not a whole number of instructions.
    pub fn program_from_bytes(bytes: &[u8]) -> Option<Vec<Self>> {
        let chunks = bytes.chunks_exact(std::mem::size_of::<Self>());
        if !chunks.remainder().is_empty() {
            return None;
        }
        chunks.map(|chunk| Self::read_from_bytes(chunk).ok()).collect()
    }
}

impl From<(u16, u8, u8, u32)> for SockFilter {
    /// Build from the `{ code, jt, jf, k }` tuples printed by `tcpdump -dd`.
    fn from((code, jt, jf, k): (u16, u8, u8, u32)) -> Self {
        Self::new(code, jt, jf, k)
    }
}

/// Attach `program` to `fd`, replacing any program already attached.
pub(crate) fn attach(fd: RawFd, program: &[SockFilter]) -> io::Result<()> {
    let len = u16::try_from(program.len())
        .ok()
        .filter(|&len| usize::from(len) <= BPF_MAXINSNS)
        .ok_or_else(|| io::Error::from_raw_os_error(libc::EINVAL))?;

    let fprog = libc::sock_fprog {
        len,
        // The kernel copies the program and never writes through this pointer.
        filter: program.as_ptr() as *mut libc::sock_filter,
    };

    // SAFETY: fprog points at `len` initialized instructions laid out as
    // struct sock_filter, alive for the duration of the call.
    let ret = unsafe {
        libc::setsockopt(
            fd,
            libc::SOL_SOCKET,
            libc::SO_ATTACH_FILTER,
            &fprog as *const libc::sock_fprog as *const libc::c_void,
            std::mem::size_of::<libc::sock_fprog>() as libc::socklen_t,
        )
    };
    if ret < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

/// Detach whatever program is attached to `fd`.
pub(crate) fn detach(fd: RawFd) -> io::Result<()> {
    let zero: libc::c_int = 0;

    // SAFETY: the option value is a plain int that outlives the call.
    let ret = unsafe {
        libc::setsockopt(
            fd,
            libc::SOL_SOCKET,
            libc::SO_DETACH_FILTER,
            &zero as *const libc::c_int as *const libc::c_void,
            std::mem::size_of::<libc::c_int>() as libc::socklen_t,
        )
    };
    if ret < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}
