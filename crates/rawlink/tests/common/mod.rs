//! Common test utilities for integration tests.

use std::time::{Duration, Instant};

use rawlink::{HardwareAddr, LinkSocket, Result};

/// Interface every test runs on.
pub const LOOPBACK: &str = "lo";

/// IEEE 802 local experimental EtherType, unused by anything else on `lo`.
pub const ETH_P_EXPERIMENTAL: u16 = 0x88b5;

/// Check if running as root.
pub fn is_root() -> bool {
    unsafe { libc::geteuid() == 0 }
}

/// Skip the test if not running as root.
#[macro_export]
macro_rules! require_root {
    () => {
        if !crate::common::is_root() {
            eprintln!("Skipping test: requires root");
            return Ok(());
        }
    };
}

/// Deadline `ms` milliseconds from now.
pub fn deadline_in(ms: u64) -> Option<Instant> {
    Some(Instant::now() + Duration::from_millis(ms))
}

/// Build an Ethernet frame with the experimental EtherType.
pub fn ethernet_frame(dst: HardwareAddr, src: HardwareAddr, payload: &[u8]) -> Vec<u8> {
    let mut frame = Vec::with_capacity(14 + payload.len());
    frame.extend_from_slice(dst.as_ref());
    frame.extend_from_slice(src.as_ref());
    frame.extend_from_slice(&ETH_P_EXPERIMENTAL.to_be_bytes());
    frame.extend_from_slice(payload);
    frame
}

/// Read frames until one satisfies `pred` or the read deadline passes.
pub async fn read_until(
    sock: &LinkSocket,
    mut pred: impl FnMut(&[u8]) -> bool,
) -> Result<Vec<u8>> {
    let mut buf = vec![0u8; 65536];
    loop {
        let n = sock.read(&mut buf).await?;
        if pred(&buf[..n]) {
            return Ok(buf[..n].to_vec());
        }
    }
}
