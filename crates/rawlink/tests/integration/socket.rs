//! Transport integration tests on the loopback interface.

use std::sync::Arc;
use std::time::{Duration, Instant};

use rawlink::{
    ETH_P_ALL, Error, HardwareAddr, LinkSocket, RawSocket, Result, SockFilter, SocketKind,
};

use crate::common::{ETH_P_EXPERIMENTAL, LOOPBACK, deadline_in, ethernet_frame, read_until};

/// `ret #0`: accept nothing.
const DROP_ALL: [SockFilter; 1] = [SockFilter::new(0x06, 0, 0, 0)];

#[tokio::test]
async fn test_open_binds_interface_and_protocol() -> Result<()> {
    require_root!();

    let sock = RawSocket::open(LOOPBACK, SocketKind::Raw, ETH_P_ALL)?;
    assert_eq!(sock.interface().name(), LOOPBACK);
    assert!(sock.interface().index() > 0);
    assert_eq!(sock.protocol(), ETH_P_ALL);
    assert_eq!(sock.kind(), SocketKind::Raw);

    // The descriptor is handed back non-blocking.
    let flags = unsafe { libc::fcntl(std::os::unix::io::AsRawFd::as_raw_fd(&sock), libc::F_GETFL) };
    assert_ne!(flags & libc::O_NONBLOCK, 0);

    sock.close()
}

#[tokio::test]
async fn test_open_accepts_raw_socket_types() -> Result<()> {
    require_root!();

    RawSocket::open(LOOPBACK, libc::SOCK_RAW, ETH_P_ALL)?.close()?;
    RawSocket::open(LOOPBACK, libc::SOCK_DGRAM, ETH_P_ALL)?.close()?;

    let err = RawSocket::open(LOOPBACK, libc::SOCK_STREAM, ETH_P_ALL).unwrap_err();
    assert!(matches!(err, Error::NotSupported(_)));
    Ok(())
}

#[tokio::test]
async fn test_past_deadline_returns_timeout() -> Result<()> {
    require_root!();

    let sock = RawSocket::open(LOOPBACK, SocketKind::Raw, ETH_P_EXPERIMENTAL)?;
    sock.set_deadline(Some(Instant::now() - Duration::from_millis(1)));

    let started = Instant::now();
    let mut buf = [0u8; 1514];
    assert!(sock.read(&mut buf).await.unwrap_err().is_timeout());
    assert!(sock.recv_from(&mut buf).await.unwrap_err().is_timeout());
    assert!(sock.write(&[0u8; 60]).await.unwrap_err().is_timeout());
    assert!(sock.send_to(&[0u8; 60], None).await.unwrap_err().is_timeout());
    assert!(started.elapsed() < Duration::from_secs(1));
    Ok(())
}

#[tokio::test]
async fn test_idle_read_times_out() -> Result<()> {
    require_root!();

    let sock = RawSocket::open(LOOPBACK, SocketKind::Raw, ETH_P_EXPERIMENTAL)?;
    sock.set_read_deadline(deadline_in(100));

    let started = Instant::now();
    let mut buf = [0u8; 1514];
    assert!(sock.read(&mut buf).await.unwrap_err().is_timeout());
    assert!(started.elapsed() >= Duration::from_millis(100));
    assert!(started.elapsed() < Duration::from_secs(5));
    Ok(())
}

#[tokio::test]
async fn test_frame_roundtrip_with_source() -> Result<()> {
    require_root!();

    let rx = LinkSocket::open(LOOPBACK, ETH_P_EXPERIMENTAL)?;
    let tx = LinkSocket::open(LOOPBACK, ETH_P_EXPERIMENTAL)?;
    rx.set_read_deadline(deadline_in(2000));

    let src = HardwareAddr::new([0x02, 0x00, 0x00, 0x00, 0x00, 0x01]);
    let frame = ethernet_frame(HardwareAddr::BROADCAST, src, b"rawlink roundtrip");
    tx.send(&frame).await?;

    let mut buf = [0u8; 1514];
    loop {
        let (n, from) = rx.recv_from(&mut buf).await?;
        if buf[..n] == frame[..] {
            // Loopback reports the frame's own source address.
            assert_eq!(from, Some(src));
            break;
        }
    }
    Ok(())
}

#[tokio::test]
async fn test_filter_attach_and_detach() -> Result<()> {
    require_root!();

    let rx = LinkSocket::open(LOOPBACK, ETH_P_EXPERIMENTAL)?;
    let tx = LinkSocket::open(LOOPBACK, ETH_P_EXPERIMENTAL)?;
    rx.set_filter(&DROP_ALL)?;

    let frame = ethernet_frame(HardwareAddr::BROADCAST, HardwareAddr::ZERO, b"filtered");
    tx.send(&frame).await?;

    rx.set_read_deadline(deadline_in(200));
    let err = read_until(&rx, |f| f == &frame[..]).await.unwrap_err();
    assert!(err.is_timeout());

    // Detach; the next frame gets through.
    rx.set_filter(&[])?;
    rx.set_read_deadline(deadline_in(2000));
    let frame = ethernet_frame(HardwareAddr::BROADCAST, HardwareAddr::ZERO, b"unfiltered");
    tx.send(&frame).await?;
    read_until(&rx, |f| f == &frame[..]).await?;
    Ok(())
}

#[tokio::test]
async fn test_detach_without_filter_surfaces_kernel_error() -> Result<()> {
    require_root!();

    let sock = RawSocket::open(LOOPBACK, SocketKind::Raw, ETH_P_EXPERIMENTAL)?;
    let err = sock.set_filter(&[]).unwrap_err();
    assert_eq!(err.errno(), Some(libc::ENOENT));
    Ok(())
}

#[tokio::test]
async fn test_filter_change_during_pending_read() -> Result<()> {
    require_root!();

    let rx = Arc::new(LinkSocket::open(LOOPBACK, ETH_P_EXPERIMENTAL)?);
    let tx = LinkSocket::open(LOOPBACK, ETH_P_EXPERIMENTAL)?;
    rx.set_read_deadline(deadline_in(2000));

    let frame = ethernet_frame(HardwareAddr::BROADCAST, HardwareAddr::ZERO, b"concurrent");
    let reader = {
        let rx = Arc::clone(&rx);
        let frame = frame.clone();
        tokio::spawn(async move { read_until(&rx, |f| f == &frame[..]).await })
    };

    // Swap filters while the reader is parked.
    tokio::time::sleep(Duration::from_millis(20)).await;
    rx.set_filter(&DROP_ALL)?;
    rx.set_filter(&[])?;

    tx.send(&frame).await?;
    assert_eq!(reader.await.expect("reader panicked")?, frame);
    Ok(())
}

#[tokio::test]
async fn test_builder_configures_socket() -> Result<()> {
    require_root!();

    let sock = RawSocket::builder(LOOPBACK)
        .kind(SocketKind::Raw)
        .protocol(ETH_P_EXPERIMENTAL)
        .promiscuous(true)
        .filter(DROP_ALL)
        .read_deadline(Instant::now() + Duration::from_millis(50))
        .open()?;

    assert_eq!(sock.protocol(), ETH_P_EXPERIMENTAL);
    let mut buf = [0u8; 64];
    assert!(sock.read(&mut buf).await.unwrap_err().is_timeout());

    sock.set_promiscuous(false)?;
    sock.close()
}
