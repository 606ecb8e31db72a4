//! Broadcast a UDP datagram from a datagram packet socket.
//!
//! Builds the UDP and IPv4 headers by hand and lets the kernel add the
//! Ethernet header towards ff:ff:ff:ff:ff:ff.
//!
//! Run with: sudo cargo run -p rawlink --example udp_broadcast -- eth0 [port] [message]
//!
//! Lifecycle events are logged at debug level:
//!   RUST_LOG=rawlink=debug sudo -E cargo run -p rawlink --example udp_broadcast -- eth0

use std::env;
use std::net::Ipv4Addr;
use std::time::{Duration, Instant};

use rawlink::network::{BROADCAST, NetworkSocket};
use rawlink::packet::{IPPROTO_UDP, Ipv4Header, Ipv4Packet, UdpPacket};
use rawlink::ETH_P_IP;

#[tokio::main]
async fn main() -> rawlink::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .init();

    let args: Vec<String> = env::args().collect();
    let Some(dev) = args.get(1) else {
        eprintln!("usage: udp_broadcast <interface> [port] [message]");
        std::process::exit(1);
    };
    let port: u16 = args.get(2).and_then(|s| s.parse().ok()).unwrap_or(9);
    let message = args.get(3).cloned().unwrap_or_else(|| "hello from rawlink".into());

    let src = Ipv4Addr::UNSPECIFIED;
    let dst = Ipv4Addr::BROADCAST;

    let mut udp = UdpPacket::new(src, port, dst, port, message.into_bytes());
    let segment = udp.marshal();

    let mut ip = Ipv4Packet::new(Ipv4Header::new(IPPROTO_UDP, src, dst), segment);
    let packet = ip.marshal()?;

    let sock = NetworkSocket::open(dev, ETH_P_IP)?;
    sock.set_write_deadline(Some(Instant::now() + Duration::from_secs(1)));
    sock.write(&packet, &BROADCAST).await?;

    println!(
        "sent {} bytes to {}:{} via {} (udp checksum {:#06x}, ip checksum {:#06x})",
        packet.len(),
        dst,
        port,
        dev,
        udp.checksum,
        ip.header.checksum
    );

    sock.close()
}
