//! Link-layer and network-layer view tests with marshaled packets.

use std::net::Ipv4Addr;

use rawlink::network::BROADCAST;
use rawlink::packet::{IPPROTO_UDP, Ipv4Header, Ipv4Packet, UdpPacket};
use rawlink::{ETH_P_IP, LinkSocket, NetworkSocket, Result, checksum};

use crate::common::{LOOPBACK, deadline_in, read_until};

fn udp_datagram(payload: &'static [u8]) -> Result<Vec<u8>> {
    let src = Ipv4Addr::LOCALHOST;
    let dst = Ipv4Addr::LOCALHOST;

    let mut udp = UdpPacket::new(src, 40000, dst, 9, payload);
    let mut ip = Ipv4Packet::new(Ipv4Header::new(IPPROTO_UDP, src, dst), udp.marshal());
    Ok(ip.marshal()?.to_vec())
}

#[tokio::test]
async fn test_network_write_adds_link_header() -> Result<()> {
    require_root!();

    let sniffer = LinkSocket::open(LOOPBACK, ETH_P_IP)?;
    let sender = NetworkSocket::open(LOOPBACK, ETH_P_IP)?;
    sniffer.set_read_deadline(deadline_in(2000));

    let packet = udp_datagram(b"network view")?;
    sender.write(&packet, &BROADCAST).await?;

    let frame = read_until(&sniffer, |f| f.len() > 14 && f[14..] == packet[..]).await?;
    assert_eq!(&frame[..6], BROADCAST.as_ref());
    assert_eq!(&frame[12..14], &ETH_P_IP.to_be_bytes());

    // The header went out with a valid checksum.
    assert_eq!(checksum(&frame[14..34]), 0);
    Ok(())
}

#[tokio::test]
async fn test_network_read_strips_link_header() -> Result<()> {
    require_root!();

    let receiver = NetworkSocket::open(LOOPBACK, ETH_P_IP)?;
    let sender = NetworkSocket::open(LOOPBACK, ETH_P_IP)?;
    receiver.set_read_deadline(deadline_in(2000));

    let packet = udp_datagram(b"stripped")?;
    sender.write(&packet, &BROADCAST).await?;

    let mut buf = vec![0u8; 65536];
    loop {
        let (n, from) = receiver.recv_from(&mut buf).await?;
        if buf[..n] == packet[..] {
            assert!(from.is_some());
            break;
        }
    }
    Ok(())
}

#[tokio::test]
async fn test_link_send_whole_frame() -> Result<()> {
    require_root!();

    let sniffer = LinkSocket::open(LOOPBACK, ETH_P_IP)?;
    let sender = LinkSocket::open(LOOPBACK, ETH_P_IP)?;
    sniffer.set_read_deadline(deadline_in(2000));

    let packet = udp_datagram(b"link view")?;
    let mut frame = Vec::with_capacity(14 + packet.len());
    frame.extend_from_slice(BROADCAST.as_ref());
    frame.extend_from_slice(&[0u8; 6]);
    frame.extend_from_slice(&ETH_P_IP.to_be_bytes());
    frame.extend_from_slice(&packet);

    sender.send(&frame).await?;
    read_until(&sniffer, |f| f == &frame[..]).await?;

    sender.write(&frame).await?;
    read_until(&sniffer, |f| f == &frame[..]).await?;
    Ok(())
}
