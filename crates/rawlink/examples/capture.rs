//! Print the source address and size of frames arriving on an interface.
//!
//! Run with: sudo cargo run -p rawlink --example capture -- eth0 [seconds]
//!
//! Only ARP frames are captured unless `--all` is given, using the filter
//! printed by `tcpdump -dd arp`.

use std::env;
use std::time::{Duration, Instant};

use rawlink::{ETH_P_ALL, Error, RawSocket, SockFilter, SocketKind};

/// `tcpdump -dd arp`
const ARP_ONLY: [(u16, u8, u8, u32); 4] = [
    (0x28, 0, 0, 0x0000000c),
    (0x15, 0, 1, 0x00000806),
    (0x06, 0, 0, 0x00040000),
    (0x06, 0, 0, 0x00000000),
];

#[tokio::main]
async fn main() -> rawlink::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .init();

    let args: Vec<String> = env::args().skip(1).collect();
    let all = args.iter().any(|a| a == "--all");
    let mut positional = args.iter().filter(|a| !a.starts_with("--"));

    let Some(dev) = positional.next() else {
        eprintln!("usage: capture <interface> [seconds] [--all]");
        std::process::exit(1);
    };
    let seconds: u64 = positional.next().and_then(|s| s.parse().ok()).unwrap_or(10);

    let mut builder = RawSocket::builder(dev.as_str())
        .kind(SocketKind::Raw)
        .protocol(ETH_P_ALL)
        .read_deadline(Instant::now() + Duration::from_secs(seconds));
    if !all {
        builder = builder.filter(ARP_ONLY.map(SockFilter::from));
    }
    let sock = builder.open()?;

    println!("capturing on {} for {}s", sock.interface(), seconds);

    let mut buf = vec![0u8; 65536];
    let mut count = 0usize;
    loop {
        match sock.recv_from(&mut buf).await {
            Ok((n, from)) => {
                count += 1;
                let from = from.map(|a| a.to_string()).unwrap_or_else(|| "-".into());
                println!("{:<18} {:>5} bytes", from, n);
            }
            Err(Error::Timeout) => break,
            Err(e) => return Err(e),
        }
    }

    println!("{} frames", count);
    sock.close()
}
