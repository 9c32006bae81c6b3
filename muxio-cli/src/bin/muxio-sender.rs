//! Muxio Sender - stream a file or stdin over UDP
//!
//! Reads input in fixed-size chunks and sends each chunk as one datagram
//! through the UDP transport.

use bytes::Bytes;
use clap::Parser;
use muxio::{OpenFlags, UdpTransport};
use muxio_cli::{Config, StatsTracker};
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::thread;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "muxio-sender")]
#[command(about = "UDP stream sender", long_about = None)]
struct Args {
    /// Destination URL (udp://host:port?opt=val)
    url: Option<String>,

    /// Input source (use '-' for stdin)
    #[arg(short, long, default_value = "-")]
    input: String,

    /// Bytes per datagram (0 uses the transport's max packet size)
    #[arg(short, long, default_value = "0")]
    chunk_size: usize,

    /// Configuration file; its [sender] section replaces the other arguments
    #[arg(long)]
    config: Option<String>,

    /// Statistics interval in seconds (0 disables)
    #[arg(long, default_value = "1")]
    stats: u64,
}

fn open_input(input: &str) -> anyhow::Result<Box<dyn Read>> {
    if input == "-" {
        tracing::info!("Reading from stdin");
        Ok(Box::new(io::stdin()))
    } else {
        tracing::info!("Reading from file: {}", input);
        let file = File::open(input)
            .map_err(|e| anyhow::anyhow!("Failed to open '{}': {}", input, e))?;
        Ok(Box::new(BufReader::new(file)))
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    tracing_subscriber::fmt::init();

    let (url, input, mut chunk_size, stats_interval) = match &args.config {
        Some(path) => {
            let config = Config::from_file(path)?;
            let sender = config
                .sender
                .ok_or_else(|| anyhow::anyhow!("No [sender] section in {}", path))?;
            (
                sender.url,
                sender.input,
                sender.chunk_size,
                sender.stats_interval_secs,
            )
        }
        None => {
            let url = args
                .url
                .ok_or_else(|| anyhow::anyhow!("A destination URL is required"))?;
            (url, args.input, args.chunk_size, args.stats)
        }
    };

    tracing::info!("Muxio sender starting...");

    let transport = UdpTransport::open(&url, OpenFlags::write())?;
    tracing::info!(
        "Sending to {} from local port {}",
        url,
        transport.local_port()
    );

    if chunk_size == 0 {
        chunk_size = transport.max_packet_size();
    }

    let mut reader = open_input(&input)?;
    let tracker = StatsTracker::new();

    if stats_interval > 0 {
        let tracker = tracker.clone();
        thread::spawn(move || loop {
            thread::sleep(Duration::from_secs(stats_interval));
            tracing::info!("{}", tracker.compact_line());
        });
    }

    let mut buf = vec![0u8; chunk_size];
    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => {
                tracing::info!("End of input reached");
                break;
            }
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                tracing::error!("Read error: {}", e);
                break;
            }
        };

        let chunk = Bytes::copy_from_slice(&buf[..n]);
        transport.write(&chunk)?;
        tracker.record(n);
    }

    tracing::info!("Done: {}", tracker.compact_line());
    transport.close();
    Ok(())
}
