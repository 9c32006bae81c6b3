//! Muxio Receiver - receive a UDP stream
//!
//! Reads datagrams from the UDP transport and writes their payloads to
//! stdout or a file.

use clap::Parser;
use muxio::{OpenFlags, UdpTransport};
use muxio_cli::{Config, StatsTracker};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::thread;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "muxio-receiver")]
#[command(about = "UDP stream receiver", long_about = None)]
struct Args {
    /// Listen URL (udp://group:port?opt=val or udp://:port)
    url: Option<String>,

    /// Output destination (use '-' for stdout)
    #[arg(short, long, default_value = "-")]
    output: String,

    /// Configuration file; its [receiver] section replaces the other arguments
    #[arg(long)]
    config: Option<String>,

    /// Statistics interval in seconds (0 disables)
    #[arg(long, default_value = "1")]
    stats: u64,
}

fn open_output(output: &str) -> anyhow::Result<Box<dyn Write>> {
    if output == "-" {
        tracing::info!("Writing to stdout");
        Ok(Box::new(io::stdout()))
    } else {
        tracing::info!("Writing to file: {}", output);
        let file = File::create(output)
            .map_err(|e| anyhow::anyhow!("Failed to create '{}': {}", output, e))?;
        Ok(Box::new(BufWriter::new(file)))
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    tracing_subscriber::fmt::init();

    let (url, output, stats_interval) = match &args.config {
        Some(path) => {
            let config = Config::from_file(path)?;
            let receiver = config
                .receiver
                .ok_or_else(|| anyhow::anyhow!("No [receiver] section in {}", path))?;
            (receiver.url, receiver.output, receiver.stats_interval_secs)
        }
        None => {
            let url = args
                .url
                .ok_or_else(|| anyhow::anyhow!("A listen URL is required"))?;
            (url, args.output, args.stats)
        }
    };

    tracing::info!("Muxio receiver starting...");

    let transport = UdpTransport::open(&url, OpenFlags::read())?;
    tracing::info!("Listening on local port {}", transport.local_port());
    if transport.is_multicast() {
        tracing::info!("Joined multicast group");
    }

    let mut writer = open_output(&output)?;
    let tracker = StatsTracker::new();

    if stats_interval > 0 {
        let tracker = tracker.clone();
        thread::spawn(move || loop {
            thread::sleep(Duration::from_secs(stats_interval));
            tracing::info!("{}", tracker.compact_line());
        });
    }

    let mut buf = vec![0u8; transport.max_packet_size().max(2048)];
    let mut packet_count = 0u64;

    loop {
        let n = match transport.read(&mut buf) {
            Ok(n) => n,
            Err(e) => {
                tracing::error!("Receive error: {}", e);
                continue;
            }
        };

        writer.write_all(&buf[..n])?;
        tracker.record(n);

        packet_count += 1;
        if packet_count % 50 == 0 {
            writer.flush()?;
        }
    }
}
