//! Statistics display and formatting

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Format bytes in human-readable form
pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

/// Format bandwidth in human-readable form
pub fn format_bandwidth(bps: u64) -> String {
    const KBPS: u64 = 1000;
    const MBPS: u64 = KBPS * 1000;
    const GBPS: u64 = MBPS * 1000;

    if bps >= GBPS {
        format!("{:.2} Gbps", bps as f64 / GBPS as f64)
    } else if bps >= MBPS {
        format!("{:.2} Mbps", bps as f64 / MBPS as f64)
    } else if bps >= KBPS {
        format!("{:.2} Kbps", bps as f64 / KBPS as f64)
    } else {
        format!("{} bps", bps)
    }
}

/// Format duration in human-readable form
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    let hours = secs / 3600;
    let minutes = (secs % 3600) / 60;
    let seconds = secs % 60;

    if hours > 0 {
        format!("{}h {:02}m {:02}s", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{}m {:02}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}

/// Counters for one transfer session
#[derive(Debug, Clone, Copy, Default)]
pub struct SessionStats {
    /// Datagrams moved
    pub packets: u64,
    /// Payload bytes moved
    pub bytes: u64,
}

/// Session counters shared between the I/O loop and the stats thread.
#[derive(Clone)]
pub struct StatsTracker {
    inner: Arc<Mutex<SessionStats>>,
    started: Instant,
}

impl StatsTracker {
    pub fn new() -> Self {
        StatsTracker {
            inner: Arc::new(Mutex::new(SessionStats::default())),
            started: Instant::now(),
        }
    }

    /// Record one datagram of `len` bytes.
    pub fn record(&self, len: usize) {
        let mut stats = self.inner.lock();
        stats.packets += 1;
        stats.bytes += len as u64;
    }

    /// Snapshot the counters.
    pub fn snapshot(&self) -> SessionStats {
        *self.inner.lock()
    }

    /// Time since the tracker was created.
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// One-line summary for continuous display.
    pub fn compact_line(&self) -> String {
        let stats = self.snapshot();
        let elapsed = self.elapsed();
        let bps = if elapsed.as_secs() > 0 {
            (stats.bytes * 8) / elapsed.as_secs()
        } else {
            0
        };
        format!(
            "[{}] packets: {} | data: {} | rate: {}",
            format_duration(elapsed),
            stats.packets,
            format_bytes(stats.bytes),
            format_bandwidth(bps)
        )
    }
}

impl Default for StatsTracker {
    fn default() -> Self {
        Self::new()
    }
}
