//! Muxio CLI Library
//!
//! Shared functionality for the muxio command-line tools.

pub mod config;
pub mod stats;

pub use config::{Config, ReceiverConfig, SenderConfig};
pub use stats::{format_bandwidth, format_bytes, format_duration, SessionStats, StatsTracker};
