//! Muxio - media transport I/O
//!
//! High-level Rust API for the muxio transport layer.

pub use muxio_net as net;
pub use muxio_udp as udp;
pub use muxio_url as url;

// Re-export commonly used types
pub use muxio_net::{OpenFlags, OpenMode, ProtocolHandler};
pub use muxio_udp::{TransportError, UdpTransport};
