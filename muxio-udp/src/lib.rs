//! UDP transport for the muxio framework
//!
//! Implements the `udp://` protocol handler: unicast, multicast and
//! source-filtered multicast datagram I/O with connection-like
//! configuration layered on top of a raw UDP socket.

pub mod multicast;
pub mod options;
pub mod transport;

pub use multicast::{SourceFilterApi, SourceFilterError, SOURCE_FILTER_API};
pub use options::{FilterMode, ReusePolicy, SourceFilter, UdpOptions};
pub use transport::{TransportError, UdpTransport};
