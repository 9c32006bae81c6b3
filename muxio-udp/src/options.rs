//! UDP URL options
//!
//! The query string of a `udp://` URL carries per-socket configuration.
//! Recognized options:
//!
//! | option | effect |
//! |---|---|
//! | `ttl=n` | multicast TTL/hop-limit |
//! | `localport=n` | request a specific local bind port |
//! | `pkt_size=n` | maximum single-datagram size reported to the caller |
//! | `buffer_size=n` | override the OS socket buffer size |
//! | `connect=0\|1` | bind the socket to a fixed peer with `connect()` |
//! | `localaddr=addr` | request a specific local bind address |
//! | `reuse=0\|1` | request/forbid address reuse |
//! | `sources=a,b` | multicast source allow-list (inclusive filtering) |
//! | `block=a,b` | multicast source block-list (exclusive filtering) |
//!
//! `sources` and `block` are mutually exclusive in effect: when both appear,
//! `sources` wins and the block list is ignored entirely.

use muxio_url::{find_tag, parse_flag, parse_int_prefix, split_list};

/// Default multicast TTL/hop-limit
pub const DEFAULT_TTL: u32 = 16;

/// Default maximum datagram size reported to callers (Ethernet MTU minus
/// IPv4 and UDP headers)
pub const DEFAULT_MAX_PACKET_SIZE: usize = 1472;

/// Default send buffer size; kept small to limit latency
pub const DEFAULT_TX_BUFFER_SIZE: usize = 32 * 1024;

/// Default receive buffer size; the largest possible UDP datagram, to avoid
/// losing data on OSes where the default is set too low
pub const DEFAULT_RX_BUFFER_SIZE: usize = 64 * 1024;

/// Address-reuse decision, resolved once during open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReusePolicy {
    /// Not specified: enabled for multicast, disabled otherwise
    #[default]
    Default,
    /// Explicitly requested
    Enabled,
    /// Explicitly forbidden
    Disabled,
}

impl ReusePolicy {
    /// Resolve the policy against the multicast-ness of the destination.
    pub fn resolve(self, multicast: bool) -> bool {
        match self {
            ReusePolicy::Enabled => true,
            ReusePolicy::Disabled => false,
            ReusePolicy::Default => multicast,
        }
    }
}

/// Source-specific multicast filtering direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterMode {
    /// Accept traffic only from the listed sources
    Include,
    /// Accept all traffic except from the listed sources
    Exclude,
}

/// A parsed source filter: direction plus the raw source list.
///
/// Sources stay unparsed strings here; they are resolved (numerically) when
/// the filter is applied to a socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFilter {
    pub mode: FilterMode,
    pub sources: Vec<String>,
}

/// All options a `udp://` URL can carry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UdpOptions {
    /// Multicast TTL/hop-limit
    pub ttl: u32,
    /// Requested local bind port; 0 means unset
    pub local_port: u16,
    /// Maximum single-datagram size reported to the caller
    pub max_packet_size: usize,
    /// OS socket buffer size override; `None` selects the role default
    pub buffer_size: Option<usize>,
    /// Whether to `connect()` the socket to the destination
    pub connect: bool,
    /// Requested local bind address
    pub local_addr: Option<String>,
    /// Address-reuse decision
    pub reuse: ReusePolicy,
    /// Source-specific multicast filter
    pub filter: Option<SourceFilter>,
}

impl Default for UdpOptions {
    fn default() -> Self {
        UdpOptions {
            ttl: DEFAULT_TTL,
            local_port: 0,
            max_packet_size: DEFAULT_MAX_PACKET_SIZE,
            buffer_size: None,
            connect: false,
            local_addr: None,
            reuse: ReusePolicy::Default,
            filter: None,
        }
    }
}

impl UdpOptions {
    /// Parse options from a URL query string.
    ///
    /// Unrecognized tags are ignored. Numeric values follow `strtol`
    /// conventions; for `connect` and `reuse` a value with no digits counts
    /// as enabling the option.
    pub fn parse(query: &str) -> Self {
        let mut opts = UdpOptions::default();

        if let Some(v) = find_tag(query, "reuse") {
            opts.reuse = if parse_flag(v) {
                ReusePolicy::Enabled
            } else {
                ReusePolicy::Disabled
            };
        }
        if let Some(v) = find_tag(query, "ttl") {
            opts.ttl = parse_int_prefix(v)
                .map(|n| n.try_into().unwrap_or(u32::MAX))
                .unwrap_or(0);
        }
        if let Some(v) = find_tag(query, "localport") {
            // out-of-range values are treated as unset
            opts.local_port = parse_int_prefix(v)
                .and_then(|n| u16::try_from(n).ok())
                .unwrap_or(0);
        }
        if let Some(v) = find_tag(query, "pkt_size") {
            opts.max_packet_size = parse_int_prefix(v)
                .map(|n| n.try_into().unwrap_or(usize::MAX))
                .unwrap_or(0);
        }
        if let Some(v) = find_tag(query, "buffer_size") {
            opts.buffer_size = parse_int_prefix(v).map(|n| n.try_into().unwrap_or(usize::MAX));
        }
        if let Some(v) = find_tag(query, "connect") {
            opts.connect = parse_flag(v);
        }
        if let Some(v) = find_tag(query, "localaddr") {
            if !v.is_empty() {
                opts.local_addr = Some(v.to_string());
            }
        }
        if let Some(v) = find_tag(query, "sources") {
            opts.filter = Some(SourceFilter {
                mode: FilterMode::Include,
                sources: split_list(v).map(String::from).collect(),
            });
        } else if let Some(v) = find_tag(query, "block") {
            opts.filter = Some(SourceFilter {
                mode: FilterMode::Exclude,
                sources: split_list(v).map(String::from).collect(),
            });
        }

        opts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let opts = UdpOptions::parse("");
        assert_eq!(opts.ttl, DEFAULT_TTL);
        assert_eq!(opts.local_port, 0);
        assert_eq!(opts.max_packet_size, DEFAULT_MAX_PACKET_SIZE);
        assert_eq!(opts.buffer_size, None);
        assert!(!opts.connect);
        assert_eq!(opts.local_addr, None);
        assert_eq!(opts.reuse, ReusePolicy::Default);
        assert_eq!(opts.filter, None);
    }

    #[test]
    fn test_numeric_options() {
        let opts = UdpOptions::parse("ttl=4&localport=5000&pkt_size=1316&buffer_size=262144");
        assert_eq!(opts.ttl, 4);
        assert_eq!(opts.local_port, 5000);
        assert_eq!(opts.max_packet_size, 1316);
        assert_eq!(opts.buffer_size, Some(262144));
    }

    #[test]
    fn test_flag_without_digits_enables() {
        let opts = UdpOptions::parse("connect=&reuse=");
        assert!(opts.connect);
        assert_eq!(opts.reuse, ReusePolicy::Enabled);

        let opts = UdpOptions::parse("connect=0&reuse=0");
        assert!(!opts.connect);
        assert_eq!(opts.reuse, ReusePolicy::Disabled);
    }

    #[test]
    fn test_reuse_policy_resolution() {
        assert!(ReusePolicy::Enabled.resolve(false));
        assert!(!ReusePolicy::Disabled.resolve(true));
        assert!(ReusePolicy::Default.resolve(true));
        assert!(!ReusePolicy::Default.resolve(false));
    }

    #[test]
    fn test_local_addr() {
        let opts = UdpOptions::parse("localaddr=10.0.0.1");
        assert_eq!(opts.local_addr.as_deref(), Some("10.0.0.1"));

        let opts = UdpOptions::parse("localaddr=");
        assert_eq!(opts.local_addr, None);
    }

    #[test]
    fn test_sources_list() {
        let opts = UdpOptions::parse("sources=10.0.0.1,10.0.0.2");
        let filter = opts.filter.unwrap();
        assert_eq!(filter.mode, FilterMode::Include);
        assert_eq!(filter.sources, vec!["10.0.0.1", "10.0.0.2"]);
    }

    #[test]
    fn test_block_list() {
        let opts = UdpOptions::parse("block=10.0.0.9");
        let filter = opts.filter.unwrap();
        assert_eq!(filter.mode, FilterMode::Exclude);
        assert_eq!(filter.sources, vec!["10.0.0.9"]);
    }

    #[test]
    fn test_sources_win_over_block() {
        let opts = UdpOptions::parse("block=10.0.0.9&sources=10.0.0.1");
        let filter = opts.filter.unwrap();
        assert_eq!(filter.mode, FilterMode::Include);
        assert_eq!(filter.sources, vec!["10.0.0.1"]);
    }

    #[test]
    fn test_empty_sources_list() {
        let opts = UdpOptions::parse("sources=");
        let filter = opts.filter.unwrap();
        assert_eq!(filter.mode, FilterMode::Include);
        assert!(filter.sources.is_empty());
    }

    #[test]
    fn test_out_of_range_localport_is_unset() {
        let opts = UdpOptions::parse("localport=70000");
        assert_eq!(opts.local_port, 0);
    }
}
