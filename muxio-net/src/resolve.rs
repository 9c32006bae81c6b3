//! Address resolution
//!
//! Wraps system name resolution with address-family control. Transports
//! resolve their local bind address in the same family as an already-known
//! remote, and fall back to wildcard candidates when no hostname is given.

use crate::error::NetError;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, ToSocketAddrs};

/// Address family constraint for resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AddressFamily {
    /// Accept any family
    #[default]
    Unspec,
    /// IPv4 only
    V4,
    /// IPv6 only
    V6,
}

impl AddressFamily {
    /// The family of a concrete socket address
    pub fn of(addr: &SocketAddr) -> Self {
        if addr.is_ipv4() {
            AddressFamily::V4
        } else {
            AddressFamily::V6
        }
    }

    /// Whether an address satisfies this constraint
    pub fn matches(self, addr: &SocketAddr) -> bool {
        match self {
            AddressFamily::Unspec => true,
            AddressFamily::V4 => addr.is_ipv4(),
            AddressFamily::V6 => addr.is_ipv6(),
        }
    }
}

/// Resolve a hostname to candidate socket addresses.
///
/// `host = None` (or an empty string) yields wildcard bind candidates for
/// the requested family, IPv4 first when the family is unspecified. A
/// non-empty hostname goes through system resolution and the results are
/// filtered to the requested family; an empty result set is an error.
pub fn resolve_host(
    host: Option<&str>,
    port: u16,
    family: AddressFamily,
) -> Result<Vec<SocketAddr>, NetError> {
    let host = match host {
        Some(h) if !h.is_empty() => h,
        _ => {
            let v4 = SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), port);
            let v6 = SocketAddr::new(IpAddr::V6(Ipv6Addr::UNSPECIFIED), port);
            return Ok(match family {
                AddressFamily::V4 => vec![v4],
                AddressFamily::V6 => vec![v6],
                AddressFamily::Unspec => vec![v4, v6],
            });
        }
    };

    let addrs: Vec<SocketAddr> = (host, port)
        .to_socket_addrs()
        .map_err(|source| {
            tracing::warn!("resolving '{}' failed: {}", host, source);
            NetError::Resolve {
                host: host.to_string(),
                source,
            }
        })?
        .filter(|a| family.matches(a))
        .collect();

    if addrs.is_empty() {
        return Err(NetError::NoAddressFound {
            host: host.to_string(),
        });
    }
    Ok(addrs)
}

/// Parse a numeric-only host address.
///
/// Source lists for multicast filtering must already be numeric; no name
/// resolution is performed.
pub fn parse_source_address(host: &str) -> Result<IpAddr, NetError> {
    host.parse::<IpAddr>()
        .map_err(|_| NetError::NotNumeric(host.to_string()))
}
