//! Multicast group management
//!
//! Group membership, outbound TTL/hop-limit, and source-specific filtering.
//! Source filtering uses one of two incompatible OS interfaces: the
//! family-agnostic `group_source_req` options, or the IPv4-only
//! `ip_mreq_source` options. The interface is selected once at compile time
//! via [`SOURCE_FILTER_API`], never re-checked per call.

use crate::options::FilterMode;
use muxio_net::parse_source_address;
use socket2::Socket;
use std::io;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use thiserror::Error;

/// Source filtering errors
#[derive(Error, Debug)]
pub enum SourceFilterError {
    #[error("source filtering is not supported on this platform")]
    Unsupported,

    #[error("source filtering only supports IPv4 groups on this platform")]
    GroupNotIpv4,

    #[error("source '{source_addr}' does not match the address family of group '{group}'")]
    FamilyMismatch { source_addr: IpAddr, group: IpAddr },

    #[error("inclusive source filtering requested but no sources given")]
    NoSourcesGiven,

    #[error(transparent)]
    InvalidSource(#[from] muxio_net::NetError),

    #[error("setsockopt failed: {0}")]
    Io(#[from] io::Error),
}

/// OS interface available for source-specific multicast filtering
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFilterApi {
    /// `MCAST_JOIN_SOURCE_GROUP` / `MCAST_BLOCK_SOURCE`, any family
    GroupSourceReq,
    /// `IP_ADD_SOURCE_MEMBERSHIP` / `IP_BLOCK_SOURCE`, IPv4 groups only
    V4Only,
    /// No source filtering available
    Unsupported,
}

/// The filtering interface this build uses.
///
/// The group_source_req options exist in the Windows SDK too but do not
/// behave as on Linux, so Windows takes the IPv4-only interface.
pub const SOURCE_FILTER_API: SourceFilterApi =
    if cfg!(any(target_os = "linux", target_os = "android")) {
        SourceFilterApi::GroupSourceReq
    } else if cfg!(any(windows, target_vendor = "apple")) {
        SourceFilterApi::V4Only
    } else {
        SourceFilterApi::Unsupported
    };

/// Set the outbound multicast TTL (IPv4) or hop limit (IPv6).
pub fn set_ttl(socket: &Socket, group: &SocketAddr, hops: u32) -> io::Result<()> {
    match group.ip() {
        IpAddr::V4(_) => socket.set_multicast_ttl_v4(hops),
        IpAddr::V6(_) => socket.set_multicast_hops_v6(hops),
    }
}

/// Join a multicast group on the default interface.
pub fn join_group(socket: &Socket, group: &SocketAddr) -> io::Result<()> {
    match group.ip() {
        IpAddr::V4(ip) => socket.join_multicast_v4(&ip, &Ipv4Addr::UNSPECIFIED),
        IpAddr::V6(ip) => socket.join_multicast_v6(&ip, 0),
    }
}

/// Leave a previously joined multicast group.
pub fn leave_group(socket: &Socket, group: &SocketAddr) -> io::Result<()> {
    match group.ip() {
        IpAddr::V4(ip) => socket.leave_multicast_v4(&ip, &Ipv4Addr::UNSPECIFIED),
        IpAddr::V6(ip) => socket.leave_multicast_v6(&ip, 0),
    }
}

/// Apply a source-specific filter to a multicast socket.
///
/// Every entry in `sources` must be a numeric address of the group's
/// family. In inclusive mode the per-source joins replace a plain group
/// join; in exclusive mode they are applied on top of one.
pub fn apply_source_filter(
    socket: &Socket,
    group: &SocketAddr,
    sources: &[String],
    mode: FilterMode,
) -> Result<(), SourceFilterError> {
    for source in sources {
        let addr = parse_source_address(source)?;
        if addr.is_ipv4() != group.is_ipv4() {
            return Err(SourceFilterError::FamilyMismatch {
                source_addr: addr,
                group: group.ip(),
            });
        }
        filter_source(socket, group, addr, mode)?;
    }
    Ok(())
}

#[cfg(any(target_os = "linux", target_os = "android"))]
fn filter_source(
    socket: &Socket,
    group: &SocketAddr,
    source: IpAddr,
    mode: FilterMode,
) -> Result<(), SourceFilterError> {
    use socket2::SockAddr;
    use std::os::fd::AsRawFd;

    // libc does not expose `group_source_req` on this target; its layout is
    // fixed by the Linux kernel ABI (linux/in.h), so it is safe to mirror
    // locally.
    #[repr(C)]
    struct group_source_req {
        gsr_interface: u32,
        gsr_group: libc::sockaddr_storage,
        gsr_source: libc::sockaddr_storage,
    }

    let level = match group.ip() {
        IpAddr::V4(_) => libc::IPPROTO_IP,
        IpAddr::V6(_) => libc::IPPROTO_IPV6,
    };
    let option = match mode {
        FilterMode::Include => libc::MCAST_JOIN_SOURCE_GROUP,
        FilterMode::Exclude => libc::MCAST_BLOCK_SOURCE,
    };

    let group_sa = SockAddr::from(*group);
    let source_sa = SockAddr::from(SocketAddr::new(source, 0));

    let mut req: group_source_req = unsafe { std::mem::zeroed() };
    req.gsr_interface = 0;
    // sockaddr_storage is large enough for any address SockAddr produces
    unsafe {
        std::ptr::copy_nonoverlapping(
            group_sa.as_ptr() as *const u8,
            &mut req.gsr_group as *mut libc::sockaddr_storage as *mut u8,
            group_sa.len() as usize,
        );
        std::ptr::copy_nonoverlapping(
            source_sa.as_ptr() as *const u8,
            &mut req.gsr_source as *mut libc::sockaddr_storage as *mut u8,
            source_sa.len() as usize,
        );
    }

    let rc = unsafe {
        libc::setsockopt(
            socket.as_raw_fd(),
            level,
            option,
            &req as *const group_source_req as *const libc::c_void,
            std::mem::size_of::<group_source_req>() as libc::socklen_t,
        )
    };
    if rc != 0 {
        return Err(SourceFilterError::Io(io::Error::last_os_error()));
    }
    Ok(())
}

#[cfg(any(windows, target_vendor = "apple"))]
fn filter_source(
    socket: &Socket,
    group: &SocketAddr,
    source: IpAddr,
    mode: FilterMode,
) -> Result<(), SourceFilterError> {
    let group = match group.ip() {
        IpAddr::V4(ip) => ip,
        IpAddr::V6(_) => return Err(SourceFilterError::GroupNotIpv4),
    };
    let source = match source {
        IpAddr::V4(ip) => ip,
        // unreachable after the family check in apply_source_filter, but
        // this function is also callable directly
        IpAddr::V6(_) => return Err(SourceFilterError::GroupNotIpv4),
    };
    let interface = Ipv4Addr::UNSPECIFIED;
    match mode {
        FilterMode::Include => socket.join_ssm_v4(&source, &group, &interface)?,
        FilterMode::Exclude => socket.block_ssm_v4(&source, &group, &interface)?,
    }
    Ok(())
}

#[cfg(not(any(
    target_os = "linux",
    target_os = "android",
    windows,
    target_vendor = "apple"
)))]
fn filter_source(
    _socket: &Socket,
    _group: &SocketAddr,
    _source: IpAddr,
    _mode: FilterMode,
) -> Result<(), SourceFilterError> {
    Err(SourceFilterError::Unsupported)
}
