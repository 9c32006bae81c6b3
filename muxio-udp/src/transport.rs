//! The UDP transport
//!
//! One instance owns one OS datagram socket. Opening resolves the
//! destination, creates and configures the socket (reuse, multicast
//! membership, buffer sizes, optional `connect()`), and binds a local port;
//! reading and writing move single datagrams; closing leaves any joined
//! multicast group and releases the descriptor. Every early exit during
//! open releases the partially configured socket, because the descriptor
//! lives inside the `Socket` value being dropped.

use crate::multicast::{self, SourceFilterError};
use crate::options::{
    FilterMode, UdpOptions, DEFAULT_RX_BUFFER_SIZE, DEFAULT_TX_BUFFER_SIZE,
};
use muxio_net::{
    resolve_host, set_nonblocking, wait_ready, AddressFamily, Direction, NetError, OpenFlags,
    OpenMode, ProtocolHandler,
};
use muxio_url::{find_tag, parse_flag, split_url, UrlError};
use socket2::{Domain, Protocol, Socket, Type};
use std::io;
use std::net::SocketAddr;
use thiserror::Error;

/// UDP transport errors
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("invalid URL: {0}")]
    Url(#[from] UrlError),

    #[error("address resolution failed: {0}")]
    Resolve(#[from] NetError),

    #[error("socket creation failed: {0}")]
    SocketCreation(#[source] io::Error),

    #[error("bind failed: {0}")]
    Bind(#[source] io::Error),

    #[error("setting {option} failed: {source}")]
    OptionConfiguration {
        option: &'static str,
        #[source]
        source: io::Error,
    },

    #[error("multicast join failed: {0}")]
    MulticastJoin(#[source] io::Error),

    #[error("multicast source filter: {0}")]
    SourceFilter(#[from] SourceFilterError),

    #[error("connect failed: {0}")]
    Connect(#[source] io::Error),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("invalid configuration: {0}")]
    InvalidConfiguration(&'static str),
}

/// A UDP protocol handler.
///
/// Opened for exactly one role, reading or writing, fixed for the lifetime
/// of the instance. `read` and `write` take `&self` and may be driven from
/// different threads; `set_remote_url` and `close` require exclusive
/// access.
pub struct UdpTransport {
    socket: Socket,
    mode: OpenMode,
    non_blocking: bool,
    ttl: u32,
    buffer_size: usize,
    max_packet_size: usize,
    is_multicast: bool,
    local_port: u16,
    reuse: bool,
    remote: Option<SocketAddr>,
    connected: bool,
}

impl UdpTransport {
    /// Open a UDP transport described by a `udp://host:port?opt=val` URL.
    ///
    /// A destination host is mandatory when opening for write. Multicast
    /// receivers adopt the destination port as their local bind port, join
    /// the group, and honor any `sources`/`block` filter; multicast senders
    /// get the configured TTL. Readers are switched to OS non-blocking mode
    /// unconditionally; blocking semantics are provided by the readiness
    /// wait in [`read`](Self::read).
    pub fn open(uri: &str, flags: OpenFlags) -> Result<Self, TransportError> {
        let parts = split_url(uri)?;
        if let Some(scheme) = parts.scheme {
            if scheme != "udp" {
                return Err(TransportError::InvalidConfiguration(
                    "URL scheme is not 'udp'",
                ));
            }
        }

        let opts = UdpOptions::parse(parts.query);
        let mode = flags.mode();
        let url_port = parts.port.unwrap_or(0);

        let remote = if parts.host.is_empty() {
            if mode.is_write() {
                return Err(TransportError::InvalidConfiguration(
                    "a destination host is required when opening for write",
                ));
            }
            None
        } else {
            Some(resolve_remote(parts.host, url_port)?)
        };
        let is_multicast = remote.map_or(false, |a| a.ip().is_multicast());

        // receivers bind the port they expect traffic on: the destination
        // port for multicast, or the URL port when no localport was given
        let mut local_port = opts.local_port;
        if mode.is_read() && (is_multicast || local_port == 0) {
            local_port = url_port;
        }

        let family = remote.map_or(AddressFamily::Unspec, |a| AddressFamily::of(&a));
        let candidates = resolve_host(opts.local_addr.as_deref(), local_port, family)?;
        let (socket, bind_addr) = create_socket(&candidates)?;

        let reuse = opts.reuse.resolve(is_multicast);
        if reuse {
            socket
                .set_reuse_address(true)
                .map_err(|source| TransportError::OptionConfiguration {
                    option: "SO_REUSEADDR",
                    source,
                })?;
        }

        // For multicast receivers, try binding the group address first so
        // datagrams aimed at other addresses on the same port stay out of
        // the socket. Not every platform allows it; fall back to the
        // resolved local address. Either way a local port is assigned here.
        let mut bound = false;
        if is_multicast && mode.is_read() {
            if let Some(group) = remote {
                bound = socket
                    .bind(&SocketAddr::new(group.ip(), local_port).into())
                    .is_ok();
            }
        }
        if !bound {
            socket
                .bind(&bind_addr.into())
                .map_err(TransportError::Bind)?;
        }

        let local_port = socket
            .local_addr()
            .ok()
            .and_then(|a| a.as_socket())
            .map_or(local_port, |a| a.port());

        // is_multicast is derived from the resolved remote, so the address
        // is present whenever it is set
        if let (true, Some(group)) = (is_multicast, remote) {
            if mode.is_write() {
                multicast::set_ttl(&socket, &group, opts.ttl).map_err(|source| {
                    TransportError::OptionConfiguration {
                        option: "multicast TTL",
                        source,
                    }
                })?;
            } else {
                match &opts.filter {
                    Some(filter) if filter.mode == FilterMode::Include => {
                        if filter.sources.is_empty() {
                            return Err(SourceFilterError::NoSourcesGiven.into());
                        }
                        multicast::apply_source_filter(
                            &socket,
                            &group,
                            &filter.sources,
                            FilterMode::Include,
                        )?;
                    }
                    other => {
                        multicast::join_group(&socket, &group)
                            .map_err(TransportError::MulticastJoin)?;
                        if let Some(filter) = other {
                            multicast::apply_source_filter(
                                &socket,
                                &group,
                                &filter.sources,
                                FilterMode::Exclude,
                            )?;
                        }
                    }
                }
            }
        }

        let buffer_size = opts.buffer_size.unwrap_or(if mode.is_write() {
            DEFAULT_TX_BUFFER_SIZE
        } else {
            DEFAULT_RX_BUFFER_SIZE
        });
        if mode.is_write() {
            socket
                .set_send_buffer_size(buffer_size)
                .map_err(|source| TransportError::OptionConfiguration {
                    option: "SO_SNDBUF",
                    source,
                })?;
        } else {
            // non-fatal: continue with whatever size the OS granted
            if let Err(e) = socket.set_recv_buffer_size(buffer_size) {
                tracing::warn!("setsockopt(SO_RCVBUF): {}", e);
            }
            set_nonblocking(&socket, true).map_err(|source| {
                TransportError::OptionConfiguration {
                    option: "non-blocking mode",
                    source,
                }
            })?;
        }

        let mut connected = false;
        if opts.connect {
            let remote = remote.ok_or(TransportError::InvalidConfiguration(
                "connect requested without a destination",
            ))?;
            socket
                .connect(&remote.into())
                .map_err(TransportError::Connect)?;
            connected = true;
        }

        Ok(UdpTransport {
            socket,
            mode,
            non_blocking: flags.is_non_blocking(),
            ttl: opts.ttl,
            buffer_size,
            max_packet_size: opts.max_packet_size,
            is_multicast,
            local_port,
            reuse,
            remote,
            connected,
        })
    }

    /// Replace the destination address after open.
    ///
    /// Re-resolves host and port from `uri` and recomputes multicast-ness.
    /// A `connect` tag in the query is honored: when it asks for a fixed
    /// peer and the socket is not yet connected, the `connect()` happens
    /// now, and a failure leaves the transport unconnected. Used when a
    /// destination is learned after the transport was opened read-only.
    pub fn set_remote_url(&mut self, uri: &str) -> Result<(), TransportError> {
        let parts = split_url(uri)?;
        if parts.host.is_empty() {
            return Err(TransportError::InvalidConfiguration(
                "a destination host is required",
            ));
        }
        let remote = resolve_remote(parts.host, parts.port.unwrap_or(0))?;
        self.remote = Some(remote);
        self.is_multicast = remote.ip().is_multicast();

        if let Some(value) = find_tag(parts.query, "connect") {
            let was_connected = self.connected;
            self.connected = parse_flag(value);
            if self.connected && !was_connected {
                if let Err(source) = self.socket.connect(&remote.into()) {
                    self.connected = false;
                    return Err(TransportError::Connect(source));
                }
            }
        }
        Ok(())
    }

    /// Receive one datagram, bounded by `buf.len()`.
    ///
    /// In blocking mode this waits for read-readiness first; the wait has
    /// no timeout and is interrupted only by a signal. A zero return is a
    /// zero-length datagram, not end of stream. Datagrams are never
    /// aggregated: one call consumes at most one datagram.
    pub fn read(&self, buf: &mut [u8]) -> Result<usize, TransportError> {
        if !self.mode.is_read() {
            return Err(TransportError::InvalidConfiguration(
                "transport was opened write-only",
            ));
        }
        if !self.non_blocking {
            wait_ready(&self.socket, Direction::Read)?;
        }
        let n = recv_into(&self.socket, buf)?;
        Ok(n)
    }

    /// Send `buf` as a single datagram.
    ///
    /// Goes through `send()` when the socket is connected, `sendto()` with
    /// the stored destination otherwise. No fragmentation is performed; a
    /// datagram larger than the path maximum fails or is truncated at the
    /// OS's discretion.
    pub fn write(&self, buf: &[u8]) -> Result<usize, TransportError> {
        if !self.mode.is_write() {
            return Err(TransportError::InvalidConfiguration(
                "transport was opened read-only",
            ));
        }
        if !self.non_blocking {
            wait_ready(&self.socket, Direction::Write)?;
        }
        let n = if self.connected {
            self.socket.send(buf)
        } else {
            let remote = self.remote.ok_or(TransportError::InvalidConfiguration(
                "no destination address set",
            ))?;
            self.socket.send_to(buf, &remote.into())
        }?;
        Ok(n)
    }

    /// Close the transport.
    ///
    /// Multicast read transports leave their group before the descriptor
    /// closes. Dropping has the same effect; `close` makes the hand-off
    /// explicit at call sites, and consuming `self` makes a double close
    /// unrepresentable.
    pub fn close(self) {}

    /// Local port assigned by the bind during open.
    pub fn local_port(&self) -> u16 {
        self.local_port
    }

    /// Largest single datagram the caller should pass to `write`.
    pub fn max_packet_size(&self) -> usize {
        self.max_packet_size
    }

    /// Whether the destination is a multicast group.
    pub fn is_multicast(&self) -> bool {
        self.is_multicast
    }

    /// Whether the socket is `connect()`-bound to a fixed peer.
    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// The resolved destination address, if one is set.
    pub fn remote_addr(&self) -> Option<SocketAddr> {
        self.remote
    }

    /// Configured multicast TTL/hop-limit.
    pub fn ttl(&self) -> u32 {
        self.ttl
    }

    /// Socket buffer size requested during open.
    pub fn buffer_size(&self) -> usize {
        self.buffer_size
    }

    /// Whether address reuse was applied to the socket.
    pub fn reuse_enabled(&self) -> bool {
        self.reuse
    }

    /// The underlying socket, for waiting on several streams at once.
    pub fn socket(&self) -> &Socket {
        &self.socket
    }
}

impl ProtocolHandler for UdpTransport {
    type Error = TransportError;

    const SCHEME: &'static str = "udp";

    fn open(uri: &str, flags: OpenFlags) -> Result<Self, TransportError> {
        UdpTransport::open(uri, flags)
    }

    fn read(&self, buf: &mut [u8]) -> Result<usize, TransportError> {
        UdpTransport::read(self, buf)
    }

    fn write(&self, buf: &[u8]) -> Result<usize, TransportError> {
        UdpTransport::write(self, buf)
    }

    fn close(self) -> Result<(), TransportError> {
        UdpTransport::close(self);
        Ok(())
    }

    fn max_packet_size(&self) -> usize {
        self.max_packet_size
    }
}

impl Drop for UdpTransport {
    fn drop(&mut self) {
        if self.is_multicast && self.mode.is_read() {
            if let Some(group) = self.remote {
                if let Err(e) = multicast::leave_group(&self.socket, &group) {
                    tracing::warn!("failed to leave multicast group {}: {}", group.ip(), e);
                }
            }
        }
    }
}

#[cfg(unix)]
impl std::os::fd::AsRawFd for UdpTransport {
    fn as_raw_fd(&self) -> std::os::fd::RawFd {
        use std::os::fd::AsRawFd;
        self.socket.as_raw_fd()
    }
}

#[cfg(windows)]
impl std::os::windows::io::AsRawSocket for UdpTransport {
    fn as_raw_socket(&self) -> std::os::windows::io::RawSocket {
        use std::os::windows::io::AsRawSocket;
        self.socket.as_raw_socket()
    }
}

/// Resolve the destination; the first candidate wins.
fn resolve_remote(host: &str, port: u16) -> Result<SocketAddr, TransportError> {
    let addrs = resolve_host(Some(host), port, AddressFamily::Unspec)?;
    Ok(addrs[0])
}

/// Create a datagram socket for the first workable candidate address.
fn create_socket(candidates: &[SocketAddr]) -> Result<(Socket, SocketAddr), TransportError> {
    let mut last_err = None;
    for candidate in candidates {
        match Socket::new(
            Domain::for_address(*candidate),
            Type::DGRAM,
            Some(Protocol::UDP),
        ) {
            Ok(socket) => return Ok((socket, *candidate)),
            Err(e) => {
                tracing::warn!("socket creation for {} failed: {}", candidate, e);
                last_err = Some(e);
            }
        }
    }
    Err(TransportError::SocketCreation(last_err.unwrap_or_else(
        || io::Error::new(io::ErrorKind::AddrNotAvailable, "no candidate addresses"),
    )))
}

/// Receive into an initialized buffer through socket2's `MaybeUninit` API.
fn recv_into(socket: &Socket, buf: &mut [u8]) -> io::Result<usize> {
    use std::mem::MaybeUninit;
    let uninit = unsafe {
        std::slice::from_raw_parts_mut(buf.as_mut_ptr() as *mut MaybeUninit<u8>, buf.len())
    };
    socket.recv(uninit)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn free_port() -> u16 {
        std::net::UdpSocket::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port()
    }

    #[test]
    fn test_open_write_unicast() {
        let t = UdpTransport::open("udp://127.0.0.1:9910", OpenFlags::write()).unwrap();
        assert!(!t.is_multicast());
        assert!(!t.is_connected());
        assert!(t.local_port() > 0);
        assert_eq!(t.max_packet_size(), 1472);
        assert_eq!(t.remote_addr(), Some("127.0.0.1:9910".parse().unwrap()));
    }

    #[test]
    fn test_write_requires_destination() {
        let err = UdpTransport::open("udp://:9910", OpenFlags::write()).unwrap_err();
        assert!(matches!(err, TransportError::InvalidConfiguration(_)));
    }

    #[test]
    fn test_read_without_destination() {
        let t = UdpTransport::open("udp://:0", OpenFlags::read()).unwrap();
        assert!(!t.is_multicast());
        assert_eq!(t.remote_addr(), None);
    }

    #[test]
    fn test_localport_binding() {
        let port = free_port();
        let uri = format!("udp://127.0.0.1:9910?localport={}", port);
        let t = UdpTransport::open(&uri, OpenFlags::read()).unwrap();
        assert_eq!(t.local_port(), port);
    }

    #[test]
    fn test_connect_roundtrip() {
        let receiver = UdpTransport::open("udp://127.0.0.1:0", OpenFlags::read()).unwrap();
        let uri = format!("udp://127.0.0.1:{}?connect=1", receiver.local_port());
        let sender = UdpTransport::open(&uri, OpenFlags::write()).unwrap();
        assert!(sender.is_connected());

        let payload = b"muxio datagram payload";
        assert_eq!(sender.write(payload).unwrap(), payload.len());

        let mut buf = [0u8; 64];
        let received = receiver.read(&mut buf).unwrap();
        assert_eq!(&buf[..received], payload);

        sender.close();
        receiver.close();
    }

    #[test]
    fn test_zero_length_datagram() {
        let receiver = UdpTransport::open("udp://127.0.0.1:0", OpenFlags::read()).unwrap();
        let uri = format!("udp://127.0.0.1:{}?connect=1", receiver.local_port());
        let sender = UdpTransport::open(&uri, OpenFlags::write()).unwrap();

        assert_eq!(sender.write(&[]).unwrap(), 0);
        let mut buf = [0u8; 16];
        assert_eq!(receiver.read(&mut buf).unwrap(), 0);
    }

    #[test]
    fn test_non_blocking_read_returns_would_block() {
        let t = UdpTransport::open("udp://127.0.0.1:0", OpenFlags::read().non_blocking(true))
            .unwrap();
        let mut buf = [0u8; 16];
        match t.read(&mut buf).unwrap_err() {
            TransportError::Io(e) => assert_eq!(e.kind(), io::ErrorKind::WouldBlock),
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_wrong_role_rejected() {
        let writer = UdpTransport::open("udp://127.0.0.1:9910", OpenFlags::write()).unwrap();
        let mut buf = [0u8; 16];
        assert!(matches!(
            writer.read(&mut buf),
            Err(TransportError::InvalidConfiguration(_))
        ));

        let reader = UdpTransport::open("udp://:0", OpenFlags::read()).unwrap();
        assert!(matches!(
            reader.write(b"x"),
            Err(TransportError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_pkt_size_override() {
        let t =
            UdpTransport::open("udp://127.0.0.1:9910?pkt_size=1316", OpenFlags::write()).unwrap();
        assert_eq!(t.max_packet_size(), 1316);
    }

    #[test]
    fn test_foreign_scheme_rejected() {
        let err = UdpTransport::open("tcp://127.0.0.1:9910", OpenFlags::write()).unwrap_err();
        assert!(matches!(err, TransportError::InvalidConfiguration(_)));
    }

    #[test]
    fn test_reuse_explicit_on_unicast() {
        let t = UdpTransport::open("udp://127.0.0.1:9910?reuse=1", OpenFlags::write()).unwrap();
        assert!(t.reuse_enabled());
        assert!(t.socket().reuse_address().unwrap());
    }

    #[test]
    fn test_reuse_defaults_off_for_unicast() {
        let t = UdpTransport::open("udp://127.0.0.1:9910", OpenFlags::write()).unwrap();
        assert!(!t.reuse_enabled());
    }

    #[test]
    fn test_multicast_read_open() {
        // joining needs a multicast-capable route; skip quietly where absent
        if let Ok(t) = UdpTransport::open("udp://239.255.43.30:46301", OpenFlags::read()) {
            assert!(t.is_multicast());
            assert!(t.reuse_enabled());
            assert_eq!(t.local_port(), 46301);
            t.close();
        }
    }

    #[test]
    fn test_multicast_reuse_suppressed() {
        if let Ok(t) = UdpTransport::open("udp://239.255.43.32:46303?reuse=0", OpenFlags::read())
        {
            assert!(!t.reuse_enabled());
        }
    }

    #[test]
    fn test_inclusive_filter_requires_sources() {
        let err =
            UdpTransport::open("udp://239.255.43.31:46302?sources=", OpenFlags::read()).unwrap_err();
        assert!(matches!(
            err,
            TransportError::SourceFilter(SourceFilterError::NoSourcesGiven)
        ));
    }

    #[test]
    fn test_set_remote_url() {
        let mut t = UdpTransport::open("udp://:0", OpenFlags::read()).unwrap();
        assert_eq!(t.remote_addr(), None);

        t.set_remote_url("udp://127.0.0.1:9910").unwrap();
        assert_eq!(t.remote_addr(), Some("127.0.0.1:9910".parse().unwrap()));
        assert!(!t.is_multicast());
    }

    #[test]
    fn test_set_remote_url_connect() {
        let receiver = UdpTransport::open("udp://127.0.0.1:0", OpenFlags::read()).unwrap();
        let mut t = UdpTransport::open("udp://:0", OpenFlags::read()).unwrap();
        let uri = format!("udp://127.0.0.1:{}?connect=1", receiver.local_port());
        t.set_remote_url(&uri).unwrap();
        assert!(t.is_connected());
    }

    #[test]
    fn test_set_remote_url_requires_host() {
        let mut t = UdpTransport::open("udp://:0", OpenFlags::read()).unwrap();
        assert!(matches!(
            t.set_remote_url("udp://:5000"),
            Err(TransportError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_protocol_handler_interface() {
        fn open_generic<H: ProtocolHandler>(uri: &str) -> Result<H, H::Error> {
            H::open(uri, OpenFlags::write())
        }

        assert_eq!(UdpTransport::SCHEME, "udp");
        let t: UdpTransport = open_generic("udp://127.0.0.1:9910").unwrap();
        ProtocolHandler::close(t).unwrap();
    }
}
