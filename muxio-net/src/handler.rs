//! Protocol handler interface
//!
//! Every network transport in the framework implements `ProtocolHandler`,
//! so the container layer can open a URL without knowing which transport
//! backs it. A handler owns exactly one OS-level endpoint: constructing it
//! opens the endpoint, consuming it closes the endpoint.

/// I/O role a handler is opened for.
///
/// Exactly one role is active per instance; it is fixed at open time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    /// Receive datagrams/streams from the network
    Read,
    /// Send datagrams/streams to the network
    Write,
}

impl OpenMode {
    pub fn is_read(self) -> bool {
        self == OpenMode::Read
    }

    pub fn is_write(self) -> bool {
        self == OpenMode::Write
    }
}

/// Flags supplied by the caller at open time.
#[derive(Debug, Clone, Copy)]
pub struct OpenFlags {
    mode: OpenMode,
    non_blocking: bool,
}

impl OpenFlags {
    /// Open for reading, blocking I/O.
    pub fn read() -> Self {
        OpenFlags {
            mode: OpenMode::Read,
            non_blocking: false,
        }
    }

    /// Open for writing, blocking I/O.
    pub fn write() -> Self {
        OpenFlags {
            mode: OpenMode::Write,
            non_blocking: false,
        }
    }

    /// Request non-blocking I/O: read/write return immediately instead of
    /// waiting for readiness.
    pub fn non_blocking(mut self, non_blocking: bool) -> Self {
        self.non_blocking = non_blocking;
        self
    }

    pub fn mode(&self) -> OpenMode {
        self.mode
    }

    pub fn is_non_blocking(&self) -> bool {
        self.non_blocking
    }
}

/// A network transport usable by the container framework.
///
/// Blocking `read`/`write` calls suspend only the calling thread; the two
/// directions are independent and may be driven from different threads.
pub trait ProtocolHandler: Sized {
    /// Error type surfaced by every operation
    type Error: std::error::Error + Send + Sync + 'static;

    /// URL scheme this handler serves (e.g. `"udp"`)
    const SCHEME: &'static str;

    /// Open the transport described by `uri` in the given role.
    fn open(uri: &str, flags: OpenFlags) -> Result<Self, Self::Error>;

    /// Receive one unit of data, bounded by `buf.len()`.
    fn read(&self, buf: &mut [u8]) -> Result<usize, Self::Error>;

    /// Send `buf` as one unit of data.
    fn write(&self, buf: &[u8]) -> Result<usize, Self::Error>;

    /// Close the transport, releasing the OS endpoint.
    fn close(self) -> Result<(), Self::Error>;

    /// Largest single unit of data the caller should pass to `write`.
    fn max_packet_size(&self) -> usize;
}
