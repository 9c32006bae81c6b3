//! Network plumbing and the protocol handler interface
//!
//! This crate provides the utilities every muxio transport shares: address
//! resolution with family control, readiness waiting, portable error types,
//! and the `ProtocolHandler` trait that makes transports interchangeable to
//! the owning framework.

pub mod error;
pub mod handler;
pub mod resolve;
pub mod wait;

pub use error::NetError;
pub use handler::{OpenFlags, OpenMode, ProtocolHandler};
pub use resolve::{parse_source_address, resolve_host, AddressFamily};
pub use wait::{set_nonblocking, wait_ready, Direction};
