//! Readiness waiting
//!
//! A blocking poll/select-equivalent parameterized by direction. There is no
//! internal timeout: the wait returns when the descriptor is ready or when a
//! signal interrupts it, in which case the caller sees
//! `io::ErrorKind::Interrupted`. Error and hangup conditions count as ready
//! so the subsequent receive or send call reports the concrete OS error.

use socket2::Socket;
use std::io;

/// I/O direction to wait for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Read,
    Write,
}

/// Block until the socket is ready in the given direction.
#[cfg(unix)]
pub fn wait_ready<S: std::os::fd::AsRawFd>(socket: &S, dir: Direction) -> io::Result<()> {
    let events = match dir {
        Direction::Read => libc::POLLIN,
        Direction::Write => libc::POLLOUT,
    };
    let mut pfd = libc::pollfd {
        fd: socket.as_raw_fd(),
        events,
        revents: 0,
    };
    let rc = unsafe { libc::poll(&mut pfd, 1, -1) };
    if rc < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

/// Block until the socket is ready in the given direction.
#[cfg(windows)]
pub fn wait_ready<S: std::os::windows::io::AsRawSocket>(
    socket: &S,
    dir: Direction,
) -> io::Result<()> {
    use windows::Win32::Networking::WinSock::{
        WSAPoll, POLLRDNORM, POLLWRNORM, SOCKET, WSAPOLLFD,
    };

    let events = match dir {
        Direction::Read => POLLRDNORM,
        Direction::Write => POLLWRNORM,
    };
    let mut pfd = WSAPOLLFD {
        fd: SOCKET(socket.as_raw_socket() as usize),
        events: events as i16,
        revents: 0,
    };
    let rc = unsafe { WSAPoll(&mut pfd, 1, -1) };
    if rc < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

/// Toggle OS-level non-blocking mode on a socket.
pub fn set_nonblocking(socket: &Socket, nonblocking: bool) -> io::Result<()> {
    socket.set_nonblocking(nonblocking)
}

#[cfg(test)]
mod tests {
    use super::*;
    use socket2::{Domain, Protocol, Type};

    #[test]
    fn test_wait_writable_is_immediate_on_fresh_socket() {
        let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP)).unwrap();
        socket.bind(&"127.0.0.1:0".parse::<std::net::SocketAddr>().unwrap().into()).unwrap();
        // an idle UDP socket always has send buffer space
        wait_ready(&socket, Direction::Write).unwrap();
    }

    #[test]
    fn test_wait_readable_after_send() {
        let receiver = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP)).unwrap();
        receiver
            .bind(&"127.0.0.1:0".parse::<std::net::SocketAddr>().unwrap().into())
            .unwrap();
        let dest = receiver.local_addr().unwrap().as_socket().unwrap();

        let sender = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP)).unwrap();
        sender.send_to(b"ping", &dest.into()).unwrap();

        wait_ready(&receiver, Direction::Read).unwrap();
    }
}
