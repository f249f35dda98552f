// SPDX-License-Identifier: BSD-3-Clause
// Copyright 2025. Triad National Security, LLC.

//! Listening socket setup, `SIGINT`-interruptible accept, and TCP keepalive
//! (C6).
//!
//! `std::net::TcpListener::accept` retries internally on `EINTR`, which would
//! swallow the very signal the acceptor loop needs to notice. Accepting
//! through the raw `libc::accept` call instead gives the same semantics as
//! the original implementation's blocking `accept(2)`: a caught signal
//! interrupts the call and the acceptor sees the error itself.

use std::net::{SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
use std::os::fd::{AsFd, AsRawFd, FromRawFd};

use log::info;
use nix::sys::socket::setsockopt;
use nix::sys::socket::sockopt::{KeepAlive, TcpKeepCount, TcpKeepIdle, TcpKeepInterval};

/// Idle time, in seconds, before the first keepalive probe is sent.
const KEEPALIVE_IDLE_SECS: u32 = 10;
/// Interval, in seconds, between keepalive probes.
const KEEPALIVE_INTERVAL_SECS: u32 = 10;
/// Number of unacknowledged probes before the connection is considered dead.
const KEEPALIVE_PROBE_COUNT: u32 = 6;

/// Opens a listening socket on `(host, port)` and applies keepalive to it,
/// matching the original implementation which configures keepalive on the
/// listening descriptor before entering the accept loop.
pub fn listen(host: &str, port: u16) -> std::io::Result<TcpListener> {
    let addr = (host, port)
        .to_socket_addrs()?
        .next()
        .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::InvalidInput, "unresolvable host"))?;

    let listener = TcpListener::bind(addr)?;
    set_keepalive(&listener)?;
    info!("listening on {addr}");
    Ok(listener)
}

/// Blocks for the next connection. Unlike [`TcpListener::accept`], a signal
/// delivered while blocked here is reported to the caller as an `EINTR`
/// `io::Error` instead of being silently retried.
pub fn accept(listener: &TcpListener) -> std::io::Result<(TcpStream, SocketAddr)> {
    let fd = listener.as_raw_fd();

    // SAFETY: `fd` is a valid, open socket descriptor for the lifetime of this
    // call, owned by `listener`, which outlives the call.
    let accepted = unsafe { libc::accept(fd, std::ptr::null_mut(), std::ptr::null_mut()) };
    if accepted < 0 {
        return Err(std::io::Error::last_os_error());
    }

    // SAFETY: `accepted` is a freshly returned, uniquely owned descriptor.
    let stream = unsafe { TcpStream::from_raw_fd(accepted) };
    let peer = stream.peer_addr()?;
    Ok((stream, peer))
}

/// Applies the fixed keepalive parameters from spec §4.6 (idle 10s, interval
/// 10s, 6 probes) to a socket.
pub fn set_keepalive(socket: &impl AsFd) -> std::io::Result<()> {
    let fd = socket.as_fd();
    setsockopt(&fd, KeepAlive, &true)?;
    setsockopt(&fd, TcpKeepIdle, &KEEPALIVE_IDLE_SECS)?;
    setsockopt(&fd, TcpKeepInterval, &KEEPALIVE_INTERVAL_SECS)?;
    setsockopt(&fd, TcpKeepCount, &KEEPALIVE_PROBE_COUNT)?;
    Ok(())
}
