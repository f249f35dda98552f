// SPDX-License-Identifier: BSD-3-Clause
// Copyright 2025. Triad National Security, LLC.

//! Wire-level building blocks for the Robin protocol: line framing, request/reply
//! grammar, and the client-side request/reply primitive. Shared by `robin-server`
//! and `robin-client` so both sides agree on exactly one definition of the framing
//! and escaping rules.

pub mod client;
pub mod line;
pub mod wire;

use std::fmt;

pub use line::LineReader;
pub use wire::{Reply, Request};

/// Maximum length of a request or reply line, including the `\n` terminator.
pub const MAX_LINE_LEN: usize = 300;

/// Errors that can occur while framing or parsing the wire protocol.
#[derive(Debug)]
pub enum Error {
    /// Underlying I/O failure reading from or writing to the stream.
    Io(std::io::Error),

    /// A line exceeded `MAX_LINE_LEN - 1` bytes before its terminator was found.
    LineTooLong,

    /// The connection was closed in the middle of a line (after some bytes of it
    /// had already arrived).
    Truncated,

    /// The connection was closed before any byte of the next line arrived.
    ConnectionClosed,

    /// A line was received but did not parse as a well-formed request or reply.
    Malformed,
}

impl std::error::Error for Error {}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::LineTooLong => write!(f, "line exceeded {MAX_LINE_LEN} bytes"),
            Self::Truncated => write!(f, "connection closed mid-line"),
            Self::ConnectionClosed => write!(f, "connection closed"),
            Self::Malformed => write!(f, "malformed line"),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}
