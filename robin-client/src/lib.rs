// SPDX-License-Identifier: BSD-3-Clause
// Copyright 2025. Triad National Security, LLC.

//! Client helper (C7): one function per command, each wrapping
//! [`robin_protocol::client::request`] to send a formatted request and parse
//! the matching reply.
//!
//! A [`Client`] holds a single connection and its line-framing state, mirroring
//! the original implementation's API: process-wide state reduced to one
//! struct per connection instead of a global socket descriptor, so a program
//! (or a test) can hold more than one client at a time.

use std::fmt;
use std::net::TcpStream;

use log::debug;
use robin_protocol::{client, Error, LineReader};

/// The outcome of a `follow` request: one target email paired with its
/// per-target result code, in input order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FollowResult {
    pub email: String,
    pub code: i64,
}

/// A single message in a `followers`/`cips` listing reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cip {
    pub id: u64,
    pub timestamp: u64,
    pub payload: String,
}

/// Errors a client call can return: a transport/framing failure, or the
/// server's own negative status code for this request.
#[derive(Debug)]
pub enum ClientError {
    Protocol(Error),
    /// The server's reply carried a negative status.
    Rejected(i64),
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Protocol(e) => write!(f, "{e}"),
            Self::Rejected(status) => write!(f, "server rejected request with status {status}"),
        }
    }
}

impl std::error::Error for ClientError {}

impl From<Error> for ClientError {
    fn from(e: Error) -> Self {
        Self::Protocol(e)
    }
}

/// A connection to a Robin server, plus the line-framing state needed to read
/// its replies.
pub struct Client {
    conn: TcpStream,
    reader: LineReader,
}

impl Client {
    /// Connects to `host:port`.
    pub fn connect(host: &str, port: u16) -> std::io::Result<Self> {
        let conn = TcpStream::connect((host, port))?;
        Ok(Client { conn, reader: LineReader::new() })
    }

    fn call(&mut self, opcode: &str, args: &[&str]) -> Result<(i64, Vec<String>), ClientError> {
        let reply = client::request(&mut self.conn, &mut self.reader, opcode, args)?;
        debug!("{opcode}: reply status {}", reply.status);
        Ok((reply.status, reply.lines))
    }

    fn call_ok(&mut self, opcode: &str, args: &[&str]) -> Result<(), ClientError> {
        let (status, _) = self.call(opcode, args)?;
        if status < 0 {
            return Err(ClientError::Rejected(status));
        }
        Ok(())
    }

    pub fn register(&mut self, email: &str, password: &str) -> Result<(), ClientError> {
        self.call_ok("register", &[email, password])
    }

    pub fn login(&mut self, email: &str, password: &str) -> Result<(), ClientError> {
        self.call_ok("login", &[email, password])
    }

    pub fn logout(&mut self) -> Result<(), ClientError> {
        self.call_ok("logout", &[])
    }

    /// Follows each of `emails`, returning one [`FollowResult`] per target in
    /// the order requested.
    pub fn follow(&mut self, emails: &[&str]) -> Result<Vec<FollowResult>, ClientError> {
        let (status, lines) = self.call("follow", emails)?;
        if status < 0 {
            return Err(ClientError::Rejected(status));
        }

        lines
            .into_iter()
            .map(|line| {
                let (email, code) = line.rsplit_once(' ').ok_or(ClientError::Protocol(Error::Malformed))?;
                let code: i64 = code.parse().map_err(|_| ClientError::Protocol(Error::Malformed))?;
                Ok(FollowResult { email: email.to_string(), code })
            })
            .collect()
    }

    /// Lists the emails currently following this client's logged-in user.
    pub fn followers(&mut self) -> Result<Vec<String>, ClientError> {
        let (status, lines) = self.call("followers", &[])?;
        if status < 0 {
            return Err(ClientError::Rejected(status));
        }
        Ok(lines)
    }

    /// Posts `text` as a new cip. Embedded newlines are encoded for the wire
    /// and decoded back by the server.
    pub fn cip(&mut self, text: &str) -> Result<(), ClientError> {
        let encoded = format!("\"{}\"", robin_protocol::wire::encode_cip_payload(text));
        self.call_ok("cip", &[&encoded])
    }

    /// Lists this client's logged-in user's own cips, oldest first.
    pub fn cips(&mut self) -> Result<Vec<Cip>, ClientError> {
        let (status, lines) = self.call("cips", &[])?;
        if status < 0 {
            return Err(ClientError::Rejected(status));
        }

        lines
            .into_iter()
            .map(|line| {
                let mut parts = line.splitn(3, ' ');
                let id: u64 = parts
                    .next()
                    .and_then(|s| s.parse().ok())
                    .ok_or(ClientError::Protocol(Error::Malformed))?;
                let timestamp: u64 = parts
                    .next()
                    .and_then(|s| s.parse().ok())
                    .ok_or(ClientError::Protocol(Error::Malformed))?;
                let payload = parts.next().unwrap_or("");
                Ok(Cip { id, timestamp, payload: robin_protocol::wire::decode_cip_payload(payload) })
            })
            .collect()
    }

    /// Sends `quit` and closes the connection. No reply is awaited beyond the
    /// status line, matching the server's own treatment of `quit`.
    pub fn quit(mut self) -> Result<(), ClientError> {
        self.call_ok("quit", &[])
    }
}
