// SPDX-License-Identifier: BSD-3-Clause
// Copyright 2025. Triad National Security, LLC.

//! Client-side request/reply primitive (C7): format a request, send it, and
//! read back the status line plus its continuation lines.

use std::io::Write;

use log::debug;

use crate::line::LineReader;
use crate::wire::{format_request, Reply};
use crate::{Error, MAX_LINE_LEN};

/// Sends one request and blocks until the full reply has arrived.
///
/// `conn` must be both readable and writable (a `TcpStream`, or anything else
/// that models a single persistent connection). `reader` holds the
/// connection's line-framing state across calls, exactly like a session's
/// receive-line scratch buffer on the server side.
pub fn request<S: std::io::Read + Write>(
    conn: &mut S,
    reader: &mut LineReader,
    opcode: &str,
    args: &[impl AsRef<str>],
) -> Result<Reply, Error> {
    let line = format_request(opcode, args);
    debug!("client: sending {line:?}");

    let mut framed = line.into_bytes();
    framed.push(b'\n');
    conn.write_all(&framed)?;

    let mut scratch = [0u8; MAX_LINE_LEN];

    let n = reader.read_line(conn, &mut scratch)?;
    let status_line = std::str::from_utf8(&scratch[..n - 1]).map_err(|_| Error::Malformed)?;
    let status: i64 = status_line.trim_end().parse().map_err(|_| Error::Malformed)?;

    let count = if status >= 0 { status as usize } else { 0 };
    let mut lines = Vec::with_capacity(count);
    for _ in 0..count {
        let n = reader.read_line(conn, &mut scratch)?;
        let line = std::str::from_utf8(&scratch[..n - 1])
            .map_err(|_| Error::Malformed)?
            .to_string();
        lines.push(line);
    }

    Ok(Reply { status, lines })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    /// A `Read + Write` sink over a fixed reply, for exercising `request()`
    /// without a real socket.
    struct FakeConn {
        reply: Cursor<Vec<u8>>,
        sent: Vec<u8>,
    }

    impl std::io::Read for FakeConn {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            self.reply.read(buf)
        }
    }

    impl Write for FakeConn {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.sent.extend_from_slice(buf);
            Ok(buf.len())
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn formats_request_and_parses_reply() {
        let mut conn = FakeConn {
            reply: Cursor::new(b"1\nb@x 0\n".to_vec()),
            sent: Vec::new(),
        };
        let mut reader = LineReader::new();

        let reply = request(&mut conn, &mut reader, "follow", &["b@x"]).unwrap();

        assert_eq!(conn.sent, b"follow b@x\n");
        assert_eq!(reply.status, 1);
        assert_eq!(reply.lines, vec!["b@x 0".to_string()]);
    }

    #[test]
    fn negative_status_has_no_continuation_lines() {
        let mut conn = FakeConn {
            reply: Cursor::new(b"-2\n".to_vec()),
            sent: Vec::new(),
        };
        let mut reader = LineReader::new();

        let reply = request(&mut conn, &mut reader, "followers", &[] as &[&str]).unwrap();

        assert_eq!(reply.status, -2);
        assert!(reply.lines.is_empty());
    }
}
