// SPDX-License-Identifier: BSD-3-Clause
// Copyright 2025. Triad National Security, LLC.

//! Line framing (C1): read one `\n`-terminated line at a time out of a byte
//! stream, without ever discarding bytes that belong to the next line.

use std::io::Read;

use log::trace;

use crate::Error;

/// Size of the chunks read from the underlying stream while hunting for a
/// terminator. Unrelated to [`crate::MAX_LINE_LEN`]: a single `read` may pull in
/// bytes belonging to several subsequent lines, which is exactly what the
/// overflow buffer exists to hold onto.
const READ_CHUNK: usize = 4096;

/// Buffers bytes read past the current line's terminator so the next call
/// drains them before touching the stream again.
///
/// Deliberately decoupled from the stream itself (unlike a `BufReader`) so a
/// caller can interleave line reads with direct writes to the same socket
/// without fighting the borrow checker over who owns it.
#[derive(Default)]
pub struct LineReader {
    overflow: Vec<u8>,
}

impl LineReader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads one line into `scratch`, returning the number of bytes written
    /// (including the `\n` terminator). Fails with [`Error::LineTooLong`] if the
    /// line would not fit in `scratch`, with [`Error::ConnectionClosed`] if EOF
    /// is hit before any byte of the line arrives, and with [`Error::Truncated`]
    /// if EOF is hit after some bytes of the line arrived but before its
    /// terminator.
    pub fn read_line<S: Read>(&mut self, stream: &mut S, scratch: &mut [u8]) -> Result<usize, Error> {
        let cap = scratch.len();

        loop {
            if let Some(nl) = self.overflow.iter().position(|&b| b == b'\n') {
                let line_len = nl + 1;
                if line_len > cap {
                    self.overflow.drain(0..line_len);
                    return Err(Error::LineTooLong);
                }

                scratch[..line_len].copy_from_slice(&self.overflow[..line_len]);
                self.overflow.drain(0..line_len);
                return Ok(line_len);
            }

            let mut chunk = [0u8; READ_CHUNK];
            let n = stream.read(&mut chunk)?;
            if n == 0 {
                return Err(if self.overflow.is_empty() {
                    Error::ConnectionClosed
                } else {
                    Error::Truncated
                });
            }

            trace!("line reader: read {n} bytes from stream");
            self.overflow.extend_from_slice(&chunk[..n]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn reads_single_line() {
        let mut stream = Cursor::new(b"hello\n".to_vec());
        let mut r = LineReader::new();
        let mut scratch = [0u8; 32];
        let n = r.read_line(&mut stream, &mut scratch).unwrap();
        assert_eq!(&scratch[..n], b"hello\n");
    }

    #[test]
    fn reads_multiple_lines_from_one_read() {
        let mut stream = Cursor::new(b"one\ntwo\nthree\n".to_vec());
        let mut r = LineReader::new();
        let mut scratch = [0u8; 32];

        let n = r.read_line(&mut stream, &mut scratch).unwrap();
        assert_eq!(&scratch[..n], b"one\n");
        let n = r.read_line(&mut stream, &mut scratch).unwrap();
        assert_eq!(&scratch[..n], b"two\n");
        let n = r.read_line(&mut stream, &mut scratch).unwrap();
        assert_eq!(&scratch[..n], b"three\n");
    }

    #[test]
    fn line_too_long() {
        let mut stream = Cursor::new(b"0123456789\n".to_vec());
        let mut r = LineReader::new();
        let mut scratch = [0u8; 5];
        assert!(matches!(
            r.read_line(&mut stream, &mut scratch),
            Err(Error::LineTooLong)
        ));
    }

    #[test]
    fn line_too_long_then_resyncs_on_next_line() {
        let mut stream = Cursor::new(b"0123456789\nok\n".to_vec());
        let mut r = LineReader::new();
        let mut scratch = [0u8; 5];
        assert!(matches!(
            r.read_line(&mut stream, &mut scratch),
            Err(Error::LineTooLong)
        ));
        let n = r.read_line(&mut stream, &mut scratch).unwrap();
        assert_eq!(&scratch[..n], b"ok\n");
    }

    #[test]
    fn connection_closed_before_any_byte() {
        let mut stream = Cursor::new(Vec::new());
        let mut r = LineReader::new();
        let mut scratch = [0u8; 32];
        assert!(matches!(
            r.read_line(&mut stream, &mut scratch),
            Err(Error::ConnectionClosed)
        ));
    }

    #[test]
    fn truncated_mid_line() {
        let mut stream = Cursor::new(b"partial".to_vec());
        let mut r = LineReader::new();
        let mut scratch = [0u8; 32];
        assert!(matches!(
            r.read_line(&mut stream, &mut scratch),
            Err(Error::Truncated)
        ));
    }

    #[test]
    fn boundary_299_bytes_plus_terminator_succeeds() {
        let body = vec![b'x'; crate::MAX_LINE_LEN - 1];
        let mut data = body;
        data.push(b'\n');
        let mut stream = Cursor::new(data);
        let mut r = LineReader::new();
        let mut scratch = [0u8; crate::MAX_LINE_LEN];
        let n = r.read_line(&mut stream, &mut scratch).unwrap();
        assert_eq!(n, crate::MAX_LINE_LEN);
    }

    #[test]
    fn boundary_300_bytes_plus_terminator_rejected() {
        let body = vec![b'x'; crate::MAX_LINE_LEN];
        let mut data = body;
        data.push(b'\n');
        let mut stream = Cursor::new(data);
        let mut r = LineReader::new();
        let mut scratch = [0u8; crate::MAX_LINE_LEN];
        assert!(matches!(
            r.read_line(&mut stream, &mut scratch),
            Err(Error::LineTooLong)
        ));
    }
}
