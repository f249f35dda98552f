// SPDX-License-Identifier: BSD-3-Clause
// Copyright 2025. Triad National Security, LLC.

//! Command dispatcher (C4): the per-connection read-parse-handle-write loop,
//! driving a [`Session`] (C3) against the shared [`Directory`] (C2).

use std::io::Write;
use std::net::TcpStream;

use log::{debug, info, warn};
use robin_directory::{AcquireError, AddError, Directory, Session};
use robin_protocol::wire::{self, status};
use robin_protocol::{Error, LineReader, MAX_LINE_LEN};

use crate::socket;

/// Serves one accepted connection to completion: sets keepalive, then repeats
/// read-line -> parse -> dispatch -> reply until the session closes.
pub fn serve_connection(stream: TcpStream, directory: &Directory) {
    if let Err(e) = socket::set_keepalive(&stream) {
        warn!("failed to set keepalive on accepted connection: {e}");
    }

    let peer = stream.peer_addr().ok();
    debug!("serving connection from {peer:?}");

    let mut stream = stream;
    let mut reader = LineReader::new();
    let mut scratch = [0u8; MAX_LINE_LEN];
    let mut session = Session::new();

    loop {
        let line = match reader.read_line(&mut stream, &mut scratch) {
            Ok(n) => n,
            Err(Error::ConnectionClosed) => {
                debug!("connection from {peer:?} closed by peer");
                break;
            }
            Err(e) => {
                warn!("transport error on connection from {peer:?}: {e}");
                break;
            }
        };

        let text = match std::str::from_utf8(&scratch[..line - 1]) {
            Ok(text) => text,
            Err(_) => {
                warn!("non-UTF-8 line from {peer:?}, closing connection");
                break;
            }
        };

        let request = match wire::parse_request(text) {
            Ok(request) => request,
            Err(_) => {
                if write_reply(&mut stream, status::INVALID_ARGUMENTS, &[]).is_err() {
                    break;
                }
                continue;
            }
        };

        if request.opcode == "quit" {
            let _ = write_reply(&mut stream, 0, &[]);
            break;
        }

        let (reply_status, lines) = handle(&mut session, directory, &request.opcode, &request.args);
        if write_reply(&mut stream, reply_status, &lines).is_err() {
            break;
        }

        if session.is_closing() {
            break;
        }
    }

    session.close(directory);
    info!("connection from {peer:?} finished");
}

/// Opcodes the dispatcher recognizes at all, independent of session state.
/// An opcode outside this set always gets `UNKNOWN_COMMAND`, even from an
/// unauthenticated session (spec §4.3's "any / unrecognized command" row).
const KNOWN_OPCODES: &[&str] =
    &["register", "login", "logout", "follow", "followers", "cip", "cips"];

/// Dispatches one already-parsed request against the session's current state
/// and returns the reply's status plus continuation lines.
fn handle(session: &mut Session, directory: &Directory, opcode: &str, args: &[String]) -> (i64, Vec<String>) {
    if !KNOWN_OPCODES.contains(&opcode) {
        return (status::UNKNOWN_COMMAND, Vec::new());
    }
    if session.user().is_none() {
        return handle_unauth(session, directory, opcode, args);
    }
    handle_auth(session, directory, opcode, args)
}

fn handle_unauth(session: &mut Session, directory: &Directory, opcode: &str, args: &[String]) -> (i64, Vec<String>) {
    match opcode {
        "register" => {
            let [email, password] = args else {
                return (status::INVALID_ARGUMENTS, Vec::new());
            };
            match directory.add(email, password) {
                Ok(()) => (0, Vec::new()),
                Err(AddError::AlreadyExists) => (status::GENERIC_FAILURE, Vec::new()),
                Err(AddError::InvalidEmail) => (status::INVALID_ARGUMENTS, Vec::new()),
            }
        }
        "login" => {
            let [email, password] = args else {
                return (status::INVALID_ARGUMENTS, Vec::new());
            };
            match directory.acquire(email, password) {
                Ok(user) => {
                    session.authenticate(user);
                    (0, Vec::new())
                }
                Err(AcquireError::NotFound | AcquireError::WrongPassword | AcquireError::AlreadyLoggedIn) => {
                    (status::GENERIC_FAILURE, Vec::new())
                }
            }
        }
        _ => (status::NOT_AUTHENTICATED, Vec::new()),
    }
}

fn handle_auth(session: &mut Session, directory: &Directory, opcode: &str, args: &[String]) -> (i64, Vec<String>) {
    let user = session.user().expect("handle_auth requires an authenticated session").clone();

    match opcode {
        "register" | "login" => (status::ALREADY_AUTHENTICATED, Vec::new()),
        "logout" => {
            session.logout(directory);
            (0, Vec::new())
        }
        "follow" => {
            if args.is_empty() {
                return (status::INVALID_ARGUMENTS, Vec::new());
            }
            let targets: Vec<String> = args.to_vec();
            let results = directory.follow(&user, &targets);
            let lines = results
                .into_iter()
                .map(|(email, outcome)| format!("{email} {}", outcome.code()))
                .collect::<Vec<_>>();
            (lines.len() as i64, lines)
        }
        "followers" => {
            let followers = directory.followers(&user);
            let count = followers.len() as i64;
            (count, followers)
        }
        "cip" => {
            let [payload] = args else {
                return (status::INVALID_ARGUMENTS, Vec::new());
            };
            let decoded = wire::decode_cip_payload(payload);
            directory.post_cip(&user, decoded);
            (0, Vec::new())
        }
        "cips" => {
            let cips = user
                .cips()
                .into_iter()
                .map(|cip| format!("{} {} {}", cip.id, cip.timestamp, wire::encode_cip_payload(&cip.payload)))
                .collect::<Vec<_>>();
            (cips.len() as i64, cips)
        }
        _ => (status::UNKNOWN_COMMAND, Vec::new()),
    }
}

/// Writes a reply's status line and continuation lines as a single logical
/// send, per spec §4.4's normative framing requirement.
fn write_reply(stream: &mut TcpStream, reply_status: i64, lines: &[String]) -> std::io::Result<()> {
    let mut out = format!("{reply_status}\n");
    for line in lines {
        out.push_str(line);
        out.push('\n');
    }
    stream.write_all(out.as_bytes())
}
