// SPDX-License-Identifier: BSD-3-Clause
// Copyright 2025. Triad National Security, LLC.

//! Per-connection session state machine (C3).
//!
//! A [`Session`] tracks which of the three states (`UNAUTH`, `AUTH(user)`,
//! `CLOSING`) a single connection is in. The state machine itself does not
//! know about opcodes or wire framing; the dispatcher (C4, in `robin-server`)
//! decides which transition a parsed command requests and calls the matching
//! method here, which is the only place that mutates the state and that talks
//! to the directory for login/logout bookkeeping.

use crate::directory::Directory;
use crate::user::UserRef;

/// Where a connection currently stands. See spec §4.3 for the full
/// transition table.
#[derive(Debug, Clone)]
pub enum SessionState {
    /// No user is logged in on this connection yet.
    Unauth,
    /// `user` is logged in on this connection.
    Auth(UserRef),
    /// The connection is being torn down; no further commands are dispatched.
    Closing,
}

/// Mutable per-connection session state, owned by the worker handling that
/// connection (never shared, so no internal locking is needed here).
#[derive(Debug)]
pub struct Session {
    state: SessionState,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Session { state: SessionState::Unauth }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn is_unauth(&self) -> bool {
        matches!(self.state, SessionState::Unauth)
    }

    pub fn is_closing(&self) -> bool {
        matches!(self.state, SessionState::Closing)
    }

    /// The logged-in user, if any.
    pub fn user(&self) -> Option<&UserRef> {
        match &self.state {
            SessionState::Auth(user) => Some(user),
            _ => None,
        }
    }

    /// `UNAUTH -> AUTH(user)`, on a successful `login`.
    pub fn authenticate(&mut self, user: UserRef) {
        self.state = SessionState::Auth(user);
    }

    /// `AUTH(u) -> UNAUTH`, on an explicit `logout`.
    pub fn logout(&mut self, directory: &Directory) {
        if let SessionState::Auth(user) = &self.state {
            directory.release(user);
        }
        self.state = SessionState::Unauth;
    }

    /// Any state `-> CLOSING`, on `quit`, EOF, or a socket error. Releases the
    /// logged-in user first if one was authenticated, matching the "any / EOF
    /// or socket error" row of the transition table.
    pub fn close(&mut self, directory: &Directory) {
        if let SessionState::Auth(user) = &self.state {
            directory.release(user);
        }
        self.state = SessionState::Closing;
    }
}
