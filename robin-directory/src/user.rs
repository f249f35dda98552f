// SPDX-License-Identifier: BSD-3-Clause
// Copyright 2025. Triad National Security, LLC.

//! The per-user entry: credentials, follow edges, and the append-only cip log.

use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

/// One message authored by a user and appended to that user's log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cip {
    pub id: u64,
    pub timestamp: u64,
    pub author: String,
    pub payload: String,
}

/// Mutable state of a user entry, guarded by its own mutex. Never accessed
/// without going through [`UserEntry`]'s methods, which enforce the directory's
/// locking discipline.
#[derive(Debug, Default)]
pub(crate) struct UserState {
    pub(crate) password: String,
    pub(crate) logged_in: bool,
    /// Emails this user follows, in the order they were followed.
    pub(crate) follows: Vec<String>,
    /// Emails that follow this user, in the order they started following.
    pub(crate) followers: Vec<String>,
    pub(crate) cips: Vec<Cip>,
    pub(crate) next_cip_id: u64,
}

/// A user's record in the directory. Stable identity for the lifetime of the
/// process (entries are never freed during normal operation), so a
/// [`UserRef`] pins its target without needing a liveness check.
#[derive(Debug)]
pub struct UserEntry {
    pub email: String,
    pub(crate) state: Mutex<UserState>,
}

/// A reference-counted pointer to a user entry. Cloning is cheap and safe to
/// hold across directory-level mutations: a session can keep its `UserRef`
/// for as long as the connection lives.
pub type UserRef = Arc<UserEntry>;

impl UserEntry {
    pub(crate) fn new(email: String, password: String) -> UserRef {
        Arc::new(UserEntry {
            email,
            state: Mutex::new(UserState {
                password,
                ..UserState::default()
            }),
        })
    }

    /// Appends a new cip with the next id and the current wall-clock
    /// timestamp, returning its id.
    pub fn post_cip(&self, payload: String) -> u64 {
        let mut state = self.state.lock().unwrap();
        let id = state.next_cip_id;
        state.next_cip_id += 1;

        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);

        state.cips.push(Cip {
            id,
            timestamp,
            author: self.email.clone(),
            payload,
        });

        id
    }

    /// Snapshot of this user's followers, in the order stored.
    pub fn followers(&self) -> Vec<String> {
        let state = self.state.lock().unwrap();
        state.followers.clone()
    }

    /// Snapshot of this user's cip log.
    pub fn cips(&self) -> Vec<Cip> {
        let state = self.state.lock().unwrap();
        state.cips.clone()
    }
}
