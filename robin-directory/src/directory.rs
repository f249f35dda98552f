// SPDX-License-Identifier: BSD-3-Clause
// Copyright 2025. Triad National Security, LLC.

//! The process-wide user directory (C2).

use std::collections::HashMap;
use std::fmt;
use std::sync::Mutex;

use log::{debug, warn};

use crate::is_valid_email;
use crate::user::{UserEntry, UserRef};

/// Outcome of [`Directory::add`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddError {
    AlreadyExists,
    InvalidEmail,
}

impl fmt::Display for AddError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyExists => write!(f, "user already exists"),
            Self::InvalidEmail => write!(f, "invalid email"),
        }
    }
}

/// Outcome of [`Directory::acquire`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquireError {
    NotFound,
    WrongPassword,
    AlreadyLoggedIn,
}

impl fmt::Display for AcquireError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "no such user"),
            Self::WrongPassword => write!(f, "wrong password"),
            Self::AlreadyLoggedIn => write!(f, "already logged in elsewhere"),
        }
    }
}

/// Per-target outcome of [`Directory::follow`]. The numeric codes are the
/// wire-level reply codes from spec §4.4.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowOutcome {
    Followed,
    AlreadyFollowing,
    NotFound,
    SelfFollow,
}

impl FollowOutcome {
    pub fn code(self) -> i64 {
        match self {
            Self::Followed => 0,
            Self::AlreadyFollowing => 1,
            Self::NotFound => -1,
            Self::SelfFollow => -2,
        }
    }
}

/// The shared user directory: a mapping from email to user entry, plus the
/// directory-level mutex that guards the set of entries itself (as opposed to
/// any one entry's mutable state).
#[derive(Default)]
pub struct Directory {
    entries: Mutex<HashMap<String, UserRef>>,
}

impl Directory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new user. Exclusive on the directory mutex; atomic with
    /// respect to concurrent `add`/`find`.
    pub fn add(&self, email: &str, password: &str) -> Result<(), AddError> {
        if !is_valid_email(email) {
            return Err(AddError::InvalidEmail);
        }

        let mut entries = self.entries.lock().unwrap();
        if entries.contains_key(email) {
            return Err(AddError::AlreadyExists);
        }

        entries.insert(email.to_string(), UserEntry::new(email.to_string(), password.to_string()));
        debug!("directory: registered {email}");
        Ok(())
    }

    /// Looks up a user by email. Shared on the directory mutex; the returned
    /// reference pins the entry so the caller may subsequently acquire its
    /// per-user mutex without racing a concurrent free.
    pub fn find(&self, email: &str) -> Option<UserRef> {
        let entries = self.entries.lock().unwrap();
        entries.get(email).cloned()
    }

    /// Verifies credentials and marks the user logged in, atomically.
    pub fn acquire(&self, email: &str, password: &str) -> Result<UserRef, AcquireError> {
        let user = self.find(email).ok_or(AcquireError::NotFound)?;

        let mut state = user.state.lock().unwrap();
        if state.password != password {
            return Err(AcquireError::WrongPassword);
        }
        if state.logged_in {
            return Err(AcquireError::AlreadyLoggedIn);
        }
        state.logged_in = true;
        drop(state);

        debug!("directory: {email} logged in");
        Ok(user)
    }

    /// Clears the logged-in flag. Idempotent, so it is safe to call again on
    /// an abnormal disconnect after an explicit `logout` already ran.
    pub fn release(&self, user: &UserRef) {
        let mut state = user.state.lock().unwrap();
        state.logged_in = false;
        debug!("directory: {} released", user.email);
    }

    /// Processes each follow target independently, in input order, acquiring
    /// per-user mutexes in lexicographic order of email whenever both the
    /// acting user and the target must be mutated, to avoid deadlock against a
    /// concurrent reciprocal follow.
    pub fn follow(&self, acting: &UserRef, targets: &[String]) -> Vec<(String, FollowOutcome)> {
        targets
            .iter()
            .map(|target_email| {
                let outcome = self.follow_one(acting, target_email);
                (target_email.clone(), outcome)
            })
            .collect()
    }

    fn follow_one(&self, acting: &UserRef, target_email: &str) -> FollowOutcome {
        if target_email == acting.email {
            return FollowOutcome::SelfFollow;
        }

        let Some(target) = self.find(target_email) else {
            return FollowOutcome::NotFound;
        };

        // Acquire both per-user mutexes in lexicographic order of email so a
        // concurrent follow in the opposite direction can't deadlock against us.
        let outcome = if acting.email < target.email {
            let mut a = acting.state.lock().unwrap();
            let mut t = target.state.lock().unwrap();
            apply_follow(&mut a.follows, &mut t.followers, &acting.email, &target.email)
        } else {
            let mut t = target.state.lock().unwrap();
            let mut a = acting.state.lock().unwrap();
            apply_follow(&mut a.follows, &mut t.followers, &acting.email, &target.email)
        };

        outcome
    }

    /// Snapshot of `user`'s followers, in the order stored.
    pub fn followers(&self, user: &UserRef) -> Vec<String> {
        user.followers()
    }

    /// Appends a new cip to `author`'s log and returns its id.
    pub fn post_cip(&self, author: &UserRef, payload: String) -> u64 {
        author.post_cip(payload)
    }

    /// Releases every entry. Must only be called once no session still holds a
    /// reference to any entry (i.e. after the acceptor has stopped and every
    /// worker has finished its current session).
    pub fn free_all(&self) {
        let mut entries = self.entries.lock().unwrap();
        let count = entries.len();
        entries.clear();
        warn!("directory: freed {count} user entries");
    }
}

fn apply_follow(
    follows: &mut Vec<String>,
    followers: &mut Vec<String>,
    acting_email: &str,
    target_email: &str,
) -> FollowOutcome {
    if follows.iter().any(|e| e == target_email) {
        return FollowOutcome::AlreadyFollowing;
    }

    follows.push(target_email.to_string());
    followers.push(acting_email.to_string());
    FollowOutcome::Followed
}
