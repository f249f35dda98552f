// SPDX-License-Identifier: BSD-3-Clause
// Copyright 2025. Triad National Security, LLC.

//! The shared user directory (C2) and per-connection session state (C3).
//!
//! Two-level locking discipline throughout: [`Directory`]'s own mutex guards
//! the set of entries (inserts/lookups); each [`UserEntry`]'s mutex guards that
//! user's mutable state (credentials, follow sets, cip log). The directory
//! mutex is always acquired first; per-user mutexes, when two must be held at
//! once (only in [`Directory::follow`]), are acquired in lexicographic order of
//! email to avoid deadlock.

pub mod directory;
pub mod session;
pub mod user;

pub use directory::{AcquireError, AddError, Directory, FollowOutcome};
pub use session::{Session, SessionState};
pub use user::{Cip, UserEntry, UserRef};

/// Maximum length of an email address, per spec.
pub const MAX_EMAIL_LEN: usize = 254;

/// Validates an email the way the directory requires it: non-empty, no
/// internal ASCII whitespace, and within [`MAX_EMAIL_LEN`] bytes. Case is
/// significant and untouched.
pub fn is_valid_email(email: &str) -> bool {
    !email.is_empty()
        && email.len() <= MAX_EMAIL_LEN
        && !email.chars().any(|c| c.is_ascii_whitespace())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_and_whitespace() {
        assert!(!is_valid_email(""));
        assert!(!is_valid_email("a b@x"));
        assert!(!is_valid_email("a\tb@x"));
    }

    #[test]
    fn rejects_overlong() {
        let long = "a".repeat(MAX_EMAIL_LEN + 1);
        assert!(!is_valid_email(&long));
    }

    #[test]
    fn accepts_ordinary_email() {
        assert!(is_valid_email("alice@example.com"));
    }
}
