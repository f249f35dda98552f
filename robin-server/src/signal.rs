// SPDX-License-Identifier: BSD-3-Clause
// Copyright 2025. Triad National Security, LLC.

//! `SIGINT` handling (C6): a blocking `accept()` is interrupted by `EINTR`
//! once the handler has recorded the signal, so the acceptor can notice it
//! without polling.

use std::os::raw::c_int;
use std::sync::atomic::{AtomicBool, Ordering};

use nix::sys::signal::{sigaction, SaFlags, SigAction, SigHandler, SigSet, Signal};

static INTERRUPTED: AtomicBool = AtomicBool::new(false);

extern "C" fn handle_sigint(_signum: c_int) {
    INTERRUPTED.store(true, Ordering::Relaxed);
}

/// Installs the `SIGINT` handler. Must be called once, before the acceptor
/// starts blocking on `accept()`.
pub fn install() {
    unsafe {
        let action = SigAction::new(SigHandler::Handler(handle_sigint), SaFlags::empty(), SigSet::empty());
        sigaction(Signal::SIGINT, &action).expect("failed to install SIGINT handler");
    }
}

/// Whether `SIGINT` has been caught since the process started.
pub fn was_interrupted() -> bool {
    INTERRUPTED.load(Ordering::Relaxed)
}
