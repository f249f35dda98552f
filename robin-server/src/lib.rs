// SPDX-License-Identifier: BSD-3-Clause
// Copyright 2025. Triad National Security, LLC.

//! The Robin server's core: the command dispatcher (C4), worker pool (C5),
//! acceptor socket helpers (C6), and `SIGINT` handling. Exposed as a library,
//! in addition to the `robin_server` binary, so integration tests can drive a
//! server instance directly instead of only through a spawned process.

pub mod dispatch;
pub mod pool;
pub mod signal;
pub mod socket;

pub use pool::Pool;

/// Default number of real workers spawned at startup, per spec §4.5.
pub const DEFAULT_REAL_WORKER_COUNT: usize = 2;
