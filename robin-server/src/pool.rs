// SPDX-License-Identifier: BSD-3-Clause
// Copyright 2025. Triad National Security, LLC.

//! Worker pool (C5): a fixed number of real workers plus spawn-on-demand
//! elastic workers, dispatched from a single pool mutex.

use std::collections::VecDeque;
use std::net::TcpStream;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::{debug, info};
use robin_directory::Directory;

use crate::dispatch;

/// How long a freshly-idle elastic worker waits for a new dispatch before it
/// gives up and exits. Keeps the common case (one connection, then gone)
/// while still letting a worker be reused for a connection that lands in the
/// same short burst.
const ELASTIC_IDLE_TIMEOUT: Duration = Duration::from_millis(200);

enum Slot {
    Idle,
    Dispatched(TcpStream),
}

struct WorkerSlot {
    slot: Mutex<Slot>,
    condvar: Condvar,
}

impl WorkerSlot {
    fn new() -> Arc<Self> {
        Arc::new(WorkerSlot { slot: Mutex::new(Slot::Idle), condvar: Condvar::new() })
    }

    fn dispatch(&self, stream: TcpStream) {
        let mut slot = self.slot.lock().unwrap();
        *slot = Slot::Dispatched(stream);
        self.condvar.notify_one();
    }
}

#[derive(Default)]
struct PoolState {
    idle_real: VecDeque<usize>,
    idle_elastic: VecDeque<Arc<WorkerSlot>>,
}

/// The two-tier worker pool. `R` real workers live for the process's
/// lifetime; elastic workers are spawned on demand and detach on exit.
pub struct Pool {
    real_slots: Vec<Arc<WorkerSlot>>,
    real_handles: Mutex<Vec<JoinHandle<()>>>,
    state: Mutex<PoolState>,
    directory: Arc<Directory>,
    shutting_down: AtomicBool,
}

impl Pool {
    /// Spawns `real_count` real workers and returns the initialized pool.
    pub fn new(real_count: usize, directory: Arc<Directory>) -> Arc<Self> {
        let mut real_slots = Vec::with_capacity(real_count);
        let mut state = PoolState::default();

        for i in 0..real_count {
            real_slots.push(WorkerSlot::new());
            state.idle_real.push_back(i);
        }

        let pool = Arc::new(Pool {
            real_slots,
            real_handles: Mutex::new(Vec::with_capacity(real_count)),
            state: Mutex::new(state),
            directory,
            shutting_down: AtomicBool::new(false),
        });

        let mut handles = Vec::with_capacity(real_count);
        for i in 0..real_count {
            let pool = Arc::clone(&pool);
            handles.push(thread::spawn(move || pool.run_real_worker(i)));
        }
        *pool.real_handles.lock().unwrap() = handles;

        info!("worker pool started with {real_count} real workers");
        pool
    }

    /// Hands a freshly accepted connection to a worker, per the dispatch
    /// policy in spec §4.5: idle real worker, else idle elastic worker, else
    /// spawn a new elastic worker.
    pub fn dispatch(self: &Arc<Self>, stream: TcpStream) {
        let mut state = self.state.lock().unwrap();

        if let Some(idx) = state.idle_real.pop_front() {
            drop(state);
            debug!("dispatching to real worker {idx}");
            self.real_slots[idx].dispatch(stream);
            return;
        }

        if let Some(slot) = state.idle_elastic.pop_front() {
            drop(state);
            debug!("dispatching to idle elastic worker");
            slot.dispatch(stream);
            return;
        }

        drop(state);
        debug!("spawning new elastic worker");
        let pool = Arc::clone(self);
        thread::spawn(move || pool.run_elastic_worker(stream));
    }

    fn run_real_worker(self: Arc<Self>, index: usize) {
        let worker_slot = Arc::clone(&self.real_slots[index]);

        loop {
            let mut guard = worker_slot.slot.lock().unwrap();
            loop {
                if self.shutting_down.load(Ordering::Acquire) {
                    debug!("real worker {index} shutting down");
                    return;
                }
                match &*guard {
                    Slot::Dispatched(_) => break,
                    Slot::Idle => {
                        guard = worker_slot.condvar.wait(guard).unwrap();
                    }
                }
            }

            let stream = match std::mem::replace(&mut *guard, Slot::Idle) {
                Slot::Dispatched(stream) => stream,
                Slot::Idle => unreachable!(),
            };
            drop(guard);

            dispatch::serve_connection(stream, &self.directory);

            if self.shutting_down.load(Ordering::Acquire) {
                return;
            }
            self.state.lock().unwrap().idle_real.push_back(index);
        }
    }

    fn run_elastic_worker(self: Arc<Self>, mut stream: TcpStream) {
        loop {
            dispatch::serve_connection(stream, &self.directory);

            let worker_slot = WorkerSlot::new();
            self.state.lock().unwrap().idle_elastic.push_back(Arc::clone(&worker_slot));

            let mut guard = worker_slot.slot.lock().unwrap();
            loop {
                match &*guard {
                    Slot::Dispatched(_) => break,
                    Slot::Idle => {
                        let (next_guard, timeout) =
                            worker_slot.condvar.wait_timeout(guard, ELASTIC_IDLE_TIMEOUT).unwrap();
                        guard = next_guard;
                        if timeout.timed_out() && matches!(*guard, Slot::Idle) {
                            // Deregister before giving up; if the dispatcher already
                            // claimed this slot it will have removed it from
                            // idle_elastic and we must keep waiting for the stream.
                            let mut state = self.state.lock().unwrap();
                            if let Some(pos) = state.idle_elastic.iter().position(|s| Arc::ptr_eq(s, &worker_slot)) {
                                state.idle_elastic.remove(pos);
                                drop(state);
                                return;
                            }
                        }
                    }
                }
            }

            stream = match std::mem::replace(&mut *guard, Slot::Idle) {
                Slot::Dispatched(stream) => stream,
                Slot::Idle => unreachable!(),
            };
            drop(guard);
        }
    }

    /// Signals every real worker to exit after its current session (if any)
    /// and joins them. Elastic workers in flight drain on their own: the
    /// acceptor has already stopped accepting by the time this runs, so each
    /// either finishes its current session and idles out on its own timeout,
    /// or is never spawned at all.
    pub fn shutdown(&self) {
        self.shutting_down.store(true, Ordering::Release);
        for slot in &self.real_slots {
            // Acquiring the slot's mutex here, even though we don't touch its
            // contents, serializes us against a worker's check-then-wait on the
            // same mutex so the flag update can never be missed between the
            // worker's check and its call to `wait`.
            let _guard = slot.slot.lock().unwrap();
            slot.condvar.notify_one();
        }

        let handles = std::mem::take(&mut *self.real_handles.lock().unwrap());
        for handle in handles {
            let _ = handle.join();
        }

        info!("worker pool shut down");
    }
}
