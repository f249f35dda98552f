// SPDX-License-Identifier: BSD-3-Clause
// Copyright 2025. Triad National Security, LLC.

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use log::{error, info, warn};
use robin_directory::Directory;
use robin_server::{signal, socket, Pool, DEFAULT_REAL_WORKER_COUNT};

#[derive(Parser)]
#[command(name = "robin_server", about = "Run the Robin server")]
struct Cli {
    /// Hostname where the server is executed.
    host: String,

    /// Port on which the server listens for incoming connections.
    port: u16,
}

fn main() -> ExitCode {
    env_logger::init();
    welcome();

    let args = Cli::parse();

    signal::install();

    let listener = match socket::listen(&args.host, args.port) {
        Ok(listener) => listener,
        Err(e) => {
            error!("failed to start the server socket: {e}");
            return ExitCode::FAILURE;
        }
    };

    let directory = Arc::new(Directory::new());
    let pool = Pool::new(DEFAULT_REAL_WORKER_COUNT, Arc::clone(&directory));

    loop {
        match socket::accept(&listener) {
            Ok((stream, peer)) => {
                info!("accepted connection from {peer}");
                pool.dispatch(stream);
            }
            Err(e) => {
                if signal::was_interrupted() {
                    info!("SIGINT received, shutting down");
                    break;
                }
                warn!("failed to accept client connection: {e}");
            }
        }
    }

    pool.shutdown();
    directory.free_all();
    drop(listener);

    ExitCode::SUCCESS
}

fn welcome() {
    let msg = format!("Robin Server {}", env!("CARGO_PKG_VERSION"));
    println!("{msg}");
    println!("{}", "-".repeat(msg.len()));
}
