// SPDX-License-Identifier: BSD-3-Clause
// Copyright 2025. Triad National Security, LLC.

use std::io;

use clap::{Parser, Subcommand};

use robin_client::Client;

#[derive(Debug, Parser)]
struct Cli {
    #[arg(long, default_value = "localhost")]
    hostname: String,

    #[arg(long, default_value_t = 8080)]
    port: u16,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Register a new account.
    Register { email: String, password: String },
    /// Log in to an existing account.
    Login { email: String, password: String },
    /// Log out of the current session.
    Logout,
    /// Follow one or more users.
    Follow { emails: Vec<String> },
    /// List the users following the logged-in account.
    Followers,
    /// Post a cip.
    Cip { text: String },
    /// List the logged-in account's own cips.
    Cips,
}

fn main() -> io::Result<()> {
    env_logger::init();

    let args = Cli::parse();
    eprintln!("{args:?}");

    let mut client = Client::connect(&args.hostname, args.port)?;

    let result = match args.command {
        Command::Register { email, password } => client.register(&email, &password).map(|()| ()),
        Command::Login { email, password } => client.login(&email, &password),
        Command::Logout => client.logout(),
        Command::Follow { emails } => {
            let emails: Vec<&str> = emails.iter().map(String::as_str).collect();
            client.follow(&emails).map(|results| {
                for r in results {
                    println!("{} {}", r.email, r.code);
                }
            })
        }
        Command::Followers => client.followers().map(|emails| {
            for email in emails {
                println!("{email}");
            }
        }),
        Command::Cip { text } => client.cip(&text),
        Command::Cips => client.cips().map(|cips| {
            for cip in cips {
                println!("{} {} {}", cip.id, cip.timestamp, cip.payload);
            }
        }),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
    }

    Ok(())
}
