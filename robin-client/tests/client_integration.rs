// SPDX-License-Identifier: BSD-3-Clause
// Copyright 2025. Triad National Security, LLC.

//! Integration tests driving [`robin_client::Client`] against a real
//! `robin-server` instance, exercising the typed API end to end.

use std::sync::atomic::{AtomicU16, Ordering};
use std::sync::Arc;
use std::time::Duration;

use robin_client::Client;
use robin_directory::Directory;
use robin_server::{socket, Pool};

static NEXT_PORT: AtomicU16 = AtomicU16::new(21_500);

fn spawn_server() -> u16 {
    let port = NEXT_PORT.fetch_add(1, Ordering::SeqCst);
    let listener = socket::listen("127.0.0.1", port).expect("bind test listener");
    let directory = Arc::new(Directory::new());
    let pool = Pool::new(2, Arc::clone(&directory));

    std::thread::spawn(move || {
        for _ in 0..16 {
            match socket::accept(&listener) {
                Ok((stream, _)) => pool.dispatch(stream),
                Err(_) => break,
            }
        }
    });

    let mut attempts = 50;
    while attempts > 0 {
        if std::net::TcpStream::connect(("127.0.0.1", port)).is_ok() {
            return port;
        }
        std::thread::sleep(Duration::from_millis(10));
        attempts -= 1;
    }
    panic!("timed out waiting for test server on port {port}");
}

#[test]
fn register_login_logout_round_trip() {
    let port = spawn_server();
    let mut client = Client::connect("127.0.0.1", port).unwrap();

    client.register("alice@example.com", "hunter2").unwrap();
    client.login("alice@example.com", "hunter2").unwrap();
    client.logout().unwrap();
}

#[test]
fn follow_returns_typed_results_in_order() {
    let port = spawn_server();

    let mut a = Client::connect("127.0.0.1", port).unwrap();
    a.register("a@example.com", "pw").unwrap();
    a.login("a@example.com", "pw").unwrap();

    let mut b = Client::connect("127.0.0.1", port).unwrap();
    b.register("b@example.com", "pw").unwrap();
    b.login("b@example.com", "pw").unwrap();

    let results = a.follow(&["a@example.com", "c@example.com", "b@example.com"]).unwrap();
    assert_eq!(results[0].email, "a@example.com");
    assert_eq!(results[0].code, -2);
    assert_eq!(results[1].email, "c@example.com");
    assert_eq!(results[1].code, -1);
    assert_eq!(results[2].email, "b@example.com");
    assert_eq!(results[2].code, 0);

    let followers = b.followers().unwrap();
    assert_eq!(followers, vec!["a@example.com".to_string()]);
}

#[test]
fn cip_round_trip_preserves_embedded_newline() {
    let port = spawn_server();
    let mut client = Client::connect("127.0.0.1", port).unwrap();
    client.register("poster@example.com", "pw").unwrap();
    client.login("poster@example.com", "pw").unwrap();

    client.cip("line one\nline two").unwrap();

    let cips = client.cips().unwrap();
    assert_eq!(cips.len(), 1);
    assert_eq!(cips[0].id, 0);
    assert_eq!(cips[0].payload, "line one\nline two");
}

#[test]
fn rejected_request_surfaces_as_client_error() {
    let port = spawn_server();
    let mut client = Client::connect("127.0.0.1", port).unwrap();

    let err = client.followers().unwrap_err();
    match err {
        robin_client::ClientError::Rejected(status) => assert_eq!(status, -2),
        other => panic!("expected Rejected(-2), got {other:?}"),
    }
}
