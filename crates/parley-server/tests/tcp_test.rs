//! Loopback wire-protocol tests.
//!
//! Each test binds an ephemeral port, runs the server task, and drives
//! real TCP clients through the session protocol.

use std::net::SocketAddr;
use std::time::Duration;

use parley_server::{Server, ServerConfig};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

async fn start_server(max_clients: usize) -> SocketAddr {
    let config = ServerConfig {
        port: 0,
        max_clients,
        logo_path: "no-such-logo.txt".into(),
    };
    let server = Server::bind(config).await.unwrap();
    let addr = server.local_addr().unwrap();
    tokio::spawn(server.run());
    addr
}

async fn connect(addr: SocketAddr) -> TcpStream {
    TcpStream::connect(("127.0.0.1", addr.port())).await.unwrap()
}

/// Read until the collected output contains `needle`, with a timeout so
/// a protocol bug fails the test instead of hanging it.
async fn recv_until(stream: &mut TcpStream, needle: &str) -> String {
    let mut collected = String::new();
    let mut buf = [0u8; 1024];
    loop {
        if collected.contains(needle) {
            return collected;
        }
        let read = tokio::time::timeout(Duration::from_secs(5), stream.read(&mut buf))
            .await
            .unwrap_or_else(|_| panic!("timed out waiting for {needle:?}, got {collected:?}"))
            .unwrap();
        assert!(read > 0, "stream closed while waiting for {needle:?}, got {collected:?}");
        collected.push_str(std::str::from_utf8(&buf[..read]).unwrap());
    }
}

/// Connect and complete name negotiation.
async fn join(addr: SocketAddr, name: &str) -> TcpStream {
    let mut stream = connect(addr).await;
    recv_until(&mut stream, "[ENTER YOUR NAME]: ").await;
    stream.write_all(format!("{name}\n").as_bytes()).await.unwrap();
    recv_until(&mut stream, &format!("[{name}]:")).await;
    stream
}

#[tokio::test]
async fn full_session_over_tcp() {
    let addr = start_server(10).await;

    let mut alice = join(addr, "alice").await;
    let mut bob = join(addr, "bob").await;

    recv_until(&mut alice, "bob has joined our chat...").await;

    bob.write_all(b"hi\n").await.unwrap();
    let to_alice = recv_until(&mut alice, "hi").await;
    assert!(to_alice.contains("[bob]:hi"));

    bob.write_all(b"exit\n").await.unwrap();
    recv_until(&mut bob, "Goodbye!").await;
    recv_until(&mut alice, "bob has left our chat...").await;
}

#[tokio::test]
async fn crlf_line_endings_are_accepted() {
    let addr = start_server(10).await;

    let mut stream = connect(addr).await;
    recv_until(&mut stream, "[ENTER YOUR NAME]: ").await;
    stream.write_all(b"carol\r\n").await.unwrap();
    // A surviving \r would corrupt the name in the prompt.
    recv_until(&mut stream, "[carol]:").await;
}

#[tokio::test]
async fn empty_message_is_rejected_over_tcp() {
    let addr = start_server(10).await;

    let mut stream = join(addr, "alice").await;
    stream.write_all(b"\n").await.unwrap();
    let output = recv_until(&mut stream, "Empty messages are not allowed!").await;
    assert!(!output.contains("has left"));
}

#[tokio::test]
async fn late_joiner_receives_history_over_tcp() {
    let addr = start_server(10).await;

    let mut alice = join(addr, "alice").await;
    alice.write_all(b"first message\n").await.unwrap();
    // Wait for the echo prompt so the broadcast has been sequenced.
    recv_until(&mut alice, "[alice]:").await;

    let mut bob = connect(addr).await;
    recv_until(&mut bob, "[ENTER YOUR NAME]: ").await;
    bob.write_all(b"bob\n").await.unwrap();

    let replay = recv_until(&mut bob, "[bob]:").await;
    assert!(replay.contains("alice has joined our chat..."));
    assert!(replay.contains("[alice]:first message"));
}

#[tokio::test]
async fn server_full_rejects_at_accept_time() {
    let addr = start_server(1).await;

    let _alice = join(addr, "alice").await;

    let mut rejected = connect(addr).await;
    recv_until(&mut rejected, "Server is full. Please try again later.").await;

    // The connection is closed without ever prompting for a name.
    let mut buf = [0u8; 64];
    let read = tokio::time::timeout(Duration::from_secs(5), rejected.read(&mut buf))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(read, 0);
}

#[tokio::test]
async fn duplicate_name_over_tcp_reprompts() {
    let addr = start_server(10).await;

    let _alice = join(addr, "alice").await;

    let mut stream = connect(addr).await;
    recv_until(&mut stream, "[ENTER YOUR NAME]: ").await;
    stream.write_all(b"alice\n").await.unwrap();
    recv_until(&mut stream, "Username is already taken.").await;

    stream.write_all(b"alice2\n").await.unwrap();
    recv_until(&mut stream, "[alice2]:").await;
}
