use crate::*;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

/// Relay between client and server that flips one bit of the
/// client→server stream at `flip_at`. Returns the relay's address.
async fn corrupting_relay(server: SocketAddr, flip_at: u64) -> Result<SocketAddr> {
    let (listener, addr) = loopback_listener().await?;

    tokio::spawn(async move {
        let (client, _) = listener.accept().await.expect("relay accept");
        let upstream = TcpStream::connect(server).await.expect("relay connect");

        let (mut client_rx, mut client_tx) = client.into_split();
        let (mut server_rx, mut server_tx) = upstream.into_split();

        tokio::spawn(async move {
            let _ = tokio::io::copy(&mut server_rx, &mut client_tx).await;
        });

        let mut buf = vec![0u8; 8192];
        let mut offset = 0u64;
        loop {
            let n = match client_rx.read(&mut buf).await {
                Ok(0) | Err(_) => break,
                Ok(n) => n,
            };
            if (offset..offset + n as u64).contains(&flip_at) {
                buf[(flip_at - offset) as usize] ^= 0x80;
            }
            offset += n as u64;
            if server_tx.write_all(&buf[..n]).await.is_err() {
                break;
            }
        }
    });

    Ok(addr)
}

#[tokio::test]
async fn flipped_bit_in_flight_is_detected() {
    let flip_at = 1_000_003;
    let (listener, server_addr) = loopback_listener().await.unwrap();
    let relay_addr = corrupting_relay(server_addr, flip_at).await.unwrap();

    let server_task = tokio::spawn(serve_one(listener, test_settings(42, None)));
    let client_task = tokio::spawn(dial_one(relay_addr, test_settings(42, None)));

    let server = tokio::time::timeout(SESSION_TIMEOUT, server_task)
        .await
        .expect("server should fail before timeout")
        .expect("server task");

    match server {
        Err(SessionError::Mismatch { offset, .. }) => assert_eq!(offset, flip_at),
        other => panic!("expected mismatch, got {other:?}"),
    }

    // The server hung up, so the client sees the connection drop.
    let client = tokio::time::timeout(SESSION_TIMEOUT, client_task)
        .await
        .expect("client should fail before timeout")
        .expect("client task");
    assert!(client.is_err());
}

#[tokio::test]
async fn mismatched_seeds_are_rejected() {
    let (server, client) = run_pair(test_settings(123_456, None), test_settings(654_321, None))
        .await
        .expect("pair should run");

    let server = server.expect_err("server must not succeed");
    let client = client.expect_err("client must not succeed");

    // Whichever side compares first reports the mismatch, within the
    // first chunk; the other may instead see the connection drop.
    let mismatches: Vec<&SessionError> =
        [&server, &client].into_iter().filter(|e| e.is_mismatch()).collect();
    assert!(!mismatches.is_empty(), "server: {server}, client: {client}");
    for e in mismatches {
        if let SessionError::Mismatch { offset, .. } = e {
            assert!(*offset < 4096);
        }
    }
}

#[tokio::test]
async fn truncated_stream_is_a_read_error() {
    let (listener, addr) = loopback_listener().await.unwrap();
    let server_task = tokio::spawn(serve_one(listener, test_settings(9, None)));

    // A peer that sends a correct prefix and then hangs up.
    let mut peer = TcpStream::connect(addr).await.unwrap();
    let mut prefix = vec![0u8; 100_000];
    wirecheck_core::StreamGenerator::new(9).fill(&mut prefix).unwrap();
    peer.write_all(&prefix).await.unwrap();
    drop(peer);

    let server = tokio::time::timeout(SESSION_TIMEOUT, server_task)
        .await
        .expect("server should fail before timeout")
        .expect("server task");

    match server {
        Err(SessionError::Read { .. }) | Err(SessionError::Write { .. }) => {}
        other => panic!("expected connection error, got {other:?}"),
    }
}
