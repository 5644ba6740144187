use crate::*;

#[tokio::test]
async fn peers_with_same_seed_verify_each_other() {
    let limit = 8 * 1024 * 1024;
    let (server, client) = run_pair(
        test_settings(123_456, Some(limit)),
        test_settings(123_456, Some(limit)),
    )
    .await
    .expect("pair should run");

    let server = server.expect("server session should complete");
    let client = client.expect("client session should complete");

    assert_eq!(server.verified, limit);
    assert_eq!(server.sent, limit);
    assert_eq!(client.verified, limit);
    assert_eq!(client.sent, limit);
}

#[tokio::test]
async fn edge_seeds_verify() {
    for seed in [0, -1, i64::from(i32::MAX), i64::MIN] {
        let limit = 256 * 1024;
        let (server, client) = run_pair(test_settings(seed, Some(limit)), test_settings(seed, Some(limit)))
            .await
            .expect("pair should run");

        assert_eq!(server.unwrap_or_else(|e| panic!("seed {seed}: {e}")).verified, limit);
        assert_eq!(client.unwrap_or_else(|e| panic!("seed {seed}: {e}")).verified, limit);
    }
}

#[tokio::test]
async fn unaligned_limit_verifies_exactly() {
    // Not a multiple of the chunk size.
    let limit = 3 * 4096 + 1234;
    let (server, client) = run_pair(test_settings(7, Some(limit)), test_settings(7, Some(limit)))
        .await
        .expect("pair should run");

    assert_eq!(server.expect("server").verified, limit);
    assert_eq!(client.expect("client").verified, limit);
}

#[tokio::test]
async fn throttled_session_still_completes() {
    let limit = 64 * 1024;
    let throttled = SessionSettings {
        pause: Duration::from_millis(1),
        ..test_settings(11, Some(limit))
    };
    let (server, client) = run_pair(throttled.clone(), throttled)
        .await
        .expect("pair should run");

    let server = server.expect("server");
    assert_eq!(server.verified, limit);
    // At least one pause per chunk.
    assert!(server.elapsed >= Duration::from_millis(16));
    assert_eq!(client.expect("client").verified, limit);
}
