//! wirecheck integration test harness.
//!
//! Tests in this crate run real sessions over loopback TCP. Each test owns
//! its listeners and tasks; nothing is shared between tests.

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::net::TcpListener;

use wirecheck_core::{transport, Seed, Session, SessionError, SessionReport, SessionSettings};

mod faults;
mod sessions;

// ── Harness ───────────────────────────────────────────────────────────────────

/// Upper bound on any single test session.
pub const SESSION_TIMEOUT: Duration = Duration::from_secs(30);

/// Settings for a test session: no pause, optional byte limit.
pub fn test_settings(seed: Seed, limit: Option<u64>) -> SessionSettings {
    SessionSettings {
        seed,
        pause: Duration::ZERO,
        limit,
        ..SessionSettings::default()
    }
}

/// Bind a listener on an OS-assigned loopback port.
pub async fn loopback_listener() -> Result<(TcpListener, SocketAddr)> {
    let listener = transport::listen("127.0.0.1:0").await?;
    let addr = listener.local_addr().context("listener has no local addr")?;
    Ok((listener, addr))
}

/// Accept one peer on `listener` and run a session on it.
pub async fn serve_one(
    listener: TcpListener,
    settings: SessionSettings,
) -> Result<SessionReport, SessionError> {
    let (stream, peer) = transport::accept_one(&listener)
        .await
        .expect("accept should succeed");
    Session::new(settings, peer.to_string())
        .run(stream, tokio::io::sink())
        .await
}

/// Dial `addr` and run a session on the connection.
pub async fn dial_one(
    addr: SocketAddr,
    settings: SessionSettings,
) -> Result<SessionReport, SessionError> {
    let (stream, peer) = transport::dial(&addr.to_string())
        .await
        .expect("dial should succeed");
    Session::new(settings, peer.to_string())
        .run(stream, tokio::io::sink())
        .await
}

/// Run a server and a client against each other, bounded by [`SESSION_TIMEOUT`].
pub async fn run_pair(
    server: SessionSettings,
    client: SessionSettings,
) -> Result<(Result<SessionReport, SessionError>, Result<SessionReport, SessionError>)> {
    let (listener, addr) = loopback_listener().await?;
    let server_task = tokio::spawn(serve_one(listener, server));
    let client_task = tokio::spawn(dial_one(addr, client));

    let (server_result, client_result) =
        tokio::time::timeout(SESSION_TIMEOUT, async { tokio::join!(server_task, client_task) })
            .await
            .context("sessions did not finish in time")?;

    Ok((server_result?, client_result?))
}
