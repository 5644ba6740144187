//! wirecheck — duplex stream integrity probe.
//!
//! Run `wirecheck -s` on one host and `wirecheck -c HOST:PORT` on the other,
//! both with the same `--seed`. Each side prints a `.` per verified MiB and
//! exits non-zero on the first read, write or verification failure.

use anyhow::{Context, Result};
use clap::Parser;

use wirecheck_core::{transport, Session, SessionError, SessionReport, WirecheckConfig};

mod cli;

use cli::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // stdout carries progress markers only; logs go to stderr.
    let filter = match cli.verbose {
        0 => tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "info".into()),
        1 => tracing_subscriber::EnvFilter::new("debug"),
        _ => tracing_subscriber::EnvFilter::new("trace"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if cli.write_config {
        let path = WirecheckConfig::write_default_if_missing()?;
        tracing::info!(path = %path.display(), "config file ready");
        return Ok(());
    }

    let config = match &cli.config {
        Some(path) => WirecheckConfig::load_from(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => WirecheckConfig::load().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "failed to load config, using defaults");
            WirecheckConfig::default()
        }),
    };

    let role = cli
        .role(&config)
        .context("must specify one of -s or -c")?;
    let settings = cli.session_settings(&config);

    let (stream, peer) = transport::establish(&role)
        .await
        .context("failed to establish connection")?;

    let session = Session::new(settings, peer.to_string());

    tokio::select! {
        result = session.run(stream, tokio::io::stdout()) => {
            println!();
            finish(result)
        }
        _ = tokio::signal::ctrl_c() => {
            println!();
            tracing::info!("interrupted, shutting down");
            Ok(())
        }
    }
}

/// Map the session outcome to the process result. A failure is returned,
/// not logged, so the diagnostic is printed exactly once on exit.
fn finish(result: Result<SessionReport, SessionError>) -> Result<()> {
    let report = result?;
    tracing::info!(verified = report.verified, "limit reached, exiting");
    Ok(())
}
