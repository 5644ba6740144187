//! Duplex session driver.
//!
//! One connection, two activities: a spawned transmit task copying the
//! seeded stream onto the write half, and the verify loop on the caller
//! checking the read half against an identically seeded reference. The
//! first failure on either side ends the session.

use std::time::{Duration, Instant};

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::task::JoinHandle;

use crate::error::SessionError;
use crate::progress::ProgressReporter;
use crate::stream::{Seed, StreamGenerator, DEFAULT_SEED};

/// Max bytes read and verified per iteration.
pub const CHUNK_SIZE: usize = 4096;

/// Bytes of context shown on each side of a mismatch report.
const MISMATCH_EXCERPT: usize = 16;

#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub seed: Seed,
    pub chunk_size: usize,
    /// Sleep after each verified chunk. Zero disables.
    pub pause: Duration,
    /// Send and verify exactly this many bytes, then end normally.
    /// `None` runs until something fails.
    pub limit: Option<u64>,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            seed: DEFAULT_SEED,
            chunk_size: CHUNK_SIZE,
            pause: Duration::from_millis(1),
            limit: None,
        }
    }
}

/// Outcome of a session that reached its byte limit.
#[derive(Debug, Clone, Copy)]
pub struct SessionReport {
    pub verified: u64,
    pub sent: u64,
    pub elapsed: Duration,
}

impl SessionReport {
    /// Verified throughput in MiB/s.
    pub fn mib_per_sec(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs == 0.0 {
            return 0.0;
        }
        self.verified as f64 / (1024.0 * 1024.0) / secs
    }
}

pub struct Session {
    settings: SessionSettings,
    peer: String,
}

impl Session {
    /// `peer` names the remote end in diagnostics.
    pub fn new(mut settings: SessionSettings, peer: impl Into<String>) -> Self {
        settings.chunk_size = settings.chunk_size.max(1);
        Self {
            settings,
            peer: peer.into(),
        }
    }

    /// Run over a single duplex stream, writing progress markers to `out`.
    pub async fn run<S, W>(&self, stream: S, out: W) -> Result<SessionReport, SessionError>
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
        W: AsyncWrite + Unpin,
    {
        let (reader, writer) = tokio::io::split(stream);
        self.run_split(reader, writer, out).await
    }

    /// Run with the inbound and outbound directions supplied separately.
    pub async fn run_split<R, T, W>(
        &self,
        reader: R,
        writer: T,
        out: W,
    ) -> Result<SessionReport, SessionError>
    where
        R: AsyncRead + Unpin,
        T: AsyncWrite + Unpin + Send + 'static,
        W: AsyncWrite + Unpin,
    {
        tracing::info!(
            peer = %self.peer,
            seed = self.settings.seed,
            limit = ?self.settings.limit,
            "session started"
        );
        let started = Instant::now();

        let mut transmit = TransmitTask::spawn(
            writer,
            self.settings.seed,
            self.settings.chunk_size,
            self.settings.limit,
            self.peer.clone(),
        );
        let mut reporter = ProgressReporter::new(out);

        let outcome = async {
            let verify = self.verify(reader, &mut reporter);
            tokio::pin!(verify);

            // Transmit only finishes early when it has sent the whole limit.
            let verified = tokio::select! {
                r = &mut verify => Some(r?),
                r = transmit.join() => {
                    r?;
                    None
                }
            };
            let verified = match verified {
                Some(verified) => verified,
                None => verify.await?,
            };
            let sent = transmit.join().await?;
            Ok::<_, SessionError>((verified, sent))
        }
        .await;

        let (verified, sent) = match outcome {
            Ok(counts) => counts,
            Err(e) => {
                transmit.cancel().await;
                return Err(e);
            }
        };

        let report = SessionReport {
            verified,
            sent,
            elapsed: started.elapsed(),
        };
        tracing::info!(
            peer = %self.peer,
            verified = report.verified,
            sent = report.sent,
            elapsed_ms = report.elapsed.as_millis() as u64,
            mib_per_sec = report.mib_per_sec(),
            "session complete"
        );
        Ok(report)
    }

    async fn verify<R, W>(
        &self,
        mut reader: R,
        reporter: &mut ProgressReporter<W>,
    ) -> Result<u64, SessionError>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let chunk = self.settings.chunk_size;
        let mut conn_buf = vec![0u8; chunk];
        let mut stream_buf = vec![0u8; chunk];
        let mut reference = StreamGenerator::new(self.settings.seed);

        loop {
            let want = match self.settings.limit {
                Some(limit) => {
                    let left = limit.saturating_sub(reference.position());
                    if left == 0 {
                        return Ok(reference.position());
                    }
                    left.min(chunk as u64) as usize
                }
                None => chunk,
            };

            let n = reader
                .read(&mut conn_buf[..want])
                .await
                .map_err(|source| self.read_error(source))?;
            if n == 0 {
                return Err(self.read_error(std::io::Error::new(
                    std::io::ErrorKind::UnexpectedEof,
                    "peer closed the connection",
                )));
            }

            let offset = reference.position();
            reference.fill(&mut stream_buf[..n])?;

            let (received, expected) = (&conn_buf[..n], &stream_buf[..n]);
            if received != expected {
                return Err(mismatch(offset, expected, received));
            }

            reporter.update(n as u64).await;
            if !self.settings.pause.is_zero() {
                tokio::time::sleep(self.settings.pause).await;
            }
        }
    }

    fn read_error(&self, source: std::io::Error) -> SessionError {
        SessionError::Read {
            peer: self.peer.clone(),
            source,
        }
    }
}

fn mismatch(offset: u64, expected: &[u8], received: &[u8]) -> SessionError {
    let at = expected
        .iter()
        .zip(received)
        .position(|(a, b)| a != b)
        .unwrap_or(0);
    let end = (at + MISMATCH_EXCERPT).min(expected.len());
    SessionError::Mismatch {
        offset: offset + at as u64,
        expected: hex::encode(&expected[at..end]),
        actual: hex::encode(&received[at..end]),
    }
}

// ── Transmit task ─────────────────────────────────────────────────────────────

/// Handle to the spawned transmit side. Aborted when dropped.
struct TransmitTask {
    handle: JoinHandle<Result<u64, SessionError>>,
    sent: Option<u64>,
    /// The handle has resolved and must not be polled again.
    finished: bool,
}

impl TransmitTask {
    fn spawn<T>(writer: T, seed: Seed, chunk: usize, limit: Option<u64>, peer: String) -> Self
    where
        T: AsyncWrite + Unpin + Send + 'static,
    {
        Self {
            handle: tokio::spawn(transmit(writer, seed, chunk, limit, peer)),
            sent: None,
            finished: false,
        }
    }

    /// Wait for the task. Safe to call again after it has completed successfully.
    async fn join(&mut self) -> Result<u64, SessionError> {
        if let Some(sent) = self.sent {
            return Ok(sent);
        }
        let joined = (&mut self.handle).await;
        self.finished = true;
        let sent = joined??;
        self.sent = Some(sent);
        Ok(sent)
    }

    /// Abort the task and wait until it has stopped and released the writer.
    async fn cancel(&mut self) {
        if self.finished {
            return;
        }
        self.handle.abort();
        let _ = (&mut self.handle).await;
        self.finished = true;
    }
}

impl Drop for TransmitTask {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn transmit<T>(
    mut writer: T,
    seed: Seed,
    chunk: usize,
    limit: Option<u64>,
    peer: String,
) -> Result<u64, SessionError>
where
    T: AsyncWrite + Unpin,
{
    let mut source = StreamGenerator::new(seed);
    let mut buf = vec![0u8; chunk];
    let write_error = |e: std::io::Error| SessionError::Write {
        peer: peer.clone(),
        source: e,
    };

    loop {
        let n = match limit {
            Some(limit) => {
                let left = limit.saturating_sub(source.position());
                if left == 0 {
                    break;
                }
                left.min(chunk as u64) as usize
            }
            None => chunk,
        };
        source.fill(&mut buf[..n])?;
        writer.write_all(&buf[..n]).await.map_err(write_error)?;
    }

    writer.shutdown().await.map_err(write_error)?;
    tracing::debug!(peer = %peer, sent = source.position(), "transmit finished");
    Ok(source.position())
}
