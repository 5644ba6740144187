//! Progress markers for the operator.
//!
//! A `.` for every 1 MiB verified and a line break for every 64 MiB.
//! Purely observational: nothing here can fail a session.

use tokio::io::{AsyncWrite, AsyncWriteExt};

pub const PROGRESS_SMALL: u64 = 1024 * 1024;
pub const PROGRESS_LARGE: u64 = 64 * PROGRESS_SMALL;

const SMALL_MARKER: &[u8] = b".";
const LARGE_MARKER: &[u8] = b"\n";

/// Markers owed after one [`Progress::update`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Crossed {
    pub small: u64,
    pub large: u64,
}

/// Cumulative verified-byte counter with two independent thresholds.
#[derive(Debug, Clone)]
pub struct Progress {
    cur: u64,
    next_small: u64,
    next_large: u64,
    small_unit: u64,
    large_unit: u64,
}

impl Progress {
    pub fn new() -> Self {
        Self::with_units(PROGRESS_SMALL, PROGRESS_LARGE)
    }

    /// Both units must be non-zero.
    pub fn with_units(small_unit: u64, large_unit: u64) -> Self {
        assert!(small_unit > 0 && large_unit > 0, "progress units must be non-zero");
        Self {
            cur: 0,
            next_small: small_unit,
            next_large: large_unit,
            small_unit,
            large_unit,
        }
    }

    /// Record `n` more verified bytes and report how many boundaries were reached.
    pub fn update(&mut self, n: u64) -> Crossed {
        self.cur = self.cur.saturating_add(n);

        let mut crossed = Crossed::default();
        if self.cur >= self.next_small {
            let steps = (self.cur - self.next_small) / self.small_unit + 1;
            crossed.small = steps;
            self.next_small += steps * self.small_unit;
        }
        if self.cur >= self.next_large {
            let steps = (self.cur - self.next_large) / self.large_unit + 1;
            crossed.large = steps;
            self.next_large += steps * self.large_unit;
        }
        crossed
    }

    pub fn verified(&self) -> u64 {
        self.cur
    }
}

impl Default for Progress {
    fn default() -> Self {
        Self::new()
    }
}

/// Writes the markers owed by a [`Progress`] to an async output stream.
pub struct ProgressReporter<W: AsyncWrite + Unpin> {
    progress: Progress,
    out: W,
}

impl<W: AsyncWrite + Unpin> ProgressReporter<W> {
    pub fn new(out: W) -> Self {
        Self::with_progress(Progress::new(), out)
    }

    pub fn with_progress(progress: Progress, out: W) -> Self {
        Self { progress, out }
    }

    pub async fn update(&mut self, n: u64) {
        let crossed = self.progress.update(n);
        if crossed == Crossed::default() {
            return;
        }
        if let Err(e) = self.emit(crossed).await {
            tracing::debug!(error = %e, "failed to write progress marker");
        }
    }

    async fn emit(&mut self, crossed: Crossed) -> std::io::Result<()> {
        for _ in 0..crossed.small {
            self.out.write_all(SMALL_MARKER).await?;
        }
        for _ in 0..crossed.large {
            self.out.write_all(LARGE_MARKER).await?;
        }
        self.out.flush().await
    }

    pub fn verified(&self) -> u64 {
        self.progress.verified()
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}
