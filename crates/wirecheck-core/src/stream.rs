//! Deterministic byte stream — the sequence both peers agree on.
//!
//! Each peer builds one generator to feed its outbound half and a second,
//! identically seeded one as the reference for what the other side sends.
//! The generator must produce identical output on every platform and
//! build, so it is ChaCha8 rather than `StdRng`.

use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::error::GenerationError;

/// Session seed, agreed out of band. Must match on both peers.
pub type Seed = i64;

/// Default seed when none is configured.
pub const DEFAULT_SEED: Seed = 123_456;

/// One ChaCha block. The rng is only ever asked for whole blocks, since
/// `fill_bytes` discards the unused tail of its last 32-bit word.
const BLOCK: usize = 64;

/// Infinite pseudo-random byte source derived from a [`Seed`].
///
/// The stream does not depend on how it is read: `fill(a)` then `fill(b)`
/// yields the same bytes as `fill(a + b)`.
pub struct StreamGenerator {
    seed: Seed,
    rng: ChaCha8Rng,
    block: [u8; BLOCK],
    /// Next unread byte in `block`. `BLOCK` = empty.
    cursor: usize,
    produced: u64,
}

impl StreamGenerator {
    pub fn new(seed: Seed) -> Self {
        Self {
            seed,
            rng: ChaCha8Rng::seed_from_u64(seed as u64),
            block: [0u8; BLOCK],
            cursor: BLOCK,
            produced: 0,
        }
    }

    /// Fill all of `buf` with the next bytes of the stream.
    pub fn fill(&mut self, buf: &mut [u8]) -> Result<(), GenerationError> {
        let mut filled = 0;
        while filled < buf.len() {
            let want = buf.len() - filled;

            if self.cursor == BLOCK && want >= BLOCK {
                // Whole blocks go straight into the caller's buffer.
                let direct = want - want % BLOCK;
                self.rng.try_fill_bytes(&mut buf[filled..filled + direct])?;
                filled += direct;
                continue;
            }

            if self.cursor == BLOCK {
                self.rng.try_fill_bytes(&mut self.block)?;
                self.cursor = 0;
            }
            let take = want.min(BLOCK - self.cursor);
            buf[filled..filled + take].copy_from_slice(&self.block[self.cursor..self.cursor + take]);
            self.cursor += take;
            filled += take;
        }
        self.produced += buf.len() as u64;
        Ok(())
    }

    /// Bytes handed out so far, i.e. the stream offset of the next byte.
    pub fn position(&self) -> u64 {
        self.produced
    }
}

impl std::fmt::Debug for StreamGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamGenerator")
            .field("seed", &self.seed)
            .field("position", &self.produced)
            .finish()
    }
}
