//! wirecheck-core — duplex stream verification between two peers.
//!
//! Both peers transmit the same seeded pseudo-random stream and verify
//! what arrives against a locally regenerated copy. Any corruption,
//! truncation or reordering on the path shows up as a mismatch.

pub mod config;
pub mod error;
pub mod progress;
pub mod session;
pub mod stream;
pub mod transport;

pub use config::{ConfigError, WirecheckConfig};
pub use error::{GenerationError, SessionError, TransportError};
pub use progress::{Progress, ProgressReporter};
pub use session::{Session, SessionReport, SessionSettings, CHUNK_SIZE};
pub use stream::{Seed, StreamGenerator, DEFAULT_SEED};
pub use transport::Role;
