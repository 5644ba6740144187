//! Configuration system for wirecheck.
//!
//! Resolution order: environment variables → config file → defaults.
//! Command-line flags are applied on top by the binary.
//!
//! Config file location:
//!   1. $WIRECHECK_CONFIG (explicit override)
//!   2. $XDG_CONFIG_HOME/wirecheck/config.toml
//!   3. ~/.config/wirecheck/config.toml

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::session::{SessionSettings, CHUNK_SIZE};
use crate::stream::{Seed, DEFAULT_SEED};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WirecheckConfig {
    pub session: SessionConfig,
    pub network: NetworkConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Stream seed. Must match on server and client.
    pub seed: Seed,
    /// Max bytes read and verified per iteration.
    pub chunk_size: usize,
    /// Pause after each verified chunk, in milliseconds. 0 = no pause.
    pub pause_ms: u64,
    /// Stop after this many verified bytes. 0 = run until failure.
    pub limit_bytes: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Address the server listens on. Port 0 = OS-assigned.
    pub listen_addr: String,
}

// ── Defaults ──────────────────────────────────────────────────────────────────

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            seed: DEFAULT_SEED,
            chunk_size: CHUNK_SIZE,
            pause_ms: 1,
            limit_bytes: 0,
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:0".to_string(),
        }
    }
}

// ── Path helpers ──────────────────────────────────────────────────────────────

fn config_dir() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| dirs_or_home().join(".config"))
        .join("wirecheck")
}

fn dirs_or_home() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/tmp"))
}

// ── Errors ────────────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {0}: {1}")]
    ReadFailed(PathBuf, std::io::Error),
    #[error("failed to parse {0}: {1}")]
    ParseFailed(PathBuf, toml::de::Error),
    #[error("failed to write {0}: {1}")]
    WriteFailed(PathBuf, std::io::Error),
    #[error("failed to serialize: {0}")]
    SerializeFailed(toml::ser::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ── Loading ───────────────────────────────────────────────────────────────────

impl WirecheckConfig {
    /// Load config: env vars → file → defaults.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::file_path())
    }

    /// Load from an explicit path. A missing file yields defaults.
    pub fn load_from(path: &std::path::Path) -> Result<Self, ConfigError> {
        let mut config = if path.exists() {
            let text = std::fs::read_to_string(path)
                .map_err(|e| ConfigError::ReadFailed(path.to_path_buf(), e))?;
            toml::from_str(&text).map_err(|e| ConfigError::ParseFailed(path.to_path_buf(), e))?
        } else {
            WirecheckConfig::default()
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Config file path.
    pub fn file_path() -> PathBuf {
        std::env::var("WIRECHECK_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| config_dir().join("config.toml"))
    }

    /// Write default config if none exists. Returns the path.
    pub fn write_default_if_missing() -> Result<PathBuf, ConfigError> {
        let path = Self::file_path();
        if !path.exists() {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| ConfigError::WriteFailed(path.clone(), e))?;
            }
            let text = toml::to_string_pretty(&WirecheckConfig::default())
                .map_err(ConfigError::SerializeFailed)?;
            std::fs::write(&path, text).map_err(|e| ConfigError::WriteFailed(path.clone(), e))?;
        }
        Ok(path)
    }

    /// Apply WIRECHECK_* overrides. Unparseable values are ignored.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(v) = lookup("WIRECHECK_SESSION__SEED") {
            if let Ok(seed) = v.parse() {
                self.session.seed = seed;
            }
        }
        if let Some(v) = lookup("WIRECHECK_SESSION__PAUSE_MS") {
            if let Ok(ms) = v.parse() {
                self.session.pause_ms = ms;
            }
        }
        if let Some(v) = lookup("WIRECHECK_SESSION__LIMIT_BYTES") {
            if let Ok(n) = v.parse() {
                self.session.limit_bytes = n;
            }
        }
        if let Some(v) = lookup("WIRECHECK_NETWORK__LISTEN_ADDR") {
            self.network.listen_addr = v;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.session.chunk_size == 0 {
            return Err(ConfigError::Invalid("session.chunk_size must be non-zero".into()));
        }
        Ok(())
    }

    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings {
            seed: self.session.seed,
            chunk_size: self.session.chunk_size,
            pause: Duration::from_millis(self.session.pause_ms),
            limit: (self.session.limit_bytes > 0).then_some(self.session.limit_bytes),
        }
    }
}
