//! TOML configuration loading and validation
//!
//! The config file mirrors the recognition service's session parameters plus
//! the local hotword assets and plugin list. Every field the handshake needs
//! lives here so the session can be built from config alone.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::{Error, Result};

/// Default reconnect attempt bound
pub const DEFAULT_MAX_RECONNECT_ATTEMPTS: u32 = 5;

/// Default fixed delay between reconnect attempts, in milliseconds
pub const DEFAULT_RECONNECT_DELAY_MS: u64 = 2000;

/// Default connect/handshake timeout, in milliseconds
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 5000;

/// Top-level voxline configuration
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Plugin identities to load at startup, in registration order
    #[serde(default)]
    pub plugins: Vec<String>,

    /// Recognition mode sent in the handshake ("2pass", "online", "offline")
    pub mode: String,

    /// Inverse text normalization flag for the handshake
    #[serde(default)]
    pub itn: bool,

    /// Keyword bias scores sent to the recognition service
    /// (keyword text -> score)
    #[serde(default)]
    pub hotwords: BTreeMap<String, HotwordScore>,

    /// Local acoustic hotword assets (keyword name -> asset + sensitivity)
    #[serde(default)]
    pub acoustic_hotwords: BTreeMap<String, AcousticHotword>,

    /// Recognition service endpoint
    pub server: ServerConfig,

    /// Audio capture and framing parameters
    pub audio: AudioConfig,

    /// Hotword model asset
    pub model: ModelConfig,

    /// Session reconnect policy
    #[serde(default)]
    pub session: SessionConfig,
}

/// Keyword bias score for the service-side hotword list
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct HotwordScore {
    /// Numeric bias score
    pub score: f64,
}

/// Acoustic hotword asset reference
#[derive(Debug, Clone, Deserialize)]
pub struct AcousticHotword {
    /// Path to the keyword asset file
    pub path: PathBuf,
    /// Detection sensitivity in `[0.0, 1.0]`
    pub sensitivity: f32,
}

/// Recognition service endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Service host
    pub host: String,
    /// Service port
    pub port: u16,
}

impl ServerConfig {
    /// WebSocket URL for the recognition service
    #[must_use]
    pub fn url(&self) -> String {
        format!("ws://{}:{}", self.host, self.port)
    }
}

/// Audio capture and framing parameters
#[derive(Debug, Clone, Deserialize)]
pub struct AudioConfig {
    /// Capture sample rate in Hz
    pub sample_rate: u32,
    /// Channel count (the pipeline expects mono)
    pub channels: u16,
    /// Bits per sample (signed 16-bit PCM)
    pub bit_depth: u16,
    /// Hotword frame length in samples
    pub frame_length: usize,
    /// Chunking descriptor for the handshake: left context, current,
    /// right context
    pub chunk_size: [u32; 3],
    /// Chunk interval for the handshake, in milliseconds
    pub chunk_interval: u32,
}

/// Hotword model asset
#[derive(Debug, Clone, Deserialize)]
pub struct ModelConfig {
    /// Model language tag (informational)
    #[serde(default)]
    pub language: String,
    /// Path to the model asset file
    pub path: PathBuf,
}

/// Session reconnect policy
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Reconnect attempts before the session is terminally failed
    pub max_reconnect_attempts: u32,
    /// Fixed delay between reconnect attempts, in milliseconds
    pub reconnect_delay_ms: u64,
    /// Connect/handshake timeout, in milliseconds
    pub connect_timeout_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_reconnect_attempts: DEFAULT_MAX_RECONNECT_ATTEMPTS,
            reconnect_delay_ms: DEFAULT_RECONNECT_DELAY_MS,
            connect_timeout_ms: DEFAULT_CONNECT_TIMEOUT_MS,
        }
    }
}

impl Config {
    /// Load and validate configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the file cannot be read, parsed, or
    /// fails validation.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("cannot read {}: {e}", path.display()))
        })?;
        let config: Self = toml::from_str(&raw)?;
        config.validate()?;

        tracing::debug!(
            path = %path.display(),
            plugins = config.plugins.len(),
            mode = %config.mode,
            "configuration loaded"
        );

        Ok(config)
    }

    /// Validate cross-field constraints
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] on the first violated constraint.
    pub fn validate(&self) -> Result<()> {
        match self.mode.as_str() {
            "2pass" | "online" | "offline" => {}
            other => {
                return Err(Error::Config(format!(
                    "mode must be \"2pass\", \"online\" or \"offline\", got \"{other}\""
                )));
            }
        }

        if self.audio.channels != 1 {
            return Err(Error::Config(format!(
                "audio.channels must be 1, got {}",
                self.audio.channels
            )));
        }
        if self.audio.bit_depth != 16 {
            return Err(Error::Config(format!(
                "audio.bit_depth must be 16, got {}",
                self.audio.bit_depth
            )));
        }
        if self.audio.frame_length == 0 {
            return Err(Error::Config("audio.frame_length must be > 0".to_string()));
        }
        if self.server.host.is_empty() {
            return Err(Error::Config("server.host must not be empty".to_string()));
        }

        for (name, hotword) in &self.acoustic_hotwords {
            if !(0.0..=1.0).contains(&hotword.sensitivity) {
                return Err(Error::Config(format!(
                    "acoustic_hotwords.{name}.sensitivity must be in [0.0, 1.0], got {}",
                    hotword.sensitivity
                )));
            }
        }

        Ok(())
    }
}
