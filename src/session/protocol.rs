//! Wire protocol for the recognition service
//!
//! One JSON handshake per connect, raw binary PCM afterwards, JSON
//! recognition results inbound, and a JSON end-of-speech notice before a
//! graceful close.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::Result;

/// Fixed session label sent in the handshake and echoed in results
pub const SESSION_LABEL: &str = "realtime_recognition";

/// Session-configuration handshake, sent once per successful connect
/// before any audio
#[derive(Debug, Clone, Serialize)]
pub struct Handshake {
    /// Chunking descriptor: left context, current, right context
    pub chunk_size: [u32; 3],
    /// Session label
    pub wav_name: String,
    /// Speaking flag; `false` is only sent in the end-of-speech notice
    pub is_speaking: bool,
    /// Audio format tag
    pub wav_format: String,
    /// Chunk interval in milliseconds
    pub chunk_interval: u32,
    /// Inverse text normalization flag
    pub itn: bool,
    /// Recognition mode ("2pass", "online", "offline")
    pub mode: String,
    /// Keyword bias scores, serialized as an embedded JSON object
    pub hotwords: String,
}

impl Handshake {
    /// Build the handshake from configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the keyword-score map cannot be serialized.
    pub fn from_config(config: &Config) -> Result<Self> {
        let scores: BTreeMap<&str, f64> = config
            .hotwords
            .iter()
            .map(|(keyword, hotword)| (keyword.as_str(), hotword.score))
            .collect();

        Ok(Self {
            chunk_size: config.audio.chunk_size,
            wav_name: SESSION_LABEL.to_string(),
            is_speaking: true,
            wav_format: "pcm".to_string(),
            chunk_interval: config.audio.chunk_interval,
            itn: config.itn,
            mode: config.mode.clone(),
            hotwords: serde_json::to_string(&scores)?,
        })
    }
}

/// End-of-speech notice sent before a graceful close
#[derive(Debug, Clone, Copy, Serialize)]
pub struct EndOfSpeech {
    /// Always `false`
    pub is_speaking: bool,
}

impl EndOfSpeech {
    /// The one valid instance
    #[must_use]
    pub const fn notice() -> Self {
        Self { is_speaking: false }
    }
}

/// A recognition result from the service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecognitionEvent {
    /// Whether the service considers this result final
    #[serde(default)]
    pub is_final: bool,
    /// Result mode ("2pass-online", "2pass-offline", "online", "offline")
    #[serde(default)]
    pub mode: String,
    /// Recognized text
    #[serde(default)]
    pub text: String,
    /// Session label echoed from the handshake
    #[serde(default)]
    pub wav_name: String,
    /// Optional timestamped segments
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stamp_sents: Option<Vec<Segment>>,
    /// Optional service-side timestamp string
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

/// A timestamped text segment within a result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Segment {
    /// Segment start, milliseconds
    pub start: i64,
    /// Segment end, milliseconds
    pub end: i64,
    /// Segment text
    #[serde(rename = "text_seg")]
    pub text: String,
    /// Trailing punctuation
    #[serde(default)]
    pub punc: String,
}

impl RecognitionEvent {
    /// Whether this is an offline (second-pass, more accurate) result
    #[must_use]
    pub fn is_offline(&self) -> bool {
        matches!(self.mode.as_str(), "2pass-offline" | "offline")
    }

    /// Whether this is an online (interim) result
    #[must_use]
    pub fn is_online(&self) -> bool {
        matches!(self.mode.as_str(), "2pass-online" | "online")
    }

    /// Whether the result carries signal worth dispatching
    ///
    /// Empty-text results of either mode carry no signal and are dropped;
    /// results in an unrecognized mode are dropped as well.
    #[must_use]
    pub fn should_dispatch(&self) -> bool {
        !self.text.is_empty() && (self.is_offline() || self.is_online())
    }
}
