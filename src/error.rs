//! Error types for the voxline pipeline

use thiserror::Error;

/// Result type alias for voxline operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the voxline pipeline
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error (malformed or incomplete config, mismatched
    /// frame lengths); fatal at initialization
    #[error("configuration error: {0}")]
    Config(String),

    /// Audio capture error
    #[error("audio error: {0}")]
    Audio(String),

    /// Hotword asset missing or capability construction failed
    #[error("hotword error: {0}")]
    Hotword(String),

    /// A frame was offered before the hotword capability was initialized
    #[error("hotword capability not initialized")]
    HotwordNotInitialized,

    /// Transport-level session error (connect, send, abnormal close)
    #[error("session error: {0}")]
    Session(String),

    /// Reconnect attempts exhausted; the session is terminally failed
    #[error("session failed after {attempts} reconnect attempts")]
    SessionFailed {
        /// Attempts made before giving up
        attempts: u32,
    },

    /// Plugin failed its load contract
    #[error("plugin load error: {0}")]
    PluginLoad(String),

    /// Plugin identity not present in the registry
    #[error("plugin not found: {0}")]
    PluginNotFound(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),
}
