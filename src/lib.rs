//! Voxline - real-time streaming voice recognition pipeline client
//!
//! Ingests a continuous PCM audio stream, slices it into fixed-length
//! frames for a local keyword-spotting capability, forwards the raw audio
//! over a reconnecting duplex session to a remote recognition service, and
//! routes recognition results to independently failing plugins.
//!
//! # Architecture
//!
//! ```text
//! capture chunks ──► FrameBuffer ──► frames ──► HotwordGate
//!        │                              │
//!        │                              └────► audio fan-out (plugins)
//!        └────────► RecognitionSession ◄──── reconnect policy
//!                          │
//!                 recognition notices
//!                          │
//!                    EventRouter ──► PluginRegistry handlers
//! ```

pub mod audio;
pub mod config;
pub mod context;
pub mod error;
pub mod hotword;
pub mod pipeline;
pub mod plugin;
pub mod router;
pub mod session;

pub use audio::{AudioCapture, Frame, FrameBuffer};
pub use config::Config;
pub use context::{KeywordSet, RecognitionContext};
pub use error::{Error, Result};
pub use hotword::{HotwordEngine, HotwordEngineFactory, HotwordGate, KeywordAsset};
pub use pipeline::Pipeline;
pub use plugin::{
    ChangeNotifier, ChannelNotifier, KeywordSpotterPlugin, PluginFactory, PluginRegistry,
    StockPluginFactory, VoicePlugin,
};
pub use router::EventRouter;
pub use session::{
    ConnectionState, RecognitionEvent, RecognitionSession, SessionHandle, SessionNotice,
};
