//! Acoustic hotword gating
//!
//! The keyword-spotting engine itself is an external capability consumed
//! through [`HotwordEngine`]: given a fixed-length frame, return the index
//! of the detected keyword or none. [`HotwordGate`] owns the capability's
//! lifecycle — it validates assets, constructs the engine through an
//! injected factory, and releases it exactly once.

pub mod energy;

use std::path::{Path, PathBuf};

pub use energy::{EnergyEngine, EnergyEngineFactory};

use crate::config::{AudioConfig, Config};
use crate::{Error, Result};

/// A keyword asset handed to the engine factory
#[derive(Debug, Clone)]
pub struct KeywordAsset {
    /// Keyword name as configured
    pub name: String,
    /// Path to the keyword asset file
    pub path: PathBuf,
    /// Detection sensitivity in `[0.0, 1.0]`
    pub sensitivity: f32,
}

/// Keyword-spotting capability contract
///
/// Implementations wrap a concrete engine (e.g. a Porcupine binding). The
/// engine dictates the frame length it requires; the gate verifies that it
/// agrees with the pipeline's configured frame length at initialization.
pub trait HotwordEngine: Send {
    /// Frame length in samples this engine requires
    fn frame_length(&self) -> usize;

    /// Offer one frame; returns the detected keyword index, if any
    fn process(&mut self, frame: &[i16]) -> Option<usize>;

    /// Free the underlying capability
    fn release(&mut self);
}

/// Constructs a [`HotwordEngine`] from validated assets
pub trait HotwordEngineFactory: Send + Sync {
    /// Build an engine from a model asset and keyword assets
    ///
    /// # Errors
    ///
    /// Returns [`Error::Hotword`] if the capability cannot be constructed.
    fn create(&self, model: &Path, keywords: &[KeywordAsset]) -> Result<Box<dyn HotwordEngine>>;
}

/// Wraps the keyword-spotting capability and owns its lifecycle
pub struct HotwordGate {
    model_path: PathBuf,
    keywords: Vec<KeywordAsset>,
    pipeline_frame_length: usize,
    engine: Option<Box<dyn HotwordEngine>>,
}

impl HotwordGate {
    /// Create an uninitialized gate from configuration
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        let keywords = config
            .acoustic_hotwords
            .iter()
            .map(|(name, hotword)| KeywordAsset {
                name: name.clone(),
                path: hotword.path.clone(),
                sensitivity: hotword.sensitivity,
            })
            .collect();

        Self::new(config.model.path.clone(), keywords, &config.audio)
    }

    /// Create an uninitialized gate
    #[must_use]
    pub fn new(model_path: PathBuf, keywords: Vec<KeywordAsset>, audio: &AudioConfig) -> Self {
        Self {
            model_path,
            keywords,
            pipeline_frame_length: audio.frame_length,
            engine: None,
        }
    }

    /// Validate assets and construct the capability
    ///
    /// A frame-length disagreement between the engine and the pipeline is a
    /// configuration error caught here, never at frame time.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Hotword`] if the model or a keyword asset is
    /// missing or the capability cannot be constructed, and
    /// [`Error::Config`] on a frame-length mismatch.
    pub fn initialize(&mut self, factory: &dyn HotwordEngineFactory) -> Result<()> {
        if !self.model_path.exists() {
            return Err(Error::Hotword(format!(
                "model asset not found: {}",
                self.model_path.display()
            )));
        }

        for keyword in &self.keywords {
            if !keyword.path.exists() {
                return Err(Error::Hotword(format!(
                    "keyword asset not found: {} ({})",
                    keyword.path.display(),
                    keyword.name
                )));
            }
            tracing::debug!(
                keyword = %keyword.name,
                path = %keyword.path.display(),
                sensitivity = keyword.sensitivity,
                "keyword asset resolved"
            );
        }

        let mut engine = factory.create(&self.model_path, &self.keywords)?;

        let required = engine.frame_length();
        if required != self.pipeline_frame_length {
            engine.release();
            return Err(Error::Config(format!(
                "hotword engine requires frames of {required} samples, \
                 audio.frame_length is {}",
                self.pipeline_frame_length
            )));
        }

        tracing::info!(
            keywords = self.keywords.len(),
            frame_length = required,
            "hotword gate initialized"
        );
        self.engine = Some(engine);
        Ok(())
    }

    /// Offer one frame to the capability
    ///
    /// # Errors
    ///
    /// Returns [`Error::HotwordNotInitialized`] if called before a
    /// successful [`initialize`](Self::initialize).
    pub fn process_frame(&mut self, frame: &[i16]) -> Result<Option<usize>> {
        let engine = self
            .engine
            .as_mut()
            .ok_or(Error::HotwordNotInitialized)?;
        Ok(engine.process(frame))
    }

    /// Keyword name for a detected index
    #[must_use]
    pub fn keyword_name(&self, index: usize) -> Option<&str> {
        self.keywords.get(index).map(|k| k.name.as_str())
    }

    /// Whether the capability has been constructed
    #[must_use]
    pub const fn is_initialized(&self) -> bool {
        self.engine.is_some()
    }

    /// Free the underlying capability
    ///
    /// Safe to call multiple times or without a prior initialize.
    pub fn release(&mut self) {
        if let Some(mut engine) = self.engine.take() {
            engine.release();
            tracing::debug!("hotword capability released");
        }
    }
}

impl Drop for HotwordGate {
    fn drop(&mut self) {
        self.release();
    }
}
