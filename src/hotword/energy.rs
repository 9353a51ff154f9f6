//! Energy-heuristic hotword engine
//!
//! A dedicated keyword-spotting binding is an external capability; this
//! engine is the built-in stand-in. It fires on a sustained run of
//! high-energy frames, leaving precise keyword verification to the text
//! match on recognition results.

use std::path::Path;

use super::{HotwordEngine, HotwordEngineFactory, KeywordAsset};
use crate::Result;

/// Minimum RMS energy (normalized) to count a frame as speech
pub const DEFAULT_ENERGY_THRESHOLD: f32 = 0.03;

/// Consecutive speech frames required to fire
pub const DEFAULT_MIN_SPEECH_FRAMES: usize = 10;

/// Fires keyword index 0 after a sustained run of speech-energy frames
pub struct EnergyEngine {
    frame_length: usize,
    threshold: f32,
    min_speech_frames: usize,
    speech_run: usize,
}

impl EnergyEngine {
    /// Create an engine for the given frame length
    #[must_use]
    pub const fn new(frame_length: usize, threshold: f32, min_speech_frames: usize) -> Self {
        Self {
            frame_length,
            threshold,
            min_speech_frames,
            speech_run: 0,
        }
    }
}

impl HotwordEngine for EnergyEngine {
    fn frame_length(&self) -> usize {
        self.frame_length
    }

    fn process(&mut self, frame: &[i16]) -> Option<usize> {
        if rms_energy(frame) > self.threshold {
            self.speech_run += 1;
        } else {
            self.speech_run = 0;
        }

        if self.speech_run >= self.min_speech_frames {
            self.speech_run = 0;
            tracing::trace!("energy run complete");
            return Some(0);
        }
        None
    }

    fn release(&mut self) {
        self.speech_run = 0;
    }
}

/// Builds [`EnergyEngine`] instances; ignores the model assets beyond the
/// gate's existence checks
pub struct EnergyEngineFactory {
    /// Frame length the engines will require
    pub frame_length: usize,
    /// Speech energy threshold
    pub threshold: f32,
    /// Consecutive speech frames required to fire
    pub min_speech_frames: usize,
}

impl EnergyEngineFactory {
    /// Factory with default thresholds
    #[must_use]
    pub const fn new(frame_length: usize) -> Self {
        Self {
            frame_length,
            threshold: DEFAULT_ENERGY_THRESHOLD,
            min_speech_frames: DEFAULT_MIN_SPEECH_FRAMES,
        }
    }
}

impl HotwordEngineFactory for EnergyEngineFactory {
    fn create(
        &self,
        _model: &Path,
        _keywords: &[KeywordAsset],
    ) -> Result<Box<dyn HotwordEngine>> {
        Ok(Box::new(EnergyEngine::new(
            self.frame_length,
            self.threshold,
            self.min_speech_frames,
        )))
    }
}

/// RMS energy of a frame, normalized to `[0.0, 1.0]`
#[allow(clippy::cast_precision_loss)]
fn rms_energy(frame: &[i16]) -> f32 {
    if frame.is_empty() {
        return 0.0;
    }
    let sum_squares: f32 = frame
        .iter()
        .map(|&s| {
            let normalized = f32::from(s) / f32::from(i16::MAX);
            normalized * normalized
        })
        .sum();
    (sum_squares / frame.len() as f32).sqrt()
}
