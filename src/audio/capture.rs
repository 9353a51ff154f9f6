//! Audio capture from the default input device
//!
//! Capture is an external collaborator at the pipeline boundary: it only
//! delivers raw PCM chunks. Chunks are forwarded over a bounded channel;
//! if the pipeline stalls, chunks are dropped here rather than buffered
//! without bound.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleRate, Stream, StreamConfig};
use tokio::sync::mpsc;

use crate::{Error, Result};

/// Sample rate for audio capture (16kHz for speech)
pub const SAMPLE_RATE: u32 = 16000;

/// Captures mono PCM audio and forwards chunks to the pipeline
pub struct AudioCapture {
    config: StreamConfig,
    stream: Option<Stream>,
}

impl AudioCapture {
    /// Create a new capture instance for the given sample rate
    ///
    /// # Errors
    ///
    /// Returns [`Error::Audio`] if no suitable input device or stream
    /// configuration is available.
    pub fn new(sample_rate: u32) -> Result<Self> {
        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .ok_or_else(|| Error::Audio("no input device available".to_string()))?;

        let supported = device
            .supported_input_configs()
            .map_err(|e| Error::Audio(e.to_string()))?
            .find(|c| {
                c.channels() == 1
                    && c.min_sample_rate() <= SampleRate(sample_rate)
                    && c.max_sample_rate() >= SampleRate(sample_rate)
            })
            .ok_or_else(|| Error::Audio("no suitable audio config found".to_string()))?;

        let config = supported.with_sample_rate(SampleRate(sample_rate)).config();

        tracing::debug!(
            device = device.name().unwrap_or_default(),
            sample_rate,
            channels = config.channels,
            "audio capture initialized"
        );

        Ok(Self {
            config,
            stream: None,
        })
    }

    /// Start capturing, sending each device buffer as one chunk of
    /// little-endian i16 PCM bytes
    ///
    /// # Errors
    ///
    /// Returns [`Error::Audio`] if the input stream cannot be built or
    /// started.
    pub fn start(&mut self, chunks: mpsc::Sender<Vec<u8>>) -> Result<()> {
        if self.stream.is_some() {
            return Ok(());
        }

        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .ok_or_else(|| Error::Audio("no input device".to_string()))?;

        let stream = device
            .build_input_stream(
                &self.config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    let bytes: Vec<u8> = data
                        .iter()
                        .flat_map(|&sample| {
                            #[allow(clippy::cast_possible_truncation)]
                            let sample_i16 =
                                (sample * 32767.0).clamp(-32768.0, 32767.0) as i16;
                            sample_i16.to_le_bytes()
                        })
                        .collect();
                    if chunks.try_send(bytes).is_err() {
                        tracing::warn!("pipeline busy, dropping capture chunk");
                    }
                },
                |err| {
                    tracing::error!(error = %err, "audio capture error");
                },
                None,
            )
            .map_err(|e| Error::Audio(e.to_string()))?;

        stream.play().map_err(|e| Error::Audio(e.to_string()))?;
        self.stream = Some(stream);

        tracing::debug!("audio capture started");
        Ok(())
    }

    /// Stop capturing
    pub fn stop(&mut self) {
        if let Some(stream) = self.stream.take() {
            drop(stream);
            tracing::debug!("audio capture stopped");
        }
    }

    /// Check if currently capturing
    #[must_use]
    pub const fn is_capturing(&self) -> bool {
        self.stream.is_some()
    }
}
