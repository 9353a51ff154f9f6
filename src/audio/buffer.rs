//! Fixed-length frame slicing over a raw PCM chunk stream
//!
//! Capture sources deliver chunks of arbitrary byte length with no alignment
//! to frame boundaries. The hotword capability consumes fixed-length sample
//! frames. [`FrameBuffer`] bridges the two: it accumulates samples across
//! chunks and emits every complete frame, carrying the remainder forward.

/// A fixed-length window of signed 16-bit PCM samples
///
/// Immutable once produced; ownership moves to whoever consumes it.
pub type Frame = Vec<i16>;

/// Accumulates PCM bytes and emits complete fixed-length frames
///
/// The backlog is drained on every [`add_chunk`](Self::add_chunk) call, so
/// the retained state is always shorter than one frame (plus at most one
/// carried byte when a chunk splits a sample).
#[derive(Debug)]
pub struct FrameBuffer {
    backlog: Vec<i16>,
    pending_byte: Option<u8>,
    frame_length: usize,
}

impl FrameBuffer {
    /// Create a frame buffer emitting frames of `frame_length` samples
    ///
    /// # Panics
    ///
    /// Panics if `frame_length` is zero; the configured frame length is
    /// validated before the pipeline is built.
    #[must_use]
    pub fn new(frame_length: usize) -> Self {
        assert!(frame_length > 0, "frame_length must be > 0");
        Self {
            backlog: Vec::with_capacity(frame_length),
            pending_byte: None,
            frame_length,
        }
    }

    /// Append a chunk of little-endian i16 PCM bytes and return every
    /// complete frame, in order
    ///
    /// Leftover samples (always fewer than one frame) are retained for the
    /// next chunk; an odd trailing byte is held until its other half
    /// arrives.
    pub fn add_chunk(&mut self, chunk: &[u8]) -> Vec<Frame> {
        let mut bytes = chunk;
        if let Some(low) = self.pending_byte.take() {
            if let Some((&high, rest)) = chunk.split_first() {
                self.backlog.push(i16::from_le_bytes([low, high]));
                bytes = rest;
            } else {
                self.pending_byte = Some(low);
                return Vec::new();
            }
        }

        let mut pairs = bytes.chunks_exact(2);
        self.backlog
            .extend(pairs.by_ref().map(|p| i16::from_le_bytes([p[0], p[1]])));
        if let [odd] = pairs.remainder() {
            self.pending_byte = Some(*odd);
        }

        let complete = self.backlog.len() / self.frame_length;
        let mut frames = Vec::with_capacity(complete);
        let mut drain = self.backlog.drain(..complete * self.frame_length);
        for _ in 0..complete {
            frames.push(drain.by_ref().take(self.frame_length).collect());
        }
        drop(drain);

        frames
    }

    /// Clear the backlog and any carried byte
    pub fn reset(&mut self) {
        self.backlog.clear();
        self.pending_byte = None;
    }

    /// Configured frame length in samples
    #[must_use]
    pub const fn frame_length(&self) -> usize {
        self.frame_length
    }

    /// Samples currently retained, awaiting the next chunk
    #[must_use]
    pub const fn backlog_len(&self) -> usize {
        self.backlog.len()
    }
}
