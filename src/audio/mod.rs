//! Audio framing and capture

pub mod buffer;
pub mod capture;

pub use buffer::{Frame, FrameBuffer};
pub use capture::{AudioCapture, SAMPLE_RATE};
