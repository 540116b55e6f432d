//! Audio handling for captured utterances.
//!
//! Incoming audio is 16 kHz, mono, signed 16-bit little-endian PCM, exactly
//! as the client's I2S microphone produces it.

pub mod buffer;
pub mod preprocess;
pub mod wav;

pub use buffer::AudioBuffer;

/// Samples per recognizer frame.
pub const FRAME_SAMPLES: usize = 512;
