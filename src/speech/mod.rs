//! Speech synthesis and the reply sub-protocol.
//!
//! # Data Flow
//! ```text
//! response text
//!     → cache.rs (previously synthesized audio on disk)
//!     → synth.rs (external text-to-speech on a cache miss)
//!     → transmit.rs (token → wait for 22/11 → stream audio)
//! ```

pub mod cache;
pub mod synth;
pub mod transmit;

use async_trait::async_trait;
use thiserror::Error;

use crate::net::Link;

pub use cache::OfflineCache;
pub use synth::ProcessSynthesizer;
pub use transmit::Transmitter;

/// Errors raised while producing audio for a response.
#[derive(Debug, Error)]
pub enum SynthesisError {
    #[error("failed to run synthesizer: {0}")]
    Io(#[from] std::io::Error),

    #[error("synthesizer exited with {status}: {stderr}")]
    Failed { status: String, stderr: String },

    #[error("synthesizer produced no audio")]
    Empty,
}

/// Converts text into encoded audio (MP3 for the current clients).
#[async_trait]
pub trait Synthesizer: Send {
    async fn synthesize(&mut self, text: &str) -> Result<Vec<u8>, SynthesisError>;
}

/// Speaks a response back to the client over its own connection.
#[async_trait]
pub trait Speaker: Send {
    /// Run the reply sub-protocol. Returns `false` when nothing was
    /// delivered; never fails the session.
    async fn transmit(&mut self, text: &str, link: &mut dyn Link) -> bool;
}
