//! Speech-to-intent recognition.
//!
//! # Data Flow
//! ```text
//! AudioBuffer
//!     → Recognizer::process (preprocess, frame, run recognizer)
//!     → Option<Intent>
//!     → ResponseDecoder::decode
//!     → text to speak back
//! ```
//!
//! # Design Decisions
//! - One recognizer per session, created when the session starts
//! - A failed inference is "no result", never a session error
//! - Failing to create a recognizer is fatal for that session

pub mod decoder;
pub mod process;

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::audio::AudioBuffer;

pub use decoder::IntentDecoder;
pub use process::ProcessRecognizer;

/// An understood command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Intent {
    pub intent: String,
    #[serde(default)]
    pub slots: BTreeMap<String, String>,
}

/// Errors raised by a recognizer.
#[derive(Debug, Error)]
pub enum RecognitionError {
    /// The recognizer could not be created.
    #[error("recognizer unavailable: {0}")]
    Unavailable(String),

    #[error("failed to run recognizer: {0}")]
    Io(#[from] std::io::Error),

    #[error("recognizer exited with {status}: {stderr}")]
    Failed { status: String, stderr: String },

    #[error("malformed recognizer output: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Converts a captured utterance into an intent.
#[async_trait]
pub trait Recognizer: Send {
    /// `Ok(None)` means the audio was processed but not understood.
    async fn process(&mut self, audio: &AudioBuffer) -> Result<Option<Intent>, RecognitionError>;
}

/// Turns a recognition result into the sentence spoken back to the user.
pub trait ResponseDecoder: Send {
    /// Always returns non-empty text.
    fn decode(&self, result: Option<&Intent>) -> String;
}
