//! Synthesizer backed by an external text-to-speech program.

use std::time::Duration;

use async_trait::async_trait;

use crate::config::SpeechConfig;
use crate::process::{run_piped, stderr_summary};
use crate::speech::{SynthesisError, Synthesizer};

/// Writes the text to the program's stdin and takes stdout as audio.
pub struct ProcessSynthesizer {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl ProcessSynthesizer {
    /// `None` when no synthesis command is configured.
    pub fn from_config(config: &SpeechConfig) -> Option<Self> {
        let program = config.command.clone().filter(|c| !c.trim().is_empty())?;
        Some(Self {
            program,
            args: config.args.clone(),
            timeout: config.timeout(),
        })
    }
}

#[async_trait]
impl Synthesizer for ProcessSynthesizer {
    async fn synthesize(&mut self, text: &str) -> Result<Vec<u8>, SynthesisError> {
        let output = run_piped(&self.program, &self.args, text.as_bytes().to_vec(), self.timeout).await?;
        if !output.status.success() {
            return Err(SynthesisError::Failed {
                status: output.status.to_string(),
                stderr: stderr_summary(&output),
            });
        }
        if output.stdout.is_empty() {
            return Err(SynthesisError::Empty);
        }
        tracing::debug!(bytes = output.stdout.len(), "Speech synthesized");
        Ok(output.stdout)
    }
}
