//! Recognizer backed by an external program.
//!
//! The program receives preprocessed s16le PCM (whole 512-sample frames) on
//! stdin and prints one JSON document on stdout:
//! - `{"intent": "...", "slots": {...}}` when understood
//! - `null`, `{"understood": false}` or nothing when not understood

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use crate::audio::{preprocess, wav, AudioBuffer, FRAME_SAMPLES};
use crate::config::{AudioConfig, RecognizerConfig};
use crate::process::{run_piped, stderr_summary};
use crate::recognition::{Intent, RecognitionError, Recognizer};

#[derive(Deserialize)]
#[serde(untagged)]
enum RawOutput {
    Understood(Intent),
    #[allow(dead_code)]
    NotUnderstood { understood: bool },
}

/// Parse the recognizer's stdout.
pub fn parse_output(stdout: &[u8]) -> Result<Option<Intent>, serde_json::Error> {
    if stdout.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    let raw: Option<RawOutput> = serde_json::from_slice(stdout)?;
    Ok(match raw {
        Some(RawOutput::Understood(intent)) => Some(intent),
        Some(RawOutput::NotUnderstood { .. }) | None => None,
    })
}

pub struct ProcessRecognizer {
    program: String,
    args: Vec<String>,
    timeout: Duration,
    audio: AudioConfig,
}

impl ProcessRecognizer {
    /// Fails when no recognizer command is configured.
    pub fn new(config: &RecognizerConfig, audio: &AudioConfig) -> Result<Self, RecognitionError> {
        let program = config
            .command
            .clone()
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| RecognitionError::Unavailable("no recognizer command configured".into()))?;

        Ok(Self {
            program,
            args: config.args.clone(),
            timeout: config.timeout(),
            audio: audio.clone(),
        })
    }

    async fn dump(&self, path: PathBuf, pcm: Vec<u8>) {
        let sample_rate = self.audio.sample_rate;
        let result = tokio::task::spawn_blocking(move || {
            wav::write_wav(&path, &pcm, sample_rate).map(|()| path)
        })
        .await;

        match result {
            Ok(Ok(path)) => tracing::debug!(path = %path.display(), "Utterance dumped"),
            Ok(Err(e)) => tracing::warn!(error = %e, "Failed to dump utterance"),
            Err(e) => tracing::warn!(error = %e, "Utterance dump task failed"),
        }
    }
}

#[async_trait]
impl Recognizer for ProcessRecognizer {
    async fn process(&mut self, audio: &AudioBuffer) -> Result<Option<Intent>, RecognitionError> {
        let prepared = preprocess::prepare(audio.as_bytes(), &self.audio);
        let frames = preprocess::whole_frames(&prepared, FRAME_SAMPLES).to_vec();

        tracing::debug!(
            captured = audio.len(),
            prepared = prepared.len(),
            frames = frames.len() / (FRAME_SAMPLES * 2),
            "Audio prepared for recognition"
        );

        if let Some(path) = self.audio.dump_path.clone() {
            self.dump(path, frames.clone()).await;
        }

        let output = run_piped(&self.program, &self.args, frames, self.timeout).await?;
        if !output.status.success() {
            return Err(RecognitionError::Failed {
                status: output.status.to_string(),
                stderr: stderr_summary(&output),
            });
        }

        Ok(parse_output(&output.stdout)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_understood_output() {
        let intent = parse_output(br#"{"intent":"openDoor","slots":{"door":"garage"}}"#)
            .unwrap()
            .unwrap();
        assert_eq!(intent.intent, "openDoor");
        assert_eq!(intent.slots.get("door").map(String::as_str), Some("garage"));

        let bare = parse_output(br#"{"intent":"lightsOn"}"#).unwrap().unwrap();
        assert!(bare.slots.is_empty());
    }

    #[test]
    fn parses_not_understood_output() {
        assert_eq!(parse_output(b"null").unwrap(), None);
        assert_eq!(parse_output(br#"{"understood": false}"#).unwrap(), None);
        assert_eq!(parse_output(b"  \n").unwrap(), None);
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_output(b"not json").is_err());
    }

    #[test]
    fn requires_a_command() {
        let err = ProcessRecognizer::new(&RecognizerConfig::default(), &AudioConfig::default())
            .err()
            .unwrap();
        assert!(matches!(err, RecognitionError::Unavailable(_)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn runs_the_configured_program() {
        let config = RecognizerConfig {
            command: Some("sh".into()),
            args: vec![
                "-c".into(),
                r#"cat > /dev/null; echo '{"intent":"lightsOn","slots":{}}'"#.into(),
            ],
            ..RecognizerConfig::default()
        };
        let mut recognizer = ProcessRecognizer::new(&config, &AudioConfig::default()).unwrap();

        let audio = AudioBuffer::from(vec![0u8; 512 * 8]);
        let intent = recognizer.process(&audio).await.unwrap().unwrap();
        assert_eq!(intent.intent, "lightsOn");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn failing_program_is_an_error() {
        let config = RecognizerConfig {
            command: Some("sh".into()),
            args: vec!["-c".into(), "cat > /dev/null; exit 1".into()],
            ..RecognizerConfig::default()
        };
        let mut recognizer = ProcessRecognizer::new(&config, &AudioConfig::default()).unwrap();

        let err = recognizer.process(&AudioBuffer::from(vec![0u8; 512])).await.unwrap_err();
        assert!(matches!(err, RecognitionError::Failed { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn slow_program_times_out() {
        let config = RecognizerConfig {
            command: Some("sh".into()),
            args: vec!["-c".into(), "sleep 30".into()],
            timeout_secs: 1,
        };
        let mut recognizer = ProcessRecognizer::new(&config, &AudioConfig::default()).unwrap();

        let err = recognizer.process(&AudioBuffer::from(vec![0u8; 1024])).await.unwrap_err();
        assert!(matches!(err, RecognitionError::Io(ref e) if e.kind() == std::io::ErrorKind::TimedOut));
    }
}
