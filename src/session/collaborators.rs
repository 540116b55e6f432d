//! Per-session recognition and speech clients.

use std::sync::Arc;

use thiserror::Error;

use crate::config::IntercomConfig;
use crate::recognition::{IntentDecoder, ProcessRecognizer, RecognitionError, Recognizer, ResponseDecoder};
use crate::speech::{Speaker, Transmitter};

/// Errors raised while building a session's collaborators.
#[derive(Debug, Error)]
pub enum CollaboratorError {
    #[error(transparent)]
    Recognizer(#[from] RecognitionError),
}

/// The clients one session talks to. Dropped when the session ends.
pub struct Collaborators {
    pub recognizer: Box<dyn Recognizer>,
    pub decoder: Box<dyn ResponseDecoder>,
    pub speaker: Box<dyn Speaker>,
}

/// Builds a fresh set of collaborators for each session.
pub trait CollaboratorFactory: Send + Sync {
    fn create(&self) -> Result<Collaborators, CollaboratorError>;
}

/// Out-of-process recognizer and synthesizer, as configured.
pub struct ProcessCollaborators {
    config: Arc<IntercomConfig>,
}

impl ProcessCollaborators {
    pub fn new(config: Arc<IntercomConfig>) -> Self {
        Self { config }
    }
}

impl CollaboratorFactory for ProcessCollaborators {
    fn create(&self) -> Result<Collaborators, CollaboratorError> {
        let recognizer = ProcessRecognizer::new(&self.config.recognizer, &self.config.audio)?;
        Ok(Collaborators {
            recognizer: Box::new(recognizer),
            decoder: Box::new(IntentDecoder),
            speaker: Box::new(Transmitter::from_config(&self.config.speech, &self.config.reply)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RecognizerConfig;

    #[test]
    fn unconfigured_recognizer_is_an_error() {
        let factory = ProcessCollaborators::new(Arc::new(IntercomConfig::default()));
        assert!(matches!(
            factory.create(),
            Err(CollaboratorError::Recognizer(RecognitionError::Unavailable(_)))
        ));
    }

    #[test]
    fn configured_recognizer_builds() {
        let config = IntercomConfig {
            recognizer: RecognizerConfig {
                command: Some("cat".into()),
                ..RecognizerConfig::default()
            },
            ..IntercomConfig::default()
        };
        let factory = ProcessCollaborators::new(Arc::new(config));
        assert!(factory.create().is_ok());
    }
}
