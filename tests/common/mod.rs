//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use intercom_server::audio::AudioBuffer;
use intercom_server::config::{IntercomConfig, ReplyConfig};
use intercom_server::recognition::{Intent, IntentDecoder, RecognitionError, Recognizer};
use intercom_server::session::{CollaboratorError, CollaboratorFactory, Collaborators};
use intercom_server::speech::{OfflineCache, SynthesisError, Synthesizer, Transmitter};

pub const REPLY_AUDIO: &[u8] = b"ID3-not-really-an-mp3";

/// Loopback config with short timeouts.
pub fn test_config(port: u16) -> IntercomConfig {
    let mut config = IntercomConfig::default();
    config.listener.host = "127.0.0.1".into();
    config.listener.port = port;
    config.timeouts.accept_ms = 100;
    config.timeouts.read_ms = 200;
    config.timeouts.drain_secs = 2;
    config.reply = ReplyConfig {
        attempts: 3,
        read_timeout_ms: 200,
        ..ReplyConfig::default()
    };
    config
}

pub fn loopback(port: u16) -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], port))
}

/// Poll `condition` until it holds or `deadline` passes.
pub async fn eventually(deadline: Duration, condition: impl Fn() -> bool) -> bool {
    let check = async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    };
    tokio::time::timeout(deadline, check).await.is_ok()
}

/// Understands everything and remembers how much audio it was given.
struct RecordingRecognizer {
    utterances: Arc<Mutex<Vec<usize>>>,
    delay: Duration,
}

#[async_trait]
impl Recognizer for RecordingRecognizer {
    async fn process(&mut self, audio: &AudioBuffer) -> Result<Option<Intent>, RecognitionError> {
        self.utterances.lock().unwrap().push(audio.len());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        Ok(Some(Intent {
            intent: "openDoor".into(),
            slots: BTreeMap::new(),
        }))
    }
}

struct FixedSynthesizer;

#[async_trait]
impl Synthesizer for FixedSynthesizer {
    async fn synthesize(&mut self, _text: &str) -> Result<Vec<u8>, SynthesisError> {
        Ok(REPLY_AUDIO.to_vec())
    }
}

/// In-process recognizer, the default decoder, and the real transmitter
/// backed by a fixed synthesizer.
#[derive(Clone, Default)]
pub struct FakeCollaborators {
    pub utterances: Arc<Mutex<Vec<usize>>>,
    /// How long recognition takes after the audio is recorded.
    pub delay: Duration,
}

impl FakeCollaborators {
    pub fn slow(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::default()
        }
    }

    pub fn utterances(&self) -> Vec<usize> {
        self.utterances.lock().unwrap().clone()
    }
}

impl CollaboratorFactory for FakeCollaborators {
    fn create(&self) -> Result<Collaborators, CollaboratorError> {
        let cache = OfflineCache::new(std::env::temp_dir().join("intercom-tests-empty-cache"));
        let reply = ReplyConfig {
            attempts: 3,
            read_timeout_ms: 200,
            ..ReplyConfig::default()
        };
        Ok(Collaborators {
            recognizer: Box::new(RecordingRecognizer {
                utterances: Arc::clone(&self.utterances),
                delay: self.delay,
            }),
            decoder: Box::new(IntentDecoder),
            speaker: Box::new(Transmitter::new(cache, Some(Box::new(FixedSynthesizer)), reply, false)),
        })
    }
}
