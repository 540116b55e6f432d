//! Reply sub-protocol: announce, wait for the client's ack, stream audio.

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use crate::config::{ReplyConfig, SpeechConfig};
use crate::net::Link;
use crate::observability::metrics;
use crate::protocol::{reply_token, ReplyAck};
use crate::speech::{OfflineCache, ProcessSynthesizer, Speaker, Synthesizer};

/// Responses at least this long are never written to the offline cache.
const MAX_SAVED_TEXT_LEN: usize = 60;

/// The default [`Speaker`].
pub struct Transmitter {
    cache: OfflineCache,
    synthesizer: Option<Box<dyn Synthesizer>>,
    reply: ReplyConfig,
    save_responses: bool,
}

impl Transmitter {
    pub fn new(
        cache: OfflineCache,
        synthesizer: Option<Box<dyn Synthesizer>>,
        reply: ReplyConfig,
        save_responses: bool,
    ) -> Self {
        Self {
            cache,
            synthesizer,
            reply,
            save_responses,
        }
    }

    pub fn from_config(speech: &SpeechConfig, reply: &ReplyConfig) -> Self {
        let synthesizer = ProcessSynthesizer::from_config(speech)
            .map(|s| Box::new(s) as Box<dyn Synthesizer>);
        if synthesizer.is_none() {
            tracing::debug!("No synthesizer configured, replies come from the offline cache only");
        }
        Self::new(
            OfflineCache::new(speech.offline_dir.clone()),
            synthesizer,
            reply.clone(),
            speech.save_responses,
        )
    }

    /// Cached audio first, then a fresh synthesis.
    async fn audio_for(&mut self, text: &str) -> Option<Vec<u8>> {
        if let Some(audio) = self.cache.lookup(text).await {
            return Some(audio);
        }

        let synthesizer = self.synthesizer.as_mut()?;
        let audio = match synthesizer.synthesize(text).await {
            Ok(audio) => audio,
            Err(e) => {
                tracing::warn!(error = %e, "Speech synthesis failed");
                return None;
            }
        };

        if self.save_responses && text.chars().count() < MAX_SAVED_TEXT_LEN {
            match self.cache.store(text, &audio).await {
                Ok(path) => tracing::debug!(path = %path.display(), "Response saved for offline use"),
                Err(e) => tracing::warn!(error = %e, "Failed to save response audio"),
            }
        }
        Some(audio)
    }

    /// Wait for `SEND_AUDIO` or `CACHED`, spending at most `reply.attempts`
    /// bounded reads.
    async fn await_ack(&mut self, link: &mut dyn Link) -> Option<ReplyAck> {
        let mut byte = [0u8; 1];
        for attempt in 1..=self.reply.attempts {
            match tokio::time::timeout(self.reply.read_timeout(), link.read(&mut byte)).await {
                Err(_) => tracing::debug!(attempt, "No reply ack yet"),
                Ok(Ok(0)) => {
                    tracing::info!("Client closed the connection during the reply");
                    return None;
                }
                Ok(Ok(_)) => match ReplyAck::from_byte(byte[0]) {
                    Some(ack) => return Some(ack),
                    None => tracing::debug!(attempt, value = byte[0], "Unexpected reply ack"),
                },
                Ok(Err(e)) => tracing::warn!(attempt, error = %e, "Failed to read reply ack"),
            }
        }
        tracing::warn!(attempts = self.reply.attempts, "Client never acknowledged the reply");
        None
    }
}

#[async_trait]
impl Speaker for Transmitter {
    async fn transmit(&mut self, text: &str, link: &mut dyn Link) -> bool {
        if text.is_empty() {
            return false;
        }

        let Some(audio) = self.audio_for(text).await else {
            tracing::info!("No audio content for the response, reply skipped");
            metrics::record_reply("no_audio");
            return false;
        };

        let token = reply_token(text);
        if let Err(e) = link.write_all(&token).await {
            tracing::warn!(error = %e, "Failed to send reply token");
            metrics::record_reply("error");
            return false;
        }
        tracing::debug!("Reply token sent");

        match self.await_ack(link).await {
            Some(ReplyAck::SendAudio) => {
                tracing::info!(bytes = audio.len(), "Streaming reply audio");
                let sent = tokio::time::timeout(self.reply.send_timeout(), async {
                    link.write_all(&audio).await?;
                    link.flush().await
                })
                .await;
                match sent {
                    Ok(Ok(())) => {
                        metrics::record_reply("streamed");
                        true
                    }
                    Ok(Err(e)) => {
                        tracing::warn!(error = %e, "Failed to stream reply audio");
                        metrics::record_reply("error");
                        false
                    }
                    Err(_) => {
                        tracing::warn!(
                            timeout_ms = self.reply.send_timeout_ms,
                            "Client stopped reading, reply audio abandoned"
                        );
                        metrics::record_reply("send_timeout");
                        false
                    }
                }
            }
            Some(ReplyAck::Cached) => {
                tracing::info!("Client has the reply cached, nothing sent");
                metrics::record_reply("client_cached");
                true
            }
            None => {
                metrics::record_reply("unacknowledged");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{CACHED, REPLY_TOKEN_LEN, SEND_AUDIO};
    use crate::speech::SynthesisError;
    use std::time::Duration;

    struct FixedSynth(&'static [u8]);

    #[async_trait]
    impl Synthesizer for FixedSynth {
        async fn synthesize(&mut self, _text: &str) -> Result<Vec<u8>, SynthesisError> {
            Ok(self.0.to_vec())
        }
    }

    fn fast_reply() -> ReplyConfig {
        ReplyConfig {
            attempts: 3,
            read_timeout_ms: 50,
            send_timeout_ms: 200,
        }
    }

    fn transmitter(tag: &str, synth: Option<Box<dyn Synthesizer>>) -> Transmitter {
        let dir = std::env::temp_dir().join(format!("intercom-transmit-{tag}-{}", std::process::id()));
        Transmitter::new(OfflineCache::new(dir), synth, fast_reply(), false)
    }

    #[tokio::test]
    async fn streams_audio_after_send_ack() {
        let (mut client, mut server) = tokio::io::duplex(4096);
        let mut speaker = transmitter("send", Some(Box::new(FixedSynth(b"MP3DATA"))));

        let peer = tokio::spawn(async move {
            let mut token = [0u8; REPLY_TOKEN_LEN];
            client.read_exact(&mut token).await.unwrap();
            client.write_all(&[SEND_AUDIO]).await.unwrap();
            let mut audio = [0u8; 7];
            client.read_exact(&mut audio).await.unwrap();
            (token, audio)
        });

        assert!(speaker.transmit("turn on the light", &mut server).await);
        let (token, audio) = peer.await.unwrap();
        assert_eq!(&token[..19], b"/turnonthelight.mp3");
        assert!(token[19..].iter().all(|b| *b == 0));
        assert_eq!(&audio, b"MP3DATA");
    }

    #[tokio::test]
    async fn cached_ack_sends_nothing() {
        let (mut client, mut server) = tokio::io::duplex(4096);
        let mut speaker = transmitter("cached", Some(Box::new(FixedSynth(b"MP3DATA"))));

        let mut token = [0u8; REPLY_TOKEN_LEN];
        client.write_all(&[CACHED]).await.unwrap();
        assert!(speaker.transmit("yes", &mut server).await);

        client.read_exact(&mut token).await.unwrap();
        assert_eq!(&token[..8], b"/yes.mp3");
        let mut extra = [0u8; 1];
        let pending = tokio::time::timeout(Duration::from_millis(50), client.read(&mut extra)).await;
        assert!(pending.is_err(), "no audio may follow a cached ack");
    }

    #[tokio::test]
    async fn gives_up_after_retry_budget() {
        let (mut client, mut server) = tokio::io::duplex(4096);
        let mut speaker = transmitter("silent", Some(Box::new(FixedSynth(b"MP3DATA"))));

        // Unexpected bytes consume attempts too.
        client.write_all(&[7]).await.unwrap();
        let started = tokio::time::Instant::now();
        assert!(!speaker.transmit("hello", &mut server).await);
        assert!(started.elapsed() >= Duration::from_millis(100));
    }

    #[tokio::test]
    async fn no_audio_means_no_token() {
        let (mut client, mut server) = tokio::io::duplex(4096);
        let mut speaker = transmitter("none", None);

        assert!(!speaker.transmit("hello", &mut server).await);
        drop(server);
        let mut rest = Vec::new();
        client.read_to_end(&mut rest).await.unwrap();
        assert!(rest.is_empty());
    }

    #[tokio::test]
    async fn offline_audio_skips_synthesis() {
        let mut speaker = transmitter("offline", None);
        speaker.cache.store("hello", b"CACHEDMP3").await.unwrap();

        let (mut client, mut server) = tokio::io::duplex(4096);
        client.write_all(&[SEND_AUDIO]).await.unwrap();
        assert!(speaker.transmit("hello", &mut server).await);

        let mut received = vec![0u8; REPLY_TOKEN_LEN + 9];
        client.read_exact(&mut received).await.unwrap();
        assert_eq!(&received[REPLY_TOKEN_LEN..], b"CACHEDMP3");

        std::fs::remove_dir_all(speaker.cache.dir()).unwrap_or_default();
    }

    #[test]
    fn ack_wait_is_send() {
        fn assert_send<T: Send>(_: T) {}
        let mut speaker = transmitter("send-bound", Some(Box::new(FixedSynth(b"MP3DATA"))));
        let (_client, mut server) = tokio::io::duplex(64);
        assert_send(speaker.await_ack(&mut server));
    }

    #[tokio::test]
    async fn stalled_client_loses_the_reply() {
        // The pipe holds far less than the reply and the client never drains it.
        let (mut client, mut server) = tokio::io::duplex(64);
        let mut speaker = transmitter("stalled", Some(Box::new(FixedSynth(&[9u8; 4096]))));

        client.write_all(&[SEND_AUDIO]).await.unwrap();
        let started = tokio::time::Instant::now();
        assert!(!speaker.transmit("hello", &mut server).await);
        assert!(started.elapsed() >= Duration::from_millis(200));
        assert!(started.elapsed() < Duration::from_secs(2));
        drop(client);
    }
}
