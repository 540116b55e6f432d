//! Protocol state machine for one connection.
//!
//! # States
//! ```text
//! AWAIT_SIGNAL ──101──▶ AWAIT_AUDIO ──read timeout──▶ DISPATCH ──▶ AWAIT_SIGNAL
//!      │  ▲                  │  (empty: back to AWAIT_SIGNAL)
//!      │  └── other bytes    │
//!      └──────────┬──────────┘
//!                 ▼
//!              CLOSED  (EOF, dead peer, stop, recognizer unavailable)
//! ```

use std::fmt;
use std::io;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::sync::watch;

use crate::audio::AudioBuffer;
use crate::config::IntercomConfig;
use crate::net::{classify, Link, ReadFailure};
use crate::observability::metrics;
use crate::protocol::{READY, WAKE};
use crate::session::{CollaboratorFactory, Collaborators, SessionHandle};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    AwaitSignal,
    AwaitAudio,
    Dispatch,
    Closed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::AwaitSignal => "await_signal",
            Self::AwaitAudio => "await_audio",
            Self::Dispatch => "dispatch",
            Self::Closed => "closed",
        })
    }
}

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// Zero-length read.
    PeerClosed,
    /// Keepalive probes went unanswered.
    KeepaliveTimeout,
    /// Connection reset by the peer.
    PeerReset,
    /// Stopped by the server or another task.
    Stopped,
    /// The recognizer could not be created.
    RecognizerUnavailable,
}

impl CloseReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PeerClosed => "peer_closed",
            Self::KeepaliveTimeout => "keepalive_timeout",
            Self::PeerReset => "peer_reset",
            Self::Stopped => "stopped",
            Self::RecognizerUnavailable => "recognizer_unavailable",
        }
    }
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The slice of configuration a session needs.
#[derive(Debug, Clone, Copy)]
pub struct SessionSettings {
    /// Largest single receive while capturing audio.
    pub chunk_size: usize,
    /// Bound on every receive; also the end-of-utterance signal.
    pub read_timeout: Duration,
}

impl SessionSettings {
    pub fn from_config(config: &IntercomConfig) -> Self {
        Self {
            chunk_size: config.audio.chunk_size,
            read_timeout: config.timeouts.read(),
        }
    }
}

/// Outcome of one bounded receive.
enum Received {
    Data(usize),
    Closed,
    TimedOut,
    Stopped,
    Failed(io::Error),
}

/// Resolves once the stop signal is raised.
async fn stopped(stop_rx: &mut watch::Receiver<bool>) {
    let _ = stop_rx.wait_for(|stopped| *stopped).await;
}

/// One connection's state machine. Owns the stream until it returns.
pub struct Session<S> {
    stream: S,
    handle: Arc<SessionHandle>,
    stop_rx: watch::Receiver<bool>,
    settings: SessionSettings,
    state: SessionState,
}

impl<S: Link> Session<S> {
    pub fn new(stream: S, handle: Arc<SessionHandle>, settings: SessionSettings) -> Self {
        let stop_rx = handle.stop_signal();
        Self {
            stream,
            handle,
            stop_rx,
            settings,
            state: SessionState::AwaitSignal,
        }
    }

    /// Serve the connection until a terminal condition. Always ends stopped
    /// and deregistered; the stream is dropped on return.
    pub async fn run(mut self, factory: &dyn CollaboratorFactory) -> CloseReason {
        let reason = match factory.create() {
            Ok(mut collaborators) => self.serve(&mut collaborators).await,
            Err(e) => {
                tracing::error!(error = %e, "Recognizer unavailable, closing session");
                CloseReason::RecognizerUnavailable
            }
        };

        self.transition(SessionState::Closed);
        self.handle.stop();
        metrics::record_session_closed(reason.as_str());
        tracing::info!(reason = %reason, "Session closed");
        reason
    }

    async fn serve(&mut self, collaborators: &mut Collaborators) -> CloseReason {
        loop {
            if let Err(reason) = self.await_signal().await {
                return reason;
            }

            self.transition(SessionState::AwaitAudio);
            let audio = match self.capture().await {
                Ok(audio) => audio,
                Err(reason) => return reason,
            };

            if audio.is_empty() {
                tracing::info!("No audio received after wake signal");
                metrics::record_utterance("empty", 0);
            } else {
                self.transition(SessionState::Dispatch);
                if let Err(reason) = self.dispatch(audio, collaborators).await {
                    return reason;
                }
            }
            self.transition(SessionState::AwaitSignal);
        }
    }

    fn transition(&mut self, next: SessionState) {
        tracing::trace!(from = %self.state, to = %next, "Session state change");
        self.state = next;
    }

    /// Receive into `buf`, bounded by the read timeout and the stop signal.
    async fn read_bounded(&mut self, buf: &mut [u8]) -> Received {
        if !self.handle.is_running() {
            return Received::Stopped;
        }

        tokio::select! {
            biased;
            _ = stopped(&mut self.stop_rx) => Received::Stopped,
            result = tokio::time::timeout(self.settings.read_timeout, self.stream.read(buf)) => match result {
                Err(_) => Received::TimedOut,
                Ok(Ok(0)) => Received::Closed,
                Ok(Ok(n)) => Received::Data(n),
                Ok(Err(e)) => Received::Failed(e),
            },
        }
    }

    /// Log a socket error. `Some` when it ends the session.
    fn on_failure(&self, err: &io::Error) -> Option<CloseReason> {
        match classify(err) {
            ReadFailure::KeepaliveTimeout => {
                tracing::warn!(phase = %self.state, error = %err, "Peer idle timeout, keepalive gave up");
                Some(CloseReason::KeepaliveTimeout)
            }
            ReadFailure::PeerReset => {
                tracing::warn!(phase = %self.state, error = %err, "Connection reset by peer");
                Some(CloseReason::PeerReset)
            }
            ReadFailure::Transient => {
                tracing::warn!(phase = %self.state, error = %err, "Receive failed");
                None
            }
        }
    }

    /// AWAIT_SIGNAL: wait for a wake byte and answer it.
    async fn await_signal(&mut self) -> Result<(), CloseReason> {
        let mut byte = [0u8; 1];
        loop {
            match self.read_bounded(&mut byte).await {
                Received::Data(_) if byte[0] == WAKE => {
                    let ready = async {
                        self.stream.write_all(&[READY]).await?;
                        self.stream.flush().await
                    }
                    .await;
                    match ready {
                        Ok(()) => {
                            tracing::debug!("Wake signal answered");
                            return Ok(());
                        }
                        Err(e) => {
                            if let Some(reason) = self.on_failure(&e) {
                                return Err(reason);
                            }
                        }
                    }
                }
                Received::Data(_) => tracing::trace!(value = byte[0], "Ignoring non-wake byte"),
                Received::TimedOut => {}
                Received::Closed => {
                    tracing::info!("Peer closed the connection");
                    return Err(CloseReason::PeerClosed);
                }
                Received::Stopped => return Err(CloseReason::Stopped),
                Received::Failed(e) => {
                    if let Some(reason) = self.on_failure(&e) {
                        return Err(reason);
                    }
                }
            }
        }
    }

    /// AWAIT_AUDIO: accumulate chunks until the peer goes quiet.
    async fn capture(&mut self) -> Result<AudioBuffer, CloseReason> {
        let mut audio = AudioBuffer::new();
        let mut chunk = vec![0u8; self.settings.chunk_size];
        loop {
            match self.read_bounded(&mut chunk).await {
                Received::Data(n) => audio.extend(&chunk[..n]),
                Received::TimedOut => return Ok(audio),
                Received::Closed => {
                    tracing::info!(bytes = audio.len(), "Peer closed the connection during capture, audio discarded");
                    return Err(CloseReason::PeerClosed);
                }
                Received::Stopped => return Err(CloseReason::Stopped),
                Received::Failed(e) => {
                    if let Some(reason) = self.on_failure(&e) {
                        return Err(reason);
                    }
                    return Ok(audio);
                }
            }
        }
    }

    /// DISPATCH: recognize, decode, and speak the answer. Abandoned as soon
    /// as the session is stopped; dropping the work kills any child process.
    async fn dispatch(&mut self, audio: AudioBuffer, collaborators: &mut Collaborators) -> Result<(), CloseReason> {
        let bytes = audio.len();
        tracing::info!(bytes, "Utterance captured");

        let stream = &mut self.stream;
        let work = async move {
            let result = match collaborators.recognizer.process(&audio).await {
                Ok(result) => result,
                Err(e) => {
                    tracing::warn!(error = %e, "Recognition failed, treating as no result");
                    None
                }
            };
            metrics::record_utterance(if result.is_some() { "understood" } else { "not_understood" }, bytes);

            let text = collaborators.decoder.decode(result.as_ref());
            collaborators.speaker.transmit(&text, stream).await
        };

        tokio::select! {
            biased;
            _ = stopped(&mut self.stop_rx) => {
                tracing::info!("Stopped during dispatch, reply abandoned");
                Err(CloseReason::Stopped)
            }
            delivered = work => {
                tracing::debug!(delivered, "Dispatch finished");
                Ok(())
            }
        }
    }
}
