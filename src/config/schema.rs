//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the server.
//! All types derive Serde traits for deserialization from config files.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration for the intercom server.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct IntercomConfig {
    /// Listener configuration (bind host/port, client cap).
    pub listener: ListenerConfig,

    /// TCP keepalive tuning for dead-peer detection.
    pub keepalive: KeepaliveConfig,

    /// Accept/read timeouts and shutdown drain deadline.
    pub timeouts: TimeoutConfig,

    /// Audio capture and preprocessing.
    pub audio: AudioConfig,

    /// Reply sub-protocol (token → ack → audio).
    pub reply: ReplyConfig,

    /// Out-of-process recognizer.
    pub recognizer: RecognizerConfig,

    /// Speech synthesis and offline cache.
    pub speech: SpeechConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Host or IP address to bind.
    pub host: String,

    /// TCP port to bind.
    pub port: u16,

    /// Advisory cap on concurrent clients. Exceeding it is logged, not refused.
    pub max_clients: usize,

    /// Listen backlog handed to the OS.
    pub backlog: u32,
}

impl ListenerConfig {
    /// `host:port` string suitable for address resolution.
    pub fn bind_target(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            max_clients: 10,
            backlog: 5,
        }
    }
}

/// TCP keepalive parameters applied to the listening and accepted sockets.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct KeepaliveConfig {
    /// Idle time before the first probe, in seconds.
    pub idle_secs: u64,

    /// Interval between probes, in seconds.
    pub interval_secs: u64,

    /// Unanswered probes before the peer is declared dead.
    pub probe_count: u32,
}

impl KeepaliveConfig {
    pub fn idle(&self) -> Duration {
        Duration::from_secs(self.idle_secs)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

impl Default for KeepaliveConfig {
    fn default() -> Self {
        Self {
            idle_secs: 30,
            interval_secs: 5,
            probe_count: 3,
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Accept timeout in milliseconds. Bounds how long a stop request waits
    /// for the accept loop to notice it.
    pub accept_ms: u64,

    /// Per-receive timeout in milliseconds. Doubles as the end-of-utterance
    /// marker during audio capture.
    pub read_ms: u64,

    /// How long `stop` waits for sessions to finish closing, in seconds.
    pub drain_secs: u64,
}

impl TimeoutConfig {
    pub fn accept(&self) -> Duration {
        Duration::from_millis(self.accept_ms)
    }

    pub fn read(&self) -> Duration {
        Duration::from_millis(self.read_ms)
    }

    pub fn drain(&self) -> Duration {
        Duration::from_secs(self.drain_secs)
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            accept_ms: 1000,
            read_ms: 1000,
            drain_secs: 5,
        }
    }
}

/// Audio capture and preprocessing configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Bytes requested per receive. Must match the client's hardware buffer.
    pub chunk_size: usize,

    /// PCM sample rate of the incoming stream.
    pub sample_rate: u32,

    /// Linear gain applied before recognition.
    pub gain_factor: i32,

    /// Seconds of near-silence blended into the end of each utterance.
    pub quiet_tail_secs: f32,

    /// When set, every preprocessed utterance is written here as WAV.
    pub dump_path: Option<PathBuf>,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            chunk_size: crate::protocol::AUDIO_CHUNK_SIZE,
            sample_rate: 16_000,
            gain_factor: 10,
            quiet_tail_secs: 1.0,
            dump_path: None,
        }
    }
}

/// Reply sub-protocol configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ReplyConfig {
    /// Attempts at reading the client's ack byte.
    pub attempts: u32,

    /// Read timeout per attempt in milliseconds.
    pub read_timeout_ms: u64,

    /// Bound on streaming the reply audio, in milliseconds. A client that
    /// stops reading loses the reply.
    pub send_timeout_ms: u64,
}

impl ReplyConfig {
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn send_timeout(&self) -> Duration {
        Duration::from_millis(self.send_timeout_ms)
    }
}

impl Default for ReplyConfig {
    fn default() -> Self {
        Self {
            attempts: 3,
            read_timeout_ms: 1000,
            send_timeout_ms: 30_000,
        }
    }
}

/// Out-of-process recognizer. Receives s16le PCM on stdin, prints JSON.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RecognizerConfig {
    /// Program to run. Sessions close immediately when this is unset.
    pub command: Option<String>,

    /// Arguments passed to the program.
    pub args: Vec<String>,

    /// Seconds one recognition run may take before it is killed.
    pub timeout_secs: u64,
}

impl RecognizerConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for RecognizerConfig {
    fn default() -> Self {
        Self {
            command: None,
            args: Vec::new(),
            timeout_secs: 30,
        }
    }
}

/// Speech synthesis configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SpeechConfig {
    /// Program that reads text on stdin and writes audio to stdout.
    pub command: Option<String>,

    /// Arguments passed to the program.
    pub args: Vec<String>,

    /// Directory of previously synthesized responses.
    pub offline_dir: PathBuf,

    /// Store freshly synthesized short responses in `offline_dir`.
    pub save_responses: bool,

    /// Seconds one synthesis run may take before it is killed.
    pub timeout_secs: u64,
}

impl SpeechConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            command: None,
            args: Vec::new(),
            offline_dir: PathBuf::from("tts/offline_audio"),
            save_responses: false,
            timeout_secs: 30,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
