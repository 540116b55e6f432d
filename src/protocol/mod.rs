//! Wire protocol shared with the microphone clients.
//!
//! # Exchange
//! ```text
//! client                          server
//!   │ ── 101 (wake) ─────────────▶ │
//!   │ ◀──────────── 202 (ready) ── │
//!   │ ── PCM chunks ≤512 B ──────▶ │   ...until the client goes quiet
//!   │                              │   recognize → decode → synthesize
//!   │ ◀──────── 29 B reply token ─ │
//!   │ ── 22 (send) | 11 (cached) ▶ │
//!   │ ◀──────────── audio bytes ── │   only after 22
//! ```
//!
//! Control bytes share the stream with audio. Audio is never escaped; the
//! client only sends a control byte when it is not streaming.

pub mod token;

pub use token::{reply_token, token_name, REPLY_TOKEN_LEN};

/// Client → server: "I have audio to send".
pub const WAKE: u8 = 101;

/// Server → client: "ready, begin sending".
pub const READY: u8 = 202;

/// Client → server during the reply phase: "send me the audio".
pub const SEND_AUDIO: u8 = 22;

/// Client → server during the reply phase: "I already have it cached".
pub const CACHED: u8 = 11;

/// Size of the client's audio buffer, and of one recognizer frame in bytes.
pub const AUDIO_CHUNK_SIZE: usize = 512;

/// The client's answer to a reply token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyAck {
    /// Stream the synthesized audio.
    SendAudio,
    /// The client plays its local copy; send nothing.
    Cached,
}

impl ReplyAck {
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            SEND_AUDIO => Some(Self::SendAudio),
            CACHED => Some(Self::Cached),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ack_bytes() {
        assert_eq!(ReplyAck::from_byte(22), Some(ReplyAck::SendAudio));
        assert_eq!(ReplyAck::from_byte(11), Some(ReplyAck::Cached));
        assert_eq!(ReplyAck::from_byte(WAKE), None);
        assert_eq!(ReplyAck::from_byte(0), None);
    }
}
