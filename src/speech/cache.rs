//! Offline store of previously synthesized responses.
//!
//! Frequent responses ("yes", "door opened") are kept on disk under a name
//! derived from their text, which saves a synthesis round trip and the
//! associated latency.

use std::io;
use std::path::{Path, PathBuf};

const ESCAPES: [(char, &str); 8] = [
    ('.', "_a_"),
    ('?', "_b_"),
    ('!', "_c_"),
    (' ', "_d_"),
    ('\'', "_e_"),
    (',', "_f_"),
    (':', "_g"),
    ('-', "_h_"),
];

/// Escape punctuation and spaces so `text` can be used as a file stem.
pub fn encode_text(text: &str) -> String {
    let mut encoded = String::with_capacity(text.len());
    for c in text.chars() {
        match ESCAPES.iter().find(|(raw, _)| *raw == c) {
            Some((_, code)) => encoded.push_str(code),
            None => encoded.push(c),
        }
    }
    encoded
}

/// Reverse of [`encode_text`] for file stems it produced.
pub fn decode_text(stem: &str) -> String {
    ESCAPES
        .iter()
        .fold(stem.to_string(), |text, (raw, code)| text.replace(code, &raw.to_string()))
}

#[derive(Debug, Clone)]
pub struct OfflineCache {
    dir: PathBuf,
}

impl OfflineCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, text: &str) -> PathBuf {
        self.dir.join(format!("{}.mp3", encode_text(text)))
    }

    /// Stored audio for `text`, if any. Read errors are logged and treated
    /// as a miss.
    pub async fn lookup(&self, text: &str) -> Option<Vec<u8>> {
        let path = self.path_for(text);
        match tokio::fs::read(&path).await {
            Ok(audio) => {
                tracing::debug!(path = %path.display(), bytes = audio.len(), "Offline audio found");
                Some(audio)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!(text, "No offline audio");
                None
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Failed to read offline audio");
                None
            }
        }
    }

    pub async fn store(&self, text: &str, audio: &[u8]) -> io::Result<PathBuf> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.path_for(text);
        tokio::fs::write(&path, audio).await?;
        Ok(path)
    }
}
