//! Utterance accumulation.

/// Raw s16le mono PCM received during one capture phase.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AudioBuffer {
    bytes: Vec<u8>,
}

impl AudioBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one received chunk.
    pub fn extend(&mut self, chunk: &[u8]) {
        self.bytes.extend_from_slice(chunk);
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl From<Vec<u8>> for AudioBuffer {
    fn from(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accumulates_chunks() {
        let mut buffer = AudioBuffer::new();
        assert!(buffer.is_empty());

        buffer.extend(&[0u8; 512]);
        buffer.extend(&[1u8; 100]);
        assert_eq!(buffer.len(), 612);
        assert_eq!(&buffer.as_bytes()[510..514], &[0, 0, 1, 1]);
    }
}
