//! Conditioning applied to an utterance before recognition.
//!
//! The microphones are quiet and the recognizer needs a clear trailing
//! silence to finalize an inference, so every utterance is amplified and its
//! tail is blended into a near-silent block.

use crate::config::AudioConfig;

/// Sample value used for the "quiet" tail. Non-zero on purpose.
pub const QUIET_SAMPLE: i16 = 0x000F;

/// The quiet block is trimmed to a multiple of this many bytes so both halves
/// stay aligned to 512-byte frames.
const QUIET_ALIGN_BYTES: usize = 1024;

/// Multiply every s16le sample by `gain`, saturating at the i16 range.
pub fn amplify(pcm: &[u8], gain: i32) -> Vec<u8> {
    let mut out = Vec::with_capacity(pcm.len());
    for pair in pcm.chunks_exact(2) {
        let sample = i32::from(i16::from_le_bytes([pair[0], pair[1]]));
        let boosted = sample
            .saturating_mul(gain)
            .clamp(i32::from(i16::MIN), i32::from(i16::MAX)) as i16;
        out.extend_from_slice(&boosted.to_le_bytes());
    }
    out
}

/// Build the aligned quiet block for `secs` seconds at `sample_rate`.
pub fn quiet_block(sample_rate: u32, secs: f32) -> Vec<u8> {
    let samples = (sample_rate as f32 * secs) as usize;
    let bytes = (samples * 2 / QUIET_ALIGN_BYTES) * QUIET_ALIGN_BYTES;
    QUIET_SAMPLE.to_le_bytes().repeat(bytes / 2)
}

/// Overwrite the end of `pcm` with the first half of the quiet block and
/// append the second half.
pub fn quiet_tail(pcm: &mut Vec<u8>, sample_rate: u32, secs: f32) {
    let quiet = quiet_block(sample_rate, secs);
    let half = quiet.len() / 2;

    let replaced = half.min(pcm.len());
    let start = pcm.len() - replaced;
    pcm[start..].copy_from_slice(&quiet[..replaced]);
    pcm.extend_from_slice(&quiet[half..]);

    tracing::trace!(
        replaced,
        appended = quiet.len() - half,
        total = pcm.len(),
        "quiet tail applied"
    );
}

/// Truncate to a whole number of frames of `frame_samples` samples.
pub fn whole_frames(pcm: &[u8], frame_samples: usize) -> &[u8] {
    let frame_bytes = frame_samples * 2;
    if frame_bytes == 0 {
        return pcm;
    }
    &pcm[..(pcm.len() / frame_bytes) * frame_bytes]
}

/// Amplify and quiet-tail an utterance per the audio configuration.
pub fn prepare(pcm: &[u8], config: &AudioConfig) -> Vec<u8> {
    let mut prepared = amplify(pcm, config.gain_factor);
    quiet_tail(&mut prepared, config.sample_rate, config.quiet_tail_secs);
    prepared
}
