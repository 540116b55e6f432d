//! WAV dumps of captured utterances, for tuning gain and microphones.

use std::path::Path;

/// Write s16le mono PCM to `path` as a WAV file.
pub fn write_wav(path: &Path, pcm: &[u8], sample_rate: u32) -> Result<(), hound::Error> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec)?;
    for pair in pcm.chunks_exact(2) {
        writer.write_sample(i16::from_le_bytes([pair[0], pair[1]]))?;
    }
    writer.finalize()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dump_round_trips_through_reader() {
        let path = std::env::temp_dir().join(format!("intercom-wav-{}.wav", std::process::id()));
        let pcm: Vec<u8> = [100i16, -100, 0, 32767].iter().flat_map(|s| s.to_le_bytes()).collect();

        write_wav(&path, &pcm, 16_000).unwrap();

        let mut reader = hound::WavReader::open(&path).unwrap();
        assert_eq!(reader.spec().sample_rate, 16_000);
        assert_eq!(reader.spec().channels, 1);
        let samples: Vec<i16> = reader.samples::<i16>().map(Result::unwrap).collect();
        assert_eq!(samples, vec![100, -100, 0, 32767]);

        std::fs::remove_file(&path).unwrap_or_default();
    }
}
