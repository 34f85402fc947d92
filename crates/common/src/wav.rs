//! WAV helpers on top of `hound`.
//!
//! Narration is exchanged as 16-bit integer PCM WAV throughout.

use std::io::Cursor;

use crate::error::SlidecastResult;

/// Stream parameters for 16-bit integer PCM.
pub fn pcm16_spec(sample_rate: u32, channels: u16) -> hound::WavSpec {
    hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    }
}

/// Whether `spec` describes 16-bit integer PCM.
pub fn is_pcm16(spec: &hound::WavSpec) -> bool {
    spec.sample_format == hound::SampleFormat::Int && spec.bits_per_sample == 16
}

/// Encode interleaved 16-bit samples as a complete in-memory WAV file.
pub fn encode_pcm16(sample_rate: u32, channels: u16, samples: &[i16]) -> SlidecastResult<Vec<u8>> {
    let mut buffer = Cursor::new(Vec::new());
    let mut writer = hound::WavWriter::new(&mut buffer, pcm16_spec(sample_rate, channels))?;
    for &sample in samples {
        writer.write_sample(sample)?;
    }
    writer.finalize()?;
    Ok(buffer.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encoded_bytes_read_back() {
        let bytes = encode_pcm16(8_000, 1, &vec![3i16; 8_000 * 42 / 10]).unwrap();

        let reader = hound::WavReader::new(Cursor::new(bytes)).unwrap();
        let spec = reader.spec();
        assert_eq!(spec.sample_rate, 8_000);
        assert_eq!(spec.channels, 1);
        assert!(is_pcm16(&spec));
        assert_eq!(reader.duration(), 33_600);
    }

    #[test]
    fn test_stereo_interleaving_preserved() {
        let bytes = encode_pcm16(16_000, 2, &[1, -1, 2, -2]).unwrap();

        let mut reader = hound::WavReader::new(Cursor::new(bytes)).unwrap();
        assert_eq!(reader.duration(), 2);
        let samples: Vec<i16> = reader.samples::<i16>().map(Result::unwrap).collect();
        assert_eq!(samples, vec![1, -1, 2, -2]);
    }

    #[test]
    fn test_float_spec_is_not_pcm16() {
        let spec = hound::WavSpec {
            sample_format: hound::SampleFormat::Float,
            bits_per_sample: 32,
            ..pcm16_spec(44_100, 1)
        };
        assert!(!is_pcm16(&spec));
    }
}
