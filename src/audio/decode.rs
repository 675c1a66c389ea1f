//! WAV decoding into [`AudioSignal`].
//!
//! Integer PCM of any bit depth up to 32 and 32-bit float PCM are supported.
//! Integer samples are scaled to `[-1.0, 1.0)`.

use std::io::{Cursor, Read};
use std::path::Path;

use hound::{SampleFormat, WavReader};

use super::normalize::AudioFormatError;
use super::signal::AudioSignal;

/// Decode an in-memory WAV file.
pub fn decode_wav(bytes: &[u8]) -> Result<AudioSignal, AudioFormatError> {
    let reader =
        WavReader::new(Cursor::new(bytes)).map_err(|e| AudioFormatError::Decode(e.to_string()))?;
    read_signal(reader)
}

/// Decode a WAV file on disk.
pub fn decode_wav_file(path: &Path) -> Result<AudioSignal, AudioFormatError> {
    let reader = WavReader::open(path).map_err(|e| AudioFormatError::Decode(e.to_string()))?;
    read_signal(reader)
}

fn read_signal<R: Read>(mut reader: WavReader<R>) -> Result<AudioSignal, AudioFormatError> {
    let spec = reader.spec();
    if spec.channels == 0 || spec.sample_rate == 0 {
        return Err(AudioFormatError::InvalidSpec {
            channels: spec.channels,
            sample_rate: spec.sample_rate,
        });
    }

    let samples: Vec<f32> = match spec.sample_format {
        SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<Result<_, _>>()
            .map_err(|e| AudioFormatError::Decode(e.to_string()))?,
        SampleFormat::Int => {
            let scale = (1_i64 << (spec.bits_per_sample.saturating_sub(1))) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<Result<_, _>>()
                .map_err(|e| AudioFormatError::Decode(e.to_string()))?
        }
    };

    if samples.is_empty() {
        return Err(AudioFormatError::Empty);
    }

    Ok(AudioSignal::new(samples, spec.sample_rate, spec.channels))
}

/// Encode interleaved `samples` as a 16-bit PCM WAV file in memory.
#[cfg(test)]
pub(crate) fn encode_wav(samples: &[f32], sample_rate: u32, channels: u16) -> Vec<u8> {
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec).expect("wav writer");
        for &s in samples {
            let v = (s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
            writer.write_sample(v).expect("write sample");
        }
        writer.finalize().expect("finalize wav");
    }
    cursor.into_inner()
}
