//! Audio resampling and channel mixing utilities.
//!
//! Both the speech recogniser and the emotion classifier expect mono audio
//! at a fixed rate.  This module provides the two conversion steps:
//!
//! 1. [`downmix`] — average any number of interleaved channels to mono.
//! 2. [`resample`] — convert between sample rates.
//!
//! Resampling goes through `rubato`'s FFT resampler.  Clips too short for a
//! single FFT chunk, and any resampler construction failure, use linear
//! interpolation instead.

use rubato::{FftFixedIn, Resampler};

/// Input chunk handed to the FFT resampler per call.
const FFT_CHUNK: usize = 1024;

/// Clips shorter than this are resampled linearly.
const MIN_FFT_INPUT: usize = 64;

// ---------------------------------------------------------------------------
// downmix
// ---------------------------------------------------------------------------

/// Mix interleaved multi-channel audio down to mono by averaging all channels.
///
/// The output length is `samples.len() / channels`; a trailing partial frame
/// is dropped.
///
/// * If `channels == 1` the input is returned as an owned `Vec` unchanged.
/// * If `channels == 0` an empty vector is returned.
///
/// ```rust
/// use emotion_chat::audio::downmix;
///
/// let stereo = vec![0.5_f32, -0.5, 0.2, 0.4]; // L R L R
/// let mono = downmix(&stereo, 2);
/// assert_eq!(mono.len(), 2);
/// assert!((mono[0] - 0.0).abs() < 1e-6);
/// assert!((mono[1] - 0.3).abs() < 1e-6);
/// ```
pub fn downmix(samples: &[f32], channels: u16) -> Vec<f32> {
    match channels {
        0 => Vec::new(),
        1 => samples.to_vec(),
        n => {
            let n = n as usize;
            samples
                .chunks_exact(n)
                .map(|frame| frame.iter().sum::<f32>() / n as f32)
                .collect()
        }
    }
}

// ---------------------------------------------------------------------------
// resample
// ---------------------------------------------------------------------------

/// Expected output length when converting `len` samples between two rates.
pub fn resampled_len(len: usize, source_rate: u32, target_rate: u32) -> usize {
    (len as f64 * target_rate as f64 / source_rate as f64).ceil() as usize
}

/// Resample mono `samples` from `source_rate` Hz to `target_rate` Hz.
///
/// * Equal rates return a copy of the input.
/// * Empty input returns an empty vector.
///
/// The output length is exactly [`resampled_len`].
///
/// ```rust
/// use emotion_chat::audio::resample;
///
/// let hi = vec![0.5_f32; 4_800];
/// let lo = resample(&hi, 48_000, 16_000);
/// assert_eq!(lo.len(), 1_600);
/// ```
pub fn resample(samples: &[f32], source_rate: u32, target_rate: u32) -> Vec<f32> {
    if source_rate == target_rate || source_rate == 0 || target_rate == 0 {
        return samples.to_vec();
    }

    if samples.is_empty() {
        return Vec::new();
    }

    if samples.len() < MIN_FFT_INPUT {
        return resample_linear(samples, source_rate, target_rate);
    }

    match resample_fft(samples, source_rate, target_rate) {
        Ok(out) => out,
        Err(e) => {
            log::warn!(
                "audio: FFT resampling {source_rate} Hz -> {target_rate} Hz failed ({e}), using linear"
            );
            resample_linear(samples, source_rate, target_rate)
        }
    }
}

/// Band-limited resampling through `rubato::FftFixedIn`.
///
/// The resampler's output delay is trimmed so sample `i` of the output lines
/// up with time `i / target_rate` of the input.
fn resample_fft(
    samples: &[f32],
    source_rate: u32,
    target_rate: u32,
) -> Result<Vec<f32>, Box<dyn std::error::Error>> {
    let mut resampler = FftFixedIn::<f64>::new(
        source_rate as usize,
        target_rate as usize,
        FFT_CHUNK,
        2,
        1,
    )?;

    let input: Vec<f64> = samples.iter().map(|&s| s as f64).collect();
    let expected = resampled_len(samples.len(), source_rate, target_rate);
    let delay = resampler.output_delay();

    let mut output: Vec<f64> = Vec::with_capacity(expected + delay);
    let mut pos = 0;

    while pos + resampler.input_frames_next() <= input.len() {
        let n = resampler.input_frames_next();
        let chunk: [&[f64]; 1] = [&input[pos..pos + n]];
        let frames = resampler.process(&chunk[..], None)?;
        output.extend_from_slice(&frames[0]);
        pos += n;
    }

    if pos < input.len() {
        let rest: [&[f64]; 1] = [&input[pos..]];
        let frames = resampler.process_partial(Some(&rest[..]), None)?;
        output.extend_from_slice(&frames[0]);
    }

    // Flush the delay line until the delayed tail is out.
    while output.len() < expected + delay {
        let frames = resampler.process_partial(None::<&[Vec<f64>]>, None)?;
        if frames[0].is_empty() {
            break;
        }
        output.extend_from_slice(&frames[0]);
    }

    let mut out: Vec<f32> = output
        .into_iter()
        .skip(delay)
        .take(expected)
        .map(|s| s as f32)
        .collect();
    out.resize(expected, 0.0);
    Ok(out)
}

/// Linear interpolation between adjacent samples.
fn resample_linear(samples: &[f32], source_rate: u32, target_rate: u32) -> Vec<f32> {
    let ratio = target_rate as f64 / source_rate as f64;
    let output_len = resampled_len(samples.len(), source_rate, target_rate);
    let mut output = Vec::with_capacity(output_len);

    for i in 0..output_len {
        let src_pos = i as f64 / ratio;
        let idx = src_pos as usize;
        let frac = src_pos - idx as f64;

        let sample = if idx + 1 < samples.len() {
            samples[idx] * (1.0 - frac as f32) + samples[idx + 1] * frac as f32
        } else if idx < samples.len() {
            samples[idx]
        } else {
            0.0
        };

        output.push(sample);
    }

    output
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    // ---- downmix -----------------------------------------------------------

    #[test]
    fn downmix_already_mono() {
        let input = vec![0.1_f32, 0.2, 0.3];
        assert_eq!(downmix(&input, 1), input);
    }

    #[test]
    fn downmix_two_channel_is_mean() {
        let input = vec![1.0_f32, -1.0, 0.5, 0.5, 0.2, 0.6];
        let out = downmix(&input, 2);
        assert_eq!(out.len(), 3);
        assert!((out[0] - 0.0).abs() < 1e-6);
        assert!((out[1] - 0.5).abs() < 1e-6);
        assert!((out[2] - 0.4).abs() < 1e-6);
    }

    #[test]
    fn downmix_three_channel_is_mean() {
        let input = vec![0.3_f32, 0.6, 0.9];
        let out = downmix(&input, 3);
        assert_eq!(out.len(), 1);
        assert!((out[0] - 0.6).abs() < 1e-6);
    }

    #[test]
    fn downmix_drops_partial_frame() {
        let out = downmix(&[1.0_f32, 1.0, 1.0], 2);
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn downmix_zero_channels() {
        assert!(downmix(&[1.0_f32, 2.0], 0).is_empty());
    }

    // ---- resample ----------------------------------------------------------

    #[test]
    fn resample_same_rate_is_noop() {
        let input: Vec<f32> = (0..160).map(|i| i as f32 / 160.0).collect();
        assert_eq!(resample(&input, 16_000, 16_000), input);
    }

    #[test]
    fn resample_empty_input() {
        assert!(resample(&[], 48_000, 16_000).is_empty());
    }

    #[test]
    fn resample_48k_to_16k_exact_length() {
        let input = vec![0.25_f32; 48_000];
        let out = resample(&input, 48_000, 16_000);
        assert_eq!(out.len(), 16_000);
    }

    #[test]
    fn resample_44100_to_16k_exact_length() {
        let input = vec![0.0_f32; 44_100];
        let out = resample(&input, 44_100, 16_000);
        assert_eq!(out.len(), resampled_len(44_100, 44_100, 16_000));
    }

    #[test]
    fn resample_upsample_8k_to_16k_doubles_length() {
        let input = vec![0.0_f32; 8_000];
        let out = resample(&input, 8_000, 16_000);
        assert_eq!(out.len(), 16_000);
    }

    #[test]
    fn short_clip_uses_linear_path() {
        // 30 samples at 48 kHz → 10 samples at 16 kHz
        let input = vec![0.5_f32; 30];
        let out = resample(&input, 48_000, 16_000);
        assert_eq!(out.len(), 10);
        for &s in &out {
            assert!((s - 0.5).abs() < 1e-5, "amplitude drift: {s}");
        }
    }

    #[test]
    fn constant_signal_keeps_amplitude_in_the_middle() {
        let input = vec![0.5_f32; 48_000];
        let out = resample(&input, 48_000, 16_000);
        // Edges ring slightly with a band-limited filter; the middle must not.
        for &s in &out[2_000..14_000] {
            assert!((s - 0.5).abs() < 1e-2, "amplitude drift: {s}");
        }
    }
}
