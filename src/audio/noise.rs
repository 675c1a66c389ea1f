//! Ambient-noise calibration and energy-based utterance trimming.
//!
//! A recorded turn usually starts with a short stretch of room tone before
//! the speaker begins.  [`NoiseGate::split`] measures that stretch, derives a
//! silence threshold from it and hands back the rest of the clip as the
//! utterance; [`NoiseGate::trim_silence`] then drops leading and trailing
//! frames that never rise above the threshold.
//!
//! When the speaker is already talking during the lead-in, the measured
//! "floor" is speech itself and nothing rises above it.
//! [`NoiseGate::speech`] then retries with the absolute `min_energy` floor so
//! the utterance is not discarded.
//!
//! ## Algorithm
//!
//! Audio is split into 30 ms frames (480 samples @ 16 kHz).  A frame counts
//! as voice when its RMS exceeds
//! `max(noise_floor * energy_ratio, min_energy)`.

/// Frame length in samples (30 ms at 16 kHz).
pub const FRAME_SIZE: usize = 480;

/// Root-mean-square amplitude of `samples`; `0.0` for an empty slice.
pub fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let mean_sq: f32 = samples.iter().map(|s| s * s).sum::<f32>() / samples.len() as f32;
    mean_sq.sqrt()
}

// ---------------------------------------------------------------------------
// NoiseGate
// ---------------------------------------------------------------------------

/// Energy gate parameters.
///
/// # Example
///
/// ```rust
/// use emotion_chat::audio::NoiseGate;
///
/// let gate = NoiseGate::new(0.5, 1.5, 0.01);
///
/// let mut audio = vec![0.0_f32; 480];
/// audio.extend(vec![0.5_f32; 480]);
/// audio.extend(vec![0.0_f32; 480]);
///
/// let trimmed = gate.trim_silence(&audio, 0.01);
/// assert_eq!(trimmed.len(), 480);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct NoiseGate {
    /// Length of the leading calibration window in seconds.
    calibration_secs: f32,
    /// Multiplier applied to the measured noise floor.
    energy_ratio: f32,
    /// Lower bound on the threshold, so a digitally silent lead-in does not
    /// make every frame count as voice.
    min_energy: f32,
}

/// Result of [`NoiseGate::split`].
#[derive(Debug, Clone, PartialEq)]
pub struct Calibrated<'a> {
    /// RMS of the calibration window, `None` when the clip was too short to
    /// calibrate.
    pub noise_floor: Option<f32>,
    /// Threshold to pass to [`NoiseGate::trim_silence`].
    pub threshold: f32,
    /// Samples after the calibration window.
    pub utterance: &'a [f32],
}

impl NoiseGate {
    pub fn new(calibration_secs: f32, energy_ratio: f32, min_energy: f32) -> Self {
        Self {
            calibration_secs,
            energy_ratio,
            min_energy,
        }
    }

    /// Silence threshold for a given noise floor.
    pub fn threshold(&self, noise_floor: f32) -> f32 {
        (noise_floor * self.energy_ratio).max(self.min_energy)
    }

    /// Calibrate against the leading window of `audio` (mono, `sample_rate`).
    ///
    /// Calibration only happens when the clip is at least twice the window
    /// length; otherwise the whole clip is the utterance and the threshold
    /// falls back to `min_energy`.
    pub fn split<'a>(&self, audio: &'a [f32], sample_rate: u32) -> Calibrated<'a> {
        let window = (self.calibration_secs.max(0.0) * sample_rate as f32) as usize;

        if window == 0 || audio.len() < window * 2 {
            return Calibrated {
                noise_floor: None,
                threshold: self.min_energy,
                utterance: audio,
            };
        }

        let floor = rms(&audio[..window]);
        Calibrated {
            noise_floor: Some(floor),
            threshold: self.threshold(floor),
            utterance: &audio[window..],
        }
    }

    fn is_voice_frame(&self, chunk: &[f32], threshold: f32) -> bool {
        !chunk.is_empty() && rms(chunk) > threshold
    }

    /// Trim leading and trailing frames at or below `threshold`.
    ///
    /// Returns a sub-slice of `audio`; empty when no frame carries voice.
    pub fn trim_silence<'a>(&self, audio: &'a [f32], threshold: f32) -> &'a [f32] {
        if audio.is_empty() {
            return audio;
        }

        let frame_size = FRAME_SIZE;
        let total_frames = audio.len().div_ceil(frame_size);
        let frame = |i: usize| {
            let s = i * frame_size;
            let e = ((i + 1) * frame_size).min(audio.len());
            &audio[s..e]
        };

        let start_frame =
            match (0..total_frames).find(|&i| self.is_voice_frame(frame(i), threshold)) {
                Some(f) => f,
                None => return &audio[0..0],
            };

        let end_frame = (0..total_frames)
            .rfind(|&i| self.is_voice_frame(frame(i), threshold))
            .unwrap_or(start_frame);

        let start = start_frame * frame_size;
        let end = ((end_frame + 1) * frame_size).min(audio.len());

        &audio[start..end]
    }

    /// Voiced part of a calibrated clip; empty only when the utterance is
    /// silent even against `min_energy`.
    pub fn speech<'a>(&self, calibrated: &Calibrated<'a>) -> &'a [f32] {
        let trimmed = self.trim_silence(calibrated.utterance, calibrated.threshold);
        if !trimmed.is_empty() || calibrated.threshold <= self.min_energy {
            return trimmed;
        }
        log::debug!(
            "noise: nothing above calibrated threshold {:.4}, retrying at {:.4}",
            calibrated.threshold,
            self.min_energy
        );
        self.trim_silence(calibrated.utterance, self.min_energy)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn make_signal(silent_pre: usize, voice: usize, silent_post: usize) -> Vec<f32> {
        let mut v = vec![0.0_f32; silent_pre];
        v.extend(vec![0.5_f32; voice]);
        v.extend(vec![0.0_f32; silent_post]);
        v
    }

    fn gate() -> NoiseGate {
        NoiseGate::new(0.5, 1.5, 0.005)
    }

    #[test]
    fn trims_leading_and_trailing_silence() {
        let audio = make_signal(480, 480, 480);
        let trimmed = gate().trim_silence(&audio, 0.01);
        assert_eq!(trimmed.len(), 480);
        assert!(trimmed.iter().all(|&s| s == 0.5));
    }

    #[test]
    fn all_silence_yields_empty() {
        let audio = vec![0.0_f32; 4_800];
        assert!(gate().trim_silence(&audio, 0.01).is_empty());
    }

    #[test]
    fn empty_input_yields_empty() {
        assert!(gate().trim_silence(&[], 0.01).is_empty());
    }

    #[test]
    fn voice_only_is_kept_whole() {
        let audio = vec![0.5_f32; 960];
        assert_eq!(gate().trim_silence(&audio, 0.01).len(), 960);
    }

    #[test]
    fn short_clip_is_not_calibrated() {
        // 0.75 s at 16 kHz is under twice the 0.5 s window.
        let audio = vec![0.2_f32; 12_000];
        let calibrated = gate().split(&audio, 16_000);
        assert_eq!(calibrated.noise_floor, None);
        assert_eq!(calibrated.threshold, 0.005);
        assert_eq!(calibrated.utterance.len(), audio.len());
    }

    #[test]
    fn long_clip_calibrates_on_lead_in() {
        let mut audio = vec![0.02_f32; 8_000];
        audio.extend(vec![0.5_f32; 8_000]);
        let calibrated = gate().split(&audio, 16_000);

        let floor = calibrated.noise_floor.unwrap();
        assert!((floor - 0.02).abs() < 1e-4);
        assert!((calibrated.threshold - 0.03).abs() < 1e-4);
        assert_eq!(calibrated.utterance.len(), 8_000);
    }

    #[test]
    fn threshold_never_drops_below_min_energy() {
        assert_eq!(gate().threshold(0.0), 0.005);
        assert!((gate().threshold(0.1) - 0.15).abs() < 1e-6);
    }

    #[test]
    fn room_tone_below_threshold_is_trimmed() {
        // Lead-in of room tone, then tone-level padding around speech.
        let mut audio = vec![0.02_f32; 8_000];
        audio.extend(vec![0.02_f32; 960]);
        audio.extend(vec![0.4_f32; 960]);
        audio.extend(vec![0.02_f32; 7_040]);

        let g = gate();
        let calibrated = g.split(&audio, 16_000);
        let trimmed = g.trim_silence(calibrated.utterance, calibrated.threshold);
        assert_eq!(trimmed.len(), 960);
    }

    #[test]
    fn speech_from_the_first_sample_survives_calibration() {
        // Steady speech-level signal: the lead-in floor equals the utterance.
        let audio = vec![0.3_f32; 32_000];
        let g = gate();
        let calibrated = g.split(&audio, 16_000);
        assert!(calibrated.threshold > 0.3);
        assert!(g.trim_silence(calibrated.utterance, calibrated.threshold).is_empty());

        assert_eq!(g.speech(&calibrated).len(), 24_000);
    }

    #[test]
    fn digital_silence_has_no_speech() {
        let audio = vec![0.0_f32; 32_000];
        let g = gate();
        assert!(g.speech(&g.split(&audio, 16_000)).is_empty());
    }

    #[test]
    fn rms_of_constant() {
        assert!((rms(&[0.5; 10]) - 0.5).abs() < 1e-6);
        assert_eq!(rms(&[]), 0.0);
    }
}
