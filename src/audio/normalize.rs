//! Fixed-window normalisation for the emotion classifier.
//!
//! [`AudioNormalizer::normalize`] turns any decoded clip into exactly
//! `target_length` mono samples at `target_rate`:
//!
//! ```text
//! interleaved ─▶ downmix ─▶ resample ─▶ crop (CropPolicy) / zero-pad ─▶ window
//! ```
//!
//! Rate conversion always precedes the length adjustment so the window covers
//! the intended duration.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::resample::{downmix, resample};
use super::signal::AudioSignal;

// ---------------------------------------------------------------------------
// AudioFormatError
// ---------------------------------------------------------------------------

/// A clip that cannot be turned into a classifier window.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum AudioFormatError {
    /// The clip contains no samples.
    #[error("audio contains no samples")]
    Empty,

    /// Channel count or sample rate is zero.
    #[error("invalid audio format: {channels} channel(s) at {sample_rate} Hz")]
    InvalidSpec { channels: u16, sample_rate: u32 },

    /// The container could not be decoded.
    #[error("could not decode audio: {0}")]
    Decode(String),
}

// ---------------------------------------------------------------------------
// CropPolicy
// ---------------------------------------------------------------------------

/// Which contiguous run of samples survives when a clip is too long.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CropPolicy {
    /// Keep the first `target_length` samples.
    Head,
    /// Keep the `target_length` samples centred in the clip.  With an odd
    /// surplus the extra sample is dropped from the end.
    Center,
}

impl Default for CropPolicy {
    fn default() -> Self {
        Self::Head
    }
}

impl CropPolicy {
    /// Start offset of the kept window for a clip of `len > target` samples.
    fn offset(&self, len: usize, target: usize) -> usize {
        match self {
            CropPolicy::Head => 0,
            CropPolicy::Center => (len - target) / 2,
        }
    }
}

// ---------------------------------------------------------------------------
// AudioNormalizer
// ---------------------------------------------------------------------------

/// Pure signal shaper; holds only the crop policy.
#[derive(Debug, Clone, Copy, Default)]
pub struct AudioNormalizer {
    policy: CropPolicy,
}

impl AudioNormalizer {
    pub fn new(policy: CropPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> CropPolicy {
        self.policy
    }

    /// Downmix, resample and fit `signal` into a `target_length` window.
    ///
    /// # Errors
    ///
    /// - [`AudioFormatError::InvalidSpec`] — zero channels or zero rate.
    /// - [`AudioFormatError::Empty`] — no samples to work with.
    ///
    /// ```
    /// use emotion_chat::audio::{AudioNormalizer, AudioSignal, CropPolicy};
    ///
    /// let stereo = AudioSignal::new(vec![0.2, 0.4, 0.2, 0.4], 16_000, 2);
    /// let out = AudioNormalizer::new(CropPolicy::Head)
    ///     .normalize(&stereo, 16_000, 4)
    ///     .unwrap();
    /// assert_eq!(out.channels, 1);
    /// assert_eq!(out.samples.len(), 4);
    /// assert!((out.samples[0] - 0.3).abs() < 1e-6);
    /// assert_eq!(out.samples[3], 0.0);
    /// ```
    pub fn normalize(
        &self,
        signal: &AudioSignal,
        target_rate: u32,
        target_length: usize,
    ) -> Result<AudioSignal, AudioFormatError> {
        if signal.channels == 0 || signal.sample_rate == 0 {
            return Err(AudioFormatError::InvalidSpec {
                channels: signal.channels,
                sample_rate: signal.sample_rate,
            });
        }

        let mono = downmix(&signal.samples, signal.channels);
        if mono.is_empty() {
            return Err(AudioFormatError::Empty);
        }

        let resampled = resample(&mono, signal.sample_rate, target_rate);

        Ok(AudioSignal::mono(
            self.fit(resampled, target_length),
            target_rate,
        ))
    }

    /// Crop or zero-pad `samples` to exactly `target_length`.
    pub fn fit(&self, mut samples: Vec<f32>, target_length: usize) -> Vec<f32> {
        if samples.len() > target_length {
            let start = self.policy.offset(samples.len(), target_length);
            samples.drain(..start);
            samples.truncate(target_length);
        } else {
            samples.resize(target_length, 0.0);
        }
        samples
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
