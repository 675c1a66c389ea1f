//! Log-mel filterbank features for the audio emotion classifier.
//!
//! Framing follows the usual speech front end: 25 ms Hann window (400
//! samples at 16 kHz), 10 ms hop, zero-padded to a 512-point real FFT,
//! power spectrum through 128 triangular mel filters, natural log, then one
//! global mean/variance normalisation over the whole matrix.

use std::sync::Arc;

use realfft::num_complex::Complex;
use realfft::{RealFftPlanner, RealToComplex};
use serde::{Deserialize, Serialize};

pub const N_FFT: usize = 512;
pub const WIN_LENGTH: usize = 400;
pub const HOP_LENGTH: usize = 160;
pub const N_MELS: usize = 128;

const LOG_GUARD: f32 = 1e-9;

/// Row-major `frames × bins` feature matrix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureMatrix {
    pub frames: usize,
    pub bins: usize,
    pub values: Vec<f32>,
}

impl FeatureMatrix {
    /// `true` when `values` holds exactly `frames * bins` finite numbers.
    pub fn is_well_formed(&self) -> bool {
        self.frames > 0
            && self.bins > 0
            && self.values.len() == self.frames * self.bins
            && self.values.iter().all(|v| v.is_finite())
    }

    pub fn row(&self, frame: usize) -> &[f32] {
        &self.values[frame * self.bins..(frame + 1) * self.bins]
    }
}

/// Number of frames produced for `len` samples.
pub fn frame_count(len: usize) -> usize {
    if len < WIN_LENGTH {
        return 0;
    }
    (len - WIN_LENGTH) / HOP_LENGTH + 1
}

/// Filterbank extractor; owns the FFT plan, window and mel filters.
pub struct FbankExtractor {
    fft: Arc<dyn RealToComplex<f32>>,
    window: Vec<f32>,
    mel_filters: Vec<Vec<f32>>,
}

impl FbankExtractor {
    pub fn new(sample_rate: u32) -> Self {
        let window = (0..WIN_LENGTH)
            .map(|i| {
                let x = 2.0 * std::f32::consts::PI * i as f32 / WIN_LENGTH as f32;
                0.5 * (1.0 - x.cos())
            })
            .collect();

        let mut planner = RealFftPlanner::<f32>::new();
        let fft = planner.plan_fft_forward(N_FFT);

        Self {
            fft,
            window,
            mel_filters: mel_filters(sample_rate as f32, N_FFT, N_MELS),
        }
    }

    /// Extract normalised log-mel features from mono `samples`.
    ///
    /// Returns an empty matrix (`frames == 0`) when the input is shorter
    /// than one analysis window.
    pub fn extract(&self, samples: &[f32]) -> FeatureMatrix {
        let frames = frame_count(samples.len());
        let mut values = Vec::with_capacity(frames * N_MELS);

        let mut buffer = self.fft.make_input_vec();
        let mut spectrum = self.fft.make_output_vec();

        for frame in 0..frames {
            let start = frame * HOP_LENGTH;
            buffer.iter_mut().for_each(|v| *v = 0.0);
            for (i, (&s, &w)) in samples[start..start + WIN_LENGTH]
                .iter()
                .zip(&self.window)
                .enumerate()
            {
                buffer[i] = s * w;
            }

            if self.fft.process(&mut buffer, &mut spectrum).is_err() {
                spectrum.iter_mut().for_each(|c| *c = Complex::new(0.0, 0.0));
            }

            for filter in &self.mel_filters {
                let energy: f32 = filter
                    .iter()
                    .zip(&spectrum)
                    .map(|(&weight, c)| weight * c.norm_sqr())
                    .sum();
                values.push(energy.max(LOG_GUARD).ln());
            }
        }

        normalize_global(&mut values);

        FeatureMatrix {
            frames,
            bins: N_MELS,
            values,
        }
    }
}

fn hz_to_mel(hz: f32) -> f32 {
    2595.0 * (1.0 + hz / 700.0).log10()
}

fn mel_to_hz(mel: f32) -> f32 {
    700.0 * (10.0_f32.powf(mel / 2595.0) - 1.0)
}

/// Triangular filters spaced evenly on the mel scale from 0 Hz to Nyquist.
fn mel_filters(sample_rate: f32, n_fft: usize, n_mels: usize) -> Vec<Vec<f32>> {
    let mel_max = hz_to_mel(sample_rate / 2.0);
    let n_bins = n_fft / 2 + 1;

    let bin_points: Vec<usize> = (0..n_mels + 2)
        .map(|i| mel_max * i as f32 / (n_mels + 1) as f32)
        .map(mel_to_hz)
        .map(|hz| ((n_fft + 1) as f32 * hz / sample_rate).floor() as usize)
        .collect();

    let mut filters = vec![vec![0.0_f32; n_bins]; n_mels];
    for (m, filter) in filters.iter_mut().enumerate() {
        let (start, center, end) = (bin_points[m], bin_points[m + 1], bin_points[m + 2]);
        for j in start..center.min(n_bins) {
            filter[j] = (j - start) as f32 / (center - start) as f32;
        }
        for j in center..end.min(n_bins) {
            filter[j] = (end - j) as f32 / (end - center) as f32;
        }
    }
    filters
}

/// Zero mean, unit variance over every value; constant input becomes zeros.
///
/// Statistics are accumulated in `f64` so that a constant matrix has a
/// variance of exactly (or very nearly) zero.
fn normalize_global(values: &mut [f32]) {
    const MIN_STD: f64 = 1e-5;

    if values.is_empty() {
        return;
    }
    let n = values.len() as f64;
    let mean = values.iter().map(|&v| v as f64).sum::<f64>() / n;
    let var = values
        .iter()
        .map(|&v| (v as f64 - mean).powi(2))
        .sum::<f64>()
        / n;
    let std = var.sqrt();
    if std < MIN_STD {
        values.fill(0.0);
        return;
    }
    for v in values.iter_mut() {
        *v = ((*v as f64 - mean) / std) as f32;
    }
}
