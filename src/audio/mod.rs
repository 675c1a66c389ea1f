//! Audio handling — WAV decode → downmix → resample → normalise / trim.
//!
//! # Pipeline
//!
//! ```text
//! bytes → ScratchAudio (temp .wav) → decode_wav_file → AudioSignal
//!       ├─▶ AudioNormalizer  (fixed window for the emotion classifier)
//!       └─▶ downmix → resample → NoiseGate (utterance for the recogniser)
//! ```
//!
//! # Quick Start
//!
//! ```rust
//! use emotion_chat::audio::{AudioNormalizer, AudioSignal, CropPolicy};
//!
//! let clip = AudioSignal::new(vec![0.1; 96_000], 48_000, 2);
//! let window = AudioNormalizer::new(CropPolicy::Center)
//!     .normalize(&clip, 16_000, 16_000)
//!     .unwrap();
//! assert_eq!(window.samples.len(), 16_000);
//! ```

pub mod decode;
pub mod noise;
pub mod normalize;
pub mod resample;
pub mod scratch;
pub mod signal;

pub use decode::{decode_wav, decode_wav_file};
pub use noise::{rms, Calibrated, NoiseGate};
pub use normalize::{AudioFormatError, AudioNormalizer, CropPolicy};
pub use resample::{downmix, resample, resampled_len};
pub use scratch::ScratchAudio;
pub use signal::AudioSignal;
