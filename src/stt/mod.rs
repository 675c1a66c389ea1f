//! STT (Speech-to-Text) module.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                   SpeechTranscriber                      │
//! │                                                          │
//! │  bytes → ScratchAudio → decode → 16 kHz mono → NoiseGate │
//! │                                        │                 │
//! │                 for each language ─────┘                 │
//! │                        ▼                                 │
//! │   ┌────────────────────────────────────┐                 │
//! │   │   SpeechRecognizer (trait)         │                 │
//! │   │   WhisperRecognizer / Unavailable  │                 │
//! │   └────────────────────────────────────┘                 │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! # Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use emotion_chat::stt::{SpeechTranscriber, TranscribeParams, WhisperRecognizer};
//!
//! # async fn run(wav: Vec<u8>) {
//! let recognizer = WhisperRecognizer::load("models/ggml-base.bin", TranscribeParams::default())
//!     .expect("model not found");
//! let transcriber = SpeechTranscriber::new(
//!     Arc::new(recognizer),
//!     vec!["ko-KR".into(), "en-US".into()],
//! );
//! let result = transcriber.transcribe(&wav).await.unwrap();
//! println!("{result:?}");
//! # }
//! ```

pub mod engine;
pub mod transcribe;
pub mod transcriber;

// ── Public re-exports ──────────────────────────────────────────────────────

pub use engine::{
    ModelError, RecognitionError, SpeechRecognizer, UnavailableRecognizer, WhisperRecognizer,
    WHISPER_RATE,
};
pub use transcribe::{optimal_threads, whisper_language, SamplingStrategy, TranscribeParams};
pub use transcriber::{SpeechTranscriber, TranscribeError, TranscriptResult};

#[cfg(test)]
pub use engine::MockRecognizer;
