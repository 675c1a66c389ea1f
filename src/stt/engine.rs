//! Speech recogniser trait and implementations.
//!
//! # Overview
//!
//! [`SpeechRecognizer`] is the interface the transcriber uses for a single
//! attempt in one language.  It is object-safe and `Send + Sync` so it can be
//! held behind an `Arc<dyn SpeechRecognizer>` and moved into
//! `spawn_blocking`.
//!
//! [`WhisperRecognizer`] is the production implementation that wraps a
//! `whisper_rs::WhisperContext`.  Construct it with [`WhisperRecognizer::load`].
//!
//! [`UnavailableRecognizer`] stands in when no model is installed; every
//! attempt fails as a service error, so audio turns report "not understood"
//! instead of aborting the program.

use std::path::Path;

use thiserror::Error;
use whisper_rs::{FullParams, WhisperContext, WhisperContextParameters};

use crate::stt::transcribe::{whisper_language, SamplingStrategy, TranscribeParams};

/// Whisper's native sample rate.
pub const WHISPER_RATE: u32 = 16_000;

/// whisper.cpp produces nothing for input under one second; shorter
/// utterances are zero-padded to this length.
const MIN_WHISPER_SAMPLES: usize = WHISPER_RATE as usize + WHISPER_RATE as usize / 10;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Outcome of a failed recognition attempt.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RecognitionError {
    /// The audio held no intelligible speech in the requested language.
    #[error("speech not understood")]
    NotUnderstood,

    /// The recogniser itself failed (model, backend or transport).
    #[error("recognition service error: {0}")]
    Service(String),
}

/// Failure to bring up a recogniser.
#[derive(Debug, Clone, Error)]
pub enum ModelError {
    /// The GGML model file was not found at the given path.
    #[error("model not found: {0}")]
    NotFound(String),

    /// `whisper_rs` failed to initialise a `WhisperContext`.
    #[error("whisper context initialisation failed: {0}")]
    ContextInit(String),
}

// ---------------------------------------------------------------------------
// SpeechRecognizer trait
// ---------------------------------------------------------------------------

/// One recognition attempt.
///
/// # Contract
///
/// - `audio` is **16 kHz, mono, f32** PCM.
/// - `language` is a configured tag such as `"ko-KR"`.
/// - A blank transcript is reported as [`RecognitionError::NotUnderstood`],
///   never as `Ok("")`.
pub trait SpeechRecognizer: Send + Sync {
    fn recognize(&self, audio: &[f32], language: &str) -> Result<String, RecognitionError>;
}

// Compile-time assertion: Box<dyn SpeechRecognizer> must be constructible.
const _: fn() = || {
    fn _assert_object_safe(_: Box<dyn SpeechRecognizer>) {}
};

// ---------------------------------------------------------------------------
// WhisperRecognizer
// ---------------------------------------------------------------------------

/// In-process whisper.cpp recogniser.
///
/// A new `WhisperState` is created for every call so the context can be
/// shared across threads without locking.
pub struct WhisperRecognizer {
    ctx: WhisperContext,
    params: TranscribeParams,
}

impl std::fmt::Debug for WhisperRecognizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WhisperRecognizer")
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

// SAFETY: WhisperContext is Send+Sync as declared by whisper-rs; the model
// weights are read-only after loading.
unsafe impl Send for WhisperRecognizer {}
unsafe impl Sync for WhisperRecognizer {}

impl WhisperRecognizer {
    /// Load a GGML model from `model_path`.
    ///
    /// # Errors
    ///
    /// - [`ModelError::NotFound`] — `model_path` does not exist.
    /// - [`ModelError::ContextInit`] — whisper-rs failed to load the file.
    pub fn load(
        model_path: impl AsRef<Path>,
        params: TranscribeParams,
    ) -> Result<Self, ModelError> {
        let path = model_path.as_ref();

        if !path.exists() {
            return Err(ModelError::NotFound(path.display().to_string()));
        }

        let path_str = path.to_str().ok_or_else(|| {
            ModelError::NotFound(format!(
                "model path contains non-UTF-8 characters: {}",
                path.display()
            ))
        })?;

        let mut ctx_params = WhisperContextParameters::default();
        ctx_params.use_gpu = params.use_gpu;
        let ctx = WhisperContext::new_with_params(path_str, ctx_params)
            .map_err(|e| ModelError::ContextInit(e.to_string()))?;

        log::info!("stt: loaded whisper model {}", path.display());
        Ok(Self { ctx, params })
    }

    fn full_params<'a, 'b>(&self) -> FullParams<'a, 'b> {
        use whisper_rs::SamplingStrategy as WS;
        let ws = match self.params.strategy {
            SamplingStrategy::Greedy { best_of } => WS::Greedy { best_of },
            SamplingStrategy::BeamSearch {
                beam_size,
                patience,
            } => WS::BeamSearch {
                beam_size,
                patience,
            },
        };

        let mut fp = FullParams::new(ws);
        fp.set_n_threads(self.params.n_threads);
        fp.set_suppress_blank(true);
        fp.set_no_context(true);

        if self.params.suppress_progress {
            fp.set_print_progress(false);
            fp.set_print_realtime(false);
            fp.set_print_special(false);
            fp.set_print_timestamps(false);
        }
        fp
    }
}

impl SpeechRecognizer for WhisperRecognizer {
    fn recognize(&self, audio: &[f32], language: &str) -> Result<String, RecognitionError> {
        if audio.is_empty() {
            return Err(RecognitionError::NotUnderstood);
        }

        let padded;
        let audio = if audio.len() < MIN_WHISPER_SAMPLES {
            let mut v = audio.to_vec();
            v.resize(MIN_WHISPER_SAMPLES, 0.0);
            padded = v;
            &padded[..]
        } else {
            audio
        };

        let lang = whisper_language(language);
        let mut fp = self.full_params();
        fp.set_language(lang.as_deref());

        let mut state = self
            .ctx
            .create_state()
            .map_err(|e| RecognitionError::Service(e.to_string()))?;

        state
            .full(fp, audio)
            .map_err(|e| RecognitionError::Service(e.to_string()))?;

        let n_segments = state
            .full_n_segments()
            .map_err(|e| RecognitionError::Service(e.to_string()))?;

        let mut text = String::new();
        for i in 0..n_segments {
            let segment = state
                .full_get_segment_text(i)
                .map_err(|e| RecognitionError::Service(format!("segment {i}: {e}")))?;
            if !is_non_speech_marker(&segment) {
                text.push_str(&segment);
            }
        }

        let text = text.trim();
        if text.is_empty() {
            Err(RecognitionError::NotUnderstood)
        } else {
            Ok(text.to_string())
        }
    }
}

/// Whisper annotates silence and noise as `[BLANK_AUDIO]`, `(music)` and
/// similar bracketed segments.
fn is_non_speech_marker(segment: &str) -> bool {
    let s = segment.trim();
    s.is_empty()
        || (s.starts_with('[') && s.ends_with(']'))
        || (s.starts_with('(') && s.ends_with(')'))
}

// ---------------------------------------------------------------------------
// UnavailableRecognizer
// ---------------------------------------------------------------------------

/// Recogniser used when no model could be loaded.
#[derive(Debug, Clone)]
pub struct UnavailableRecognizer {
    reason: String,
}

impl UnavailableRecognizer {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl SpeechRecognizer for UnavailableRecognizer {
    fn recognize(&self, _audio: &[f32], _language: &str) -> Result<String, RecognitionError> {
        Err(RecognitionError::Service(self.reason.clone()))
    }
}

// ---------------------------------------------------------------------------
// MockRecognizer  (test-only)
// ---------------------------------------------------------------------------

/// Scripted per-language responses; records every attempt.
#[cfg(test)]
pub struct MockRecognizer {
    script: std::collections::HashMap<String, Result<String, RecognitionError>>,
    calls: std::sync::Mutex<Vec<(String, usize)>>,
}

#[cfg(test)]
impl MockRecognizer {
    /// Every language not scripted answers `NotUnderstood`.
    pub fn new() -> Self {
        Self {
            script: Default::default(),
            calls: Default::default(),
        }
    }

    pub fn with(mut self, language: &str, response: Result<&str, RecognitionError>) -> Self {
        self.script
            .insert(language.to_string(), response.map(str::to_string));
        self
    }

    /// `(language, sample count)` for each attempt, in order.
    pub fn calls(&self) -> Vec<(String, usize)> {
        self.calls.lock().unwrap().clone()
    }
}

#[cfg(test)]
impl SpeechRecognizer for MockRecognizer {
    fn recognize(&self, audio: &[f32], language: &str) -> Result<String, RecognitionError> {
        self.calls
            .lock()
            .unwrap()
            .push((language.to_string(), audio.len()));
        match self.script.get(language) {
            Some(Ok(text)) if text.trim().is_empty() => Err(RecognitionError::NotUnderstood),
            Some(response) => response.clone(),
            None => Err(RecognitionError::NotUnderstood),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
