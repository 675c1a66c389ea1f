//! Whisper decoding parameters and language-tag handling.
//!
//! [`TranscribeParams`] carries everything that controls a Whisper run
//! except the language, which the transcriber supplies per attempt.

// ---------------------------------------------------------------------------
// SamplingStrategy
// ---------------------------------------------------------------------------

/// Mirrors `whisper_rs::SamplingStrategy` but is owned and `Clone`.
///
/// [`SamplingStrategy::Greedy`] is single-pass and fast;
/// [`SamplingStrategy::BeamSearch`] trades 2-4× latency for accuracy.
#[derive(Debug, Clone, PartialEq)]
pub enum SamplingStrategy {
    /// Greedy (single-pass) decoding.
    Greedy {
        /// Number of candidate tokens evaluated per step.  1 is fastest.
        best_of: i32,
    },
    /// Beam-search decoding.
    BeamSearch {
        /// Number of beams to maintain in parallel.
        beam_size: i32,
        /// Beam-search patience factor (≥1.0 = standard beam search).
        patience: f32,
    },
}

impl Default for SamplingStrategy {
    fn default() -> Self {
        Self::Greedy { best_of: 1 }
    }
}

// ---------------------------------------------------------------------------
// TranscribeParams
// ---------------------------------------------------------------------------

/// Parameters shared by every recognition attempt.
///
/// ```
/// use emotion_chat::stt::{SamplingStrategy, TranscribeParams};
///
/// let params = TranscribeParams {
///     strategy: SamplingStrategy::BeamSearch { beam_size: 5, patience: 1.0 },
///     ..TranscribeParams::default()
/// };
/// assert!(params.n_threads >= 1);
/// ```
#[derive(Debug, Clone)]
pub struct TranscribeParams {
    /// Decoding strategy — Greedy is fastest, BeamSearch is more accurate.
    pub strategy: SamplingStrategy,

    /// Number of CPU threads handed to Whisper.  Defaults to
    /// [`optimal_threads()`], capped at 8.
    pub n_threads: i32,

    /// Suppress Whisper's progress output to stderr.
    pub suppress_progress: bool,

    /// Ask whisper.cpp for a GPU backend when one was compiled in.
    pub use_gpu: bool,
}

impl Default for TranscribeParams {
    fn default() -> Self {
        Self {
            strategy: SamplingStrategy::default(),
            n_threads: optimal_threads(),
            suppress_progress: true,
            use_gpu: false,
        }
    }
}

/// Number of CPU threads to use for inference, capped at 8.
pub fn optimal_threads() -> i32 {
    std::thread::available_parallelism()
        .map(|n| n.get().min(8) as i32)
        .unwrap_or(4)
}

// ---------------------------------------------------------------------------
// Language tags
// ---------------------------------------------------------------------------

/// Whisper language code for a configured tag.
///
/// Locale tags keep only their primary subtag (`"ko-KR"` → `"ko"`,
/// `"en_US"` → `"en"`).  `"auto"` and blank tags mean auto-detection and
/// return `None`.
///
/// ```
/// use emotion_chat::stt::whisper_language;
///
/// assert_eq!(whisper_language("ko-KR").as_deref(), Some("ko"));
/// assert_eq!(whisper_language("auto"), None);
/// ```
pub fn whisper_language(tag: &str) -> Option<String> {
    let primary = tag
        .trim()
        .split(|c| c == '-' || c == '_')
        .next()
        .unwrap_or("")
        .to_ascii_lowercase();

    if primary.is_empty() || primary == "auto" {
        None
    } else {
        Some(primary)
    }
}
