//! Recorded audio → text, trying languages in order.
//!
//! ```text
//! bytes ─▶ size check ─▶ ScratchAudio ─▶ decode ─▶ downmix ─▶ 16 kHz
//!       ─▶ NoiseGate (calibrate + trim) ─▶ recognise per language
//! ```
//!
//! Only the first non-empty transcript is kept.  A language the recogniser
//! does not understand, or a service error for one language, moves on to
//! the next; running out of languages is [`TranscriptResult::NoResult`],
//! not an error.  The exception is a recogniser that fails with a service
//! error for every language, which is reported as
//! [`TranscribeError::RecognizerUnavailable`].

use std::sync::Arc;

use thiserror::Error;

use crate::audio::{downmix, resample, AudioFormatError, NoiseGate, ScratchAudio};
use crate::config::{AudioConfig, SttConfig};
use crate::stt::engine::{RecognitionError, SpeechRecognizer, WHISPER_RATE};

// ---------------------------------------------------------------------------
// Result / error types
// ---------------------------------------------------------------------------

/// Outcome of one audio submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranscriptResult {
    Recognized { text: String, language: String },
    NoResult,
}

#[derive(Debug, Error)]
pub enum TranscribeError {
    /// The buffer is empty or too small to hold a usable recording.
    #[error("audio buffer too small: {len} bytes (minimum {min})")]
    InvalidAudio { len: usize, min: usize },

    /// The buffer is not decodable audio.
    #[error(transparent)]
    Format(#[from] AudioFormatError),

    /// The scratch file could not be written.
    #[error("scratch storage failed: {0}")]
    Storage(#[from] std::io::Error),

    /// Every language attempt failed with a service error.
    #[error("speech recogniser unavailable: {0}")]
    RecognizerUnavailable(String),
}

// ---------------------------------------------------------------------------
// SpeechTranscriber
// ---------------------------------------------------------------------------

pub struct SpeechTranscriber {
    recognizer: Arc<dyn SpeechRecognizer>,
    languages: Vec<String>,
    min_audio_bytes: usize,
    gate: NoiseGate,
}

impl SpeechTranscriber {
    pub fn new(recognizer: Arc<dyn SpeechRecognizer>, languages: Vec<String>) -> Self {
        let audio = AudioConfig::default();
        Self {
            recognizer,
            languages,
            min_audio_bytes: audio.min_audio_bytes,
            gate: NoiseGate::new(audio.calibration_secs, audio.energy_ratio, audio.min_energy),
        }
    }

    pub fn from_config(
        recognizer: Arc<dyn SpeechRecognizer>,
        stt: &SttConfig,
        audio: &AudioConfig,
    ) -> Self {
        Self {
            recognizer,
            languages: stt.languages.clone(),
            min_audio_bytes: audio.min_audio_bytes,
            gate: NoiseGate::new(audio.calibration_secs, audio.energy_ratio, audio.min_energy),
        }
    }

    pub fn languages(&self) -> &[String] {
        &self.languages
    }

    /// Transcribe one recorded clip.
    ///
    /// # Errors
    ///
    /// - [`TranscribeError::InvalidAudio`] — fewer than `min_audio_bytes`;
    ///   the recogniser is never called.
    /// - [`TranscribeError::Format`] — the bytes are not a WAV file.
    /// - [`TranscribeError::Storage`] — the scratch file could not be written.
    pub async fn transcribe(&self, bytes: &[u8]) -> Result<TranscriptResult, TranscribeError> {
        if bytes.is_empty() || bytes.len() < self.min_audio_bytes {
            return Err(TranscribeError::InvalidAudio {
                len: bytes.len(),
                min: self.min_audio_bytes,
            });
        }

        let utterance = {
            let scratch = ScratchAudio::write(bytes)?;
            let signal = scratch.decode()?;
            let mono = downmix(&signal.samples, signal.channels);
            resample(&mono, signal.sample_rate, WHISPER_RATE)
        };

        let calibrated = self.gate.split(&utterance, WHISPER_RATE);
        let speech = self.gate.speech(&calibrated);

        if speech.is_empty() {
            log::info!(
                "stt: no speech above threshold {:.4} (noise floor {:?})",
                calibrated.threshold,
                calibrated.noise_floor
            );
            return Ok(TranscriptResult::NoResult);
        }

        let speech: Arc<[f32]> = Arc::from(speech);
        log::debug!(
            "stt: {} speech samples, trying {:?}",
            speech.len(),
            self.languages
        );

        let mut service_failure: Option<String> = None;
        let mut heard_but_not_understood = false;

        for language in &self.languages {
            match self.attempt(speech.clone(), language.clone()).await {
                Ok(text) => {
                    log::debug!("stt: [{language}] {text:?}");
                    return Ok(TranscriptResult::Recognized {
                        text,
                        language: language.clone(),
                    });
                }
                Err(RecognitionError::NotUnderstood) => {
                    log::debug!("stt: [{language}] not understood");
                    heard_but_not_understood = true;
                }
                Err(RecognitionError::Service(e)) => {
                    log::warn!("stt: [{language}] recognition failed: {e}");
                    service_failure = Some(e);
                }
            }
        }

        if let (false, Some(reason)) = (heard_but_not_understood, service_failure) {
            return Err(TranscribeError::RecognizerUnavailable(reason));
        }

        log::info!("stt: no language produced a transcript");
        Ok(TranscriptResult::NoResult)
    }

    /// One recogniser call on the blocking pool.
    async fn attempt(
        &self,
        speech: Arc<[f32]>,
        language: String,
    ) -> Result<String, RecognitionError> {
        let recognizer = self.recognizer.clone();
        let text = tokio::task::spawn_blocking(move || recognizer.recognize(&speech, &language))
            .await
            .map_err(|e| RecognitionError::Service(format!("recogniser task failed: {e}")))??;

        let text = text.trim();
        if text.is_empty() {
            Err(RecognitionError::NotUnderstood)
        } else {
            Ok(text.to_string())
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::decode::encode_wav;
    use crate::stt::engine::MockRecognizer;

    /// 0.5 s of silence followed by `speech_secs` of a 220 Hz tone.
    fn spoken_clip(rate: u32, channels: u16, speech_secs: f32) -> Vec<u8> {
        let lead = (rate as f32 * 0.5) as usize;
        let speech = (rate as f32 * speech_secs) as usize;
        let mut mono = vec![0.0_f32; lead];
        mono.extend((0..speech).map(|i| {
            0.3 * (2.0 * std::f32::consts::PI * 220.0 * i as f32 / rate as f32).sin()
        }));
        let interleaved: Vec<f32> = mono
            .iter()
            .flat_map(|&s| std::iter::repeat(s).take(channels as usize))
            .collect();
        encode_wav(&interleaved, rate, channels)
    }

    fn transcriber(recognizer: Arc<MockRecognizer>, languages: &[&str]) -> SpeechTranscriber {
        SpeechTranscriber::new(
            recognizer,
            languages.iter().map(|s| s.to_string()).collect(),
        )
    }

    #[tokio::test]
    async fn falls_back_to_next_language() {
        let rec = Arc::new(
            MockRecognizer::new()
                .with("ko-KR", Err(RecognitionError::NotUnderstood))
                .with("en-US", Ok("hello")),
        );
        let t = transcriber(rec.clone(), &["ko-KR", "en-US"]);

        let result = t.transcribe(&spoken_clip(16_000, 1, 1.0)).await.unwrap();
        assert_eq!(
            result,
            TranscriptResult::Recognized {
                text: "hello".into(),
                language: "en-US".into()
            }
        );
        let langs: Vec<String> = rec.calls().into_iter().map(|(l, _)| l).collect();
        assert_eq!(langs, vec!["ko-KR", "en-US"]);
    }

    #[tokio::test]
    async fn first_success_stops_the_search() {
        let rec = Arc::new(
            MockRecognizer::new()
                .with("ko-KR", Ok("안녕하세요"))
                .with("en-US", Ok("hello")),
        );
        let t = transcriber(rec.clone(), &["ko-KR", "en-US"]);
        let result = t.transcribe(&spoken_clip(16_000, 1, 1.0)).await.unwrap();
        assert!(matches!(
            result,
            TranscriptResult::Recognized { ref language, .. } if language == "ko-KR"
        ));
        assert_eq!(rec.calls().len(), 1);
    }

    #[tokio::test]
    async fn service_error_moves_on() {
        let rec = Arc::new(
            MockRecognizer::new()
                .with("ko-KR", Err(RecognitionError::Service("503".into())))
                .with("en-US", Ok("  hello there ")),
        );
        let t = transcriber(rec, &["ko-KR", "en-US"]);
        let result = t.transcribe(&spoken_clip(16_000, 1, 1.0)).await.unwrap();
        assert_eq!(
            result,
            TranscriptResult::Recognized {
                text: "hello there".into(),
                language: "en-US".into()
            }
        );
    }

    #[tokio::test]
    async fn exhausted_languages_is_no_result() {
        let rec = Arc::new(MockRecognizer::new().with("en-US", Ok("   ")));
        let t = transcriber(rec.clone(), &["ko-KR", "en-US"]);
        let result = t.transcribe(&spoken_clip(16_000, 1, 1.0)).await.unwrap();
        assert_eq!(result, TranscriptResult::NoResult);
        assert_eq!(rec.calls().len(), 2);
    }

    #[tokio::test]
    async fn speech_from_first_sample_is_recognised() {
        let rec = Arc::new(
            MockRecognizer::new()
                .with("ko-KR", Err(RecognitionError::NotUnderstood))
                .with("en-US", Ok("hello")),
        );
        let t = transcriber(rec.clone(), &["ko-KR", "en-US"]);

        // 2 s of tone with no quiet lead-in.
        let samples: Vec<f32> = (0..32_000)
            .map(|i| 0.3 * (2.0 * std::f32::consts::PI * 220.0 * i as f32 / 16_000.0).sin())
            .collect();
        let result = t.transcribe(&encode_wav(&samples, 16_000, 1)).await.unwrap();

        assert_eq!(
            result,
            TranscriptResult::Recognized {
                text: "hello".into(),
                language: "en-US".into()
            }
        );
        assert_eq!(rec.calls().len(), 2);
    }

    #[tokio::test]
    async fn service_failure_for_every_language_is_unavailable() {
        let rec = Arc::new(
            MockRecognizer::new()
                .with("ko-KR", Err(RecognitionError::Service("no model".into())))
                .with("en-US", Err(RecognitionError::Service("no model".into()))),
        );
        let t = transcriber(rec.clone(), &["ko-KR", "en-US"]);
        let err = t.transcribe(&spoken_clip(16_000, 1, 1.0)).await.unwrap_err();
        assert!(matches!(err, TranscribeError::RecognizerUnavailable(ref m) if m == "no model"));
        assert_eq!(rec.calls().len(), 2);
    }

    #[tokio::test]
    async fn mixed_service_and_not_understood_is_no_result() {
        let rec = Arc::new(
            MockRecognizer::new()
                .with("ko-KR", Err(RecognitionError::Service("503".into())))
                .with("en-US", Err(RecognitionError::NotUnderstood)),
        );
        let t = transcriber(rec, &["ko-KR", "en-US"]);
        let result = t.transcribe(&spoken_clip(16_000, 1, 1.0)).await.unwrap();
        assert_eq!(result, TranscriptResult::NoResult);
    }

    #[tokio::test]
    async fn empty_buffer_is_rejected_before_recognition() {
        let rec = Arc::new(MockRecognizer::new().with("en-US", Ok("hello")));
        let t = transcriber(rec.clone(), &["en-US"]);

        let err = t.transcribe(&[]).await.unwrap_err();
        assert!(matches!(err, TranscribeError::InvalidAudio { len: 0, .. }));

        let err = t.transcribe(&[0u8; 999]).await.unwrap_err();
        assert!(matches!(err, TranscribeError::InvalidAudio { len: 999, min: 1000 }));

        assert!(rec.calls().is_empty());
    }

    #[tokio::test]
    async fn undecodable_bytes_are_format_error() {
        let rec = Arc::new(MockRecognizer::new());
        let t = transcriber(rec.clone(), &["en-US"]);
        let err = t.transcribe(&[7u8; 4_096]).await.unwrap_err();
        assert!(matches!(err, TranscribeError::Format(_)));
        assert!(rec.calls().is_empty());
    }

    #[tokio::test]
    async fn silence_skips_recognition() {
        let rec = Arc::new(MockRecognizer::new().with("en-US", Ok("hallucination")));
        let t = transcriber(rec.clone(), &["en-US"]);
        let silent = encode_wav(&vec![0.0; 32_000], 16_000, 1);
        let result = t.transcribe(&silent).await.unwrap();
        assert_eq!(result, TranscriptResult::NoResult);
        assert!(rec.calls().is_empty());
    }

    #[tokio::test]
    async fn stereo_44k_reaches_recognizer_as_16k_speech() {
        let rec = Arc::new(MockRecognizer::new().with("en-US", Ok("hello")));
        let t = transcriber(rec.clone(), &["en-US"]);
        t.transcribe(&spoken_clip(44_100, 2, 1.0)).await.unwrap();

        let calls = rec.calls();
        assert_eq!(calls.len(), 1);
        // One second of tone at 16 kHz, give or take a trimmed edge frame.
        let samples = calls[0].1;
        assert!(
            (15_000..=17_000).contains(&samples),
            "unexpected speech length {samples}"
        );
    }

    #[test]
    fn configured_languages_are_kept_in_order() {
        let stt = SttConfig::default();
        let t = SpeechTranscriber::from_config(
            Arc::new(MockRecognizer::new()),
            &stt,
            &AudioConfig::default(),
        );
        assert_eq!(t.languages(), &["ko-KR".to_string(), "en-US".to_string()]);
    }
}
