//! The conversation state machine.
//!
//! [`ConversationSession`] owns the lifecycle, the per-persona
//! [`SessionState`] and every collaborator a turn needs.  A turn runs all of
//! its fallible steps first and only then commits, in one place, the user
//! message, the assistant reply, the statistics, the current emotion and the
//! input marker.  A failed turn leaves the state exactly as it was.
//!
//! # Turn flow
//!
//! ```text
//! text  ─▶ marker check ─▶ TextEmotionClassifier ─────────────────┐
//! audio ─▶ marker check ─▶ SpeechTranscriber ─▶ detector ─────────┤
//!                              text:  TextEmotionClassifier       │
//!                              audio: decode → normalise → model  │
//!                                                                 ▼
//!                                       ResponseGenerator ─▶ commit
//! ```

use std::sync::Arc;

use crate::audio::{decode_wav, AudioNormalizer};
use crate::config::{AppConfig, EmotionDetector};
use crate::emotion::{
    AudioEmotionClassifier, DetectedEmotion, EmotionModel, EmotionPolicy, EmotionSource,
    TextEmotionClassifier,
};
use crate::llm::{ChatClient, ResponseGenerator};
use crate::pipeline::state::{set_phase, SharedStatus, TurnPhase};
use crate::stt::{SpeechRecognizer, SpeechTranscriber, TranscriptResult};

use super::error::{SessionError, TurnError};
use super::lifecycle::{Lifecycle, LifecycleAction};
use super::state::{ConversationStats, InputMarker, Message, PersonaId, SessionState};

// ---------------------------------------------------------------------------
// Collaborators
// ---------------------------------------------------------------------------

/// External services a session talks to.
pub struct Collaborators {
    /// Chat model used for text emotion classification.
    pub chat: Arc<dyn ChatClient>,
    /// Produces assistant replies.
    pub responder: Arc<dyn ResponseGenerator>,
    /// Single-language speech recogniser.
    pub recognizer: Arc<dyn SpeechRecognizer>,
    /// Audio classification model; required for the audio detector.
    pub emotion_model: Option<Arc<dyn EmotionModel>>,
}

/// The audio detector and the signal shaping it depends on.
struct AudioDetector {
    normalizer: AudioNormalizer,
    classifier: AudioEmotionClassifier,
    target_rate: u32,
    target_length: usize,
}

// ---------------------------------------------------------------------------
// TurnOutcome
// ---------------------------------------------------------------------------

/// What a committed turn added.
#[derive(Debug, Clone, PartialEq)]
pub struct TurnSummary {
    pub user_text: String,
    pub emotion: DetectedEmotion,
    pub reply: String,
    /// Recognition language, for audio turns.
    pub language: Option<String>,
    pub stats: ConversationStats,
}

#[derive(Debug)]
pub enum TurnOutcome {
    /// Messages, statistics, emotion and marker were updated.
    Committed(TurnSummary),
    /// Same input as the last committed turn; nothing changed.
    Duplicate,
    /// Blank input; nothing changed.
    Ignored,
    /// The turn aborted; nothing changed.
    Failed(TurnError),
}

impl TurnOutcome {
    pub fn is_committed(&self) -> bool {
        matches!(self, TurnOutcome::Committed(_))
    }
}

/// Resets the shared phase to `Idle` when a turn ends, however it ends.
struct PhaseGuard<'a>(Option<&'a SharedStatus>);

impl PhaseGuard<'_> {
    fn enter(&self, phase: TurnPhase) {
        if let Some(status) = self.0 {
            set_phase(status, phase);
        }
    }
}

impl Drop for PhaseGuard<'_> {
    fn drop(&mut self) {
        self.enter(TurnPhase::Idle);
    }
}

// ---------------------------------------------------------------------------
// ConversationSession
// ---------------------------------------------------------------------------

pub struct ConversationSession {
    lifecycle: Lifecycle,
    state: Option<SessionState>,
    policy: EmotionPolicy,
    greeting: String,
    text_classifier: TextEmotionClassifier,
    audio_detector: Option<AudioDetector>,
    transcriber: SpeechTranscriber,
    responder: Arc<dyn ResponseGenerator>,
    status: Option<SharedStatus>,
}

impl ConversationSession {
    /// Build a session in the `Uninitialized` state.
    ///
    /// With `detector = "audio"` but no emotion model, audio turns fall back
    /// to classifying the transcript.
    pub fn new(config: &AppConfig, collaborators: Collaborators) -> Self {
        let policy = config.emotion.policy();

        let audio_detector = match (config.emotion.detector, collaborators.emotion_model) {
            (EmotionDetector::Audio, Some(model)) => Some(AudioDetector {
                normalizer: AudioNormalizer::new(config.audio.crop_policy),
                classifier: AudioEmotionClassifier::new(
                    model,
                    config.emotion.label_table(),
                    policy.clone(),
                    config.audio.target_rate,
                    config.audio.target_length,
                ),
                target_rate: config.audio.target_rate,
                target_length: config.audio.target_length,
            }),
            (EmotionDetector::Audio, None) => {
                log::warn!("session: audio detector configured without a model, using text");
                None
            }
            (EmotionDetector::Text, _) => None,
        };

        Self {
            lifecycle: Lifecycle::Uninitialized,
            state: None,
            text_classifier: TextEmotionClassifier::new(collaborators.chat, policy.clone()),
            policy,
            greeting: config.session.greeting.clone(),
            audio_detector,
            transcriber: SpeechTranscriber::from_config(
                collaborators.recognizer,
                &config.stt,
                &config.audio,
            ),
            responder: collaborators.responder,
            status: None,
        }
    }

    /// Publish turn phases to `status`.
    pub fn with_status(mut self, status: SharedStatus) -> Self {
        self.status = Some(status);
        self
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    pub fn persona(&self) -> Option<&PersonaId> {
        self.lifecycle.persona()
    }

    pub fn state(&self) -> Option<&SessionState> {
        self.state.as_ref()
    }

    pub fn messages(&self) -> &[Message] {
        self.state
            .as_ref()
            .map(|s| s.messages.as_slice())
            .unwrap_or(&[])
    }

    pub fn stats(&self) -> ConversationStats {
        self.state.as_ref().map(|s| s.stats).unwrap_or_default()
    }

    pub fn current_emotion(&self) -> Option<DetectedEmotion> {
        self.state.as_ref().map(|s| s.current_emotion)
    }

    pub fn audio_detector_enabled(&self) -> bool {
        self.audio_detector.is_some()
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Enter `persona`'s chat.  Returns `true` when fresh state was created.
    ///
    /// # Errors
    ///
    /// [`SessionError::InvalidTransition`] when a different persona is
    /// active; use [`switch_persona`](Self::switch_persona) instead.
    pub fn initialize(&mut self, persona: PersonaId) -> Result<bool, SessionError> {
        match self.lifecycle.plan_initialize(&persona)? {
            LifecycleAction::Preserve => Ok(false),
            LifecycleAction::Create | LifecycleAction::Rebuild => {
                self.create(persona);
                Ok(true)
            }
        }
    }

    /// Select `persona` from any state; a different persona discards the
    /// current conversation.
    pub fn switch_persona(&mut self, persona: PersonaId) -> LifecycleAction {
        let action = self.lifecycle.plan_switch(&persona);
        match action {
            LifecycleAction::Preserve => {}
            LifecycleAction::Rebuild => {
                log::info!(
                    "session: switching persona {} -> {persona}, discarding conversation",
                    self.lifecycle.persona().map_or("-", PersonaId::as_str)
                );
                self.create(persona);
            }
            LifecycleAction::Create => self.create(persona),
        }
        action
    }

    /// Leave the chat; the conversation is dropped.
    pub fn leave(&mut self) -> Result<(), SessionError> {
        self.lifecycle.plan_leave()?;
        log::info!("session: left conversation");
        self.state = None;
        self.lifecycle = Lifecycle::Discarded;
        Ok(())
    }

    /// Drop everything and return to `Uninitialized`.
    pub fn reset(&mut self) {
        log::info!("session: reset");
        self.state = None;
        self.lifecycle = Lifecycle::Uninitialized;
    }

    fn create(&mut self, persona: PersonaId) {
        log::info!("session: new conversation with {persona}");
        self.state = Some(SessionState::new(
            persona.clone(),
            &self.greeting,
            self.policy.default_label,
        ));
        self.lifecycle = Lifecycle::Active(persona);
    }

    // -----------------------------------------------------------------------
    // Turns
    // -----------------------------------------------------------------------

    /// Handle typed text.
    pub async fn apply_text_turn(&mut self, text: &str) -> TurnOutcome {
        let Some(persona) = self.persona().cloned() else {
            return TurnOutcome::Failed(TurnError::NotActive);
        };

        let text = text.trim();
        if text.is_empty() {
            return TurnOutcome::Ignored;
        }

        let marker = InputMarker::text(text);
        if self.is_duplicate(&marker) {
            log::debug!("session: duplicate text input ignored");
            return TurnOutcome::Duplicate;
        }

        let phase = PhaseGuard(self.status.as_ref());
        phase.enter(TurnPhase::Classifying);
        let label = self.text_classifier.classify(text).await;
        let emotion = DetectedEmotion::new(label, EmotionSource::Text);

        phase.enter(TurnPhase::Responding);
        let reply = match self.responder.respond(text, persona.as_str(), label).await {
            Ok(reply) => reply,
            Err(e) => return self.fail(TurnError::CollaboratorUnavailable(e.to_string())),
        };
        drop(phase);

        self.commit(marker, text.to_string(), emotion, reply, None)
    }

    /// Handle a recorded clip (WAV bytes).
    pub async fn apply_audio_turn(&mut self, bytes: &[u8]) -> TurnOutcome {
        let Some(persona) = self.persona().cloned() else {
            return TurnOutcome::Failed(TurnError::NotActive);
        };

        let marker = InputMarker::audio(bytes);
        if self.is_duplicate(&marker) {
            log::debug!("session: duplicate audio input ignored");
            return TurnOutcome::Duplicate;
        }

        let phase = PhaseGuard(self.status.as_ref());
        phase.enter(TurnPhase::Transcribing);
        let (text, language) = match self.transcriber.transcribe(bytes).await {
            Ok(TranscriptResult::Recognized { text, language }) => (text, language),
            Ok(TranscriptResult::NoResult) => {
                return self.fail(TurnError::TranscriptionExhausted)
            }
            Err(e) => return self.fail(e.into()),
        };

        phase.enter(TurnPhase::Classifying);
        let emotion = match &self.audio_detector {
            Some(detector) => match detector.classify(bytes).await {
                Ok(label) => DetectedEmotion::new(label, EmotionSource::Audio),
                Err(e) => return self.fail(e),
            },
            None => DetectedEmotion::new(
                self.text_classifier.classify(&text).await,
                EmotionSource::Text,
            ),
        };

        phase.enter(TurnPhase::Responding);
        let reply = match self
            .responder
            .respond(&text, persona.as_str(), emotion.label)
            .await
        {
            Ok(reply) => reply,
            Err(e) => return self.fail(TurnError::CollaboratorUnavailable(e.to_string())),
        };
        drop(phase);

        self.commit(marker, text, emotion, reply, Some(language))
    }

    fn is_duplicate(&self, marker: &InputMarker) -> bool {
        self.state
            .as_ref()
            .and_then(|s| s.last_input.as_ref())
            .is_some_and(|last| last == marker)
    }

    fn fail(&self, error: TurnError) -> TurnOutcome {
        log::warn!("session: turn failed: {error}");
        TurnOutcome::Failed(error)
    }

    fn commit(
        &mut self,
        marker: InputMarker,
        user_text: String,
        emotion: DetectedEmotion,
        reply: String,
        language: Option<String>,
    ) -> TurnOutcome {
        let Some(state) = self.state.as_mut() else {
            return TurnOutcome::Failed(TurnError::NotActive);
        };

        state.messages.push(Message::user(user_text.clone(), emotion));
        state.messages.push(Message::assistant(reply.clone()));
        state.stats = state.stats.record(emotion.label, &self.policy);
        state.current_emotion = emotion;
        state.last_input = Some(marker);

        log::info!(
            "session: turn {} committed, emotion {} ({:?})",
            state.stats.total,
            emotion.label,
            emotion.source
        );

        TurnOutcome::Committed(TurnSummary {
            user_text,
            emotion,
            reply,
            language,
            stats: state.stats,
        })
    }
}

impl AudioDetector {
    async fn classify(&self, bytes: &[u8]) -> Result<crate::emotion::EmotionLabel, TurnError> {
        let signal = decode_wav(bytes)?;
        let window = self
            .normalizer
            .normalize(&signal, self.target_rate, self.target_length)?;
        Ok(self.classifier.classify(&window).await?)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
