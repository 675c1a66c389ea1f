//! Session runner: drives a [`ConversationSession`] from an event channel.
//!
//! [`SessionRunner`] owns the session and the [`SharedStatus`] and handles
//! [`SessionEvent`]s received over a `tokio::sync::mpsc` channel, strictly in
//! arrival order.  Each event yields exactly one [`SessionUpdate`] on the
//! outbound channel.
//!
//! # Event flow
//!
//! ```text
//! SelectPersona(p) ──▶ switch_persona          ──▶ Persona
//! Text(t)          ──▶ apply_text_turn         ──▶ Turn | Duplicate | Ignored | Notice
//! Audio(input)     ──▶ read file (if path)
//!                      └─▶ apply_audio_turn    ──▶ Turn | Duplicate | Notice
//! Reset            ──▶ reset                   ──▶ Reset
//! Leave            ──▶ leave                   ──▶ Left | Notice
//! Stats            ──▶ (read only)             ──▶ Stats
//! ```
//!
//! The status snapshot is refreshed after every event so the host can render
//! persona, emotion and statistics without touching the session.

use std::path::PathBuf;

use tokio::sync::mpsc;

use crate::session::{
    ConversationSession, ConversationStats, LifecycleAction, PersonaId, TurnOutcome, TurnSummary,
};

use super::state::SharedStatus;

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// A recorded clip, either in memory or on disk.
#[derive(Debug, Clone)]
pub enum AudioInput {
    Bytes(Vec<u8>),
    File(PathBuf),
}

/// Requests from the host.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// Open (or switch to) a persona's chat.
    SelectPersona(PersonaId),
    Text(String),
    Audio(AudioInput),
    Reset,
    Leave,
    /// Ask for the current statistics.
    Stats,
}

/// What the runner did with one event.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionUpdate {
    /// Persona selected; `fresh` is `true` when a new conversation started.
    Persona {
        persona: PersonaId,
        greeting: Option<String>,
        fresh: bool,
    },
    Turn(TurnSummary),
    Duplicate,
    Ignored,
    Stats(ConversationStats),
    Reset,
    Left,
    /// User-visible message for a failed turn or rejected request.
    Notice(String),
}

// ---------------------------------------------------------------------------
// SessionRunner
// ---------------------------------------------------------------------------

/// Owns one session and applies events to it sequentially.
///
/// ```rust,no_run
/// use emotion_chat::config::AppConfig;
/// use emotion_chat::pipeline::{new_shared_status, SessionEvent, SessionRunner};
/// use emotion_chat::session::{Collaborators, ConversationSession};
///
/// # async fn example(collaborators: Collaborators) {
/// let status = new_shared_status();
/// let session = ConversationSession::new(&AppConfig::default(), collaborators)
///     .with_status(status.clone());
///
/// let (event_tx, event_rx) = tokio::sync::mpsc::channel(16);
/// let (update_tx, mut update_rx) = tokio::sync::mpsc::channel(16);
/// tokio::spawn(SessionRunner::new(session, status).run(event_rx, update_tx));
///
/// event_tx.send(SessionEvent::SelectPersona("companion".into())).await.ok();
/// let _greeting = update_rx.recv().await;
/// # }
/// ```
pub struct SessionRunner {
    session: ConversationSession,
    status: SharedStatus,
}

impl SessionRunner {
    pub fn new(session: ConversationSession, status: SharedStatus) -> Self {
        Self { session, status }
    }

    pub fn session(&self) -> &ConversationSession {
        &self.session
    }

    // -----------------------------------------------------------------------
    // Main async loop
    // -----------------------------------------------------------------------

    /// Run until `events` is closed or the update receiver is dropped.
    pub async fn run(
        mut self,
        mut events: mpsc::Receiver<SessionEvent>,
        updates: mpsc::Sender<SessionUpdate>,
    ) {
        while let Some(event) = events.recv().await {
            let update = self.handle(event).await;
            self.publish(&update);
            if updates.send(update).await.is_err() {
                log::info!("pipeline: update receiver dropped, stopping");
                return;
            }
        }

        log::info!("pipeline: event channel closed, shutting down");
    }

    /// Apply one event and describe the result.
    pub async fn handle(&mut self, event: SessionEvent) -> SessionUpdate {
        match event {
            SessionEvent::SelectPersona(persona) => self.handle_persona(persona),
            SessionEvent::Text(text) => {
                let outcome = self.session.apply_text_turn(&text).await;
                Self::outcome_update(outcome)
            }
            SessionEvent::Audio(input) => self.handle_audio(input).await,
            SessionEvent::Reset => {
                self.session.reset();
                SessionUpdate::Reset
            }
            SessionEvent::Leave => match self.session.leave() {
                Ok(()) => SessionUpdate::Left,
                Err(e) => SessionUpdate::Notice(e.to_string()),
            },
            SessionEvent::Stats => SessionUpdate::Stats(self.session.stats()),
        }
    }

    // -----------------------------------------------------------------------
    // Event handlers
    // -----------------------------------------------------------------------

    fn handle_persona(&mut self, persona: PersonaId) -> SessionUpdate {
        let action = self.session.switch_persona(persona.clone());
        let fresh = action != LifecycleAction::Preserve;
        let greeting = if fresh {
            self.session.messages().first().map(|m| m.content.clone())
        } else {
            None
        };
        SessionUpdate::Persona {
            persona,
            greeting,
            fresh,
        }
    }

    async fn handle_audio(&mut self, input: AudioInput) -> SessionUpdate {
        let bytes = match input {
            AudioInput::Bytes(bytes) => bytes,
            AudioInput::File(path) => match tokio::fs::read(&path).await {
                Ok(bytes) => bytes,
                Err(e) => {
                    log::warn!("pipeline: cannot read {}: {e}", path.display());
                    return SessionUpdate::Notice(format!(
                        "Could not open {}: {e}",
                        path.display()
                    ));
                }
            },
        };
        let outcome = self.session.apply_audio_turn(&bytes).await;
        Self::outcome_update(outcome)
    }

    fn outcome_update(outcome: TurnOutcome) -> SessionUpdate {
        match outcome {
            TurnOutcome::Committed(summary) => SessionUpdate::Turn(summary),
            TurnOutcome::Duplicate => SessionUpdate::Duplicate,
            TurnOutcome::Ignored => SessionUpdate::Ignored,
            TurnOutcome::Failed(e) => SessionUpdate::Notice(e.notice()),
        }
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    /// Copy the session's visible state into the shared status.
    fn publish(&self, update: &SessionUpdate) {
        let Ok(mut st) = self.status.lock() else {
            log::error!("pipeline: status lock poisoned");
            return;
        };
        st.persona = self.session.persona().map(|p| p.as_str().to_string());
        st.emotion = self.session.current_emotion();
        st.stats = self.session.stats();
        st.notice = match update {
            SessionUpdate::Notice(msg) => Some(msg.clone()),
            _ => None,
        };
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::decode::encode_wav;
    use crate::config::AppConfig;
    use crate::emotion::{EmotionLabel, EmotionSource};
    use crate::llm::client::tests::CannedClient;
    use crate::llm::LlmResponder;
    use crate::pipeline::state::{new_shared_status, TurnPhase};
    use crate::session::Collaborators;
    use crate::stt::{MockRecognizer, RecognitionError};
    use std::sync::Arc;

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    fn make_runner(
        client: CannedClient,
        recognizer: MockRecognizer,
    ) -> (SessionRunner, SharedStatus) {
        let client = Arc::new(client);
        let config = AppConfig::default();
        let collaborators = Collaborators {
            chat: client.clone(),
            responder: Arc::new(LlmResponder::new(client, &config.llm)),
            recognizer: Arc::new(recognizer),
            emotion_model: None,
        };
        let status = new_shared_status();
        let session = ConversationSession::new(&config, collaborators).with_status(status.clone());
        (SessionRunner::new(session, Arc::clone(&status)), status)
    }

    /// 0.5 s silence then 1 s of tone at 16 kHz.
    fn spoken_wav() -> Vec<u8> {
        let mut samples = vec![0.0_f32; 8_000];
        samples.extend(
            (0..16_000)
                .map(|i| 0.3 * (2.0 * std::f32::consts::PI * 220.0 * i as f32 / 16_000.0).sin()),
        );
        encode_wav(&samples, 16_000, 1)
    }

    async fn run_all(runner: SessionRunner, events: Vec<SessionEvent>) -> Vec<SessionUpdate> {
        let (tx, rx) = mpsc::channel(16);
        let (update_tx, mut update_rx) = mpsc::channel(16);
        for event in events {
            tx.send(event).await.unwrap();
        }
        drop(tx);

        runner.run(rx, update_tx).await;

        let mut updates = Vec::new();
        while let Some(update) = update_rx.recv().await {
            updates.push(update);
        }
        updates
    }

    // -----------------------------------------------------------------------
    // Tests
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn select_persona_then_text_turn() {
        let client = CannedClient::new("Sad", "That sounds hard.");
        let (runner, status) = make_runner(client, MockRecognizer::new());

        let updates = run_all(
            runner,
            vec![
                SessionEvent::SelectPersona("companion".into()),
                SessionEvent::Text("I lost my job today".into()),
            ],
        )
        .await;

        assert_eq!(updates.len(), 2);
        assert!(matches!(
            &updates[0],
            SessionUpdate::Persona { fresh: true, greeting: Some(_), .. }
        ));
        let SessionUpdate::Turn(summary) = &updates[1] else {
            panic!("expected turn, got {:?}", updates[1]);
        };
        assert_eq!(summary.emotion.label, EmotionLabel::Sad);
        assert_eq!(summary.reply, "That sounds hard.");

        let st = status.lock().unwrap();
        assert_eq!(st.phase, TurnPhase::Idle);
        assert_eq!(st.persona.as_deref(), Some("companion"));
        assert_eq!(st.stats.total, 1);
        assert_eq!(st.stats.negative, 1);
        assert_eq!(st.emotion.map(|e| e.label), Some(EmotionLabel::Sad));
        assert!(st.notice.is_none());
    }

    #[tokio::test]
    async fn text_before_persona_is_a_notice() {
        let (runner, status) = make_runner(CannedClient::new("Happy", "ok"), MockRecognizer::new());

        let updates = run_all(runner, vec![SessionEvent::Text("hello".into())]).await;

        assert!(matches!(&updates[0], SessionUpdate::Notice(_)));
        let st = status.lock().unwrap();
        assert!(st.persona.is_none());
        assert!(st.notice.is_some());
    }

    #[tokio::test]
    async fn redelivered_text_is_reported_as_duplicate() {
        let client = CannedClient::new("Happy", "Nice!");
        let (runner, status) = make_runner(client, MockRecognizer::new());

        let updates = run_all(
            runner,
            vec![
                SessionEvent::SelectPersona("companion".into()),
                SessionEvent::Text("great news".into()),
                SessionEvent::Text("great news".into()),
                SessionEvent::Stats,
            ],
        )
        .await;

        assert!(matches!(updates[2], SessionUpdate::Duplicate));
        assert_eq!(
            updates[3],
            SessionUpdate::Stats(ConversationStats {
                total: 1,
                positive: 1,
                negative: 0
            })
        );
        assert_eq!(status.lock().unwrap().stats.total, 1);
    }

    #[tokio::test]
    async fn audio_bytes_turn() {
        let recognizer = MockRecognizer::new()
            .with("ko-KR", Err(RecognitionError::NotUnderstood))
            .with("en-US", Ok("hello"));
        let (runner, _status) = make_runner(CannedClient::new("Neutral", "Hi there."), recognizer);

        let updates = run_all(
            runner,
            vec![
                SessionEvent::SelectPersona("companion".into()),
                SessionEvent::Audio(AudioInput::Bytes(spoken_wav())),
            ],
        )
        .await;

        let SessionUpdate::Turn(summary) = &updates[1] else {
            panic!("expected turn, got {:?}", updates[1]);
        };
        assert_eq!(summary.user_text, "hello");
        assert_eq!(summary.language.as_deref(), Some("en-US"));
        assert_eq!(summary.emotion.source, EmotionSource::Text);
    }

    #[tokio::test]
    async fn audio_file_turn_and_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.wav");
        std::fs::write(&path, spoken_wav()).unwrap();

        let recognizer = MockRecognizer::new().with("ko-KR", Ok("안녕하세요"));
        let (runner, status) = make_runner(CannedClient::new("Happy", "반가워요"), recognizer);

        let updates = run_all(
            runner,
            vec![
                SessionEvent::SelectPersona("companion".into()),
                SessionEvent::Audio(AudioInput::File(path)),
                SessionEvent::Audio(AudioInput::File(dir.path().join("missing.wav"))),
            ],
        )
        .await;

        assert!(matches!(&updates[1], SessionUpdate::Turn(s) if s.user_text == "안녕하세요"));
        assert!(matches!(&updates[2], SessionUpdate::Notice(_)));

        let st = status.lock().unwrap();
        assert_eq!(st.stats.total, 1);
        assert!(st.notice.is_some());
    }

    #[tokio::test]
    async fn failed_turn_sets_notice_then_success_clears_it() {
        let (runner, status) = make_runner(CannedClient::new("Happy", "ok"), MockRecognizer::new());

        let updates = run_all(
            runner,
            vec![
                SessionEvent::SelectPersona("companion".into()),
                SessionEvent::Audio(AudioInput::Bytes(Vec::new())),
            ],
        )
        .await;
        assert!(matches!(&updates[1], SessionUpdate::Notice(_)));
        assert!(status.lock().unwrap().notice.is_some());

        let (mut runner, status) =
            make_runner(CannedClient::new("Happy", "ok"), MockRecognizer::new());
        let update = runner
            .handle(SessionEvent::SelectPersona("companion".into()))
            .await;
        runner.publish(&update);
        runner.publish(&SessionUpdate::Notice("x".into()));
        let update = runner.handle(SessionEvent::Text("great".into())).await;
        runner.publish(&update);
        assert!(status.lock().unwrap().notice.is_none());
    }

    #[tokio::test]
    async fn leave_and_reset() {
        let (runner, status) = make_runner(CannedClient::new("Happy", "ok"), MockRecognizer::new());

        let updates = run_all(
            runner,
            vec![
                SessionEvent::SelectPersona("companion".into()),
                SessionEvent::Leave,
                SessionEvent::Leave,
                SessionEvent::SelectPersona("mentor".into()),
                SessionEvent::Reset,
            ],
        )
        .await;

        assert_eq!(updates[1], SessionUpdate::Left);
        assert!(matches!(&updates[2], SessionUpdate::Notice(m) if m.contains("leave")));
        assert!(matches!(&updates[3], SessionUpdate::Persona { fresh: true, .. }));
        assert_eq!(updates[4], SessionUpdate::Reset);

        let st = status.lock().unwrap();
        assert!(st.persona.is_none());
        assert!(st.emotion.is_none());
        assert_eq!(st.stats, ConversationStats::default());
    }

    #[tokio::test]
    async fn reselecting_same_persona_keeps_conversation() {
        let (mut runner, _status) =
            make_runner(CannedClient::new("Happy", "ok"), MockRecognizer::new());

        runner
            .handle(SessionEvent::SelectPersona("companion".into()))
            .await;
        runner.handle(SessionEvent::Text("great".into())).await;
        let update = runner
            .handle(SessionEvent::SelectPersona("companion".into()))
            .await;

        assert!(matches!(
            update,
            SessionUpdate::Persona { fresh: false, greeting: None, .. }
        ));
        assert_eq!(runner.session().stats().total, 1);
    }
}
