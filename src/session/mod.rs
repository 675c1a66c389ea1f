//! Conversation sessions.
//!
//! * [`ConversationSession`] — lifecycle, history, statistics and turns.
//! * [`Lifecycle`] — `Uninitialized` / `Active(persona)` / `Discarded`.
//! * [`TurnError`] / [`SessionError`] — why a request did not apply.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use emotion_chat::config::AppConfig;
//! use emotion_chat::llm::{ApiChatClient, LlmResponder};
//! use emotion_chat::session::{Collaborators, ConversationSession, TurnOutcome};
//! use emotion_chat::stt::UnavailableRecognizer;
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = AppConfig::default();
//!     let chat = Arc::new(ApiChatClient::from_config(&config.llm));
//!     let mut session = ConversationSession::new(
//!         &config,
//!         Collaborators {
//!             chat: chat.clone(),
//!             responder: Arc::new(LlmResponder::new(chat, &config.llm)),
//!             recognizer: Arc::new(UnavailableRecognizer::new("no model")),
//!             emotion_model: None,
//!         },
//!     );
//!
//!     session.initialize("companion".into()).unwrap();
//!     if let TurnOutcome::Committed(turn) = session.apply_text_turn("I lost my job today").await {
//!         println!("[{}] {}", turn.emotion.label, turn.reply);
//!     }
//! }
//! ```

pub mod error;
pub mod lifecycle;
#[allow(clippy::module_inception)]
pub mod session;
pub mod state;

pub use error::{SessionError, TurnError};
pub use lifecycle::{Lifecycle, LifecycleAction};
pub use session::{Collaborators, ConversationSession, TurnOutcome, TurnSummary};
pub use state::{ConversationStats, InputMarker, Message, PersonaId, Role, SessionState};
