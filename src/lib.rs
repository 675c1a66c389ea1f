//! Emotion-aware conversational sessions.
//!
//! Text or recorded speech goes in; the session labels the speaker's emotion,
//! asks a language model for a persona reply and keeps per-conversation
//! history and statistics.

pub mod audio;
pub mod config;
pub mod emotion;
pub mod llm;
pub mod pipeline;
pub mod session;
pub mod stt;
