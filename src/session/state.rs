//! Conversation data: messages, statistics and the per-persona state.

use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::emotion::{DetectedEmotion, EmotionLabel, EmotionPolicy, EmotionSource, Polarity};

// ---------------------------------------------------------------------------
// PersonaId
// ---------------------------------------------------------------------------

/// Opaque persona identifier; the persona catalogue lives elsewhere.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PersonaId(String);

impl PersonaId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PersonaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PersonaId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

// ---------------------------------------------------------------------------
// Message
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One entry of the conversation history.  Never mutated after it is
/// appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    /// Set on user messages only.
    pub emotion: Option<DetectedEmotion>,
    pub timestamp: DateTime<Local>,
}

impl Message {
    pub fn user(content: impl Into<String>, emotion: DetectedEmotion) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            emotion: Some(emotion),
            timestamp: Local::now(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            emotion: None,
            timestamp: Local::now(),
        }
    }
}

// ---------------------------------------------------------------------------
// ConversationStats
// ---------------------------------------------------------------------------

/// Running counts over completed turns.
///
/// `positive + negative <= total` always holds: each turn adds one to
/// `total` and at most one to either partition.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationStats {
    pub total: u64,
    pub positive: u64,
    pub negative: u64,
}

impl ConversationStats {
    /// Statistics after one more completed turn labelled `label`.
    ///
    /// ```
    /// use emotion_chat::emotion::{EmotionLabel, EmotionPolicy};
    /// use emotion_chat::session::ConversationStats;
    ///
    /// let policy = EmotionPolicy::default();
    /// let stats = ConversationStats::default()
    ///     .record(EmotionLabel::Sad, &policy)
    ///     .record(EmotionLabel::Neutral, &policy);
    /// assert_eq!((stats.total, stats.positive, stats.negative), (2, 0, 1));
    /// ```
    #[must_use]
    pub fn record(self, label: EmotionLabel, policy: &EmotionPolicy) -> Self {
        let mut next = Self {
            total: self.total + 1,
            ..self
        };
        match policy.polarity(label) {
            Polarity::Positive => next.positive += 1,
            Polarity::Negative => next.negative += 1,
            Polarity::Neither => {}
        }
        next
    }

    /// Share of turns with a negative label, `0.0` before the first turn.
    pub fn negative_ratio(&self) -> f32 {
        if self.total == 0 {
            0.0
        } else {
            self.negative as f32 / self.total as f32
        }
    }
}

// ---------------------------------------------------------------------------
// InputMarker
// ---------------------------------------------------------------------------

/// Identity of the last committed input; guards against re-delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputMarker {
    Text(String),
    /// Digest of the raw audio bytes.
    Audio(u64),
}

impl InputMarker {
    pub fn text(text: &str) -> Self {
        Self::Text(text.trim().to_string())
    }

    pub fn audio(bytes: &[u8]) -> Self {
        let mut hasher = DefaultHasher::new();
        bytes.hash(&mut hasher);
        Self::Audio(hasher.finish())
    }
}

// ---------------------------------------------------------------------------
// SessionState
// ---------------------------------------------------------------------------

/// Everything that belongs to one persona's conversation.
#[derive(Debug, Clone)]
pub struct SessionState {
    pub persona: PersonaId,
    pub current_emotion: DetectedEmotion,
    pub messages: Vec<Message>,
    pub stats: ConversationStats,
    pub last_input: Option<InputMarker>,
}

impl SessionState {
    /// Fresh state: greeting only, zeroed statistics, default emotion.
    pub fn new(persona: PersonaId, greeting: &str, default_label: EmotionLabel) -> Self {
        Self {
            persona,
            current_emotion: DetectedEmotion::new(default_label, EmotionSource::Initial),
            messages: vec![Message::assistant(greeting)],
            stats: ConversationStats::default(),
            last_input: None,
        }
    }
}
