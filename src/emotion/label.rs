//! The closed emotion label set and the policy that surrounds it.
//!
//! [`EmotionLabel`] is the only emotion vocabulary the pipeline knows.  Every
//! classifier output is funnelled through [`EmotionPolicy::coerce`] so that a
//! value outside the set can never reach the session.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ---------------------------------------------------------------------------
// EmotionLabel
// ---------------------------------------------------------------------------

/// One of the six emotions the classifiers are allowed to report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EmotionLabel {
    Anger,
    Disgust,
    Fear,
    Happy,
    Neutral,
    Sad,
}

/// Returned by [`EmotionLabel::from_str`] for text outside the label set.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("unknown emotion label: {0:?}")]
pub struct UnknownLabel(pub String);

impl EmotionLabel {
    /// Every label, in the order used by the default index table.
    pub const ALL: [EmotionLabel; 6] = [
        EmotionLabel::Anger,
        EmotionLabel::Disgust,
        EmotionLabel::Fear,
        EmotionLabel::Happy,
        EmotionLabel::Neutral,
        EmotionLabel::Sad,
    ];

    /// Canonical spelling, as the language model is asked to reply.
    pub fn as_str(&self) -> &'static str {
        match self {
            EmotionLabel::Anger => "Anger",
            EmotionLabel::Disgust => "Disgust",
            EmotionLabel::Fear => "Fear",
            EmotionLabel::Happy => "Happy",
            EmotionLabel::Neutral => "Neutral",
            EmotionLabel::Sad => "Sad",
        }
    }

    /// Parse a free-form model reply.
    ///
    /// Surrounding whitespace, quotes and a trailing period are ignored and
    /// the comparison is case-insensitive, so `" \"sad.\" "` parses as
    /// [`EmotionLabel::Sad`].  Anything else is `None`.
    ///
    /// ```
    /// use emotion_chat::emotion::EmotionLabel;
    ///
    /// assert_eq!(EmotionLabel::parse_reply("  Happy\n"), Some(EmotionLabel::Happy));
    /// assert_eq!(EmotionLabel::parse_reply("Excited"), None);
    /// ```
    pub fn parse_reply(raw: &str) -> Option<Self> {
        let cleaned = raw
            .trim()
            .trim_matches(|c: char| c == '"' || c == '\'' || c == '.' || c == '`')
            .trim();
        cleaned.parse().ok()
    }
}

impl fmt::Display for EmotionLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EmotionLabel {
    type Err = UnknownLabel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EmotionLabel::ALL
            .iter()
            .copied()
            .find(|label| label.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownLabel(s.to_string()))
    }
}

// ---------------------------------------------------------------------------
// DetectedEmotion
// ---------------------------------------------------------------------------

/// Which detector produced an emotion value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EmotionSource {
    /// Seeded by session initialisation; no input has been analysed yet.
    Initial,
    /// Language-model classification of typed text or a transcript.
    Text,
    /// Audio classifier run on the normalised waveform.
    Audio,
}

/// An emotion label together with the detector that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectedEmotion {
    pub label: EmotionLabel,
    pub source: EmotionSource,
}

impl DetectedEmotion {
    pub fn new(label: EmotionLabel, source: EmotionSource) -> Self {
        Self { label, source }
    }
}

// ---------------------------------------------------------------------------
// LabelTable
// ---------------------------------------------------------------------------

/// Maps classifier output indices to labels.
///
/// Index `i` of the model's score vector corresponds to `labels[i]`.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelTable {
    labels: Vec<EmotionLabel>,
}

impl LabelTable {
    pub fn new(labels: Vec<EmotionLabel>) -> Self {
        Self { labels }
    }

    /// Label for `index`, or `None` when the table has no entry for it.
    pub fn lookup(&self, index: usize) -> Option<EmotionLabel> {
        self.labels.get(index).copied()
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

impl Default for LabelTable {
    fn default() -> Self {
        Self::new(EmotionLabel::ALL.to_vec())
    }
}

// ---------------------------------------------------------------------------
// EmotionPolicy
// ---------------------------------------------------------------------------

/// How a label counts toward conversation statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Polarity {
    Positive,
    Negative,
    /// Counted in `total` only.
    Neither,
}

/// Default label plus the positive/negative partitions used for statistics.
///
/// The two sets are expected to be disjoint; `AppConfig::validate` enforces
/// this for configured policies.
#[derive(Debug, Clone, PartialEq)]
pub struct EmotionPolicy {
    pub default_label: EmotionLabel,
    pub positive: Vec<EmotionLabel>,
    pub negative: Vec<EmotionLabel>,
}

impl Default for EmotionPolicy {
    fn default() -> Self {
        Self {
            default_label: EmotionLabel::Neutral,
            positive: vec![EmotionLabel::Happy],
            negative: vec![
                EmotionLabel::Anger,
                EmotionLabel::Disgust,
                EmotionLabel::Fear,
                EmotionLabel::Sad,
            ],
        }
    }
}

impl EmotionPolicy {
    /// Substitute the default label for a missing classifier output.
    pub fn coerce(&self, label: Option<EmotionLabel>) -> EmotionLabel {
        label.unwrap_or(self.default_label)
    }

    pub fn polarity(&self, label: EmotionLabel) -> Polarity {
        if self.positive.contains(&label) {
            Polarity::Positive
        } else if self.negative.contains(&label) {
            Polarity::Negative
        } else {
            Polarity::Neither
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
