//! Prompt builder for emotion extraction and persona replies.
//!
//! [`PromptBuilder`] constructs `(system_msg, user_msg)` pairs for any
//! OpenAI-compatible `/v1/chat/completions` endpoint:
//! * **Emotion** (`emotion_chat`) — a constrained instruction that allows
//!   exactly one label from the closed set as the entire reply.
//! * **Reply** (`reply_chat`) — persona-scoped conversational answer that is
//!   told the user's detected emotion.

use crate::emotion::EmotionLabel;

// ---------------------------------------------------------------------------
// System instructions
// ---------------------------------------------------------------------------

const EMOTION_INSTRUCTION: &str = "\
You are an emotion classifier for short conversational messages.
Task: Decide which single emotion the speaker expresses.

Rules:
1. Answer with exactly one word from this list: {labels}.
2. Do not add punctuation, quotes or explanation.
3. If no emotion is clearly expressed, answer Neutral.
4. The message may be in any language; answer in English.";

const EMOTION_EXAMPLES: &str = "
Examples:
Message: \"I finally got the offer, I can't stop smiling\"
Emotion: Happy

Message: \"Why does nobody ever listen to me\"
Emotion: Anger

Message: \"I keep hearing noises downstairs\"
Emotion: Fear
";

const REPLY_INSTRUCTION: &str = "\
You are {persona}, a warm conversational companion.
The user's current emotion was detected as {emotion}.

Rules:
1. Reply in the language the user wrote in.
2. Acknowledge how the user seems to feel without naming the label mechanically.
3. Keep the reply to a few sentences.";

// ---------------------------------------------------------------------------
// PromptBuilder
// ---------------------------------------------------------------------------

/// Builds chat prompts for the two language-model tasks.
///
/// # Example
/// ```rust
/// use emotion_chat::llm::PromptBuilder;
///
/// let builder = PromptBuilder::new();
/// let (system, user) = builder.emotion_chat("I lost my job today");
/// assert!(system.contains("Sad"));
/// assert!(user.contains("I lost my job today"));
/// ```
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    labels: Vec<EmotionLabel>,
}

impl Default for PromptBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl PromptBuilder {
    /// Builder offering the full label set.
    pub fn new() -> Self {
        Self {
            labels: EmotionLabel::ALL.to_vec(),
        }
    }

    /// Build the emotion-extraction **(system_msg, user_msg)** pair.
    pub fn emotion_chat(&self, text: &str) -> (String, String) {
        let labels = self
            .labels
            .iter()
            .map(EmotionLabel::as_str)
            .collect::<Vec<_>>()
            .join(", ");
        let system_msg = EMOTION_INSTRUCTION.replace("{labels}", &labels);

        let mut user_msg = String::with_capacity(512);
        user_msg.push_str(EMOTION_EXAMPLES);
        user_msg.push_str(&format!("\nMessage: \"{}\"\nEmotion:", text.trim()));

        (system_msg, user_msg)
    }

    /// Build the persona reply **(system_msg, user_msg)** pair.
    pub fn reply_chat(&self, text: &str, persona: &str, emotion: EmotionLabel) -> (String, String) {
        let system_msg = REPLY_INSTRUCTION
            .replace("{persona}", persona)
            .replace("{emotion}", emotion.as_str());
        (system_msg, text.trim().to_string())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emotion_prompt_lists_every_label() {
        let (system, _) = PromptBuilder::new().emotion_chat("hello");
        for label in EmotionLabel::ALL {
            assert!(system.contains(label.as_str()), "missing {label}");
        }
        assert!(
            system.contains("exactly one word"),
            "system msg must require a single label"
        );
        assert!(system.contains("emotion classifier"));
    }

    #[test]
    fn emotion_prompt_includes_text_and_cue() {
        let (_, user) = PromptBuilder::new().emotion_chat("  I lost my job today \n");
        assert!(user.contains("Message: \"I lost my job today\""));
        assert!(user.trim_end().ends_with("Emotion:"));
        assert!(user.contains("Examples:"));
    }

    #[test]
    fn reply_prompt_names_persona_and_emotion() {
        let (system, user) =
            PromptBuilder::new().reply_chat("I lost my job today", "companion", EmotionLabel::Sad);
        assert!(system.contains("You are companion"));
        assert!(system.contains("detected as Sad"));
        assert_eq!(user, "I lost my job today");
    }
}
