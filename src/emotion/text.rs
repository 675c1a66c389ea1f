//! Language-model emotion classification for free text.

use std::sync::Arc;

use crate::llm::{ChatClient, ChatRequest, PromptBuilder};

use super::label::{EmotionLabel, EmotionPolicy};

/// Upper bound on reply tokens; a label is one word.
const LABEL_MAX_TOKENS: u32 = 8;

/// Asks the chat model for exactly one label.
///
/// Never fails: an unreachable model, an empty reply or a reply outside the
/// label set all yield the policy's default label.
pub struct TextEmotionClassifier {
    client: Arc<dyn ChatClient>,
    prompts: PromptBuilder,
    policy: EmotionPolicy,
}

impl TextEmotionClassifier {
    pub fn new(client: Arc<dyn ChatClient>, policy: EmotionPolicy) -> Self {
        Self {
            client,
            prompts: PromptBuilder::new(),
            policy,
        }
    }

    pub async fn classify(&self, text: &str) -> EmotionLabel {
        let (system, user) = self.prompts.emotion_chat(text);
        let request = ChatRequest::new(system, user)
            .temperature(0.0)
            .max_tokens(LABEL_MAX_TOKENS);

        match self.client.complete(request).await {
            Ok(reply) => {
                let parsed = EmotionLabel::parse_reply(&reply);
                if parsed.is_none() {
                    log::warn!(
                        "emotion: reply {reply:?} is not a known label, using {}",
                        self.policy.default_label
                    );
                }
                self.policy.coerce(parsed)
            }
            Err(e) => {
                log::warn!(
                    "emotion: text classification failed ({e}), using {}",
                    self.policy.default_label
                );
                self.policy.default_label
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::client::tests::CannedClient;

    fn classifier(client: CannedClient) -> TextEmotionClassifier {
        TextEmotionClassifier::new(Arc::new(client), EmotionPolicy::default())
    }

    #[tokio::test]
    async fn parses_exact_label() {
        let c = classifier(CannedClient::new("Sad", ""));
        assert_eq!(c.classify("I lost my job today").await, EmotionLabel::Sad);
    }

    #[tokio::test]
    async fn tolerates_case_quotes_and_period() {
        let c = classifier(CannedClient::new("  \"happy.\"\n", ""));
        assert_eq!(c.classify("great news").await, EmotionLabel::Happy);
    }

    #[tokio::test]
    async fn unknown_reply_is_default() {
        let c = classifier(CannedClient::new("Excited", ""));
        assert_eq!(c.classify("we won!").await, EmotionLabel::Neutral);
    }

    #[tokio::test]
    async fn collaborator_failure_is_default() {
        let c = classifier(CannedClient::failing());
        assert_eq!(c.classify("anything").await, EmotionLabel::Neutral);
    }

    #[tokio::test]
    async fn classification_runs_deterministically() {
        let client = Arc::new(CannedClient::new("Fear", ""));
        let c = TextEmotionClassifier::new(client.clone(), EmotionPolicy::default());
        c.classify("there is someone outside").await;

        let requests = client.requests.lock().unwrap();
        assert_eq!(requests[0].temperature, 0.0);
        assert!(requests[0].user.contains("there is someone outside"));
    }

    #[tokio::test]
    async fn custom_default_label_is_used() {
        let policy = EmotionPolicy {
            default_label: EmotionLabel::Happy,
            ..EmotionPolicy::default()
        };
        let c = TextEmotionClassifier::new(Arc::new(CannedClient::new("meh", "")), policy);
        assert_eq!(c.classify("whatever").await, EmotionLabel::Happy);
    }
}
