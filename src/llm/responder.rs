//! Response generation seam.
//!
//! The session only needs "text in, reply out"; [`LlmResponder`] fulfils that
//! with the shared [`ChatClient`].

use std::sync::Arc;

use async_trait::async_trait;

use super::client::{ChatClient, ChatRequest, LlmError};
use super::prompt::PromptBuilder;
use crate::config::LlmConfig;
use crate::emotion::EmotionLabel;

/// Produces the assistant reply for one user turn.
#[async_trait]
pub trait ResponseGenerator: Send + Sync {
    async fn respond(
        &self,
        text: &str,
        persona: &str,
        emotion: EmotionLabel,
    ) -> Result<String, LlmError>;
}

/// Persona-scoped replies from an OpenAI-compatible model.
pub struct LlmResponder {
    client: Arc<dyn ChatClient>,
    prompts: PromptBuilder,
    temperature: f32,
    max_tokens: u32,
}

impl LlmResponder {
    pub fn new(client: Arc<dyn ChatClient>, config: &LlmConfig) -> Self {
        Self {
            client,
            prompts: PromptBuilder::new(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        }
    }
}

#[async_trait]
impl ResponseGenerator for LlmResponder {
    async fn respond(
        &self,
        text: &str,
        persona: &str,
        emotion: EmotionLabel,
    ) -> Result<String, LlmError> {
        let (system, user) = self.prompts.reply_chat(text, persona, emotion);
        let request = ChatRequest::new(system, user)
            .temperature(self.temperature)
            .max_tokens(self.max_tokens);
        self.client.complete(request).await
    }
}
