//! Core `ChatClient` trait and `ApiChatClient` implementation.
//!
//! `ApiChatClient` calls any OpenAI-compatible `/v1/chat/completions` endpoint
//! — Ollama (OpenAI mode), OpenAI, Groq, LM Studio, vLLM, etc.
//! All connection details come from [`LlmConfig`]; nothing is hardcoded.

use async_trait::async_trait;
use thiserror::Error;

use crate::config::LlmConfig;

// ---------------------------------------------------------------------------
// LlmError
// ---------------------------------------------------------------------------

/// Errors that can occur while talking to the language model.
#[derive(Debug, Error)]
pub enum LlmError {
    /// HTTP transport or connection error.
    #[error("HTTP request failed: {0}")]
    Request(String),

    /// The request did not complete within the configured timeout.
    #[error("LLM request timed out")]
    Timeout,

    /// The HTTP response could not be parsed as expected JSON.
    #[error("failed to parse LLM response: {0}")]
    Parse(String),

    /// The LLM returned a response with no usable text content.
    #[error("LLM returned an empty response")]
    EmptyResponse,
}

impl From<reqwest::Error> for LlmError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            LlmError::Timeout
        } else {
            LlmError::Request(e.to_string())
        }
    }
}

// ---------------------------------------------------------------------------
// ChatRequest
// ---------------------------------------------------------------------------

/// One system + user exchange.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    pub system: String,
    pub user: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl ChatRequest {
    pub fn new(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
            temperature: 0.0,
            max_tokens: 16,
        }
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

// ---------------------------------------------------------------------------
// ChatClient trait
// ---------------------------------------------------------------------------

/// Async trait for a single chat completion.
///
/// Implementors must be `Send + Sync` so they can be shared across tasks
/// (e.g. wrapped in `Arc<dyn ChatClient>`).
#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Returns the trimmed assistant reply; never an empty string.
    async fn complete(&self, request: ChatRequest) -> Result<String, LlmError>;
}

// ---------------------------------------------------------------------------
// ApiChatClient
// ---------------------------------------------------------------------------

/// Calls an OpenAI-compatible `/v1/chat/completions` endpoint.
///
/// # No hardcoded URLs
/// All connection details (`base_url`, `api_key`, `model`) come exclusively
/// from the [`LlmConfig`] passed to [`ApiChatClient::from_config`].
pub struct ApiChatClient {
    client: reqwest::Client,
    config: LlmConfig,
}

impl ApiChatClient {
    /// Build an `ApiChatClient` from application config.
    ///
    /// The HTTP client is pre-configured with the per-request timeout from
    /// `config.timeout_secs`.  A default (no-timeout) client is used if the
    /// builder fails.
    pub fn from_config(config: &LlmConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            config: config.clone(),
        }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1/chat/completions",
            self.config.base_url.trim_end_matches('/')
        )
    }
}

#[async_trait]
impl ChatClient for ApiChatClient {
    /// The `Authorization: Bearer …` header is attached **only** when
    /// `config.api_key` is `Some(key)` and `key` is non-empty — safe for
    /// Ollama and other local providers that require no authentication.
    async fn complete(&self, request: ChatRequest) -> Result<String, LlmError> {
        let body = serde_json::json!({
            "model":       self.config.model,
            "messages": [
                { "role": "system", "content": request.system },
                { "role": "user",   "content": request.user   }
            ],
            "stream":      false,
            "temperature": request.temperature,
            "max_tokens":  request.max_tokens
        });

        let mut req = self.client.post(self.endpoint()).json(&body);

        let key = self.config.api_key.as_deref().unwrap_or("");
        if !key.is_empty() {
            req = req.bearer_auth(key);
        }

        let response = req.send().await?.error_for_status()?;

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| LlmError::Parse(e.to_string()))?;

        extract_content(&json)
    }
}

/// Pull `choices[0].message.content` out of a completion response.
fn extract_content(json: &serde_json::Value) -> Result<String, LlmError> {
    let content = json["choices"][0]["message"]["content"]
        .as_str()
        .ok_or(LlmError::EmptyResponse)?
        .trim()
        .to_string();

    if content.is_empty() {
        return Err(LlmError::EmptyResponse);
    }

    Ok(content)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Replies by matching the system prompt; records every request.
    pub(crate) struct CannedClient {
        pub emotion_reply: Result<String, ()>,
        pub chat_reply: Result<String, ()>,
        pub requests: Mutex<Vec<ChatRequest>>,
    }

    impl CannedClient {
        pub(crate) fn new(emotion_reply: &str, chat_reply: &str) -> Self {
            Self {
                emotion_reply: Ok(emotion_reply.into()),
                chat_reply: Ok(chat_reply.into()),
                requests: Mutex::new(Vec::new()),
            }
        }

        pub(crate) fn failing() -> Self {
            Self {
                emotion_reply: Err(()),
                chat_reply: Err(()),
                requests: Mutex::new(Vec::new()),
            }
        }

        pub(crate) fn request_count(&self) -> usize {
            self.requests.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl ChatClient for CannedClient {
        async fn complete(&self, request: ChatRequest) -> Result<String, LlmError> {
            let is_emotion = request.system.contains("emotion classifier");
            self.requests.lock().unwrap().push(request);
            let reply = if is_emotion {
                &self.emotion_reply
            } else {
                &self.chat_reply
            };
            reply
                .clone()
                .map_err(|_| LlmError::Request("connection refused".into()))
        }
    }

    fn make_config(api_key: Option<&str>) -> LlmConfig {
        LlmConfig {
            base_url: "http://localhost:11434/".into(),
            api_key: api_key.map(|s| s.to_string()),
            ..LlmConfig::default()
        }
    }

    #[test]
    fn from_config_accepts_any_api_key() {
        let _ = ApiChatClient::from_config(&make_config(None));
        let _ = ApiChatClient::from_config(&make_config(Some("")));
        let _ = ApiChatClient::from_config(&make_config(Some("sk-test-1234")));
    }

    #[test]
    fn endpoint_drops_trailing_slash() {
        let client = ApiChatClient::from_config(&make_config(None));
        assert_eq!(
            client.endpoint(),
            "http://localhost:11434/v1/chat/completions"
        );
    }

    /// Verify that `ApiChatClient` is object-safe (usable as `dyn ChatClient`).
    #[test]
    fn client_is_object_safe() {
        let client: Box<dyn ChatClient> =
            Box::new(ApiChatClient::from_config(&make_config(None)));
        drop(client);
    }

    #[test]
    fn extracts_trimmed_content() {
        let json = serde_json::json!({
            "choices": [{ "message": { "content": "  Sad \n" } }]
        });
        assert_eq!(extract_content(&json).unwrap(), "Sad");
    }

    #[test]
    fn blank_content_is_empty_response() {
        let json = serde_json::json!({
            "choices": [{ "message": { "content": "   " } }]
        });
        assert!(matches!(
            extract_content(&json),
            Err(LlmError::EmptyResponse)
        ));
        assert!(matches!(
            extract_content(&serde_json::json!({})),
            Err(LlmError::EmptyResponse)
        ));
    }

    #[test]
    fn request_builder_sets_sampling() {
        let req = ChatRequest::new("sys", "user").temperature(0.7).max_tokens(256);
        assert_eq!(req.temperature, 0.7);
        assert_eq!(req.max_tokens, 256);
    }
}
