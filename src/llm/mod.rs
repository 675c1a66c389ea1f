//! Language-model access for emotion extraction and replies.
//!
//! This module provides:
//! * [`ChatClient`] — async trait for one chat completion.
//! * [`ApiChatClient`] — OpenAI-compatible REST client.
//! * [`PromptBuilder`] — emotion-extraction and persona-reply prompts.
//! * [`ResponseGenerator`] / [`LlmResponder`] — assistant replies.
//! * [`LlmError`] — error variants for LLM operations.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use emotion_chat::config::AppConfig;
//! use emotion_chat::emotion::EmotionLabel;
//! use emotion_chat::llm::{ApiChatClient, LlmResponder, ResponseGenerator};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = AppConfig::default();
//!     let client = Arc::new(ApiChatClient::from_config(&config.llm));
//!     let responder = LlmResponder::new(client, &config.llm);
//!
//!     let reply = responder
//!         .respond("I lost my job today", "companion", EmotionLabel::Sad)
//!         .await
//!         .unwrap();
//!     println!("{reply}");
//! }
//! ```

pub mod client;
pub mod prompt;
pub mod responder;

pub use client::{ApiChatClient, ChatClient, ChatRequest, LlmError};
pub use prompt::PromptBuilder;
pub use responder::{LlmResponder, ResponseGenerator};
