//! LLM Provider abstraction
//!
//! The orchestration loop talks to the model through two seams:
//! - [`LlmProvider`] starts a conversation seeded with history, tool
//!   declarations and a system instruction
//! - [`ChatSession`] sends the next user message or batch of tool results
//!   and returns the model's reply
//!
//! [`GenAIProvider`] implements both on top of the genai framework, which
//! covers OpenAI, Anthropic, Gemini, Groq, DeepSeek, xAI, Ollama and others.

mod genai_provider;
mod logging;

pub use genai_provider::{create_provider_from_config, GenAIProvider, ProviderType};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;
use crate::session::Turn;
use crate::tools::ToolDefinition;

/// A tool invocation requested by the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    /// Provider-assigned id tying the result back to this call
    pub call_id: String,
    pub name: String,
    pub args: Value,
}

/// Outcome of one tool invocation, reported back to the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionResponse {
    pub call_id: String,
    pub name: String,
    /// `{"result": ...}` on success, `{"error": "..."}` on failure
    pub response: Value,
}

impl FunctionResponse {
    pub fn success(call: &FunctionCall, result: Value) -> Self {
        Self {
            call_id: call.call_id.clone(),
            name: call.name.clone(),
            response: serde_json::json!({ "result": result }),
        }
    }

    pub fn failure(call: &FunctionCall, message: impl Into<String>) -> Self {
        Self {
            call_id: call.call_id.clone(),
            name: call.name.clone(),
            response: serde_json::json!({ "error": message.into() }),
        }
    }

    pub fn is_error(&self) -> bool {
        self.response.get("error").is_some()
    }
}

/// Model reply to one send
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelResponse {
    pub text: Option<String>,
    /// Empty when the model requests no tool use
    pub function_calls: Vec<FunctionCall>,
}

impl ModelResponse {
    pub fn text(&self) -> &str {
        self.text.as_deref().unwrap_or_default()
    }

    pub fn has_function_calls(&self) -> bool {
        !self.function_calls.is_empty()
    }
}

/// Message sent to an open chat
#[derive(Debug, Clone, PartialEq)]
pub enum ChatInput {
    Text(String),
    FunctionResponses(Vec<FunctionResponse>),
}

/// Everything needed to open a chat
#[derive(Debug, Clone, Default)]
pub struct ChatConfig {
    /// Prior turns, oldest first; expected to alternate user/model
    pub history: Vec<Turn>,
    pub tools: Vec<ToolDefinition>,
    pub system_instruction: Option<String>,
}

/// An open, stateful conversation with the model
#[async_trait]
pub trait ChatSession: Send {
    async fn send(&mut self, input: ChatInput) -> Result<ModelResponse>;
}

/// Factory for chats with a specific model
pub trait LlmProvider: Send + Sync {
    /// Provider name (e.g., "openai", "gemini")
    fn name(&self) -> &str;

    fn start_chat(&self, config: ChatConfig) -> Box<dyn ChatSession>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn call() -> FunctionCall {
        FunctionCall {
            call_id: "call_1".to_string(),
            name: "listMessages".to_string(),
            args: json!({}),
        }
    }

    #[test]
    fn test_function_response_payloads() {
        let ok = FunctionResponse::success(&call(), json!([1, 2, 3]));
        assert_eq!(ok.response, json!({ "result": [1, 2, 3] }));
        assert!(!ok.is_error());

        let err = FunctionResponse::failure(&call(), "mailbox locked");
        assert_eq!(err.response, json!({ "error": "mailbox locked" }));
        assert_eq!(err.name, "listMessages");
        assert!(err.is_error());
    }

    #[test]
    fn test_model_response_text_defaults_empty() {
        let response = ModelResponse::default();
        assert_eq!(response.text(), "");
        assert!(!response.has_function_calls());
    }
}
