//! genai-backed provider
//!
//! genai is stateless: every call carries the full `ChatRequest`. A
//! [`GenAIChat`] keeps that request and appends the user messages, model
//! replies, tool calls and tool responses as the conversation advances.

use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use genai::chat::{
    ChatMessage, ChatOptions, ChatRequest, ChatStreamEvent, ChatStreamResponse, Tool, ToolCall, ToolResponse,
};
use genai::resolver::{AuthData, AuthResolver};
use genai::{Client, WebConfig};
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use super::logging::{log_llm_interaction, LogConfig};
use super::{ChatConfig, ChatInput, ChatSession, FunctionCall, LlmProvider, ModelResponse};
use crate::config::ProviderConfig;
use crate::error::{Error, Result};
use crate::session::Role;

/// Whole-request deadline; tool-heavy answers can stream for minutes
const REQUEST_TIMEOUT: Duration = Duration::from_secs(300);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Model backends reachable through genai
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderType {
    Gemini,
    OpenAI,
    Anthropic,
    Cohere,
    Groq,
    /// Grok models
    XAI,
    DeepSeek,
    /// Local models; no key required
    Ollama,
}

impl ProviderType {
    pub const ALL: [ProviderType; 8] = [
        Self::Gemini,
        Self::OpenAI,
        Self::Anthropic,
        Self::Cohere,
        Self::Groq,
        Self::XAI,
        Self::DeepSeek,
        Self::Ollama,
    ];

    /// genai adapter name, also the config spelling
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Gemini => "gemini",
            Self::OpenAI => "openai",
            Self::Anthropic => "anthropic",
            Self::Cohere => "cohere",
            Self::Groq => "groq",
            Self::XAI => "xai",
            Self::DeepSeek => "deepseek",
            Self::Ollama => "ollama",
        }
    }

    /// Model used when the config leaves `model` empty
    pub fn default_model(self) -> &'static str {
        match self {
            Self::Gemini => "gemini-2.0-flash",
            Self::OpenAI => "gpt-4o",
            Self::Anthropic => "claude-sonnet-4-20250514",
            Self::Cohere => "command-r-plus",
            Self::Groq => "llama-3.3-70b-versatile",
            Self::XAI => "grok-3",
            Self::DeepSeek => "deepseek-chat",
            Self::Ollama => "llama3.2",
        }
    }

    /// Model name as genai resolves it: `<adapter>::<model>`
    fn qualify_model(self, model: &str) -> String {
        if model.contains("::") {
            model.to_string()
        } else {
            format!("{}::{}", self.as_str(), model)
        }
    }
}

impl std::fmt::Display for ProviderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ProviderType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let name = s.trim().to_ascii_lowercase();
        let name = match name.as_str() {
            "google" => "gemini",
            "grok" => "xai",
            other => other,
        };
        Self::ALL
            .into_iter()
            .find(|p| p.as_str() == name)
            .ok_or_else(|| format!("Unsupported provider '{}'", s))
    }
}

/// [`LlmProvider`] over a genai [`Client`]
pub struct GenAIProvider {
    client: Client,
    provider_type: ProviderType,
    model: String,
    options: ChatOptions,
}

impl GenAIProvider {
    /// Provider whose key genai resolves from the backend's environment variable
    pub fn new(provider_type: ProviderType, model: Option<&str>) -> Self {
        Self::build(provider_type, model, None)
    }

    /// Provider that always authenticates with `api_key`
    pub fn with_api_key(provider_type: ProviderType, api_key: &str, model: Option<&str>) -> Self {
        Self::build(provider_type, model, Some(api_key.to_string()))
    }

    fn build(provider_type: ProviderType, model: Option<&str>, api_key: Option<String>) -> Self {
        let web_config = WebConfig::default()
            .with_timeout(REQUEST_TIMEOUT)
            .with_connect_timeout(CONNECT_TIMEOUT);
        let mut builder = Client::builder().with_web_config(web_config);

        if let Some(key) = api_key {
            builder = builder.with_auth_resolver(AuthResolver::from_resolver_fn(
                move |_| -> std::result::Result<Option<AuthData>, genai::resolver::Error> {
                    Ok(Some(AuthData::from_single(key.clone())))
                },
            ));
        }

        Self {
            client: builder.build(),
            provider_type,
            model: model
                .filter(|m| !m.is_empty())
                .unwrap_or(provider_type.default_model())
                .to_string(),
            options: ChatOptions::default(),
        }
    }

    /// Set sampling temperature and output token cap
    pub fn with_sampling(mut self, temperature: f64, max_tokens: u32) -> Self {
        self.options = ChatOptions::default()
            .with_temperature(temperature)
            .with_max_tokens(max_tokens);
        self
    }

    pub fn provider_type(&self) -> ProviderType {
        self.provider_type
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

impl LlmProvider for GenAIProvider {
    fn name(&self) -> &str {
        self.provider_type.as_str()
    }

    fn start_chat(&self, config: ChatConfig) -> Box<dyn ChatSession> {
        let mut request = ChatRequest::default();

        if let Some(system) = &config.system_instruction {
            request = request.with_system(system.as_str());
        }

        for turn in &config.history {
            request = match turn.role {
                Role::User => request.append_message(ChatMessage::user(turn.text.as_str())),
                Role::Model => request.append_message(ChatMessage::assistant(turn.text.as_str())),
                Role::Tool | Role::System => request,
            };
        }

        let tool_count = config.tools.len();
        if tool_count > 0 {
            let tools: Vec<Tool> = config
                .tools
                .into_iter()
                .map(|t| {
                    Tool::new(t.name)
                        .with_description(t.description)
                        .with_schema(t.parameters)
                })
                .collect();
            request = request.with_tools(tools);
        }

        Box::new(GenAIChat {
            client: self.client.clone(),
            model: self.provider_type.qualify_model(&self.model),
            options: self.options.clone(),
            request,
            tool_count,
        })
    }
}

/// An open conversation holding the accumulated genai request
struct GenAIChat {
    client: Client,
    model: String,
    options: ChatOptions,
    request: ChatRequest,
    tool_count: usize,
}

/// Streamed reply with the raw tool calls kept for the follow-up request
struct StreamedReply {
    content: String,
    tool_calls: Vec<ToolCall>,
}

impl StreamedReply {
    /// Drain a response stream; each tool-call event carries a complete call
    async fn collect(response: ChatStreamResponse, model: &str) -> Result<Self> {
        let mut reply = Self {
            content: String::new(),
            tool_calls: Vec::new(),
        };
        let mut events = response.stream;

        while let Some(event) = events.next().await {
            match event {
                Ok(ChatStreamEvent::Chunk(chunk)) => reply.content.push_str(&chunk.content),
                Ok(ChatStreamEvent::ToolCallChunk(chunk)) => reply.tool_calls.push(chunk.tool_call),
                Ok(ChatStreamEvent::End(_)) => break,
                Ok(_) => {}
                Err(e) => {
                    error!(error = ?e, model = %model, "LLM stream interrupted");
                    return Err(Error::Provider(format!("stream from {} failed: {}", model, e)));
                }
            }
        }

        Ok(reply)
    }
}

impl GenAIChat {
    fn append(&mut self, message: impl Into<ChatMessage>) {
        let request = std::mem::take(&mut self.request);
        self.request = request.append_message(message);
    }

    /// Streaming keeps long generations clear of the request timeout
    async fn execute(&self) -> Result<StreamedReply> {
        let response = self
            .client
            .exec_chat_stream(&self.model, self.request.clone(), Some(&self.options))
            .await
            .map_err(|e| {
                error!(error = ?e, model = %self.model, "LLM request failed");
                Error::Provider(format!("request to {} failed: {}", self.model, e))
            })?;

        StreamedReply::collect(response, &self.model).await
    }
}

#[async_trait]
impl ChatSession for GenAIChat {
    async fn send(&mut self, input: ChatInput) -> Result<ModelResponse> {
        match &input {
            ChatInput::Text(text) => self.append(ChatMessage::user(text.as_str())),
            ChatInput::FunctionResponses(responses) => {
                for response in responses {
                    let content = serde_json::to_string(&response.response)?;
                    self.append(ToolResponse::new(response.call_id.clone(), content));
                }
            }
        }

        let reply = self.execute().await.inspect_err(|e| {
            log_llm_interaction(LogConfig {
                model: &self.model,
                input: &input,
                tool_count: self.tool_count,
                result: None,
                error: Some(&e.to_string()),
            });
        })?;

        let response = ModelResponse {
            text: if reply.content.is_empty() {
                None
            } else {
                Some(reply.content.clone())
            },
            function_calls: reply
                .tool_calls
                .iter()
                .map(|tc| FunctionCall {
                    call_id: tc.call_id.clone(),
                    name: tc.fn_name.clone(),
                    args: tc.fn_arguments.clone(),
                })
                .collect(),
        };

        // Keep the model's turn so the next send continues the same conversation.
        // A turn with tool calls is replayed as the calls alone; its text is dropped.
        if !reply.tool_calls.is_empty() {
            self.append(reply.tool_calls);
        } else if !reply.content.is_empty() {
            self.append(ChatMessage::assistant(reply.content));
        }

        debug!(
            model = %self.model,
            function_calls = response.function_calls.len(),
            "LLM response received"
        );
        log_llm_interaction(LogConfig {
            model: &self.model,
            input: &input,
            tool_count: self.tool_count,
            result: Some(&response),
            error: None,
        });

        Ok(response)
    }
}

/// Build the provider described by `[provider]`
pub fn create_provider_from_config(config: &ProviderConfig) -> Result<GenAIProvider> {
    let provider_type: ProviderType = config.provider_type.parse().map_err(Error::Config)?;
    let model = (!config.model.is_empty()).then_some(config.model.as_str());

    let provider = match config.get_api_key() {
        Some(key) => GenAIProvider::with_api_key(provider_type, &key, model),
        None if provider_type == ProviderType::Ollama => GenAIProvider::new(provider_type, model),
        None => {
            return Err(Error::Config(format!(
                "No API key configured for provider '{}'",
                provider_type
            )));
        }
    };

    Ok(provider.with_sampling(config.temperature, config.max_tokens))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_type_parsing() {
        assert_eq!("Gemini".parse::<ProviderType>(), Ok(ProviderType::Gemini));
        assert_eq!("google".parse::<ProviderType>(), Ok(ProviderType::Gemini));
        assert_eq!("grok".parse::<ProviderType>(), Ok(ProviderType::XAI));
        assert!("nonsense".parse::<ProviderType>().is_err());
    }

    #[test]
    fn test_qualify_model() {
        assert_eq!(
            ProviderType::Gemini.qualify_model("gemini-2.0-flash"),
            "gemini::gemini-2.0-flash"
        );
        assert_eq!(
            ProviderType::Groq.qualify_model("openai::gpt-4o"),
            "openai::gpt-4o"
        );
    }

    #[test]
    fn test_create_provider_with_explicit_key() {
        let mut config = ProviderConfig::for_backend("openai");
        config.api_key = Some("sk-test".to_string());
        config.model = "gpt-4o-mini".to_string();

        let provider = create_provider_from_config(&config).unwrap();
        assert_eq!(provider.name(), "openai");
        assert_eq!(provider.model(), "gpt-4o-mini");
    }

    #[test]
    fn test_create_provider_unknown_type() {
        let mut config = ProviderConfig::for_backend("openai");
        config.provider_type = "carrier-pigeon".to_string();

        assert!(matches!(
            create_provider_from_config(&config),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_ollama_needs_no_key() {
        let config = ProviderConfig {
            provider_type: "ollama".to_string(),
            api_key: None,
            api_key_env: Some("CHATBRIDGE_TEST_NO_SUCH_KEY".to_string()),
            model: String::new(),
            max_tokens: 1024,
            temperature: 0.2,
        };

        let provider = create_provider_from_config(&config).unwrap();
        assert_eq!(provider.model(), "llama3.2");
    }
}
