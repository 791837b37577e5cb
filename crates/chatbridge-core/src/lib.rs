//! Chatbridge Core - Tool-calling conversation bridge
//!
//! This crate provides the core of the bridge between a messaging front-end
//! and an LLM that can call external tools:
//! - Schema translation from tool-provider JSON Schema to the LLM dialect
//! - Tool catalog adapter over a tool-execution service
//! - In-memory per-user conversation store with trimming and expiry
//! - The bounded function-call orchestration loop

pub mod config;
pub mod error;
pub mod orchestration;
pub mod provider;
pub mod schema;
pub mod session;
pub mod tools;

pub use config::{defaults, Config, ConfigManager, ConversationConfig, OrchestrationConfig, ProviderConfig, ToolServerConfig};
pub use error::{Error, Result, ToolError};
pub use orchestration::{Orchestrator, OrchestratorSettings, Reply};
pub use provider::{
    create_provider_from_config, ChatConfig, ChatInput, ChatSession, FunctionCall, FunctionResponse,
    GenAIProvider, LlmProvider, ModelResponse, ProviderType,
};
pub use schema::{normalize, NormalizedToolSchema};
pub use session::{spawn_sweeper, ConversationStore, Role, Session, StoreStats, SweepHandle, Turn};
pub use tools::{build_tool_declarations, ToolDefinition, ToolDescriptor, ToolExecutor};
