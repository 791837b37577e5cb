//! Configuration for Chatbridge
//!
//! One TOML file with a table per concern: `[provider]`, `[conversation]`,
//! `[orchestration]`, `[tool_server]` and `[general]`. Every field has a
//! default, so a missing file or table is valid.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Built-in limits
pub mod defaults {
    use std::time::Duration;

    /// Maximum number of turns kept per user
    pub const HISTORY_LIMIT: usize = 20;
    /// Idle time after which a session is swept
    pub const HISTORY_EXPIRY: Duration = Duration::from_secs(24 * 60 * 60);
    /// How often the expiry sweep runs
    pub const SWEEP_INTERVAL: Duration = Duration::from_secs(60 * 60);
    /// Maximum function-call rounds per inbound message
    pub const MAX_FUNCTION_CALLS: usize = 5;
    /// Persona given to the model when none is configured
    pub const SYSTEM_INSTRUCTION: &str = "You are a helpful assistant reachable over chat. \
        Use the available tools when the user's request needs them, and answer concisely.";
}

/// Top-level configuration file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// LLM provider settings
    #[serde(default)]
    pub provider: ProviderConfig,
    /// Conversation history limits
    #[serde(default)]
    pub conversation: ConversationConfig,
    /// Function-call loop settings
    #[serde(default)]
    pub orchestration: OrchestrationConfig,
    /// Tool-execution service connection
    #[serde(default)]
    pub tool_server: ToolServerConfig,
    /// General application settings
    #[serde(default)]
    pub general: GeneralConfig,
}

/// Model backend and sampling settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Backend name: "gemini", "openai", "anthropic", ...
    pub provider_type: String,
    /// Inline key; wins over `api_key_env`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Variable to read the key from
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key_env: Option<String>,
    /// Model id; empty selects the backend's default
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self::for_backend("gemini")
    }
}

impl ProviderConfig {
    /// Settings for `backend`; the key comes from its usual variables
    pub fn for_backend(backend: &str) -> Self {
        Self {
            provider_type: backend.to_lowercase(),
            api_key: None,
            api_key_env: None,
            model: String::new(),
            max_tokens: 4096,
            temperature: 0.7,
        }
    }

    /// Variables consulted after `api_key_env`
    pub fn default_key_variables(&self) -> &'static [&'static str] {
        key_variables(&self.provider_type)
    }

    /// Inline key, then `api_key_env`, then the backend's usual variables
    pub fn get_api_key(&self) -> Option<String> {
        let inline = self.api_key.clone().filter(|key| !key.is_empty());
        inline.or_else(|| {
            self.api_key_env
                .iter()
                .map(String::as_str)
                .chain(key_variables(&self.provider_type).iter().copied())
                .find_map(|name| std::env::var(name).ok().filter(|key| !key.is_empty()))
        })
    }
}

/// Environment variables conventionally holding a backend's API key
fn key_variables(backend: &str) -> &'static [&'static str] {
    match backend {
        "gemini" | "google" => &["GEMINI_API_KEY", "GOOGLE_API_KEY"],
        "openai" => &["OPENAI_API_KEY"],
        "anthropic" => &["ANTHROPIC_API_KEY"],
        "cohere" => &["COHERE_API_KEY"],
        "groq" => &["GROQ_API_KEY"],
        "deepseek" => &["DEEPSEEK_API_KEY"],
        "xai" | "grok" => &["XAI_API_KEY"],
        _ => &[],
    }
}

/// Conversation history limits
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversationConfig {
    /// Maximum turns kept per user (oldest dropped first)
    pub history_limit: usize,
    /// Seconds of inactivity before a session expires
    pub history_expiry_secs: u64,
    /// Seconds between expiry sweeps
    pub sweep_interval_secs: u64,
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            history_limit: defaults::HISTORY_LIMIT,
            history_expiry_secs: defaults::HISTORY_EXPIRY.as_secs(),
            sweep_interval_secs: defaults::SWEEP_INTERVAL.as_secs(),
        }
    }
}

impl ConversationConfig {
    pub fn history_expiry(&self) -> Duration {
        Duration::from_secs(self.history_expiry_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

/// Function-call loop settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestrationConfig {
    /// Maximum tool-call rounds per inbound message
    pub max_function_calls: usize,
    /// System instruction sent with every conversation
    pub system_instruction: String,
}

impl Default for OrchestrationConfig {
    fn default() -> Self {
        Self {
            max_function_calls: defaults::MAX_FUNCTION_CALLS,
            system_instruction: defaults::SYSTEM_INSTRUCTION.to_string(),
        }
    }
}

/// Connection to the MCP tool server
///
/// Either `command` (spawned, spoken to over stdio) or `url` (HTTP) is set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolServerConfig {
    /// Command to launch the server
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    /// Arguments for `command`
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
    /// HTTP endpoint of the server
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Extra environment for `command`
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub env: HashMap<String, String>,
}

impl ToolServerConfig {
    pub fn is_configured(&self) -> bool {
        self.command.is_some() || self.url.is_some()
    }
}

/// Process-wide settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// `tracing` filter used when `RUST_LOG` is unset
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

/// Owns the TOML config file: loads it once, writes it back on request
pub struct ConfigManager {
    path: PathBuf,
    config: Config,
}

impl ConfigManager {
    /// Manager for the file at [`ConfigManager::default_config_path`]
    pub fn new() -> Result<Self> {
        Self::with_path(Self::default_config_path()?)
    }

    /// Read `path`; a missing file yields all defaults
    pub fn with_path(path: PathBuf) -> Result<Self> {
        let config = match std::fs::read_to_string(&path) {
            Ok(content) => toml::from_str(&content)
                .map_err(|e| Error::Config(format!("Invalid {}: {}", path.display(), e)))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Config::default(),
            Err(e) => {
                return Err(Error::Config(format!("Cannot read {}: {}", path.display(), e)));
            }
        };

        Ok(Self { path, config })
    }

    /// `<config dir>/chatbridge/config.toml`
    pub fn default_config_path() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|dir| dir.join("chatbridge").join("config.toml"))
            .ok_or_else(|| Error::Config("No platform config directory".to_string()))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut Config {
        &mut self.config
    }

    pub fn into_config(self) -> Config {
        self.config
    }

    /// Write the config back, creating missing parent directories
    pub fn save(&self) -> Result<()> {
        let content = toml::to_string_pretty(&self.config)
            .map_err(|e| Error::Config(format!("Cannot serialize config: {}", e)))?;
        if let Some(dir) = self.path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        std::fs::write(&self.path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.provider.provider_type, "gemini");
        assert_eq!(config.conversation.history_limit, 20);
        assert_eq!(config.conversation.history_expiry(), Duration::from_secs(86_400));
        assert_eq!(config.conversation.sweep_interval(), Duration::from_secs(3_600));
        assert_eq!(config.orchestration.max_function_calls, 5);
        assert!(!config.tool_server.is_configured());
        assert_eq!(config.general.log_level, "info");
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: Config = toml::from_str(
            r#"
            [conversation]
            history_limit = 8

            [tool_server]
            command = "mail-mcp"
            args = ["--stdio"]
            "#,
        )
        .unwrap();

        assert_eq!(config.conversation.history_limit, 8);
        assert_eq!(config.conversation.history_expiry_secs, 86_400);
        assert_eq!(config.orchestration.max_function_calls, 5);
        assert_eq!(config.tool_server.command.as_deref(), Some("mail-mcp"));
        assert_eq!(config.tool_server.args, vec!["--stdio".to_string()]);
        assert!(config.tool_server.is_configured());
    }

    #[test]
    fn test_defaults_survive_toml() {
        let written = toml::to_string_pretty(&Config::default()).unwrap();
        assert!(written.contains("[provider]"));
        assert!(written.contains("[conversation]"));

        let reread: Config = toml::from_str(&written).unwrap();
        assert_eq!(reread.provider.provider_type, "gemini");
        assert_eq!(reread.orchestration.system_instruction, defaults::SYSTEM_INSTRUCTION);
    }

    #[test]
    fn test_default_provider_defers_model_choice() {
        let provider = ProviderConfig::default();

        assert_eq!(provider.provider_type, "gemini");
        assert!(provider.model.is_empty());
        assert!(provider.api_key_env.is_none());
        assert_eq!(provider.max_tokens, 4096);

        // A table naming only the backend must not inherit another backend's key variable
        let reread: ProviderConfig = toml::from_str("provider_type = \"openai\"").unwrap();
        assert!(reread.model.is_empty());
        assert!(reread.api_key_env.is_none());
        assert_eq!(reread.default_key_variables(), &["OPENAI_API_KEY"]);
    }

    #[test]
    fn test_explicit_api_key_wins() {
        let mut provider = ProviderConfig::for_backend("openai");
        provider.api_key = Some("sk-direct".to_string());
        provider.api_key_env = Some("CHATBRIDGE_TEST_UNUSED_KEY".to_string());

        assert_eq!(provider.get_api_key(), Some("sk-direct".to_string()));
    }

    #[test]
    fn test_backend_key_variables() {
        assert_eq!(
            ProviderConfig::for_backend("Anthropic").default_key_variables(),
            &["ANTHROPIC_API_KEY"]
        );
        assert_eq!(
            ProviderConfig::for_backend("gemini").default_key_variables(),
            &["GEMINI_API_KEY", "GOOGLE_API_KEY"]
        );
        assert!(ProviderConfig::for_backend("ollama").default_key_variables().is_empty());
    }
}
