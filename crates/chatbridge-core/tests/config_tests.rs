//! Configuration loading tests

use chatbridge_core::{Config, ConfigManager, ConversationStore, OrchestratorSettings};
use std::fs;
use tempfile::TempDir;

mod config_tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let manager = ConfigManager::with_path(dir.path().join("config.toml")).unwrap();

        let config = manager.config();
        assert_eq!(config.conversation.history_limit, 20);
        assert_eq!(config.conversation.history_expiry_secs, 86_400);
        assert_eq!(config.conversation.sweep_interval_secs, 3_600);
        assert_eq!(config.orchestration.max_function_calls, 5);
        assert!(!config.tool_server.is_configured());
    }

    #[test]
    fn test_load_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            r#"
[provider]
provider_type = "anthropic"
model = "claude-sonnet-4-20250514"

[conversation]
history_limit = 10

[orchestration]
max_function_calls = 3
system_instruction = "Answer in French."

[tool_server]
command = "mail-tools"
args = ["--stdio"]

[tool_server.env]
MAIL_TOKEN = "secret"
"#,
        )
        .unwrap();

        let config = ConfigManager::with_path(path).unwrap().into_config();

        assert_eq!(config.provider.provider_type, "anthropic");
        assert_eq!(config.conversation.history_limit, 10);
        assert_eq!(config.conversation.history_expiry_secs, 86_400);
        assert_eq!(config.tool_server.command.as_deref(), Some("mail-tools"));
        assert_eq!(config.tool_server.env.get("MAIL_TOKEN").map(String::as_str), Some("secret"));
        assert!(config.tool_server.is_configured());

        let settings = OrchestratorSettings::from(&config.orchestration);
        assert_eq!(settings.max_function_calls, 3);
        assert_eq!(settings.system_instruction.as_deref(), Some("Answer in French."));

        let store = ConversationStore::from_config(&config.conversation);
        assert_eq!(store.history_limit(), 10);
    }

    #[test]
    fn test_save_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut manager = ConfigManager::with_path(path.clone()).unwrap();
        manager.config_mut().tool_server.url = Some("http://localhost:8931/mcp".to_string());
        manager.config_mut().tool_server.env.insert("A".to_string(), "1".to_string());
        manager.save().unwrap();

        let reloaded = ConfigManager::with_path(path).unwrap();
        assert_eq!(
            reloaded.config().tool_server.url.as_deref(),
            Some("http://localhost:8931/mcp")
        );
        assert_eq!(reloaded.config().tool_server.env.len(), 1);
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[conversation\nhistory_limit = ").unwrap();

        let err = ConfigManager::with_path(path).err().unwrap();
        assert!(matches!(err, chatbridge_core::Error::Config(_)));
    }

    #[test]
    fn test_default_impl_matches_manager_defaults() {
        let config = Config::default();
        assert_eq!(config.general.log_level, "info");
        assert_eq!(config.provider.provider_type, "gemini");
    }
}
