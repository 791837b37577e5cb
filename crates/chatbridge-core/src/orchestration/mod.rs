//! Bounded function-call orchestration
//!
//! One inbound message becomes one orchestration run:
//! tool catalog, prior history, then alternating model replies and
//! concurrent tool rounds until the model answers without tools or the
//! round cap is hit. History is only written when the run succeeds.

mod engine;
mod fanout;

pub use engine::Orchestrator;

use serde::{Deserialize, Serialize};

use crate::config::{defaults, OrchestrationConfig};

/// Loop limits and the instruction sent with every conversation
#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    /// Maximum tool rounds executed per message
    pub max_function_calls: usize,
    pub system_instruction: Option<String>,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            max_function_calls: defaults::MAX_FUNCTION_CALLS,
            system_instruction: Some(defaults::SYSTEM_INSTRUCTION.to_string()),
        }
    }
}

impl From<&OrchestrationConfig> for OrchestratorSettings {
    fn from(config: &OrchestrationConfig) -> Self {
        let instruction = config.system_instruction.trim();
        Self {
            // Zero would turn every tool request into a capped reply
            max_function_calls: config.max_function_calls.max(1),
            system_instruction: (!instruction.is_empty()).then(|| instruction.to_string()),
        }
    }
}

/// Result of a successful run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reply {
    /// Final model text, persisted as the model turn
    pub text: String,
    /// Model responses received, including the final one
    pub rounds: usize,
    /// Tool rounds executed; never above `max_function_calls`
    pub tool_rounds: usize,
    /// The model still wanted tools when the cap stopped the loop
    pub round_cap_exceeded: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_from_config() {
        let config = OrchestrationConfig {
            max_function_calls: 3,
            system_instruction: "  Be brief.  ".to_string(),
        };
        let settings = OrchestratorSettings::from(&config);

        assert_eq!(settings.max_function_calls, 3);
        assert_eq!(settings.system_instruction.as_deref(), Some("Be brief."));
    }

    #[test]
    fn test_settings_blank_instruction_and_zero_cap() {
        let config = OrchestrationConfig {
            max_function_calls: 0,
            system_instruction: "   ".to_string(),
        };
        let settings = OrchestratorSettings::from(&config);

        assert_eq!(settings.max_function_calls, 1);
        assert!(settings.system_instruction.is_none());
    }

    #[test]
    fn test_default_settings() {
        let settings = OrchestratorSettings::default();
        assert_eq!(settings.max_function_calls, 5);
        assert!(settings.system_instruction.is_some());
    }
}
