//! LLM request/response logging
//!
//! Set the `LLM_LOG_FILE` environment variable to append one JSON line per
//! LLM exchange to that file.
//!
//! Example: `LLM_LOG_FILE=/tmp/llm.log chatbridge`

use serde_json::json;
use std::io::Write;
use tracing::{debug, warn};

use super::{ChatInput, ModelResponse};

/// What to include in a log entry
pub(crate) struct LogConfig<'a> {
    pub model: &'a str,
    pub input: &'a ChatInput,
    pub tool_count: usize,
    pub result: Option<&'a ModelResponse>,
    pub error: Option<&'a str>,
}

fn input_to_json(input: &ChatInput) -> serde_json::Value {
    match input {
        ChatInput::Text(text) => json!({ "type": "text", "text": text }),
        ChatInput::FunctionResponses(responses) => json!({
            "type": "function_responses",
            "responses": responses,
        }),
    }
}

/// Append an interaction to `LLM_LOG_FILE`, if set
pub(crate) fn log_llm_interaction(config: LogConfig<'_>) {
    let log_file = match std::env::var("LLM_LOG_FILE") {
        Ok(path) => path,
        Err(_) => return,
    };

    let entry = json!({
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "model": config.model,
        "request": {
            "input": input_to_json(config.input),
            "tool_count": config.tool_count,
        },
        "response": config.result.map(|r| json!({
            "type": if r.has_function_calls() { "function_calls" } else { "message" },
            "text": r.text,
            "function_calls": r.function_calls,
        })),
        "error": config.error,
    });

    match std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_file)
    {
        Ok(mut file) => {
            if let Err(e) = writeln!(file, "{}", entry) {
                warn!("Failed to write to LLM log file: {}", e);
            }
        }
        Err(e) => {
            warn!("Failed to open LLM log file {}: {}", log_file, e);
        }
    }

    debug!("Logged LLM interaction to {}", log_file);
}
