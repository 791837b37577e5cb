use std::sync::Arc;

use tracing::{debug, error, info, warn};

use super::fanout::execute_round;
use super::{OrchestratorSettings, Reply};
use crate::error::{Error, Result};
use crate::provider::{ChatConfig, ChatInput, LlmProvider};
use crate::session::{ConversationStore, StoreStats, Turn};
use crate::tools::{build_tool_declarations, ToolDefinition, ToolExecutor};

/// Drives one model conversation per inbound message
pub struct Orchestrator {
    executor: Arc<dyn ToolExecutor>,
    provider: Arc<dyn LlmProvider>,
    store: Arc<ConversationStore>,
    settings: OrchestratorSettings,
}

impl Orchestrator {
    pub fn new(
        executor: Arc<dyn ToolExecutor>,
        provider: Arc<dyn LlmProvider>,
        store: Arc<ConversationStore>,
        settings: OrchestratorSettings,
    ) -> Self {
        Self {
            executor,
            provider,
            store,
            settings,
        }
    }

    pub fn store(&self) -> &Arc<ConversationStore> {
        &self.store
    }

    pub fn settings(&self) -> &OrchestratorSettings {
        &self.settings
    }

    /// Answer `text` from `user_id`, calling tools as the model requests.
    ///
    /// Returns [`Error::ToolCatalogUnavailable`] when tools cannot be listed
    /// and [`Error::OrchestrationFailed`] when the model call fails. In both
    /// cases the user's history is unchanged. At most `max_function_calls`
    /// tool rounds run; if the reply after the last of them still asks for
    /// tools, its text is returned with `round_cap_exceeded` set.
    pub async fn handle_message(&self, user_id: &str, text: &str, correlation_id: &str) -> Result<Reply> {
        info!(user_id = %user_id, correlation_id = %correlation_id, "Handling message");

        let tools = build_tool_declarations(self.executor.as_ref())
            .await
            .map_err(|e| {
                error!(correlation_id = %correlation_id, error = %e, "Tool catalog unavailable");
                Error::ToolCatalogUnavailable(e)
            })?;
        let history = self.store.get_history(user_id);
        debug!(
            correlation_id = %correlation_id,
            tools = tools.len(),
            history = history.len(),
            "Starting chat"
        );

        let reply = self
            .run(text, history, tools, correlation_id)
            .await
            .map_err(|e| {
                error!(user_id = %user_id, correlation_id = %correlation_id, error = %e, "Orchestration failed");
                Error::orchestration(correlation_id, e)
            })?;

        self.store.append_exchange(user_id, text, reply.text.as_str());
        info!(
            user_id = %user_id,
            correlation_id = %correlation_id,
            rounds = reply.rounds,
            "Message handled"
        );
        Ok(reply)
    }

    async fn run(
        &self,
        text: &str,
        history: Vec<Turn>,
        tools: Vec<ToolDefinition>,
        correlation_id: &str,
    ) -> Result<Reply> {
        let mut chat = self.provider.start_chat(ChatConfig {
            history,
            tools,
            system_instruction: self.settings.system_instruction.clone(),
        });

        let mut response = chat.send(ChatInput::Text(text.to_string())).await?;
        let mut tool_rounds = 0;
        let mut round_cap_exceeded = false;

        while response.has_function_calls() {
            if tool_rounds >= self.settings.max_function_calls {
                warn!(
                    correlation_id = %correlation_id,
                    round = tool_rounds,
                    pending_calls = response.function_calls.len(),
                    "Function call cap reached, using latest response"
                );
                round_cap_exceeded = true;
                break;
            }

            tool_rounds += 1;
            debug!(
                correlation_id = %correlation_id,
                round = tool_rounds,
                calls = response.function_calls.len(),
                "Executing tool round"
            );
            let results = execute_round(&self.executor, &response.function_calls, correlation_id).await;
            response = chat.send(ChatInput::FunctionResponses(results)).await?;
        }

        Ok(Reply {
            text: response.text().to_string(),
            rounds: tool_rounds + 1,
            tool_rounds,
            round_cap_exceeded,
        })
    }

    /// Forget everything said by `user_id`
    pub fn clear(&self, user_id: &str) {
        self.store.clear(user_id);
    }

    pub fn history(&self, user_id: &str) -> Vec<Turn> {
        self.store.get_history(user_id)
    }

    pub fn stats(&self) -> StoreStats {
        self.store.stats()
    }
}
