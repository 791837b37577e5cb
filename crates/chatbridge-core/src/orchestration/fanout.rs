//! Concurrent execution of one round of tool calls

use std::sync::Arc;

use tokio::task::JoinSet;
use tracing::{debug, warn};

use crate::provider::{FunctionCall, FunctionResponse};
use crate::tools::ToolExecutor;

/// Run every call concurrently and wait for all of them.
///
/// Responses come back in the order the model requested the calls. A failed
/// or panicked invocation becomes an `{"error": ...}` payload instead of
/// aborting the round.
pub(crate) async fn execute_round(
    executor: &Arc<dyn ToolExecutor>,
    calls: &[FunctionCall],
    correlation_id: &str,
) -> Vec<FunctionResponse> {
    let mut join_set: JoinSet<(usize, FunctionResponse)> = JoinSet::new();

    for (index, call) in calls.iter().enumerate() {
        let executor = Arc::clone(executor);
        let call = call.clone();
        let correlation_id = correlation_id.to_string();
        join_set.spawn(async move {
            let response = match executor.call_tool(&call.name, call.args.clone()).await {
                Ok(value) => {
                    debug!(correlation_id = %correlation_id, tool = %call.name, "Tool call succeeded");
                    FunctionResponse::success(&call, value)
                }
                Err(e) => {
                    warn!(correlation_id = %correlation_id, tool = %call.name, error = %e, "Tool call failed");
                    FunctionResponse::failure(&call, e.to_string())
                }
            };
            (index, response)
        });
    }

    let mut slots: Vec<Option<FunctionResponse>> = vec![None; calls.len()];
    while let Some(joined) = join_set.join_next().await {
        match joined {
            Ok((index, response)) => slots[index] = Some(response),
            Err(e) => {
                // The slot stays empty and is filled in below
                warn!(correlation_id = %correlation_id, error = %e, "Tool task did not complete");
            }
        }
    }

    slots
        .into_iter()
        .zip(calls)
        .map(|(slot, call)| {
            slot.unwrap_or_else(|| FunctionResponse::failure(call, "tool task aborted before completing"))
        })
        .collect()
}
