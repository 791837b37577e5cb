//! MCP-backed tool executor
//!
//! Bridges an MCP server to the [`ToolExecutor`] seam used by the
//! orchestration loop.

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, info};

use chatbridge_mcp::{
    ClientInfo, HttpTransport, McpClient, McpError, McpTool, StdioTransport, ToolCallResult, Transport,
};

use super::{ToolDescriptor, ToolExecutor};
use crate::config::ToolServerConfig;
use crate::error::{Error, Result, ToolError};

/// Tool executor speaking MCP to a single server
pub struct McpToolExecutor<T: Transport> {
    client: McpClient<T>,
}

impl<T: Transport> McpToolExecutor<T> {
    /// Wrap an already initialized client
    pub fn new(client: McpClient<T>) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &McpClient<T> {
        &self.client
    }
}

impl McpToolExecutor<Box<dyn Transport>> {
    /// Open the transport described by `config` and run the MCP handshake
    pub async fn connect(config: &ToolServerConfig) -> Result<Self> {
        let transport: Box<dyn Transport> = match (&config.command, &config.url) {
            (Some(command), _) => {
                let env: Vec<(String, String)> = config
                    .env
                    .iter()
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect();
                Box::new(StdioTransport::spawn(command, &config.args, &env).await?)
            }
            (None, Some(url)) => Box::new(HttpTransport::new(url.clone())),
            (None, None) => {
                return Err(Error::Config(
                    "tool_server needs either `command` or `url`".to_string(),
                ));
            }
        };

        let mut client = McpClient::new(transport);
        let server = client
            .initialize(ClientInfo {
                name: "chatbridge".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            })
            .await
            .map_err(|e| Error::ToolCatalogUnavailable(map_mcp_error(e)))?;

        info!(server = %server.name, version = %server.version, "Connected to tool server");
        Ok(Self::new(client))
    }
}

fn map_mcp_error(e: McpError) -> ToolError {
    match e {
        McpError::Transport(msg) => ToolError::Transport(msg),
        McpError::Protocol(msg) => ToolError::ExecutionFailed(format!("protocol error: {}", msg)),
        McpError::Server(msg) => ToolError::ExecutionFailed(msg),
    }
}

impl From<McpTool> for ToolDescriptor {
    fn from(tool: McpTool) -> Self {
        Self {
            name: tool.name,
            description: tool.description,
            input_schema: tool.input_schema,
        }
    }
}

/// Turn an MCP `tools/call` result into a JSON value or a tool failure
fn into_tool_output(name: &str, result: ToolCallResult) -> std::result::Result<Value, ToolError> {
    let text = result.text();

    if result.is_error {
        let message = text.unwrap_or_else(|| format!("MCP tool '{}' reported an error", name));
        return Err(ToolError::ExecutionFailed(message));
    }

    if let Some(structured) = result.structured_content {
        return Ok(structured);
    }

    match text {
        Some(text) => Ok(Value::String(text)),
        None => Ok(serde_json::to_value(&result.content).unwrap_or(Value::Null)),
    }
}

#[async_trait]
impl<T: Transport> ToolExecutor for McpToolExecutor<T> {
    async fn list_tools(&self) -> std::result::Result<Vec<ToolDescriptor>, ToolError> {
        let tools = self.client.list_tools().await.map_err(map_mcp_error)?;
        Ok(tools.into_iter().map(ToolDescriptor::from).collect())
    }

    async fn call_tool(&self, name: &str, args: Value) -> std::result::Result<Value, ToolError> {
        debug!(tool = %name, "Calling MCP tool");
        let result = self.client.call_tool(name, args).await.map_err(map_mcp_error)?;
        into_tool_output(name, result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn call_result(value: Value) -> ToolCallResult {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_text_content_becomes_string() {
        let result = call_result(json!({
            "content": [ { "type": "text", "text": "3 unread messages" } ]
        }));

        assert_eq!(
            into_tool_output("listMessages", result).unwrap(),
            json!("3 unread messages")
        );
    }

    #[test]
    fn test_structured_content_preferred() {
        let result = call_result(json!({
            "content": [ { "type": "text", "text": "{\"count\":3}" } ],
            "structuredContent": { "count": 3 }
        }));

        assert_eq!(
            into_tool_output("listMessages", result).unwrap(),
            json!({ "count": 3 })
        );
    }

    #[test]
    fn test_is_error_becomes_failure() {
        let result = call_result(json!({
            "content": [ { "type": "text", "text": "mailbox locked" } ],
            "isError": true
        }));

        let err = into_tool_output("listMessages", result).unwrap_err();
        assert!(matches!(err, ToolError::ExecutionFailed(ref msg) if msg == "mailbox locked"));
    }

    #[test]
    fn test_is_error_without_text() {
        let result = call_result(json!({ "content": [], "isError": true }));

        let err = into_tool_output("archive", result).unwrap_err();
        assert_eq!(err.to_string(), "Execution failed: MCP tool 'archive' reported an error");
    }

    #[test]
    fn test_descriptor_from_mcp_tool() {
        let tool: McpTool = serde_json::from_value(json!({
            "name": "listMessages",
            "description": "List mail",
            "inputSchema": { "type": "object" }
        }))
        .unwrap();

        let descriptor = ToolDescriptor::from(tool);
        assert_eq!(descriptor.name, "listMessages");
        assert_eq!(descriptor.description.as_deref(), Some("List mail"));
        assert_eq!(descriptor.input_schema, json!({ "type": "object" }));
    }

    #[tokio::test]
    async fn test_connect_requires_endpoint() {
        let err = McpToolExecutor::connect(&ToolServerConfig::default())
            .await
            .err()
            .unwrap();
        assert!(matches!(err, Error::Config(_)));
    }
}
