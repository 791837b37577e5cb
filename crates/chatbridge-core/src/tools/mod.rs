//! Tool catalog for the orchestration loop
//!
//! Tools live in an external tool-execution service reached through the
//! [`ToolExecutor`] trait. Every orchestration run fetches the current list
//! and renders it into LLM declarations with [`build_tool_declarations`].

#[cfg(feature = "mcp")]
pub mod mcp;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::error::ToolError;
use crate::schema::NormalizedToolSchema;

/// A tool as advertised by the tool-execution service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// JSON-Schema-like parameter description; `Null` when the service sent none
    #[serde(default)]
    pub input_schema: Value,
}

impl ToolDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            input_schema: Value::Null,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_input_schema(mut self, schema: Value) -> Self {
        self.input_schema = schema;
        self
    }
}

/// Tool definition for LLM consumption
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

impl ToolDefinition {
    /// Build the LLM declaration for a descriptor, normalizing its schema
    pub fn from_descriptor(descriptor: &ToolDescriptor) -> Self {
        let description = descriptor
            .description
            .clone()
            .filter(|d| !d.trim().is_empty())
            .unwrap_or_else(|| format!("Execute {}", descriptor.name));

        Self {
            name: descriptor.name.clone(),
            description,
            parameters: NormalizedToolSchema::from_input_schema(&descriptor.input_schema)
                .to_parameters(),
        }
    }
}

/// The external tool-execution service
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    /// Enumerate the tools currently available
    async fn list_tools(&self) -> Result<Vec<ToolDescriptor>, ToolError>;

    /// Invoke a tool by name
    async fn call_tool(&self, name: &str, args: Value) -> Result<Value, ToolError>;
}

/// Fetch the current tool list and render it as LLM declarations.
///
/// A failed enumeration is returned as-is; no partial set is produced.
pub async fn build_tool_declarations(
    executor: &dyn ToolExecutor,
) -> Result<Vec<ToolDefinition>, ToolError> {
    let descriptors = executor.list_tools().await?;
    debug!(count = descriptors.len(), "Fetched tool catalog");

    Ok(descriptors.iter().map(ToolDefinition::from_descriptor).collect())
}
