//! Error types for Chatbridge Core

use thiserror::Error;

/// Result type alias using Chatbridge Error
pub type Result<T> = std::result::Result<T, Error>;

/// Chatbridge error types
#[derive(Error, Debug)]
pub enum Error {
    /// The tool-execution service could not enumerate its tools
    #[error("Tool catalog unavailable: {0}")]
    ToolCatalogUnavailable(#[source] ToolError),

    /// An orchestration run aborted; conversation history was left untouched
    #[error("Orchestration failed [{correlation_id}]: {source}")]
    OrchestrationFailed {
        correlation_id: String,
        #[source]
        source: Box<Error>,
    },

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Wrap a failure of the run identified by `correlation_id`
    pub fn orchestration(correlation_id: impl Into<String>, source: Error) -> Self {
        Self::OrchestrationFailed {
            correlation_id: correlation_id.into(),
            source: Box::new(source),
        }
    }
}

/// Tool-specific errors
#[derive(Error, Debug)]
pub enum ToolError {
    #[error("Tool not found: {0}")]
    NotFound(String),

    #[error("Invalid parameters: {0}")]
    InvalidParams(String),

    #[error("Execution failed: {0}")]
    ExecutionFailed(String),

    #[error("Transport error: {0}")]
    Transport(String),
}
