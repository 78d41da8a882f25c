//! Model-facing contracts for Parley.
//!
//! Provides:
//! - The conversation message model
//! - The streaming model-provider contract (`ModelProvider`, `Delta`)
//! - The callable tool contract and tool set
//! - Token estimation
//! - The tool result registry that turns raw tool JSON into typed values

pub mod message;
pub mod results;
pub mod tokens;
pub mod tools;

use std::pin::Pin;

use async_trait::async_trait;
use futures_util::Stream;

pub use message::{ImageAttachment, Message, Role, ToolMetadata, ToolStatus, SUMMARY_PROVENANCE};
pub use results::{ToolResult, ToolResultRegistry};
pub use tokens::{CharRatioEstimator, TokenEstimator};
pub use tools::{Tool, ToolError, ToolSet};

/// Stream of incremental events for one provider round.
pub type DeltaStream = Pin<Box<dyn Stream<Item = Delta> + Send>>;

/// A language-model backend that streams its response.
///
/// Cancellation is cooperative: the caller stops polling and drops the
/// stream, and implementations must release their resources on drop.
#[async_trait]
pub trait ModelProvider: Send + Sync {
    async fn stream(
        &self,
        transcript: &[Message],
        tools: &[ToolSchema],
    ) -> Result<DeltaStream, AiError>;

    /// Name used in logs.
    fn name(&self) -> &str {
        "provider"
    }
}

/// One increment of a provider round.
#[derive(Debug, Clone, PartialEq)]
pub enum Delta {
    TextChunk(String),
    ToolCallRequested { name: String, arguments: String },
    Done,
    ErrorOccurred(String),
}

/// The JSON-schema description of a tool offered to the provider.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ToolSchema {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

#[derive(Debug, thiserror::Error)]
pub enum AiError {
    #[error("API error: {0}")]
    ApiError(String),
    #[error("Network error: {0}")]
    NetworkError(String),
    #[error("Parse error: {0}")]
    ParseError(String),
    #[error("Timeout")]
    Timeout,
    #[error("Cancelled")]
    Cancelled,
}

impl From<AiError> for parley_common::ParleyError {
    fn from(e: AiError) -> Self {
        parley_common::ParleyError::Ai(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ai_error_display() {
        assert_eq!(
            AiError::NetworkError("reset".into()).to_string(),
            "Network error: reset"
        );
        assert_eq!(AiError::Cancelled.to_string(), "Cancelled");
    }

    #[test]
    fn ai_error_converts_to_parley_error() {
        let err: parley_common::ParleyError = AiError::Timeout.into();
        assert_eq!(err.to_string(), "ai error: Timeout");
    }

    #[test]
    fn tool_schema_serializes() {
        let schema = ToolSchema {
            name: "calculator".into(),
            description: "Evaluate arithmetic".into(),
            parameters: serde_json::json!({"type": "object"}),
        };
        let json = serde_json::to_value(&schema).unwrap();
        assert_eq!(json["name"], "calculator");
        assert_eq!(json["parameters"]["type"], "object");
    }
}
