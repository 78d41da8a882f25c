//! Callable tool contract.
//!
//! Tools are functions the model can call (weather, calendar, calculator,
//! ...). Each takes a JSON argument string and returns a JSON result string.

mod set;

use async_trait::async_trait;

use crate::ToolSchema;

pub use set::ToolSet;

#[async_trait]
pub trait Tool: Send + Sync {
    fn schema(&self) -> ToolSchema;

    /// Run the tool. A successful result is a JSON document.
    async fn invoke(&self, arguments: &str) -> Result<String, ToolError>;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ToolError {
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),
    #[error("execution failed: {0}")]
    Execution(String),
    #[error("timed out after {0}s")]
    Timeout(u64),
    #[error("cancelled")]
    Cancelled,
    #[error("unknown tool: {0}")]
    NotFound(String),
}

impl ToolError {
    /// Whether offering the user a retry makes sense.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ToolError::Execution(_) | ToolError::Timeout(_) | ToolError::Cancelled
        )
    }
}

impl From<ToolError> for parley_common::ParleyError {
    fn from(e: ToolError) -> Self {
        parley_common::ParleyError::Tool(e.to_string())
    }
}
