//! Tool execution configuration.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    /// Backstop timeout applied to each tool call, in seconds (valid range: 1-600).
    pub call_timeout_secs: u32,
    /// Maximum provider/tool round trips per turn (valid range: 1-64).
    pub max_tool_rounds: u32,
    /// Tool names whose schemas are never offered to the provider.
    pub disabled: Vec<String>,
}

impl ToolsConfig {
    pub fn is_disabled(&self, name: &str) -> bool {
        self.disabled.iter().any(|d| d == name)
    }
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            call_timeout_secs: 30,
            max_tool_rounds: 8,
            disabled: Vec::new(),
        }
    }
}
