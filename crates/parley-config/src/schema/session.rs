//! Session and history configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Sent as a leading system message with every request.
    pub system_prompt: Option<String>,
    /// Length cap for titles derived from the first user message (valid range: 8-200).
    pub auto_title_chars: u32,
    /// Override for the session storage directory.
    pub storage_dir: Option<PathBuf>,
    /// Maximum number of sessions returned when listing history.
    pub history_limit: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            system_prompt: None,
            auto_title_chars: 40,
            storage_dir: None,
            history_limit: 200,
        }
    }
}
