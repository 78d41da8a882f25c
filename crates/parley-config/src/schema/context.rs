//! Context window budget configuration.

use serde::{Deserialize, Serialize};

/// Token budget and usage-band thresholds for the conversation transcript.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextConfig {
    /// Maximum transcript size in tokens (valid range: 256-2000000).
    pub max_tokens: u32,
    /// Usage fraction at which the near-limit band starts.
    pub near_limit_threshold: f64,
    /// Usage fraction at which the critical band starts.
    pub critical_threshold: f64,
    /// Characters per token for the default estimator (valid range: 1-16).
    pub chars_per_token: u32,
    /// Fixed framing cost added to every message.
    pub per_message_overhead: u32,
    /// Flat cost of an attached image.
    pub image_token_cost: u32,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            max_tokens: 8000,
            near_limit_threshold: 0.80,
            critical_threshold: 0.95,
            chars_per_token: 4,
            per_message_overhead: 4,
            image_token_cost: 85,
        }
    }
}
