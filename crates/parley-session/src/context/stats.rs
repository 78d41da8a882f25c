//! Token usage snapshot for the active transcript.

use serde::Serialize;

use super::ContextWindowConfig;

/// Tokens attributed to each message role.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TokenBreakdown {
    pub system: usize,
    pub user: usize,
    pub assistant: usize,
    pub tool: usize,
}

impl TokenBreakdown {
    pub fn total(&self) -> usize {
        self.system + self.user + self.assistant + self.tool
    }
}

/// Usage band for UI affordances. Informational only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UsageBand {
    #[default]
    Normal,
    NearLimit,
    Critical,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ContextStats {
    pub current_tokens: usize,
    pub max_tokens: usize,
    pub breakdown: TokenBreakdown,
    /// Messages dropped from the active session by trimming or summarizing.
    pub trimmed_count: usize,
}

impl ContextStats {
    /// `current_tokens / max_tokens`, clamped to `[0, 1]`.
    pub fn usage_percent(&self) -> f64 {
        if self.max_tokens == 0 {
            return 1.0;
        }
        (self.current_tokens as f64 / self.max_tokens as f64).clamp(0.0, 1.0)
    }

    pub fn band(&self, config: &ContextWindowConfig) -> UsageBand {
        let usage = self.usage_percent();
        if usage >= config.critical_threshold {
            UsageBand::Critical
        } else if usage >= config.near_limit_threshold {
            UsageBand::NearLimit
        } else {
            UsageBand::Normal
        }
    }

    pub fn is_over_budget(&self) -> bool {
        self.current_tokens > self.max_tokens
    }

    pub fn remaining(&self) -> usize {
        self.max_tokens.saturating_sub(self.current_tokens)
    }
}
