//! Context window budget.
//!
//! Computes token usage for a message list and decides whether a new
//! message fits, needs the oldest eligible history trimmed, or needs the
//! history summarized. Never mutates the store: the orchestrator applies
//! the returned decision.

mod stats;

#[cfg(test)]
mod tests;

use std::sync::Arc;

use parley_ai::{CharRatioEstimator, Message, Role, TokenEstimator};
use parley_config::schema::ContextConfig;
use tracing::debug;

pub use stats::{ContextStats, TokenBreakdown, UsageBand};

#[derive(Debug, Clone, PartialEq)]
pub struct ContextWindowConfig {
    pub max_tokens: usize,
    pub near_limit_threshold: f64,
    pub critical_threshold: f64,
}

impl Default for ContextWindowConfig {
    fn default() -> Self {
        Self::from(&ContextConfig::default())
    }
}

impl From<&ContextConfig> for ContextWindowConfig {
    fn from(config: &ContextConfig) -> Self {
        Self {
            max_tokens: config.max_tokens as usize,
            near_limit_threshold: config.near_limit_threshold,
            critical_threshold: config.critical_threshold,
        }
    }
}

/// Outcome of an admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdmissionDecision {
    Ok,
    /// Drop this many of the oldest trimmable messages.
    Trim(usize),
    /// Trimming every eligible message is not enough.
    Summarize,
}

/// Pinned and system messages are never trimmed automatically.
pub fn is_trimmable(message: &Message) -> bool {
    !message.pinned && message.role != Role::System
}

pub struct ContextWindow {
    config: ContextWindowConfig,
    estimator: Arc<dyn TokenEstimator>,
    /// Tokens always spent outside the stored messages (system prompt).
    reserved_tokens: usize,
    trimmed_count: usize,
}

impl ContextWindow {
    pub fn new(config: ContextWindowConfig, estimator: Arc<dyn TokenEstimator>) -> Self {
        Self {
            config,
            estimator,
            reserved_tokens: 0,
            trimmed_count: 0,
        }
    }

    /// Build from the `[context]` config section using the default
    /// character-ratio estimator.
    pub fn from_config(config: &ContextConfig) -> Self {
        let estimator = CharRatioEstimator::new(config.chars_per_token as usize)
            .with_overhead(config.per_message_overhead as usize)
            .with_image_cost(config.image_token_cost as usize);
        Self::new(config.into(), Arc::new(estimator))
    }

    /// Charge a standing system prompt against the budget.
    pub fn reserve_system_prompt(&mut self, prompt: Option<&str>) {
        self.reserved_tokens = prompt
            .map(|p| self.estimator.estimate_message(&Message::system(p)))
            .unwrap_or(0);
    }

    pub fn config(&self) -> &ContextWindowConfig {
        &self.config
    }

    pub fn estimator(&self) -> &Arc<dyn TokenEstimator> {
        &self.estimator
    }

    pub fn trimmed_count(&self) -> usize {
        self.trimmed_count
    }

    pub fn record_trim(&mut self, dropped: usize) {
        self.trimmed_count += dropped;
    }

    pub fn set_trimmed_count(&mut self, count: usize) {
        self.trimmed_count = count;
    }

    pub fn reset(&mut self) {
        self.trimmed_count = 0;
    }

    pub fn stats(&self, messages: &[Message]) -> ContextStats {
        let mut breakdown = TokenBreakdown {
            system: self.reserved_tokens,
            ..TokenBreakdown::default()
        };
        for message in messages {
            let tokens = self.estimator.estimate_message(message);
            match message.role {
                Role::System => breakdown.system += tokens,
                Role::User => breakdown.user += tokens,
                Role::Assistant => breakdown.assistant += tokens,
                Role::Tool => breakdown.tool += tokens,
            }
        }
        ContextStats {
            current_tokens: breakdown.total(),
            max_tokens: self.config.max_tokens,
            breakdown,
            trimmed_count: self.trimmed_count,
        }
    }

    pub fn band(&self, stats: &ContextStats) -> UsageBand {
        stats.band(&self.config)
    }

    /// Decide whether `incoming` can be appended to `messages`.
    ///
    /// Walks the trimmable messages oldest first until the remainder plus
    /// the incoming message fits. An incoming message larger than the
    /// whole budget is still admitted, with a summarize decision.
    pub fn admit(&self, incoming: &Message, messages: &[Message]) -> AdmissionDecision {
        let max = self.config.max_tokens;
        let incoming_tokens = self.estimator.estimate_message(incoming);
        let current = self.stats(messages).current_tokens;

        if current + incoming_tokens <= max {
            return AdmissionDecision::Ok;
        }
        if incoming_tokens > max {
            debug!(incoming_tokens, max, "Incoming message exceeds the whole budget");
            return AdmissionDecision::Summarize;
        }

        let mut remaining = current;
        let mut dropped = 0;
        for message in messages.iter().filter(|m| is_trimmable(m)) {
            remaining -= self.estimator.estimate_message(message);
            dropped += 1;
            if remaining + incoming_tokens <= max {
                debug!(dropped, remaining, incoming_tokens, "Admission requires trimming");
                return AdmissionDecision::Trim(dropped);
            }
        }
        debug!(current, incoming_tokens, max, "Trimming cannot satisfy budget");
        AdmissionDecision::Summarize
    }
}
