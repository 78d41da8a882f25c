//! Immutable conversation snapshot published to observers.

use std::sync::Arc;

use parley_ai::{Message, ToolStatus};
use parley_common::{MessageId, Notification, SessionId};

use crate::context::{ContextStats, UsageBand};
use crate::plan::PlanStep;
use crate::store::SessionSummary;

/// What the assistant is doing right now.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ThinkingStatus {
    #[default]
    Idle,
    /// Waiting on the provider.
    Thinking,
    UsingTool(String),
    /// Summarizing history or feeding tool results back.
    Processing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Trimmed { dropped: usize },
    Summarized { replaced: usize },
}

/// One-shot, dismissible notice that history was condensed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextNotice {
    pub kind: NoticeKind,
    pub message: String,
}

impl ContextNotice {
    pub fn trimmed(dropped: usize) -> Self {
        let noun = if dropped == 1 { "message" } else { "messages" };
        Self {
            kind: NoticeKind::Trimmed { dropped },
            message: format!("Removed {dropped} older {noun} to stay within the context limit"),
        }
    }

    pub fn summarized(replaced: usize) -> Self {
        let noun = if replaced == 1 { "message" } else { "messages" };
        Self {
            kind: NoticeKind::Summarized { replaced },
            message: format!("Summarized {replaced} older {noun} to stay within the context limit"),
        }
    }
}

/// Everything the presentation layer renders. A fresh value is published
/// after every mutation; `version` increases monotonically.
#[derive(Debug, Clone, Default)]
pub struct ConversationState {
    pub version: u64,
    pub session_id: SessionId,
    pub title: String,
    pub messages: Arc<Vec<Message>>,
    /// Streaming text of the assistant message being generated.
    pub draft: String,
    pub thinking: ThinkingStatus,
    /// Steps of the current turn; empty unless there is more than one.
    pub plan: Vec<PlanStep>,
    pub context: ContextStats,
    pub usage_band: UsageBand,
    pub pinned: Vec<Message>,
    pub notifications: Vec<Notification>,
    pub context_notice: Option<ContextNotice>,
    pub error_banner: Option<String>,
    pub undo_available: bool,
    pub sessions: Vec<SessionSummary>,
}

impl ConversationState {
    pub fn is_idle(&self) -> bool {
        self.thinking == ThinkingStatus::Idle
    }

    pub fn message(&self, id: &MessageId) -> Option<&Message> {
        self.messages.iter().find(|m| m.id == *id)
    }

    pub fn running_tools(&self) -> usize {
        self.messages
            .iter()
            .filter(|m| m.tool_status() == Some(ToolStatus::Running))
            .count()
    }
}
