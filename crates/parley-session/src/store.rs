//! Message and session store.
//!
//! Owns the active session's ordered message list and the in-memory
//! catalog of past sessions. Messages only change through the
//! operations here: append, tail replacement, tool status transitions,
//! pin toggling, trimming, and whole-list restore.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use parley_ai::{Message, Role, ToolStatus};
use parley_common::{MessageId, SessionError, SessionId};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::context::is_trimmable;

pub const DEFAULT_TITLE: &str = "New conversation";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    pub title: String,
    pub messages: Vec<Message>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Session {
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            id: SessionId::new(),
            title: DEFAULT_TITLE.to_string(),
            messages: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            id: self.id.clone(),
            title: self.title.clone(),
            message_count: self.messages.len(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }

    pub fn has_default_title(&self) -> bool {
        self.title == DEFAULT_TITLE
    }

    /// No messages and never renamed.
    pub fn is_blank(&self) -> bool {
        self.messages.is_empty() && self.has_default_title()
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

/// Catalog entry for a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub id: SessionId,
    pub title: String,
    pub message_count: usize,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub struct SessionStore {
    active: Session,
    history: HashMap<SessionId, Session>,
    auto_title_chars: usize,
}

impl SessionStore {
    pub fn new(auto_title_chars: usize) -> Self {
        Self::with_active(Session::new(), auto_title_chars)
    }

    pub fn with_active(session: Session, auto_title_chars: usize) -> Self {
        Self {
            active: session,
            history: HashMap::new(),
            auto_title_chars,
        }
    }

    pub fn active(&self) -> &Session {
        &self.active
    }

    pub fn active_id(&self) -> &SessionId {
        &self.active.id
    }

    pub fn messages(&self) -> &[Message] {
        &self.active.messages
    }

    pub fn get(&self, id: &MessageId) -> Option<&Message> {
        self.active.messages.iter().find(|m| m.id == *id)
    }

    pub fn position(&self, id: &MessageId) -> Option<usize> {
        self.active.messages.iter().position(|m| m.id == *id)
    }

    pub fn pinned(&self) -> Vec<Message> {
        self.active
            .messages
            .iter()
            .filter(|m| m.pinned)
            .cloned()
            .collect()
    }

    /// Append a message to the active session. The first user message of a
    /// session with the default title also names the session.
    pub fn append(&mut self, message: Message) -> Result<(), SessionError> {
        if !message.is_well_formed() {
            return Err(SessionError::InvalidMessage(format!(
                "{:?} message {} has inconsistent tool metadata",
                message.role, message.id
            )));
        }
        if message.role == Role::User && self.active.has_default_title() {
            if let Some(title) = auto_title(&message.content, self.auto_title_chars) {
                self.active.title = title;
            }
        }
        self.active.messages.push(message);
        self.active.touch();
        Ok(())
    }

    /// Insert a summary message ahead of the remaining history.
    pub fn prepend(&mut self, message: Message) -> Result<(), SessionError> {
        if !message.is_well_formed() {
            return Err(SessionError::InvalidMessage(message.id.to_string()));
        }
        self.active.messages.insert(0, message);
        self.active.touch();
        Ok(())
    }

    /// Replace everything from `from_index` onward with `new_messages`.
    /// Returns the removed tail.
    pub fn replace_tail(
        &mut self,
        from_index: usize,
        new_messages: Vec<Message>,
    ) -> Result<Vec<Message>, SessionError> {
        if from_index > self.active.messages.len() {
            return Err(SessionError::InvalidMessage(format!(
                "tail index {from_index} is past the end of {} messages",
                self.active.messages.len()
            )));
        }
        if let Some(bad) = new_messages.iter().find(|m| !m.is_well_formed()) {
            return Err(SessionError::InvalidMessage(bad.id.to_string()));
        }
        let removed = self.active.messages.split_off(from_index);
        self.active.messages.extend(new_messages);
        self.active.touch();
        Ok(removed)
    }

    /// Move a tool message between statuses. Allowed transitions are
    /// `running -> completed | failed` and, for an explicit retry,
    /// `failed -> running`.
    pub fn update_tool_status(
        &mut self,
        id: &MessageId,
        status: ToolStatus,
        raw_result: Option<String>,
        error: Option<String>,
    ) -> Result<(), SessionError> {
        let message = self
            .active
            .messages
            .iter_mut()
            .find(|m| m.id == *id)
            .ok_or_else(|| SessionError::UnknownMessage(id.to_string()))?;
        let tool = message
            .tool
            .as_mut()
            .ok_or_else(|| SessionError::InvalidMessage(format!("{id} is not a tool message")))?;

        let allowed = matches!(
            (tool.status, status),
            (ToolStatus::Running, ToolStatus::Completed)
                | (ToolStatus::Running, ToolStatus::Failed)
                | (ToolStatus::Failed, ToolStatus::Running)
        );
        if !allowed {
            return Err(SessionError::InvalidTransition(format!(
                "{id}: {:?} -> {:?}",
                tool.status, status
            )));
        }

        tool.status = status;
        match status {
            ToolStatus::Running => {
                tool.raw_result = None;
                tool.error = None;
            }
            ToolStatus::Completed => {
                tool.raw_result = raw_result;
                tool.error = None;
            }
            ToolStatus::Failed => {
                if raw_result.is_some() {
                    tool.raw_result = raw_result;
                }
                tool.error = error;
            }
        }
        debug!(message = %id, status = ?status, "Tool status updated");
        self.active.touch();
        Ok(())
    }

    /// Fail every running tool message with `reason`. Returns how many changed.
    pub fn fail_running_tools(&mut self, reason: &str) -> usize {
        let running: Vec<MessageId> = self
            .active
            .messages
            .iter()
            .filter(|m| m.is_running_tool())
            .map(|m| m.id.clone())
            .collect();
        for id in &running {
            // Only running messages were collected, so the transition is valid.
            let _ = self.update_tool_status(id, ToolStatus::Failed, None, Some(reason.to_string()));
        }
        running.len()
    }

    /// Flip the pinned flag. Returns the new value.
    pub fn toggle_pin(&mut self, id: &MessageId) -> Result<bool, SessionError> {
        let message = self
            .active
            .messages
            .iter_mut()
            .find(|m| m.id == *id)
            .ok_or_else(|| SessionError::UnknownMessage(id.to_string()))?;
        message.pinned = !message.pinned;
        let pinned = message.pinned;
        self.active.touch();
        Ok(pinned)
    }

    /// Remove up to `count` of the oldest trimmable messages.
    pub fn remove_oldest_trimmable(&mut self, count: usize) -> Vec<Message> {
        let mut removed = Vec::new();
        let mut kept = Vec::with_capacity(self.active.messages.len());
        for message in self.active.messages.drain(..) {
            if removed.len() < count && is_trimmable(&message) {
                removed.push(message);
            } else {
                kept.push(message);
            }
        }
        self.active.messages = kept;
        if !removed.is_empty() {
            self.active.touch();
        }
        removed
    }

    /// Remove the messages with the given ids. Returns how many were removed.
    pub fn remove_messages(&mut self, ids: &[MessageId]) -> usize {
        let before = self.active.messages.len();
        self.active.messages.retain(|m| !ids.contains(&m.id));
        let removed = before - self.active.messages.len();
        if removed > 0 {
            self.active.touch();
        }
        removed
    }

    /// Replace the whole message list (undo restore).
    pub fn restore_messages(&mut self, messages: Vec<Message>) {
        self.active.messages = messages;
        self.active.touch();
    }

    /// Make `id` the active session, archiving the current one.
    pub fn switch_session(&mut self, id: &SessionId) -> Result<(), SessionError> {
        if *id == self.active.id {
            return Ok(());
        }
        let next = self
            .history
            .remove(id)
            .ok_or_else(|| SessionError::UnknownSession(id.to_string()))?;
        let previous = std::mem::replace(&mut self.active, next);
        self.archive(previous);
        Ok(())
    }

    /// Archive the active session and start an empty one.
    pub fn start_new_session(&mut self) -> &SessionId {
        let previous = std::mem::replace(&mut self.active, Session::new());
        self.archive(previous);
        &self.active.id
    }

    /// Add a session loaded from persistence to the in-memory catalog.
    pub fn insert_history(&mut self, session: Session) {
        if session.id != self.active.id {
            self.history.insert(session.id.clone(), session);
        }
    }

    pub fn contains(&self, id: &SessionId) -> bool {
        self.active.id == *id || self.history.contains_key(id)
    }

    pub fn history_session(&self, id: &SessionId) -> Option<&Session> {
        self.history.get(id)
    }

    /// Delete a session from memory. Deleting the active session replaces
    /// it with a fresh empty one. Returns `false` if the id is not in memory.
    pub fn delete_session(&mut self, id: &SessionId) -> bool {
        if *id == self.active.id {
            self.active = Session::new();
            return true;
        }
        self.history.remove(id).is_some()
    }

    /// Rename a session. Returns `false` when the title is unchanged.
    pub fn rename_session(&mut self, id: &SessionId, title: &str) -> Result<bool, SessionError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(SessionError::InvalidTitle("title is empty".into()));
        }
        let session = if *id == self.active.id {
            &mut self.active
        } else {
            self.history
                .get_mut(id)
                .ok_or_else(|| SessionError::UnknownSession(id.to_string()))?
        };
        if session.title == title {
            return Ok(false);
        }
        session.title = title.to_string();
        session.touch();
        Ok(true)
    }

    /// All sessions in memory, most recently updated first.
    pub fn list_sessions(&self) -> Vec<SessionSummary> {
        let mut list: Vec<SessionSummary> = std::iter::once(&self.active)
            .chain(self.history.values())
            .map(Session::summary)
            .collect();
        list.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        list
    }

    fn archive(&mut self, session: Session) {
        if !session.is_blank() {
            self.history.insert(session.id.clone(), session);
        }
    }
}

/// Title derived from the first user message, shortened on a word boundary.
pub fn auto_title(text: &str, max_chars: usize) -> Option<String> {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        return None;
    }
    if collapsed.chars().count() <= max_chars {
        return Some(collapsed);
    }
    let cut: String = collapsed.chars().take(max_chars).collect();
    let shortened = match cut.rfind(' ') {
        Some(idx) if idx > 0 => cut[..idx].to_string(),
        _ => cut,
    };
    Some(format!("{}…", shortened.trim_end()))
}
