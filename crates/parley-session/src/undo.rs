//! Single-level undo for edit and regenerate.
//!
//! A snapshot of the message list is captured immediately before an edit
//! or regenerate truncates the session. Only one snapshot exists at a
//! time; taking a new one overwrites the old.

use parley_ai::{Message, Role};
use parley_common::{MessageId, SessionError, SessionId};
use tracing::debug;

use crate::store::SessionStore;

#[derive(Debug, Clone, PartialEq)]
pub struct UndoSnapshot {
    pub session_id: SessionId,
    pub messages: Vec<Message>,
    pub trimmed_count: usize,
}

#[derive(Debug, Default)]
pub struct UndoManager {
    snapshot: Option<UndoSnapshot>,
}

impl UndoManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn capture(&mut self, store: &SessionStore, trimmed_count: usize) {
        self.snapshot = Some(UndoSnapshot {
            session_id: store.active_id().clone(),
            messages: store.messages().to_vec(),
            trimmed_count,
        });
    }

    pub fn is_available(&self) -> bool {
        self.snapshot.is_some()
    }

    /// Whether a snapshot exists for `session`.
    pub fn is_available_for(&self, session: &SessionId) -> bool {
        self.snapshot
            .as_ref()
            .is_some_and(|s| s.session_id == *session)
    }

    pub fn clear(&mut self) {
        self.snapshot = None;
    }

    /// Snapshot, then remove the user message `id` and everything after it.
    /// Returns the removed message so its attachment can be re-sent.
    pub fn prepare_edit(
        &mut self,
        store: &mut SessionStore,
        id: &MessageId,
        trimmed_count: usize,
    ) -> Result<Message, SessionError> {
        let index = editable_index(store, id, Role::User)?;
        self.capture(store, trimmed_count);
        let mut removed = store.replace_tail(index, Vec::new())?;
        debug!(message = %id, removed = removed.len(), "Prepared edit");
        // `index` was found in the list, so the tail is never empty.
        Ok(removed.swap_remove(0))
    }

    /// Snapshot, then remove the assistant message `id` and everything
    /// after it, leaving the context that produced it.
    pub fn prepare_regenerate(
        &mut self,
        store: &mut SessionStore,
        id: &MessageId,
        trimmed_count: usize,
    ) -> Result<(), SessionError> {
        let index = editable_index(store, id, Role::Assistant)?;
        self.capture(store, trimmed_count);
        let removed = store.replace_tail(index, Vec::new())?;
        debug!(message = %id, removed = removed.len(), "Prepared regenerate");
        Ok(())
    }

    /// Restore the snapshot verbatim and consume it. A snapshot taken in a
    /// different session is discarded. Returns the restored trimmed count.
    pub fn undo(&mut self, store: &mut SessionStore) -> Option<usize> {
        let snapshot = self.snapshot.take()?;
        if snapshot.session_id != *store.active_id() {
            debug!(session = %snapshot.session_id, "Discarding undo snapshot from another session");
            return None;
        }
        store.restore_messages(snapshot.messages);
        Some(snapshot.trimmed_count)
    }
}

fn editable_index(store: &SessionStore, id: &MessageId, role: Role) -> Result<usize, SessionError> {
    let index = store
        .position(id)
        .ok_or_else(|| SessionError::UnknownMessage(id.to_string()))?;
    if store.messages()[index].role != role {
        return Err(SessionError::NotEditable(format!(
            "{id} is not a {} message",
            format!("{role:?}").to_lowercase()
        )));
    }
    Ok(index)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conversation() -> (SessionStore, Vec<Message>) {
        let messages = vec![
            Message::user("weather in Oslo?"),
            Message::assistant("3 degrees"),
            Message::user("and tomorrow?"),
            Message::assistant("snow"),
        ];
        let mut store = SessionStore::new(40);
        for m in &messages {
            store.append(m.clone()).unwrap();
        }
        (store, messages)
    }

    #[test]
    fn edit_truncates_at_target() {
        let (mut store, messages) = conversation();
        let mut undo = UndoManager::new();

        let original = undo.prepare_edit(&mut store, &messages[2].id, 0).unwrap();
        assert_eq!(original.content, "and tomorrow?");
        assert_eq!(store.messages(), &messages[..2]);
        assert!(undo.is_available());
    }

    #[test]
    fn undo_after_edit_restores_exactly() {
        let (mut store, messages) = conversation();
        let mut undo = UndoManager::new();

        undo.prepare_edit(&mut store, &messages[0].id, 3).unwrap();
        store.append(Message::user("weather in Bergen?")).unwrap();

        assert_eq!(undo.undo(&mut store), Some(3));
        assert_eq!(store.messages(), messages.as_slice());
        assert!(!undo.is_available());
        assert_eq!(undo.undo(&mut store), None);
    }

    #[test]
    fn regenerate_keeps_preceding_context() {
        let (mut store, messages) = conversation();
        let mut undo = UndoManager::new();

        undo.prepare_regenerate(&mut store, &messages[3].id, 0).unwrap();
        assert_eq!(store.messages(), &messages[..3]);
    }

    #[test]
    fn role_mismatch_is_rejected_without_snapshot() {
        let (mut store, messages) = conversation();
        let mut undo = UndoManager::new();

        assert!(matches!(
            undo.prepare_edit(&mut store, &messages[1].id, 0),
            Err(SessionError::NotEditable(_))
        ));
        assert!(matches!(
            undo.prepare_regenerate(&mut store, &messages[0].id, 0),
            Err(SessionError::NotEditable(_))
        ));
        assert!(matches!(
            undo.prepare_edit(&mut store, &MessageId::new(), 0),
            Err(SessionError::UnknownMessage(_))
        ));
        assert!(!undo.is_available());
        assert_eq!(store.messages().len(), 4);
    }

    #[test]
    fn new_snapshot_overwrites_previous() {
        let (mut store, messages) = conversation();
        let mut undo = UndoManager::new();

        undo.prepare_regenerate(&mut store, &messages[3].id, 0).unwrap();
        let after_first = store.messages().to_vec();
        undo.prepare_edit(&mut store, &messages[2].id, 0).unwrap();

        undo.undo(&mut store);
        assert_eq!(store.messages(), after_first.as_slice());
        assert!(!undo.is_available());
    }

    #[test]
    fn snapshot_from_other_session_is_discarded() {
        let (mut store, messages) = conversation();
        let mut undo = UndoManager::new();
        let first = store.active_id().clone();

        undo.prepare_edit(&mut store, &messages[2].id, 0).unwrap();
        assert!(undo.is_available_for(&first));
        store.start_new_session();
        assert!(!undo.is_available_for(store.active_id()));

        assert_eq!(undo.undo(&mut store), None);
        assert!(store.messages().is_empty());
    }
}
