//! In-memory persistence for tests and ephemeral runs.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use parley_common::{PersistError, SessionId};

use super::SessionPersistence;
use crate::store::{Session, SessionSummary};

#[derive(Debug, Default)]
pub struct MemoryPersistence {
    sessions: Mutex<HashMap<SessionId, Session>>,
    fail_saves: AtomicBool,
}

impl MemoryPersistence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent save fail with an I/O error.
    pub fn set_fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    pub fn get(&self, id: &SessionId) -> Option<Session> {
        self.lock().ok()?.get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().map(|s| s.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(
        &self,
    ) -> Result<std::sync::MutexGuard<'_, HashMap<SessionId, Session>>, PersistError> {
        self.sessions
            .lock()
            .map_err(|_| PersistError::Io("session map lock poisoned".into()))
    }
}

#[async_trait]
impl SessionPersistence for MemoryPersistence {
    async fn load(&self, id: &SessionId) -> Result<Option<Session>, PersistError> {
        Ok(self.lock()?.get(id).cloned())
    }

    async fn save(&self, session: &Session) -> Result<(), PersistError> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(PersistError::Io("disk full".into()));
        }
        self.lock()?.insert(session.id.clone(), session.clone());
        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<SessionSummary>, PersistError> {
        let mut list: Vec<_> = self.lock()?.values().map(Session::summary).collect();
        list.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(list)
    }

    async fn delete(&self, id: &SessionId) -> Result<(), PersistError> {
        self.lock()?.remove(id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn failing_saves_leave_store_untouched() {
        let store = MemoryPersistence::new();
        let session = Session::new();

        store.set_fail_saves(true);
        assert!(matches!(store.save(&session).await, Err(PersistError::Io(_))));
        assert!(store.is_empty());

        store.set_fail_saves(false);
        store.save(&session).await.unwrap();
        assert_eq!(store.get(&session.id), Some(session));
    }
}
