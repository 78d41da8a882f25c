//! One pretty-printed JSON document per session.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use parley_common::{PersistError, SessionId};
use tokio::fs;
use tracing::{debug, warn};

use super::SessionPersistence;
use crate::store::{Session, SessionSummary};

#[derive(Debug, Clone)]
pub struct JsonFilePersistence {
    dir: PathBuf,
}

impl JsonFilePersistence {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, id: &SessionId) -> PathBuf {
        let stem: String = id
            .as_str()
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.dir.join(format!("{stem}.json"))
    }

    async fn read_session(path: &Path) -> Result<Session, PersistError> {
        let bytes = fs::read(path).await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

#[async_trait]
impl SessionPersistence for JsonFilePersistence {
    async fn load(&self, id: &SessionId) -> Result<Option<Session>, PersistError> {
        let bytes = match fs::read(self.path_for(id)).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(serde_json::from_slice(&bytes)?))
    }

    async fn save(&self, session: &Session) -> Result<(), PersistError> {
        fs::create_dir_all(&self.dir).await?;
        let json = serde_json::to_vec_pretty(session)?;

        let path = self.path_for(&session.id);
        let tmp_path = path.with_extension("json.tmp");
        fs::write(&tmp_path, &json).await?;
        if let Err(e) = fs::rename(&tmp_path, &path).await {
            warn!(error = %e, "atomic rename failed, falling back to direct write");
            fs::write(&path, &json).await?;
            let _ = fs::remove_file(&tmp_path).await;
        }

        debug!(session = %session.id, path = %path.display(), "Session saved");
        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<SessionSummary>, PersistError> {
        let mut entries = match fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut summaries = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            match Self::read_session(&path).await {
                Ok(session) => summaries.push(session.summary()),
                Err(e) => warn!(path = %path.display(), error = %e, "Skipping unreadable session file"),
            }
        }
        summaries.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(summaries)
    }

    async fn delete(&self, id: &SessionId) -> Result<(), PersistError> {
        match fs::remove_file(self.path_for(id)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use parley_ai::Message;

    use super::*;

    fn session_with(text: &str) -> Session {
        let mut session = Session::new();
        session.title = text.to_string();
        session.messages.push(Message::user(text));
        session
    }

    #[tokio::test]
    async fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFilePersistence::new(dir.path());
        let session = session_with("hello");

        store.save(&session).await.unwrap();
        let loaded = store.load(&session.id).await.unwrap().unwrap();
        assert_eq!(loaded, session);
        assert!(!dir.path().join(format!("{}.json.tmp", session.id)).exists());
    }

    #[tokio::test]
    async fn missing_session_loads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFilePersistence::new(dir.path());
        assert!(store.load(&SessionId::from("nope")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn corrupt_file_is_an_error_on_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFilePersistence::new(dir.path());
        std::fs::write(dir.path().join("broken.json"), "{not json").unwrap();
        assert!(matches!(
            store.load(&SessionId::from("broken")).await,
            Err(PersistError::Serialization(_))
        ));
    }

    #[tokio::test]
    async fn list_skips_malformed_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFilePersistence::new(dir.path());

        let older = session_with("older");
        store.save(&older).await.unwrap();
        let mut newer = session_with("newer");
        newer.updated_at = older.updated_at + chrono::Duration::seconds(10);
        store.save(&newer).await.unwrap();
        std::fs::write(dir.path().join("garbage.json"), "[]").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let list = store.list_all().await.unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].title, "newer");
        assert_eq!(list[1].message_count, 1);
    }

    #[tokio::test]
    async fn list_of_missing_dir_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFilePersistence::new(dir.path().join("not-yet"));
        assert!(store.list_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFilePersistence::new(dir.path());
        let session = session_with("bye");
        store.save(&session).await.unwrap();

        store.delete(&session.id).await.unwrap();
        store.delete(&session.id).await.unwrap();
        assert!(store.load(&session.id).await.unwrap().is_none());
    }

    #[test]
    fn ids_are_sanitized_into_file_names() {
        let store = JsonFilePersistence::new("/tmp/sessions");
        let path = store.path_for(&SessionId::from("../etc/passwd"));
        assert_eq!(path, PathBuf::from("/tmp/sessions/___etc_passwd.json"));
    }
}
