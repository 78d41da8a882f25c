//! Session persistence collaborator.
//!
//! Persistence is best effort: the orchestrator logs failures and keeps
//! the in-memory conversation going.

mod json_file;
mod memory;

use async_trait::async_trait;
use parley_common::{PersistError, SessionId};

use crate::store::{Session, SessionSummary};

pub use json_file::JsonFilePersistence;
pub use memory::MemoryPersistence;

#[async_trait]
pub trait SessionPersistence: Send + Sync {
    /// Load a session, `None` if it was never saved.
    async fn load(&self, id: &SessionId) -> Result<Option<Session>, PersistError>;

    async fn save(&self, session: &Session) -> Result<(), PersistError>;

    /// Summaries of every stored session, most recently updated first.
    async fn list_all(&self) -> Result<Vec<SessionSummary>, PersistError>;

    /// Delete a stored session. Deleting an unknown id is not an error.
    async fn delete(&self, id: &SessionId) -> Result<(), PersistError>;
}
