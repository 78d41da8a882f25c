use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("config parse error: {0}")]
    ParseError(String),

    #[error("config validation error: {0}")]
    ValidationError(String),
}

/// Failures of the session persistence collaborator. Never fatal to the
/// in-memory conversation.
#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    #[error("session not found: {0}")]
    NotFound(String),

    #[error("persistence io error: {0}")]
    Io(String),

    #[error("persistence serialization error: {0}")]
    Serialization(String),
}

impl From<std::io::Error> for PersistError {
    fn from(e: std::io::Error) -> Self {
        PersistError::Io(e.to_string())
    }
}

impl From<serde_json::Error> for PersistError {
    fn from(e: serde_json::Error) -> Self {
        PersistError::Serialization(e.to_string())
    }
}

/// Rejected store and orchestrator commands.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("unknown session: {0}")]
    UnknownSession(String),

    #[error("unknown message: {0}")]
    UnknownMessage(String),

    #[error("message cannot be edited: {0}")]
    NotEditable(String),

    #[error("invalid title: {0}")]
    InvalidTitle(String),

    #[error("invalid message: {0}")]
    InvalidMessage(String),

    #[error("invalid tool status transition: {0}")]
    InvalidTransition(String),

    #[error("orchestrator is shut down")]
    Closed,
}

#[derive(Debug, thiserror::Error)]
pub enum ParleyError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Persist(#[from] PersistError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("ai error: {0}")]
    Ai(String),

    #[error("tool error: {0}")]
    Tool(String),

    #[error("{0}")]
    Other(String),
}
