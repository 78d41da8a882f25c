//! Conversation core for Parley.
//!
//! Provides:
//! - The message and session store
//! - Context window budgeting (trim / summarize decisions)
//! - The multi-tool plan tracker
//! - Single-level undo for edit and regenerate
//! - Session persistence
//! - The orchestrator that drives provider streams and tool calls

pub mod context;
pub mod orchestrator;
pub mod persistence;
pub mod plan;
pub mod store;
pub mod undo;

pub use context::{AdmissionDecision, ContextStats, ContextWindow, ContextWindowConfig, UsageBand};
pub use orchestrator::{
    ContextNotice, ConversationState, NoticeKind, Orchestrator, OrchestratorConfig,
    OrchestratorHandle, ThinkingStatus,
};
pub use persistence::{JsonFilePersistence, MemoryPersistence, SessionPersistence};
pub use plan::{PlanError, PlanStep, PlanTracker, StepStatus};
pub use store::{Session, SessionStore, SessionSummary, DEFAULT_TITLE};
pub use undo::{UndoManager, UndoSnapshot};
