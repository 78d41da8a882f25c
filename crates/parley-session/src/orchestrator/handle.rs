//! Command interface to a running orchestrator.

use parley_ai::{ImageAttachment, Message, ToolResult, ToolStatus};
use parley_common::{Event, EventBus, MessageId, SessionError, SessionId};
use tokio::sync::{broadcast, mpsc, oneshot, watch};

use super::state::ConversationState;
use super::ResultParsers;

pub(super) type Reply<T> = oneshot::Sender<Result<T, SessionError>>;

pub(super) enum Command {
    Send {
        text: String,
        image: Option<ImageAttachment>,
        reply: Reply<MessageId>,
    },
    Cancel {
        reply: Reply<bool>,
    },
    EditAndResend {
        id: MessageId,
        text: String,
        reply: Reply<MessageId>,
    },
    Regenerate {
        id: MessageId,
        reply: Reply<()>,
    },
    TogglePin {
        id: MessageId,
        reply: Reply<bool>,
    },
    Undo {
        reply: Reply<bool>,
    },
    RetryTool {
        id: MessageId,
        reply: Reply<()>,
    },
    SwitchSession {
        id: SessionId,
        reply: Reply<()>,
    },
    StartNewSession {
        reply: Reply<SessionId>,
    },
    DeleteSession {
        id: SessionId,
        reply: Reply<()>,
    },
    RenameSession {
        id: SessionId,
        title: String,
        reply: Reply<bool>,
    },
    DismissNotice,
    DismissError,
    DismissNotification {
        id: u64,
    },
    Flush {
        reply: Reply<()>,
    },
    Shutdown {
        reply: Reply<()>,
    },
}

/// Cheap, cloneable handle used by the presentation layer. Commands are
/// applied in the order they are sent; observers read published
/// snapshots and never mutate state directly.
#[derive(Clone)]
pub struct OrchestratorHandle {
    commands: mpsc::Sender<Command>,
    state: watch::Receiver<ConversationState>,
    events: EventBus,
    registry: ResultParsers,
}

impl OrchestratorHandle {
    pub(super) fn new(
        commands: mpsc::Sender<Command>,
        state: watch::Receiver<ConversationState>,
        events: EventBus,
        registry: ResultParsers,
    ) -> Self {
        Self {
            commands,
            state,
            events,
            registry,
        }
    }

    /// Send a user message, cancelling any in-flight generation first.
    pub async fn send(
        &self,
        text: impl Into<String>,
        image: Option<ImageAttachment>,
    ) -> Result<MessageId, SessionError> {
        let text = text.into();
        self.request(|reply| Command::Send { text, image, reply })
            .await
    }

    /// Cancel the in-flight generation. Returns `false` if nothing was running.
    pub async fn cancel(&self) -> Result<bool, SessionError> {
        self.request(|reply| Command::Cancel { reply }).await
    }

    /// Replace user message `id` and everything after it with `text`.
    pub async fn edit_and_resend(
        &self,
        id: &MessageId,
        text: impl Into<String>,
    ) -> Result<MessageId, SessionError> {
        let id = id.clone();
        let text = text.into();
        self.request(|reply| Command::EditAndResend { id, text, reply })
            .await
    }

    /// Drop assistant message `id` and what follows, then ask again.
    pub async fn regenerate(&self, id: &MessageId) -> Result<(), SessionError> {
        let id = id.clone();
        self.request(|reply| Command::Regenerate { id, reply }).await
    }

    pub async fn toggle_pin(&self, id: &MessageId) -> Result<bool, SessionError> {
        let id = id.clone();
        self.request(|reply| Command::TogglePin { id, reply }).await
    }

    /// Restore the list from before the last edit or regenerate.
    pub async fn undo(&self) -> Result<bool, SessionError> {
        self.request(|reply| Command::Undo { reply }).await
    }

    /// Re-invoke a failed tool call with its original arguments.
    pub async fn retry_tool(&self, id: &MessageId) -> Result<(), SessionError> {
        let id = id.clone();
        self.request(|reply| Command::RetryTool { id, reply }).await
    }

    pub async fn switch_session(&self, id: &SessionId) -> Result<(), SessionError> {
        let id = id.clone();
        self.request(|reply| Command::SwitchSession { id, reply })
            .await
    }

    pub async fn start_new_session(&self) -> Result<SessionId, SessionError> {
        self.request(|reply| Command::StartNewSession { reply }).await
    }

    pub async fn delete_session(&self, id: &SessionId) -> Result<(), SessionError> {
        let id = id.clone();
        self.request(|reply| Command::DeleteSession { id, reply })
            .await
    }

    /// Returns `false` when the title was already `title`.
    pub async fn rename_session(
        &self,
        id: &SessionId,
        title: impl Into<String>,
    ) -> Result<bool, SessionError> {
        let id = id.clone();
        let title = title.into();
        self.request(|reply| Command::RenameSession { id, title, reply })
            .await
    }

    pub async fn dismiss_notice(&self) -> Result<(), SessionError> {
        self.tell(Command::DismissNotice).await
    }

    pub async fn dismiss_error(&self) -> Result<(), SessionError> {
        self.tell(Command::DismissError).await
    }

    pub async fn dismiss_notification(&self, id: u64) -> Result<(), SessionError> {
        self.tell(Command::DismissNotification { id }).await
    }

    /// Wait until every queued save has reached persistence.
    pub async fn flush(&self) -> Result<(), SessionError> {
        self.request(|reply| Command::Flush { reply }).await
    }

    /// Cancel work, save the active session, and stop the actor.
    pub async fn shutdown(&self) -> Result<(), SessionError> {
        self.request(|reply| Command::Shutdown { reply }).await
    }

    /// The latest published snapshot.
    pub fn state(&self) -> ConversationState {
        self.state.borrow().clone()
    }

    /// A receiver notified on every new snapshot.
    pub fn subscribe(&self) -> watch::Receiver<ConversationState> {
        self.state.clone()
    }

    pub fn events(&self) -> broadcast::Receiver<Event> {
        self.events.subscribe()
    }

    /// Wait until no generation is in flight and return that snapshot.
    pub async fn wait_idle(&self) -> Result<ConversationState, SessionError> {
        let mut rx = self.state.clone();
        let state = rx
            .wait_for(ConversationState::is_idle)
            .await
            .map_err(|_| SessionError::Closed)?;
        Ok(state.clone())
    }

    /// Typed view of a completed tool message, `None` for anything the
    /// registry cannot parse.
    pub fn typed_result(&self, message: &Message) -> Option<ToolResult> {
        let meta = message.tool.as_ref()?;
        if meta.status != ToolStatus::Completed {
            return None;
        }
        self.registry.parse(&meta.name, meta.raw_result.as_deref()?)
    }

    async fn request<T>(
        &self,
        make: impl FnOnce(Reply<T>) -> Command,
    ) -> Result<T, SessionError> {
        let (reply, rx) = oneshot::channel();
        self.tell(make(reply)).await?;
        rx.await.map_err(|_| SessionError::Closed)?
    }

    async fn tell(&self, command: Command) -> Result<(), SessionError> {
        self.commands
            .send(command)
            .await
            .map_err(|_| SessionError::Closed)
    }
}
