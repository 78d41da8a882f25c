//! The single writer of conversation state.
//!
//! Commands from handles, progress from the generation task, and save
//! failures all arrive here and are applied one at a time. After each
//! one a fresh snapshot is published.

use std::collections::HashMap;
use std::sync::Arc;

use parley_ai::{ImageAttachment, Message, ModelProvider, ToolSchema, ToolSet, ToolStatus};
use parley_common::{
    Event, EventBus, MessageId, Notification, NotificationQueue, SessionError, SessionId,
};
use tokio::sync::{mpsc, oneshot, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::generation::{Generation, GenerationEvent, ToolOutcome};
use super::handle::{Command, Reply};
use super::state::{ContextNotice, ConversationState, ThinkingStatus};
use super::{OrchestratorConfig, ResultParsers};
use crate::context::{is_trimmable, AdmissionDecision, ContextWindow};
use crate::persistence::SessionPersistence;
use crate::plan::PlanTracker;
use crate::store::{Session, SessionStore, SessionSummary};
use crate::undo::UndoManager;

/// Messages sent to the actor by its own background tasks.
#[derive(Debug)]
pub(super) enum Internal {
    Generation { id: u64, event: GenerationEvent },
    SaveFailed { session: SessionId, reason: String },
}

enum SaveJob {
    Save(Box<Session>),
    Delete(SessionId),
    Flush(oneshot::Sender<Result<(), SessionError>>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TurnKind {
    Reply,
    Retry,
}

struct ActiveTurn {
    id: u64,
    kind: TurnKind,
    cancel: CancellationToken,
    /// Plan step index for each tool message of the turn.
    steps: HashMap<MessageId, usize>,
    /// Tool messages requested but not yet started. Each one joins the
    /// store when its invocation begins.
    pending: HashMap<MessageId, Message>,
}

pub(super) struct Actor {
    config: OrchestratorConfig,
    provider: Arc<dyn ModelProvider>,
    tools: Arc<ToolSet>,
    schemas: Arc<Vec<ToolSchema>>,
    disabled: Arc<Vec<String>>,
    registry: ResultParsers,
    persistence: Option<Arc<dyn SessionPersistence>>,
    resume: Option<SessionId>,

    store: SessionStore,
    context: ContextWindow,
    plan: PlanTracker,
    undo: UndoManager,
    notifications: NotificationQueue,
    notice: Option<ContextNotice>,
    error_banner: Option<String>,
    draft: String,
    thinking: ThinkingStatus,
    /// Summaries of persisted sessions not yet loaded into memory.
    persisted: Vec<SessionSummary>,

    turn: Option<ActiveTurn>,
    next_generation: u64,
    version: u64,

    state_tx: watch::Sender<ConversationState>,
    events: EventBus,
    internal_tx: mpsc::UnboundedSender<Internal>,
    saver: Option<mpsc::UnboundedSender<SaveJob>>,
}

pub(super) struct ActorParts {
    pub config: OrchestratorConfig,
    pub provider: Arc<dyn ModelProvider>,
    pub tools: ToolSet,
    pub registry: ResultParsers,
    pub persistence: Option<Arc<dyn SessionPersistence>>,
    pub context: ContextWindow,
    pub session: Option<Session>,
    pub resume: Option<SessionId>,
    pub state_tx: watch::Sender<ConversationState>,
    pub events: EventBus,
}

impl Actor {
    pub fn new(parts: ActorParts, internal_tx: mpsc::UnboundedSender<Internal>) -> Self {
        let ActorParts {
            config,
            provider,
            tools,
            registry,
            persistence,
            mut context,
            session,
            resume,
            state_tx,
            events,
        } = parts;

        context.reserve_system_prompt(config.system_prompt.as_deref());
        let schemas = Arc::new(tools.schemas(&config.disabled_tools));
        let disabled = Arc::new(config.disabled_tools.clone());
        let store = match session {
            Some(session) => SessionStore::with_active(session, config.auto_title_chars),
            None => SessionStore::new(config.auto_title_chars),
        };
        let saver = persistence
            .as_ref()
            .map(|p| spawn_saver(Arc::clone(p), internal_tx.clone()));

        Self {
            config,
            provider,
            tools: Arc::new(tools),
            schemas,
            disabled,
            registry,
            persistence,
            resume,
            store,
            context,
            plan: PlanTracker::new(),
            undo: UndoManager::new(),
            notifications: NotificationQueue::new(16),
            notice: None,
            error_banner: None,
            draft: String::new(),
            thinking: ThinkingStatus::Idle,
            persisted: Vec::new(),
            turn: None,
            next_generation: 0,
            version: 0,
            state_tx,
            events,
            internal_tx,
            saver,
        }
    }

    pub async fn run(
        mut self,
        mut commands: mpsc::Receiver<Command>,
        mut internal: mpsc::UnboundedReceiver<Internal>,
    ) {
        self.startup().await;
        self.publish();

        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(Command::Shutdown { reply }) => {
                        self.shutdown().await;
                        let _ = reply.send(Ok(()));
                        break;
                    }
                    Some(command) => self.handle_command(command).await,
                    None => {
                        self.shutdown().await;
                        break;
                    }
                },
                Some(message) = internal.recv() => self.handle_internal(message),
            }
            self.publish();
        }
        self.publish();
        debug!("Orchestrator stopped");
    }

    async fn startup(&mut self) {
        let Some(persistence) = self.persistence.clone() else {
            return;
        };
        match persistence.list_all().await {
            Ok(list) => self.persisted = list,
            Err(e) => {
                warn!(error = %e, "Failed to list saved sessions");
                self.notifications.push(Notification::warning(
                    "Could not load history",
                    e.to_string(),
                ));
            }
        }
        if let Some(id) = self.resume.take() {
            if let Err(e) = self.switch_session(id).await {
                warn!(error = %e, "Failed to resume session");
                self.notifications
                    .push(Notification::warning("Could not resume session", e.to_string()));
            }
        }
    }

    async fn shutdown(&mut self) {
        self.cancel_generation();
        self.save_active();
        if let Some(saver) = self.saver.take() {
            let (tx, rx) = oneshot::channel();
            if saver.send(SaveJob::Flush(tx)).is_ok() {
                let _ = rx.await;
            }
        }
        self.events.publish(Event::Shutdown);
        info!(session = %self.store.active_id(), "Orchestrator shut down");
    }

    async fn handle_command(&mut self, command: Command) {
        match command {
            Command::Send { text, image, reply } => {
                let result = self.send(text, image);
                self.respond(reply, result);
            }
            Command::Cancel { reply } => {
                let result = Ok(self.cancel_generation());
                self.respond(reply, result);
            }
            Command::EditAndResend { id, text, reply } => {
                let result = self.edit_and_resend(&id, text);
                self.respond(reply, result);
            }
            Command::Regenerate { id, reply } => {
                let result = self.regenerate(&id);
                self.respond(reply, result);
            }
            Command::TogglePin { id, reply } => {
                let result = self.store.toggle_pin(&id);
                if result.is_ok() {
                    self.save_active();
                }
                self.respond(reply, result);
            }
            Command::Undo { reply } => {
                let result = Ok(self.undo());
                self.respond(reply, result);
            }
            Command::RetryTool { id, reply } => {
                let result = self.retry_tool(&id);
                self.respond(reply, result);
            }
            Command::SwitchSession { id, reply } => {
                let result = self.switch_session(id).await;
                self.respond(reply, result);
            }
            Command::StartNewSession { reply } => {
                let result = Ok(self.start_new_session());
                self.respond(reply, result);
            }
            Command::DeleteSession { id, reply } => {
                let result = self.delete_session(&id);
                self.respond(reply, result);
            }
            Command::RenameSession { id, title, reply } => {
                let result = self.rename_session(&id, &title).await;
                self.respond(reply, result);
            }
            Command::DismissNotice => self.notice = None,
            Command::DismissError => self.error_banner = None,
            Command::DismissNotification { id } => {
                self.notifications.dismiss(id);
            }
            Command::Flush { reply } => {
                self.publish();
                match self.saver {
                    Some(ref saver) => {
                        if let Err(mpsc::error::SendError(SaveJob::Flush(reply))) =
                            saver.send(SaveJob::Flush(reply))
                        {
                            let _ = reply.send(Ok(()));
                        }
                    }
                    None => {
                        let _ = reply.send(Ok(()));
                    }
                }
            }
            // Handled by the run loop.
            Command::Shutdown { reply } => {
                let _ = reply.send(Ok(()));
            }
        }
    }

    /// Publish before replying so a caller that awaited the command
    /// observes its effect in the next snapshot it reads.
    fn respond<T>(&mut self, reply: Reply<T>, result: Result<T, SessionError>) {
        self.publish();
        let _ = reply.send(result);
    }

    // ── Turns ────────────────────────────────────────────────────────

    fn send(
        &mut self,
        text: String,
        image: Option<ImageAttachment>,
    ) -> Result<MessageId, SessionError> {
        if text.trim().is_empty() && image.is_none() {
            return Err(SessionError::InvalidMessage("message is empty".into()));
        }
        self.cancel_generation();
        self.undo.clear();

        let mut message = Message::user(text);
        message.image = image;
        self.submit(message)
    }

    fn edit_and_resend(&mut self, id: &MessageId, text: String) -> Result<MessageId, SessionError> {
        if text.trim().is_empty() {
            return Err(SessionError::InvalidMessage("message is empty".into()));
        }
        self.cancel_generation();
        let original = self
            .undo
            .prepare_edit(&mut self.store, id, self.context.trimmed_count())?;

        let mut message = Message::user(text);
        message.image = original.image;
        message.pinned = original.pinned;
        self.submit(message)
    }

    fn regenerate(&mut self, id: &MessageId) -> Result<(), SessionError> {
        self.cancel_generation();
        self.undo
            .prepare_regenerate(&mut self.store, id, self.context.trimmed_count())?;
        self.start_turn(None);
        Ok(())
    }

    /// Admit a user message and start a reply turn for it.
    fn submit(&mut self, message: Message) -> Result<MessageId, SessionError> {
        self.error_banner = None;
        let mut summarize = None;

        match self.context.admit(&message, self.store.messages()) {
            AdmissionDecision::Ok => {}
            AdmissionDecision::Trim(count) => {
                let dropped = self.store.remove_oldest_trimmable(count).len();
                self.context.record_trim(dropped);
                self.notice = Some(ContextNotice::trimmed(dropped));
                self.events.publish(Event::ContextTrimmed { dropped });
                info!(session = %self.store.active_id(), dropped, "Trimmed history");
            }
            AdmissionDecision::Summarize => {
                let range: Vec<Message> = self
                    .store
                    .messages()
                    .iter()
                    .filter(|m| is_trimmable(m) || m.is_summary())
                    .cloned()
                    .collect();
                if range.is_empty() {
                    warn!(session = %self.store.active_id(), "Message exceeds the context budget with nothing to summarize");
                } else {
                    summarize = Some(range);
                }
            }
        }

        let id = message.id.clone();
        self.store.append(message)?;
        self.start_turn(summarize);
        Ok(id)
    }

    fn start_turn(&mut self, summarize: Option<Vec<Message>>) {
        let transcript = self.store.messages().to_vec();
        let generation = self.new_generation(TurnKind::Reply);
        self.thinking = if summarize.is_some() {
            ThinkingStatus::Processing
        } else {
            ThinkingStatus::Thinking
        };
        tokio::spawn(generation.run_turn(transcript, summarize));
    }

    fn retry_tool(&mut self, id: &MessageId) -> Result<(), SessionError> {
        let message = self
            .store
            .get(id)
            .ok_or_else(|| SessionError::UnknownMessage(id.to_string()))?;
        if message.tool_status() != Some(ToolStatus::Failed) {
            return Err(SessionError::InvalidTransition(format!(
                "{id} is not a failed tool call"
            )));
        }
        self.cancel_generation();
        self.store
            .update_tool_status(id, ToolStatus::Running, None, None)?;

        let Some(message) = self.store.get(id).cloned() else {
            return Err(SessionError::UnknownMessage(id.to_string()));
        };
        let generation = self.new_generation(TurnKind::Retry);
        self.thinking = ThinkingStatus::Processing;
        tokio::spawn(generation.run_retry(message));
        Ok(())
    }

    fn new_generation(&mut self, kind: TurnKind) -> Generation {
        self.next_generation += 1;
        let id = self.next_generation;
        let cancel = CancellationToken::new();

        if kind == TurnKind::Reply {
            self.plan.clear();
        }
        self.draft.clear();
        self.turn = Some(ActiveTurn {
            id,
            kind,
            cancel: cancel.clone(),
            steps: HashMap::new(),
            pending: HashMap::new(),
        });
        self.events
            .publish(Event::TurnStarted(self.store.active_id().clone()));
        debug!(generation = id, ?kind, "Generation started");

        Generation {
            id,
            provider: Arc::clone(&self.provider),
            tools: Arc::clone(&self.tools),
            schemas: Arc::clone(&self.schemas),
            disabled: Arc::clone(&self.disabled),
            system_prompt: self.config.system_prompt.clone(),
            tool_timeout: self.config.tool_timeout,
            max_tool_rounds: self.config.max_tool_rounds,
            cancel,
            tx: self.internal_tx.clone(),
        }
    }

    /// Stop the in-flight generation, failing any running tool messages.
    /// Returns `false` if nothing was running.
    fn cancel_generation(&mut self) -> bool {
        let Some(turn) = self.turn.take() else {
            return false;
        };
        turn.cancel.cancel();

        let failed = self.store.fail_running_tools("cancelled");
        self.plan.fail_unfinished();
        self.draft.clear();
        self.thinking = ThinkingStatus::Idle;
        self.events
            .publish(Event::TurnCancelled(self.store.active_id().clone()));
        info!(generation = turn.id, failed_tools = failed, "Generation cancelled");
        self.save_active();
        true
    }

    fn undo(&mut self) -> bool {
        self.cancel_generation();
        match self.undo.undo(&mut self.store) {
            Some(trimmed) => {
                self.context.set_trimmed_count(trimmed);
                self.plan.clear();
                self.error_banner = None;
                self.save_active();
                true
            }
            None => false,
        }
    }

    // ── Generation progress ──────────────────────────────────────────

    fn handle_internal(&mut self, message: Internal) {
        match message {
            Internal::Generation { id, event } => {
                if self.turn.as_ref().map(|t| t.id) != Some(id) {
                    debug!(generation = id, "Ignoring event from stale generation");
                    return;
                }
                self.apply_generation_event(event);
            }
            Internal::SaveFailed { session, reason } => {
                warn!(session = %session, reason = %reason, "Session save failed");
                self.notifications
                    .push(Notification::warning("Could not save conversation", reason));
            }
        }
    }

    fn apply_generation_event(&mut self, event: GenerationEvent) {
        match event {
            GenerationEvent::SummaryReady { replaced, summary } => {
                let replaced = self.still_condensable(&replaced);
                let removed = self.store.remove_messages(&replaced);
                if let Err(e) = self.store.prepend(summary) {
                    warn!(error = %e, "Dropping malformed summary");
                }
                self.context.record_trim(removed);
                self.notice = Some(ContextNotice::summarized(removed));
                self.events
                    .publish(Event::ContextSummarized { replaced: removed });
                info!(session = %self.store.active_id(), replaced = removed, "Summarized history");
                self.thinking = ThinkingStatus::Thinking;
            }
            GenerationEvent::SummaryFailed { replaced, reason } => {
                let replaced = self.still_condensable(&replaced);
                let dropped = self.store.remove_messages(&replaced);
                self.context.record_trim(dropped);
                self.notice = Some(ContextNotice::trimmed(dropped));
                self.events.publish(Event::ContextTrimmed { dropped });
                warn!(reason = %reason, dropped, "Summary failed, trimmed history instead");
                self.notifications
                    .push(Notification::warning("Summary unavailable", reason));
                self.thinking = ThinkingStatus::Thinking;
            }
            GenerationEvent::RoundStarted => {
                self.thinking = ThinkingStatus::Thinking;
            }
            GenerationEvent::TextChunk(chunk) => {
                self.draft.push_str(&chunk);
            }
            GenerationEvent::RoundCompleted {
                assistant,
                tool_messages,
            } => self.apply_round(assistant, tool_messages),
            GenerationEvent::ToolStarted {
                message_id,
                name,
                ack,
            } => {
                let queued = self
                    .turn
                    .as_mut()
                    .and_then(|t| t.pending.remove(&message_id));
                if let Some(message) = queued {
                    if let Err(e) = self.store.append(message) {
                        warn!(error = %e, "Dropping malformed tool message");
                    }
                }
                if let Some(index) = self.step_for(&message_id) {
                    if let Err(e) = self.plan.mark_running(index) {
                        warn!(error = %e, "Plan step out of sync");
                    }
                }
                self.thinking = ThinkingStatus::UsingTool(name.clone());
                self.events.publish(Event::ToolStarted { name });
                // The task is waiting for this before it invokes the tool.
                self.publish();
                let _ = ack.send(());
            }
            GenerationEvent::ToolFinished {
                message_id,
                outcome,
            } => self.apply_tool_outcome(&message_id, outcome),
            GenerationEvent::Finished { message } => self.finish_turn(message),
            GenerationEvent::Failed(reason) => self.fail_turn(reason),
        }
    }

    fn apply_round(&mut self, assistant: Option<Message>, tool_messages: Vec<Message>) {
        self.draft.clear();
        if let Some(message) = assistant {
            if let Err(e) = self.store.append(message) {
                warn!(error = %e, "Dropping malformed assistant message");
            }
        }

        let names: Vec<String> = tool_messages
            .iter()
            .filter_map(|m| m.tool.as_ref().map(|t| t.name.clone()))
            .collect();
        let first = self.plan.append_steps(&names);

        if let Some(ref mut turn) = self.turn {
            for (offset, message) in tool_messages.into_iter().enumerate() {
                turn.steps.insert(message.id.clone(), first + offset);
                turn.pending.insert(message.id.clone(), message);
            }
        }
        self.thinking = ThinkingStatus::Processing;
    }

    fn apply_tool_outcome(&mut self, message_id: &MessageId, outcome: ToolOutcome) {
        let status = outcome.status();
        let name = self
            .store
            .get(message_id)
            .and_then(|m| m.tool.as_ref())
            .map(|t| t.name.clone())
            .unwrap_or_default();

        let error = outcome.error.as_ref().map(ToString::to_string);
        if let Err(e) = self.store.update_tool_status(
            message_id,
            status,
            outcome.raw_result.clone(),
            error.clone(),
        ) {
            warn!(error = %e, "Tool result could not be recorded");
        }

        if let Some(index) = self.step_for(message_id) {
            let marked = if outcome.succeeded() {
                self.plan.mark_completed(index)
            } else {
                self.plan.mark_failed(index)
            };
            if let Err(e) = marked {
                warn!(error = %e, "Plan step out of sync");
            }
        }

        match (outcome.raw_result.as_deref(), outcome.succeeded()) {
            (Some(raw), true) => match self.registry.parse(&name, raw) {
                Some(result) => debug!(tool = %name, summary = %result.summary(), "Tool result"),
                None => debug!(tool = %name, "Tool result has no typed view"),
            },
            _ => info!(tool = %name, error = ?error, "Tool call failed"),
        }

        self.events.publish(Event::ToolFinished {
            name,
            success: outcome.succeeded(),
        });
        self.thinking = ThinkingStatus::Processing;
    }

    fn finish_turn(&mut self, message: Option<Message>) {
        let Some(turn) = self.turn.take() else {
            return;
        };
        if let Some(message) = message {
            if let Err(e) = self.store.append(message) {
                warn!(error = %e, "Dropping malformed assistant message");
            }
        }
        self.draft.clear();
        self.thinking = ThinkingStatus::Idle;
        self.events
            .publish(Event::TurnFinished(self.store.active_id().clone()));
        debug!(generation = turn.id, kind = ?turn.kind, "Generation finished");
        self.save_active();
    }

    fn fail_turn(&mut self, reason: String) {
        let Some(turn) = self.turn.take() else {
            return;
        };
        self.draft.clear();
        self.store.fail_running_tools(&reason);
        self.plan.fail_unfinished();
        self.thinking = ThinkingStatus::Idle;
        self.error_banner = Some(reason.clone());
        warn!(generation = turn.id, reason = %reason, "Generation failed");
        self.events.publish(Event::TurnFailed {
            session: self.store.active_id().clone(),
            reason,
        });
        self.save_active();
    }

    /// Ids from a summary range that may still be removed. Messages
    /// pinned after the range was chosen are kept.
    fn still_condensable(&self, ids: &[MessageId]) -> Vec<MessageId> {
        ids.iter()
            .filter(|id| {
                self.store
                    .get(id)
                    .is_some_and(|m| is_trimmable(m) || m.is_summary())
            })
            .cloned()
            .collect()
    }

    fn step_for(&self, message_id: &MessageId) -> Option<usize> {
        self.turn.as_ref()?.steps.get(message_id).copied()
    }

    // ── Sessions ─────────────────────────────────────────────────────

    async fn switch_session(&mut self, id: SessionId) -> Result<(), SessionError> {
        if id == *self.store.active_id() {
            return Ok(());
        }
        if !self.store.contains(&id) {
            let session = self.load_persisted(&id).await?;
            self.store.insert_history(session);
        }

        self.cancel_generation();
        self.save_active();
        self.store.switch_session(&id)?;
        self.reset_session_view();
        self.events.publish(Event::SessionSwitched(id.clone()));
        info!(session = %id, "Switched session");
        Ok(())
    }

    fn start_new_session(&mut self) -> SessionId {
        self.cancel_generation();
        self.save_active();
        let id = self.store.start_new_session().clone();
        self.reset_session_view();
        self.events.publish(Event::SessionSwitched(id.clone()));
        info!(session = %id, "Started new session");
        id
    }

    fn delete_session(&mut self, id: &SessionId) -> Result<(), SessionError> {
        let persisted = self.persisted.iter().any(|s| s.id == *id);
        if !self.store.contains(id) && !persisted {
            return Err(SessionError::UnknownSession(id.to_string()));
        }
        let was_active = id == self.store.active_id();
        if was_active {
            self.cancel_generation();
        }

        self.store.delete_session(id);
        self.persisted.retain(|s| s.id != *id);
        if let Some(ref saver) = self.saver {
            let _ = saver.send(SaveJob::Delete(id.clone()));
        }
        if was_active {
            self.reset_session_view();
        }
        self.events.publish(Event::SessionDeleted(id.clone()));
        info!(session = %id, "Deleted session");
        Ok(())
    }

    async fn rename_session(&mut self, id: &SessionId, title: &str) -> Result<bool, SessionError> {
        if !self.store.contains(id) {
            let session = self.load_persisted(id).await?;
            self.store.insert_history(session);
        }
        let changed = self.store.rename_session(id, title)?;
        if changed {
            if id == self.store.active_id() {
                self.save_active();
            } else if let Some(session) = self.store.history_session(id) {
                self.enqueue_save(session.clone());
            }
        }
        Ok(changed)
    }

    async fn load_persisted(&mut self, id: &SessionId) -> Result<Session, SessionError> {
        let Some(persistence) = self.persistence.clone() else {
            return Err(SessionError::UnknownSession(id.to_string()));
        };
        match persistence.load(id).await {
            Ok(Some(session)) => {
                self.persisted.retain(|s| s.id != *id);
                Ok(session)
            }
            Ok(None) => {
                self.persisted.retain(|s| s.id != *id);
                Err(SessionError::UnknownSession(id.to_string()))
            }
            Err(e) => {
                warn!(session = %id, error = %e, "Failed to load session");
                Err(SessionError::UnknownSession(format!("{id}: {e}")))
            }
        }
    }

    fn reset_session_view(&mut self) {
        self.context.reset();
        self.plan.clear();
        self.draft.clear();
        self.notice = None;
        self.error_banner = None;
        self.thinking = ThinkingStatus::Idle;
    }

    fn save_active(&mut self) {
        if self.store.active().is_blank() {
            return;
        }
        let session = self.store.active().clone();
        self.enqueue_save(session);
    }

    fn enqueue_save(&self, session: Session) {
        if let Some(ref saver) = self.saver {
            let _ = saver.send(SaveJob::Save(Box::new(session)));
        }
    }

    fn sessions(&self) -> Vec<SessionSummary> {
        let mut list = self.store.list_sessions();
        for summary in &self.persisted {
            if !self.store.contains(&summary.id) {
                list.push(summary.clone());
            }
        }
        list.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        list.truncate(self.config.history_limit);
        list
    }

    fn publish(&mut self) {
        self.version += 1;
        let messages = self.store.messages();
        let context = self.context.stats(messages);
        let state = ConversationState {
            version: self.version,
            session_id: self.store.active_id().clone(),
            title: self.store.active().title.clone(),
            messages: Arc::new(messages.to_vec()),
            draft: self.draft.clone(),
            thinking: self.thinking.clone(),
            plan: self.plan.visible_plan(),
            usage_band: self.context.band(&context),
            context,
            pinned: self.store.pinned(),
            notifications: self.notifications.visible(),
            context_notice: self.notice.clone(),
            error_banner: self.error_banner.clone(),
            undo_available: self.undo.is_available_for(self.store.active_id()),
            sessions: self.sessions(),
        };
        self.state_tx.send_replace(state);
    }
}

/// Applies save and delete jobs in order, off the actor's path.
fn spawn_saver(
    persistence: Arc<dyn SessionPersistence>,
    internal: mpsc::UnboundedSender<Internal>,
) -> mpsc::UnboundedSender<SaveJob> {
    let (tx, mut rx) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        while let Some(job) = rx.recv().await {
            match job {
                SaveJob::Save(session) => {
                    if let Err(e) = persistence.save(&session).await {
                        let _ = internal.send(Internal::SaveFailed {
                            session: session.id.clone(),
                            reason: e.to_string(),
                        });
                    }
                }
                SaveJob::Delete(id) => {
                    if let Err(e) = persistence.delete(&id).await {
                        warn!(session = %id, error = %e, "Failed to delete saved session");
                    }
                }
                SaveJob::Flush(reply) => {
                    let _ = reply.send(Ok(()));
                }
            }
        }
    });
    tx
}
