//! Conversation orchestrator.
//!
//! A single actor task owns the store, context window, plan tracker and
//! undo snapshot. The provider stream and tool invocations run in a
//! separate cancellable task that reports back to the actor, and every
//! mutation ends with a new [`ConversationState`] published on a watch
//! channel.
//!
//! # Example
//!
//! ```rust,ignore
//! let handle = Orchestrator::builder(provider)
//!     .tools(tools)
//!     .persistence(Arc::new(JsonFilePersistence::new(dir)))
//!     .spawn();
//! handle.send("What's the weather in Oslo?", None).await?;
//! let state = handle.wait_idle().await?;
//! ```

mod actor;
mod generation;
mod handle;
mod state;


use std::sync::Arc;
use std::time::Duration;

use parley_ai::{ModelProvider, TokenEstimator, ToolResult, ToolResultRegistry, ToolSet};
use parley_common::{EventBus, SessionId};
use parley_config::schema::ContextConfig;
use parley_config::ParleyConfig;
use tokio::sync::{mpsc, watch};

use crate::context::ContextWindow;
use crate::persistence::SessionPersistence;
use crate::store::Session;

pub use handle::OrchestratorHandle;
pub use state::{ContextNotice, ConversationState, NoticeKind, ThinkingStatus};

/// Runtime settings derived from [`ParleyConfig`].
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub system_prompt: Option<String>,
    /// Backstop applied to every tool call.
    pub tool_timeout: Duration,
    pub max_tool_rounds: u32,
    pub disabled_tools: Vec<String>,
    pub context: ContextConfig,
    pub auto_title_chars: usize,
    pub history_limit: usize,
}

impl From<&ParleyConfig> for OrchestratorConfig {
    fn from(config: &ParleyConfig) -> Self {
        Self {
            system_prompt: config
                .session
                .system_prompt
                .clone()
                .filter(|p| !p.trim().is_empty()),
            tool_timeout: Duration::from_secs(u64::from(config.tools.call_timeout_secs)),
            max_tool_rounds: config.tools.max_tool_rounds,
            disabled_tools: config.tools.disabled.clone(),
            context: config.context.clone(),
            auto_title_chars: config.session.auto_title_chars as usize,
            history_limit: config.session.history_limit as usize,
        }
    }
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self::from(&ParleyConfig::default())
    }
}

/// Source of typed tool result views.
#[derive(Clone)]
pub(crate) enum ResultParsers {
    /// `ToolResultRegistry::global()`, so parsers registered after spawn
    /// still apply.
    Global,
    Fixed(Arc<ToolResultRegistry>),
}

impl ResultParsers {
    pub(crate) fn parse(&self, tool_name: &str, raw_json: &str) -> Option<ToolResult> {
        match self {
            ResultParsers::Global => ToolResultRegistry::global()
                .read()
                .ok()?
                .parse(tool_name, raw_json),
            ResultParsers::Fixed(registry) => registry.parse(tool_name, raw_json),
        }
    }
}

pub struct Orchestrator;

impl Orchestrator {
    pub fn builder(provider: Arc<dyn ModelProvider>) -> OrchestratorBuilder {
        OrchestratorBuilder {
            provider,
            tools: ToolSet::new(),
            registry: None,
            persistence: None,
            estimator: None,
            config: OrchestratorConfig::default(),
            session: None,
            resume: None,
        }
    }
}

pub struct OrchestratorBuilder {
    provider: Arc<dyn ModelProvider>,
    tools: ToolSet,
    registry: Option<Arc<ToolResultRegistry>>,
    persistence: Option<Arc<dyn SessionPersistence>>,
    estimator: Option<Arc<dyn TokenEstimator>>,
    config: OrchestratorConfig,
    session: Option<Session>,
    resume: Option<SessionId>,
}

impl OrchestratorBuilder {
    pub fn config(mut self, config: OrchestratorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn tools(mut self, tools: ToolSet) -> Self {
        self.tools = tools;
        self
    }

    /// Result registry used for typed tool views. Defaults to the
    /// process-wide registry, read on every parse.
    pub fn registry(mut self, registry: Arc<ToolResultRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn persistence(mut self, persistence: Arc<dyn SessionPersistence>) -> Self {
        self.persistence = Some(persistence);
        self
    }

    /// Replace the character-ratio estimator built from `[context]`.
    pub fn estimator(mut self, estimator: Arc<dyn TokenEstimator>) -> Self {
        self.estimator = Some(estimator);
        self
    }

    /// Start with `session` as the active session.
    pub fn session(mut self, session: Session) -> Self {
        self.session = Some(session);
        self
    }

    /// Load session `id` from persistence on startup.
    pub fn resume(mut self, id: SessionId) -> Self {
        self.resume = Some(id);
        self
    }

    /// Spawn the actor on the current tokio runtime.
    pub fn spawn(self) -> OrchestratorHandle {
        let registry = match self.registry {
            Some(registry) => ResultParsers::Fixed(registry),
            None => ResultParsers::Global,
        };
        let context = match self.estimator {
            Some(estimator) => ContextWindow::new((&self.config.context).into(), estimator),
            None => ContextWindow::from_config(&self.config.context),
        };

        let (command_tx, command_rx) = mpsc::channel(64);
        let (internal_tx, internal_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(ConversationState::default());
        let events = EventBus::new(256);

        let actor = actor::Actor::new(
            actor::ActorParts {
                config: self.config,
                provider: self.provider,
                tools: self.tools,
                registry: registry.clone(),
                persistence: self.persistence,
                context,
                session: self.session,
                resume: self.resume,
                state_tx,
                events: events.clone(),
            },
            internal_tx,
        );
        tokio::spawn(actor.run(command_rx, internal_rx));

        OrchestratorHandle::new(command_tx, state_rx, events, registry)
    }
}
