//! The in-flight generation task.
//!
//! Runs one turn against the provider: an optional summarization round,
//! then provider rounds with sequential tool execution between them.
//! Everything it learns is sent back to the actor, which is the only
//! writer of conversation state. The task never touches the store.

use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use parley_ai::results::is_error_payload;
use parley_ai::{Delta, Message, ModelProvider, ToolError, ToolSchema, ToolSet, ToolStatus};
use parley_common::{new_correlation_id, MessageId};
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::actor::Internal;

const SUMMARY_INSTRUCTION: &str = "Summarize the conversation so far in a few sentences. \
Keep names, numbers, decisions and open questions. Reply with the summary only.";

/// Progress reported by a generation task.
#[derive(Debug)]
pub(super) enum GenerationEvent {
    SummaryReady {
        replaced: Vec<MessageId>,
        summary: Message,
    },
    SummaryFailed {
        replaced: Vec<MessageId>,
        reason: String,
    },
    RoundStarted,
    TextChunk(String),
    /// A provider round ended with tool calls, listed in request order.
    /// Each tool message is stored when its `ToolStarted` is applied.
    RoundCompleted {
        assistant: Option<Message>,
        tool_messages: Vec<Message>,
    },
    /// Sent before invocation; the task waits for `ack`.
    ToolStarted {
        message_id: MessageId,
        name: String,
        ack: oneshot::Sender<()>,
    },
    ToolFinished {
        message_id: MessageId,
        outcome: ToolOutcome,
    },
    Finished {
        message: Option<Message>,
    },
    Failed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub(super) struct ToolOutcome {
    pub raw_result: Option<String>,
    pub error: Option<ToolError>,
}

impl ToolOutcome {
    /// A payload flagged `"error": true` is a failure even when the tool
    /// itself returned successfully.
    fn settle(result: Result<String, ToolError>) -> Self {
        match result {
            Ok(raw) => {
                let error = error_payload_reason(&raw).map(ToolError::Execution);
                Self {
                    raw_result: Some(raw),
                    error,
                }
            }
            Err(e) => Self {
                raw_result: None,
                error: Some(e),
            },
        }
    }

    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }

    pub fn status(&self) -> ToolStatus {
        if self.succeeded() {
            ToolStatus::Completed
        } else {
            ToolStatus::Failed
        }
    }
}

fn error_payload_reason(raw: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(raw).ok()?;
    if !is_error_payload(&value) {
        return None;
    }
    let reason = ["message", "reason", "detail"]
        .iter()
        .find_map(|key| value.get(*key).and_then(|v| v.as_str()))
        .unwrap_or("tool reported an error");
    Some(reason.to_string())
}

enum RoundError {
    Cancelled,
    Failed(String),
}

struct RoundOutput {
    text: String,
    calls: Vec<(String, String)>,
}

pub(super) struct Generation {
    pub id: u64,
    pub provider: Arc<dyn ModelProvider>,
    pub tools: Arc<ToolSet>,
    pub schemas: Arc<Vec<ToolSchema>>,
    pub disabled: Arc<Vec<String>>,
    pub system_prompt: Option<String>,
    pub tool_timeout: Duration,
    pub max_tool_rounds: u32,
    pub cancel: CancellationToken,
    pub tx: mpsc::UnboundedSender<Internal>,
}

impl Generation {
    /// Drive a full reply turn over `transcript`.
    pub async fn run_turn(self, mut transcript: Vec<Message>, summarize: Option<Vec<Message>>) {
        if let Some(range) = summarize {
            let replaced: Vec<MessageId> = range.iter().map(|m| m.id.clone()).collect();
            transcript.retain(|m| !replaced.contains(&m.id));
            match self.summarize(&range).await {
                Ok(text) => {
                    let summary = Message::summary(text);
                    transcript.insert(0, summary.clone());
                    self.emit(GenerationEvent::SummaryReady { replaced, summary });
                }
                Err(RoundError::Cancelled) => return,
                Err(RoundError::Failed(reason)) => {
                    self.emit(GenerationEvent::SummaryFailed { replaced, reason });
                }
            }
        }

        let mut tool_rounds = 0;
        loop {
            self.emit(GenerationEvent::RoundStarted);
            let output = match self.stream_round(&transcript, true).await {
                Ok(output) => output,
                Err(RoundError::Cancelled) => return,
                Err(RoundError::Failed(reason)) => {
                    self.emit(GenerationEvent::Failed(reason));
                    return;
                }
            };

            let assistant = (!output.text.is_empty()).then(|| Message::assistant(output.text));
            if output.calls.is_empty() {
                self.emit(GenerationEvent::Finished { message: assistant });
                return;
            }
            if tool_rounds >= self.max_tool_rounds {
                warn!(
                    generation = self.id,
                    rounds = tool_rounds,
                    "Tool round limit reached, finishing turn"
                );
                self.emit(GenerationEvent::Finished { message: assistant });
                return;
            }
            tool_rounds += 1;

            let tool_messages: Vec<Message> = output
                .calls
                .into_iter()
                .map(|(name, arguments)| Message::tool_call(name, new_correlation_id(), arguments))
                .collect();
            self.emit(GenerationEvent::RoundCompleted {
                assistant: assistant.clone(),
                tool_messages: tool_messages.clone(),
            });
            transcript.extend(assistant);

            for message in tool_messages {
                match self.run_tool(message).await {
                    Some(done) => transcript.push(done),
                    None => return,
                }
            }
        }
    }

    /// Re-invoke one failed tool call. The provider is not consulted.
    pub async fn run_retry(self, message: Message) {
        if self.run_tool(message).await.is_some() {
            self.emit(GenerationEvent::Finished { message: None });
        }
    }

    /// Invoke the tool behind a `Running` tool message. Returns the
    /// settled message, or `None` once the generation is cancelled.
    async fn run_tool(&self, mut message: Message) -> Option<Message> {
        let (name, arguments) = {
            let meta = message.tool.as_ref()?;
            (meta.name.clone(), meta.arguments.clone())
        };

        let (ack, acked) = oneshot::channel();
        self.emit(GenerationEvent::ToolStarted {
            message_id: message.id.clone(),
            name: name.clone(),
            ack,
        });
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return None,
            res = acked => res.ok()?,
        }

        let result = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return None,
            res = self.invoke(&name, &arguments) => res,
        };
        let outcome = ToolOutcome::settle(result);
        debug!(tool = %name, success = outcome.succeeded(), "Tool call settled");

        if let Some(ref mut meta) = message.tool {
            meta.status = outcome.status();
            meta.raw_result = outcome.raw_result.clone();
            meta.error = outcome.error.as_ref().map(ToString::to_string);
        }
        self.emit(GenerationEvent::ToolFinished {
            message_id: message.id.clone(),
            outcome,
        });
        Some(message)
    }

    async fn invoke(&self, name: &str, arguments: &str) -> Result<String, ToolError> {
        if self.disabled.iter().any(|d| d == name) {
            return Err(ToolError::NotFound(name.to_string()));
        }
        let tool = self
            .tools
            .get(name)
            .ok_or_else(|| ToolError::NotFound(name.to_string()))?;
        match tokio::time::timeout(self.tool_timeout, tool.invoke(arguments)).await {
            Ok(result) => result,
            Err(_) => Err(ToolError::Timeout(self.tool_timeout.as_secs())),
        }
    }

    async fn summarize(&self, range: &[Message]) -> Result<String, RoundError> {
        let mut request = Vec::with_capacity(range.len() + 1);
        request.push(Message::system(SUMMARY_INSTRUCTION));
        request.extend(range.iter().cloned());

        let output = self.collect(&request, &[], false).await?;
        let text = output.text.trim();
        if text.is_empty() {
            return Err(RoundError::Failed("provider returned an empty summary".into()));
        }
        Ok(text.to_string())
    }

    async fn stream_round(
        &self,
        transcript: &[Message],
        emit_chunks: bool,
    ) -> Result<RoundOutput, RoundError> {
        let mut request = Vec::with_capacity(transcript.len() + 1);
        if let Some(ref prompt) = self.system_prompt {
            request.push(Message::system(prompt.clone()));
        }
        request.extend(transcript.iter().cloned());
        self.collect(&request, &self.schemas, emit_chunks).await
    }

    async fn collect(
        &self,
        request: &[Message],
        schemas: &[ToolSchema],
        emit_chunks: bool,
    ) -> Result<RoundOutput, RoundError> {
        let mut stream = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return Err(RoundError::Cancelled),
            res = self.provider.stream(request, schemas) => {
                res.map_err(|e| RoundError::Failed(e.to_string()))?
            }
        };

        let mut output = RoundOutput {
            text: String::new(),
            calls: Vec::new(),
        };
        loop {
            let delta = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Err(RoundError::Cancelled),
                delta = stream.next() => delta,
            };
            match delta {
                None | Some(Delta::Done) => break,
                Some(Delta::TextChunk(chunk)) => {
                    output.text.push_str(&chunk);
                    if emit_chunks {
                        self.emit(GenerationEvent::TextChunk(chunk));
                    }
                }
                Some(Delta::ToolCallRequested { name, arguments }) => {
                    debug!(tool = %name, "Provider requested tool call");
                    output.calls.push((name, arguments));
                }
                Some(Delta::ErrorOccurred(reason)) => return Err(RoundError::Failed(reason)),
            }
        }
        Ok(output)
    }

    fn emit(&self, event: GenerationEvent) {
        let _ = self.tx.send(Internal::Generation {
            id: self.id,
            event,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_payload_becomes_failure() {
        let outcome = ToolOutcome::settle(Ok(r#"{"error":true,"message":"city not found"}"#.into()));
        assert_eq!(outcome.status(), ToolStatus::Failed);
        assert_eq!(
            outcome.error,
            Some(ToolError::Execution("city not found".into()))
        );
        assert!(outcome.raw_result.is_some());
    }

    #[test]
    fn plain_payload_succeeds() {
        let outcome = ToolOutcome::settle(Ok(r#"{"expression":"1+1","result":2}"#.into()));
        assert!(outcome.succeeded());
        assert_eq!(outcome.status(), ToolStatus::Completed);
    }

    #[test]
    fn tool_error_has_no_payload() {
        let outcome = ToolOutcome::settle(Err(ToolError::Timeout(30)));
        assert_eq!(outcome.raw_result, None);
        assert_eq!(outcome.status(), ToolStatus::Failed);
    }

    #[test]
    fn error_reason_falls_back_to_generic_text() {
        assert_eq!(
            error_payload_reason(r#"{"error":true}"#).as_deref(),
            Some("tool reported an error")
        );
        assert_eq!(error_payload_reason("not json"), None);
    }
}
