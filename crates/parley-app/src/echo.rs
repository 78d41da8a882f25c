//! Offline provider that streams the user's words back.

use std::time::Duration;

use async_trait::async_trait;
use futures_util::stream::{self, StreamExt};
use parley_ai::{AiError, Delta, DeltaStream, Message, ModelProvider, Role, ToolSchema};

pub struct EchoProvider {
    chunk_delay: Duration,
}

impl EchoProvider {
    pub fn new(chunk_delay: Duration) -> Self {
        Self { chunk_delay }
    }
}

impl Default for EchoProvider {
    fn default() -> Self {
        Self::new(Duration::from_millis(25))
    }
}

/// The text the echo provider answers `transcript` with.
pub fn reply_for(transcript: &[Message]) -> String {
    match transcript.last() {
        Some(last) if last.role == Role::User => {
            let mut reply = format!("You said: {}", last.content.trim());
            if last.image.is_some() {
                reply.push_str(" [with an image]");
            }
            reply
        }
        _ => {
            let earlier = transcript.iter().filter(|m| m.role != Role::System).count();
            let noun = if earlier == 1 { "message" } else { "messages" };
            format!("({earlier} earlier {noun})")
        }
    }
}

/// Split `text` into word-sized chunks that keep their trailing spaces.
fn chunks(text: &str) -> Vec<String> {
    text.split_inclusive(' ').map(str::to_string).collect()
}

#[async_trait]
impl ModelProvider for EchoProvider {
    async fn stream(
        &self,
        transcript: &[Message],
        _tools: &[ToolSchema],
    ) -> Result<DeltaStream, AiError> {
        let delay = self.chunk_delay;
        let words = stream::iter(chunks(&reply_for(transcript))).then(move |chunk| async move {
            tokio::time::sleep(delay).await;
            Delta::TextChunk(chunk)
        });
        Ok(words.chain(stream::once(async { Delta::Done })).boxed())
    }

    fn name(&self) -> &str {
        "echo"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn echoes_last_user_message() {
        let transcript = vec![Message::assistant("hi"), Message::user("  hello there ")];
        assert_eq!(reply_for(&transcript), "You said: hello there");
    }

    #[test]
    fn counts_messages_when_not_answering_a_user() {
        let transcript = vec![
            Message::system("Summarize."),
            Message::user("a"),
            Message::assistant("b"),
        ];
        assert_eq!(reply_for(&transcript), "(2 earlier messages)");
    }

    #[test]
    fn chunks_rejoin_to_original() {
        let parts = chunks("one two  three");
        assert_eq!(parts.len(), 4);
        assert_eq!(parts.concat(), "one two  three");
    }

    #[tokio::test]
    async fn streams_chunks_then_done() {
        let provider = EchoProvider::new(Duration::ZERO);
        let stream = provider
            .stream(&[Message::user("ping pong")], &[])
            .await
            .unwrap();
        let deltas: Vec<Delta> = stream.collect().await;
        assert_eq!(
            deltas,
            vec![
                Delta::TextChunk("You ".into()),
                Delta::TextChunk("said: ".into()),
                Delta::TextChunk("ping ".into()),
                Delta::TextChunk("pong".into()),
                Delta::Done,
            ]
        );
    }
}
