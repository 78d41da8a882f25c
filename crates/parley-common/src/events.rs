use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::id::SessionId;

/// Conversation lifecycle events, published alongside state snapshots so
/// observers can react to transitions without diffing snapshots.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum Event {
    TurnStarted(SessionId),
    TurnFinished(SessionId),
    TurnFailed { session: SessionId, reason: String },
    TurnCancelled(SessionId),
    ToolStarted { name: String },
    ToolFinished { name: String, success: bool },
    ContextTrimmed { dropped: usize },
    ContextSummarized { replaced: usize },
    SessionSwitched(SessionId),
    SessionDeleted(SessionId),
    Shutdown,
    #[serde(other)]
    Unknown,
}

pub struct EventBus {
    sender: broadcast::Sender<Event>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.sender.subscribe()
    }

    pub fn publish(&self, event: Event) -> usize {
        self.sender.send(event).unwrap_or(0)
    }
}

impl Clone for EventBus {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn publish_and_receive() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();

        bus.publish(Event::ContextTrimmed { dropped: 2 });

        let event = rx.recv().await.unwrap();
        assert!(matches!(event, Event::ContextTrimmed { dropped: 2 }));
    }

    #[tokio::test]
    async fn turn_events_arrive_in_order() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();
        let session = SessionId::from("s1");

        bus.publish(Event::TurnStarted(session.clone()));
        bus.publish(Event::ToolStarted {
            name: "weather".into(),
        });
        bus.publish(Event::TurnFinished(session.clone()));

        assert!(matches!(rx.recv().await.unwrap(), Event::TurnStarted(ref s) if *s == session));
        assert!(
            matches!(rx.recv().await.unwrap(), Event::ToolStarted { ref name } if name == "weather")
        );
        assert!(matches!(rx.recv().await.unwrap(), Event::TurnFinished(_)));
    }

    #[tokio::test]
    async fn cloned_bus_shares_subscribers() {
        let bus = EventBus::new(16);
        let clone = bus.clone();
        let mut rx = bus.subscribe();

        clone.publish(Event::Shutdown);
        assert!(matches!(rx.recv().await.unwrap(), Event::Shutdown));
    }

    #[test]
    fn publish_returns_zero_with_no_subscribers() {
        let bus = EventBus::new(16);
        assert_eq!(bus.publish(Event::Shutdown), 0);
    }

    #[test]
    fn unknown_event_deserializes() {
        let json = r#"{"type":"SomeNewEventWeNeverHeardOf","data":null}"#;
        let event: Event = serde_json::from_str(json).unwrap();
        assert!(matches!(event, Event::Unknown));
    }
}
