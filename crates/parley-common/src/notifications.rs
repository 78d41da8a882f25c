use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

static NEXT_NOTIFICATION_ID: AtomicU64 = AtomicU64::new(1);

/// Severity level for in-app notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Info,
    Warning,
    Error,
}

/// A dismissible banner shown by the presentation layer.
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub id: u64,
    pub level: NotificationLevel,
    pub title: String,
    pub body: String,
    pub created_at: Instant,
    /// `None` keeps the banner until it is dismissed.
    pub ttl: Option<Duration>,
}

impl Notification {
    fn build(
        level: NotificationLevel,
        title: impl Into<String>,
        body: impl Into<String>,
        ttl: Option<Duration>,
    ) -> Self {
        Self {
            id: NEXT_NOTIFICATION_ID.fetch_add(1, Ordering::Relaxed),
            level,
            title: title.into(),
            body: body.into(),
            created_at: Instant::now(),
            ttl,
        }
    }

    /// Creates an info notification with a 5-second TTL.
    pub fn info(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self::build(
            NotificationLevel::Info,
            title,
            body,
            Some(Duration::from_secs(5)),
        )
    }

    /// Creates a warning notification with an 8-second TTL.
    pub fn warning(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self::build(
            NotificationLevel::Warning,
            title,
            body,
            Some(Duration::from_secs(8)),
        )
    }

    /// Creates an error notification that stays until dismissed.
    pub fn error(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self::build(NotificationLevel::Error, title, body, None)
    }

    /// Returns `true` if this notification has exceeded its TTL.
    pub fn is_expired(&self) -> bool {
        self.ttl
            .map(|ttl| self.created_at.elapsed() >= ttl)
            .unwrap_or(false)
    }
}

/// A bounded queue of in-app notifications that auto-evicts expired entries.
#[derive(Debug)]
pub struct NotificationQueue {
    items: VecDeque<Notification>,
    capacity: usize,
}

impl NotificationQueue {
    /// Creates a new queue with the given maximum capacity.
    pub fn new(capacity: usize) -> Self {
        Self {
            items: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Pushes a notification, evicting expired entries first.
    /// If still at capacity after eviction, the oldest entry is removed.
    pub fn push(&mut self, notification: Notification) {
        self.evict_expired();
        if self.items.len() >= self.capacity {
            self.items.pop_front();
        }
        self.items.push_back(notification);
    }

    /// Returns clones of all currently visible (non-expired) notifications.
    pub fn visible(&mut self) -> Vec<Notification> {
        self.evict_expired();
        self.items.iter().cloned().collect()
    }

    /// Removes a notification by id. Returns `false` if it was not queued.
    pub fn dismiss(&mut self, id: u64) -> bool {
        let before = self.items.len();
        self.items.retain(|n| n.id != id);
        self.items.len() != before
    }

    /// Returns `true` if an unexpired notification of `level` is queued.
    pub fn has_level(&mut self, level: NotificationLevel) -> bool {
        self.evict_expired();
        self.items.iter().any(|n| n.level == level)
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Returns the number of notifications currently in the queue (including expired).
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns `true` if the queue is empty.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    fn evict_expired(&mut self) {
        self.items.retain(|n| !n.is_expired());
    }
}

impl Default for NotificationQueue {
    fn default() -> Self {
        Self::new(16)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_notifications_are_sticky() {
        let n = Notification::error("Stream failed", "connection reset");
        assert_eq!(n.ttl, None);
        assert!(!n.is_expired());
    }

    #[test]
    fn zero_ttl_expires_immediately() {
        let mut n = Notification::info("Trimmed", "2 messages");
        n.ttl = Some(Duration::ZERO);
        assert!(n.is_expired());
    }

    #[test]
    fn ids_are_distinct() {
        let a = Notification::info("a", "");
        let b = Notification::info("b", "");
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn queue_drops_oldest_at_capacity() {
        let mut queue = NotificationQueue::new(2);
        queue.push(Notification::error("one", ""));
        queue.push(Notification::error("two", ""));
        queue.push(Notification::error("three", ""));

        let titles: Vec<_> = queue.visible().into_iter().map(|n| n.title).collect();
        assert_eq!(titles, vec!["two", "three"]);
    }

    #[test]
    fn queue_evicts_expired_on_visible() {
        let mut queue = NotificationQueue::default();
        let mut stale = Notification::warning("stale", "");
        stale.ttl = Some(Duration::ZERO);
        queue.push(stale);
        queue.push(Notification::error("fresh", ""));

        let visible = queue.visible();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].title, "fresh");
    }

    #[test]
    fn dismiss_removes_by_id() {
        let mut queue = NotificationQueue::default();
        let n = Notification::error("banner", "");
        let id = n.id;
        queue.push(n);

        assert!(queue.has_level(NotificationLevel::Error));
        assert!(queue.dismiss(id));
        assert!(!queue.dismiss(id));
        assert!(queue.is_empty());
    }
}
