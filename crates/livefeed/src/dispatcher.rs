//! Per-topic feed logs.
//!
//! The dispatcher turns raw inbound frames into timestamped, locally
//! identified records and appends them to the log of the topic they arrived
//! on. Bodies are opaque text; nothing is parsed or validated here.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use metrics::counter;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use uuid::Uuid;

/// One record received on a subscribed topic.
///
/// `received_at` is assigned from the local wall clock on arrival; it is a
/// presentation timestamp, not a broker-assigned one.
#[derive(Debug, Clone, Serialize)]
pub struct InboundMessage {
    /// Locally generated identifier, unique per record.
    pub local_id: Uuid,
    /// Topic the message arrived on.
    pub topic: String,
    /// Opaque message text, exactly as delivered.
    pub raw_body: String,
    /// Local arrival time.
    pub received_at: DateTime<Utc>,
}

/// Append-only, per-topic message logs.
///
/// Logs are created lazily on first message, preserve arrival order, never
/// deduplicate, and grow until explicitly cleared. Cloning is cheap and all
/// clones share the same logs.
#[derive(Debug, Clone, Default)]
pub struct FeedDispatcher {
    inner: Arc<DispatcherInner>,
}

#[derive(Debug, Default)]
struct DispatcherInner {
    logs: DashMap<String, Vec<InboundMessage>>,
    total_received: AtomicU64,
}

impl FeedDispatcher {
    /// Create an empty dispatcher.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one raw frame into its topic's log.
    pub fn on_message(&self, topic: &str, raw_body: &str) {
        let record = InboundMessage {
            local_id: Uuid::new_v4(),
            topic: topic.to_string(),
            raw_body: raw_body.to_string(),
            received_at: Utc::now(),
        };

        self.inner
            .logs
            .entry(topic.to_string())
            .or_default()
            .push(record);
        self.inner.total_received.fetch_add(1, Ordering::Relaxed);
        counter!("feed_messages_received_total", "topic" => topic.to_string()).increment(1);
    }

    /// Handler suitable for `Session::subscribe`, appending into this
    /// dispatcher.
    pub fn handler(&self) -> impl Fn(&str, &str) + Send + Sync + 'static {
        let dispatcher = self.clone();
        move |topic, body| dispatcher.on_message(topic, body)
    }

    /// Point-in-time copy of a topic's log, in arrival order. Unknown topics
    /// yield an empty list.
    pub fn snapshot(&self, topic: &str) -> Vec<InboundMessage> {
        self.inner
            .logs
            .get(topic)
            .map(|log| log.clone())
            .unwrap_or_default()
    }

    /// Number of records currently held for a topic.
    pub fn len(&self, topic: &str) -> usize {
        self.inner.logs.get(topic).map(|log| log.len()).unwrap_or(0)
    }

    /// Whether no topic holds any record.
    pub fn is_empty(&self) -> bool {
        self.inner.logs.iter().all(|log| log.is_empty())
    }

    /// Empty one topic's log. Other topics are untouched.
    pub fn clear(&self, topic: &str) {
        if let Some(mut log) = self.inner.logs.get_mut(topic) {
            log.clear();
        }
    }

    /// Dispatcher statistics.
    pub fn stats(&self) -> FeedStats {
        FeedStats {
            topic_count: self.inner.logs.len(),
            total_received: self.inner.total_received.load(Ordering::Relaxed),
        }
    }
}

/// Dispatcher statistics.
#[derive(Debug, Clone, Serialize)]
pub struct FeedStats {
    /// Topics with a log created (including cleared ones).
    pub topic_count: usize,
    /// Messages recorded since creation, across all topics.
    pub total_received: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_snapshot_preserves_arrival_order() {
        let dispatcher = FeedDispatcher::new();
        for i in 0..50 {
            dispatcher.on_message("/topic/match-events", &format!("event {i}"));
        }

        let log = dispatcher.snapshot("/topic/match-events");
        assert_eq!(log.len(), 50);
        for (i, record) in log.iter().enumerate() {
            assert_eq!(record.raw_body, format!("event {i}"));
            assert_eq!(record.topic, "/topic/match-events");
        }
    }

    #[test]
    fn test_local_ids_are_distinct() {
        let dispatcher = FeedDispatcher::new();
        for _ in 0..100 {
            dispatcher.on_message("/topic/notifications", "ping");
        }

        let ids: HashSet<Uuid> = dispatcher
            .snapshot("/topic/notifications")
            .iter()
            .map(|m| m.local_id)
            .collect();
        assert_eq!(ids.len(), 100);
    }

    #[test]
    fn test_clear_affects_single_topic() {
        let dispatcher = FeedDispatcher::new();
        dispatcher.on_message("/topic/match-events", "goal");
        dispatcher.on_message("/topic/match-comments", "what a strike");
        dispatcher.on_message("/topic/match-comments", "offside surely");

        dispatcher.clear("/topic/match-comments");

        assert_eq!(dispatcher.len("/topic/match-comments"), 0);
        assert_eq!(dispatcher.len("/topic/match-events"), 1);
        assert_eq!(dispatcher.stats().total_received, 3);
    }

    #[test]
    fn test_snapshot_is_a_copy() {
        let dispatcher = FeedDispatcher::new();
        dispatcher.on_message("/topic/notifications", "first");

        let before = dispatcher.snapshot("/topic/notifications");
        dispatcher.on_message("/topic/notifications", "second");

        assert_eq!(before.len(), 1);
        assert_eq!(dispatcher.len("/topic/notifications"), 2);
    }

    #[test]
    fn test_unknown_topic_is_empty() {
        let dispatcher = FeedDispatcher::new();
        assert!(dispatcher.snapshot("/topic/unknown").is_empty());
        assert_eq!(dispatcher.len("/topic/unknown"), 0);
        dispatcher.clear("/topic/unknown");
    }

    #[test]
    fn test_raw_body_is_not_interpreted() {
        let dispatcher = FeedDispatcher::new();
        dispatcher.on_message("/topic/match-comments", "not json {{{");

        let log = dispatcher.snapshot("/topic/match-comments");
        assert_eq!(log[0].raw_body, "not json {{{");
    }
}
