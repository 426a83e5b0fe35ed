//! Boundary normalization of inbound feed payloads.
//!
//! Feed logs keep bodies opaque; consumers that want structure go through
//! here exactly once. Producers are inconsistent about field names and types
//! (`text` vs `comment`, numbers as strings), so the lookups tolerate both
//! and plain text degrades to a usable record instead of an error.

use crate::{TOPIC_MATCH_COMMENTS, TOPIC_MATCH_EVENTS};
use serde_json::Value;

/// Normalized view of one inbound payload, tagged by kind.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedEvent {
    Comment(CommentView),
    MatchEvent(MatchEventView),
    Notice(String),
}

/// A user comment as shown in the feed.
#[derive(Debug, Clone, PartialEq)]
pub struct CommentView {
    pub match_id: Option<i64>,
    pub username: Option<String>,
    pub text: String,
    pub timestamp: Option<String>,
    pub rating: Option<u8>,
}

/// A match event as shown in the feed.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchEventView {
    pub match_id: Option<i64>,
    pub event_type: Option<String>,
    pub minute: Option<u32>,
    pub team: Option<String>,
    pub player: Option<String>,
    pub description: String,
}

/// Normalize one raw payload according to the topic it arrived on.
///
/// Unrecognized topics come back as [`FeedEvent::Notice`] with the body
/// untouched.
pub fn normalize(topic: &str, raw_body: &str) -> FeedEvent {
    match topic {
        TOPIC_MATCH_COMMENTS => FeedEvent::Comment(normalize_comment(raw_body)),
        TOPIC_MATCH_EVENTS => FeedEvent::MatchEvent(normalize_match_event(raw_body)),
        _ => FeedEvent::Notice(raw_body.to_string()),
    }
}

/// Normalize a comment payload. JSON objects are read with `text` preferred
/// over the legacy `comment` field; anything else is treated as the comment
/// text itself.
pub fn normalize_comment(raw_body: &str) -> CommentView {
    let Ok(Value::Object(map)) = serde_json::from_str::<Value>(raw_body) else {
        return CommentView {
            match_id: None,
            username: None,
            text: raw_body.to_string(),
            timestamp: None,
            rating: None,
        };
    };

    let text = string_field(&map, "text")
        .or_else(|| string_field(&map, "comment"))
        .unwrap_or_else(|| raw_body.to_string());

    CommentView {
        match_id: int_field(&map, "matchId"),
        username: string_field(&map, "username"),
        text,
        timestamp: string_field(&map, "timestamp"),
        rating: int_field(&map, "rating").and_then(|r| u8::try_from(r).ok()),
    }
}

/// Normalize a match-event payload. Plain text becomes the description of an
/// otherwise-empty event.
pub fn normalize_match_event(raw_body: &str) -> MatchEventView {
    let Ok(Value::Object(map)) = serde_json::from_str::<Value>(raw_body) else {
        return MatchEventView {
            match_id: None,
            event_type: None,
            minute: None,
            team: None,
            player: None,
            description: raw_body.to_string(),
        };
    };

    MatchEventView {
        match_id: int_field(&map, "matchId"),
        event_type: string_field(&map, "eventType").or_else(|| string_field(&map, "eventtype")),
        minute: int_field(&map, "minute").and_then(|m| u32::try_from(m).ok()),
        team: string_field(&map, "team"),
        player: string_field(&map, "player"),
        description: string_field(&map, "description").unwrap_or_default(),
    }
}

/// Read a string field, accepting numbers rendered as strings.
fn string_field(map: &serde_json::Map<String, Value>, key: &str) -> Option<String> {
    match map.get(key) {
        Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    }
}

/// Read an integer field, accepting strings holding digits.
fn int_field(map: &serde_json::Map<String, Value>, key: &str) -> Option<i64> {
    match map.get(key) {
        Some(Value::Number(n)) => n.as_i64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    }
}
