//! Wire types for the match platform API.
//!
//! Field names on the wire are camelCase, matching the backend schema.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A match record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchDetails {
    pub match_id: i64,
    pub home_team_name: String,
    pub home_team_score: Option<i32>,
    pub away_team_name: String,
    pub away_team_score: Option<i32>,
}

/// Partial update for a match. Only set fields are sent.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchDetailsPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub home_team_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub home_team_score: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub away_team_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub away_team_score: Option<i32>,
}

impl MatchDetailsPatch {
    /// Whether the patch carries no fields at all.
    pub fn is_empty(&self) -> bool {
        self.home_team_name.is_none()
            && self.home_team_score.is_none()
            && self.away_team_name.is_none()
            && self.away_team_score.is_none()
    }
}

/// A user comment on a match. `rating` is 1-5; the backend enforces the
/// range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment_id: Option<i64>,
    pub match_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<i64>,
    pub username: String,
    pub text: String,
    pub timestamp: DateTime<Utc>,
    pub rating: u8,
}

/// An in-match event (goal, card, substitution, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchEvent {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_id: Option<String>,
    pub match_id: i64,
    pub event_type: String,
    pub minute: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub team: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub player: Option<String>,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub additional_info: Option<String>,
    pub timestamp: DateTime<Utc>,
}
