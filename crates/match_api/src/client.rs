//! Match platform REST API client.
//!
//! Every call is a single request/response; failures are surfaced to the
//! caller and never retried here.

use crate::error::{ApiError, Result};
use crate::types::{Comment, MatchDetails, MatchDetailsPatch, MatchEvent};
use reqwest::Response;
use tracing::debug;

/// Default base URL for the match platform API.
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8080/football/liveToWatch/v3";

/// Match platform REST API client.
#[derive(Debug, Clone)]
pub struct MatchApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl Default for MatchApiClient {
    fn default() -> Self {
        Self::new()
    }
}

impl MatchApiClient {
    /// Create a client against the default base URL.
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_API_BASE_URL)
    }

    /// Create a client against a custom base URL.
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }

    /// Fetch one match by id.
    pub async fn get_match_details(&self, match_id: i64) -> Result<MatchDetails> {
        let url = format!("{}/getMatchDetails?matchId={}", self.base_url, match_id);
        debug!("fetching match details from {url}");
        let response = self.http.get(&url).send().await?;
        Ok(Self::ensure_success(response).await?.json().await?)
    }

    /// Create a match. Returns the backend's plain-text confirmation.
    pub async fn add_match_details(&self, details: &MatchDetails) -> Result<String> {
        let url = format!("{}/addMatchDetails", self.base_url);
        debug!("adding match {} via {url}", details.match_id);
        let response = self.http.post(&url).json(details).send().await?;
        Ok(Self::ensure_success(response).await?.text().await?)
    }

    /// Apply a partial update to a match.
    pub async fn update_match_details(
        &self,
        match_id: i64,
        patch: &MatchDetailsPatch,
    ) -> Result<String> {
        let url = format!("{}/patchByMatchId?matchId={}", self.base_url, match_id);
        debug!("patching match {match_id} via {url}");
        let response = self.http.patch(&url).json(patch).send().await?;
        Ok(Self::ensure_success(response).await?.text().await?)
    }

    /// Delete a match.
    pub async fn delete_match_details(&self, match_id: i64) -> Result<String> {
        let url = format!("{}/deleteByMatchId?matchId={}", self.base_url, match_id);
        debug!("deleting match {match_id} via {url}");
        let response = self.http.delete(&url).send().await?;
        Ok(Self::ensure_success(response).await?.text().await?)
    }

    /// List every match.
    pub async fn get_all_match_details(&self) -> Result<Vec<MatchDetails>> {
        let url = format!("{}/getAllMatchDetails", self.base_url);
        debug!("listing matches from {url}");
        let response = self.http.get(&url).send().await?;
        Ok(Self::ensure_success(response).await?.json().await?)
    }

    /// Post a comment on a match.
    pub async fn add_comment(&self, comment: &Comment) -> Result<String> {
        let url = format!("{}/addComment", self.base_url);
        debug!("adding comment on match {} via {url}", comment.match_id);
        let response = self.http.post(&url).json(comment).send().await?;
        Ok(Self::ensure_success(response).await?.text().await?)
    }

    /// List the comments on a match.
    pub async fn get_comments(&self, match_id: i64) -> Result<Vec<Comment>> {
        let url = format!("{}/getComments?matchId={}", self.base_url, match_id);
        debug!("fetching comments from {url}");
        let response = self.http.get(&url).send().await?;
        Ok(Self::ensure_success(response).await?.json().await?)
    }

    /// Record an in-match event.
    pub async fn add_match_event(&self, event: &MatchEvent) -> Result<String> {
        let url = format!("{}/addMatchEvent", self.base_url);
        debug!("adding {} event on match {} via {url}", event.event_type, event.match_id);
        let response = self.http.post(&url).json(event).send().await?;
        Ok(Self::ensure_success(response).await?.text().await?)
    }

    /// List the events recorded for a match.
    pub async fn get_match_events(&self, match_id: i64) -> Result<Vec<MatchEvent>> {
        let url = format!("{}/getMatchEvents?matchId={}", self.base_url, match_id);
        debug!("fetching match events from {url}");
        let response = self.http.get(&url).send().await?;
        Ok(Self::ensure_success(response).await?.json().await?)
    }

    async fn ensure_success(response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        Err(ApiError::Status {
            status: status.as_u16(),
            body: response.text().await.unwrap_or_default(),
        })
    }
}
