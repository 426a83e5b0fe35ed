//! Explicit match cache with stated invalidation rules.
//!
//! Rules, enforced by [`CachedMatchApi`]:
//! - reads fill the cache: `get_match_details` fills per-id entries,
//!   `get_all_match_details` fills the listing and marks it complete;
//! - any successful mutation invalidates the touched id and the listing
//!   completeness flag;
//! - failed calls never populate or invalidate anything.

use crate::client::MatchApiClient;
use crate::error::Result;
use crate::types::{MatchDetails, MatchDetailsPatch};
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tracing::debug;

/// Cached match records, shared across readers.
#[derive(Debug, Default)]
pub struct MatchCache {
    matches: DashMap<i64, MatchDetails>,
    /// Whether the cached entries are known to cover the full listing.
    listing_complete: AtomicBool,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl MatchCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached record for an id, counting hit/miss.
    pub fn get(&self, match_id: i64) -> Option<MatchDetails> {
        let cached = self.matches.get(&match_id).map(|m| m.clone());
        match cached {
            Some(details) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(details)
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Store one record.
    pub fn insert(&self, details: MatchDetails) {
        self.matches.insert(details.match_id, details);
    }

    /// Store a full listing and mark it complete.
    pub fn fill_listing(&self, matches: &[MatchDetails]) {
        for details in matches {
            self.insert(details.clone());
        }
        self.listing_complete.store(true, Ordering::Relaxed);
    }

    /// The full listing, if a complete one is cached. Sorted by match id.
    pub fn listing(&self) -> Option<Vec<MatchDetails>> {
        if !self.listing_complete.load(Ordering::Relaxed) {
            return None;
        }
        let mut matches: Vec<MatchDetails> =
            self.matches.iter().map(|m| m.value().clone()).collect();
        matches.sort_by_key(|m| m.match_id);
        Some(matches)
    }

    /// Drop one id and the listing completeness flag.
    pub fn invalidate(&self, match_id: i64) {
        self.matches.remove(&match_id);
        self.listing_complete.store(false, Ordering::Relaxed);
    }

    /// Drop everything.
    pub fn invalidate_all(&self) {
        self.matches.clear();
        self.listing_complete.store(false, Ordering::Relaxed);
    }

    /// Cache statistics.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.matches.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

/// Cache statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
}

/// Match API client with the cache rules applied around every call.
#[derive(Debug, Default)]
pub struct CachedMatchApi {
    client: MatchApiClient,
    cache: MatchCache,
}

impl CachedMatchApi {
    pub fn new(client: MatchApiClient) -> Self {
        Self {
            client,
            cache: MatchCache::new(),
        }
    }

    /// The underlying cache, for inspection.
    pub fn cache(&self) -> &MatchCache {
        &self.cache
    }

    /// Fetch one match, serving from cache when possible.
    pub async fn get_match_details(&self, match_id: i64) -> Result<MatchDetails> {
        if let Some(details) = self.cache.get(match_id) {
            debug!(match_id, "match served from cache");
            return Ok(details);
        }
        let details = self.client.get_match_details(match_id).await?;
        self.cache.insert(details.clone());
        Ok(details)
    }

    /// Fetch the full listing, serving from cache once complete.
    pub async fn get_all_match_details(&self) -> Result<Vec<MatchDetails>> {
        if let Some(matches) = self.cache.listing() {
            debug!(count = matches.len(), "listing served from cache");
            return Ok(matches);
        }
        let matches = self.client.get_all_match_details().await?;
        self.cache.fill_listing(&matches);
        Ok(matches)
    }

    /// Create a match and invalidate its cache entry.
    pub async fn add_match_details(&self, details: &MatchDetails) -> Result<String> {
        let confirmation = self.client.add_match_details(details).await?;
        self.cache.invalidate(details.match_id);
        Ok(confirmation)
    }

    /// Patch a match and invalidate its cache entry.
    pub async fn update_match_details(
        &self,
        match_id: i64,
        patch: &MatchDetailsPatch,
    ) -> Result<String> {
        let confirmation = self.client.update_match_details(match_id, patch).await?;
        self.cache.invalidate(match_id);
        Ok(confirmation)
    }

    /// Delete a match and invalidate its cache entry.
    pub async fn delete_match_details(&self, match_id: i64) -> Result<String> {
        let confirmation = self.client.delete_match_details(match_id).await?;
        self.cache.invalidate(match_id);
        Ok(confirmation)
    }
}
