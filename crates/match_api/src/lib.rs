//! REST client for the football match platform API.
//!
//! One-shot request/response calls with no retries; non-2xx responses
//! surface as typed errors carrying the HTTP status. [`CachedMatchApi`]
//! layers an explicit cache with stated invalidation rules on top.

pub mod cache;
pub mod client;
pub mod error;
pub mod types;

pub use cache::{CacheStats, CachedMatchApi, MatchCache};
pub use client::{MatchApiClient, DEFAULT_API_BASE_URL};
pub use error::{ApiError, Result};
pub use types::{Comment, MatchDetails, MatchDetailsPatch, MatchEvent};
