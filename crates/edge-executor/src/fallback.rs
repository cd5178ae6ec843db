//! Stale fallback for origin failures.

use chrono::Utc;
use edge_cache::{CacheKey, EdgeCacheStore};
use edge_core::EdgeResponse;
use edge_observability::StructuredLogger;
use http::StatusCode;

/// Body of the 500 returned when no fallback is available.
pub const FETCH_FAILED_MESSAGE: &str = "Internal Server Error: Failed to fetch configuration";

/// Result of applying the fallback.
#[derive(Debug)]
pub enum FallbackResult {
    /// A cached entry, returned as stored.
    Stale(EdgeResponse),
    /// Nothing to serve; carries the plain-text 500.
    Failed(EdgeResponse),
}

impl FallbackResult {
    /// The response to send.
    pub fn into_response(self) -> EdgeResponse {
        match self {
            Self::Stale(response) | Self::Failed(response) => response,
        }
    }
}

fn fetch_failed() -> EdgeResponse {
    EdgeResponse::plain_text(StatusCode::INTERNAL_SERVER_ERROR, FETCH_FAILED_MESSAGE)
}

/// Serve any cached entry for `key`, whatever its age, after `error`.
pub async fn apply_fallback(
    store: &dyn EdgeCacheStore,
    key: &CacheKey,
    error: &str,
    logger: &StructuredLogger,
) -> FallbackResult {
    logger
        .error_builder("Origin fetch failed")
        .field("key", key.as_str())
        .field("error", error)
        .emit();

    match store.match_entry(key).await {
        Ok(Some(entry)) => {
            logger
                .warn_builder("Cache STALE - serving cached config after origin failure")
                .field("key", key.as_str())
                .field_u64("age_secs", entry.age_secs(Utc::now()))
                .emit();
            FallbackResult::Stale(entry.into_response())
        }
        Ok(None) => {
            logger.error("No cached config available");
            FallbackResult::Failed(fetch_failed())
        }
        Err(e) => {
            logger
                .error_builder("Cache read failed during fallback")
                .field("error", e.to_string())
                .emit();
            FallbackResult::Failed(fetch_failed())
        }
    }
}
