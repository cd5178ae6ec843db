//! Freshness policy advertised to downstream caches.

use std::time::Duration;

use edge_core::EdgeResponse;
use serde::{Deserialize, Serialize};

/// `CDN-Cache-Control` (not in the `http` crate's constants).
pub const CDN_CACHE_CONTROL: &str = "cdn-cache-control";

/// Public cache policy for the fetched resource.
///
/// Stale-while-revalidate is advertised only: honoring it is up to the
/// downstream HTTP cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteCachePolicy {
    /// Time-to-live for cached responses.
    pub ttl: Duration,
    /// Stale-while-revalidate window.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stale_while_revalidate: Option<Duration>,
}

impl Default for RouteCachePolicy {
    fn default() -> Self {
        Self::public(Duration::from_secs(edge_core::DEFAULT_CACHE_MAX_AGE))
            .with_swr(Duration::from_secs(edge_core::DEFAULT_SWR_MAX_AGE))
    }
}

impl RouteCachePolicy {
    /// Create a public cache policy.
    pub fn public(ttl: Duration) -> Self {
        Self {
            ttl,
            stale_while_revalidate: None,
        }
    }

    /// Public policy from max-age and SWR seconds.
    pub fn from_ages(max_age_secs: u64, swr_secs: u64) -> Self {
        Self::public(Duration::from_secs(max_age_secs)).with_swr(Duration::from_secs(swr_secs))
    }

    /// Set stale-while-revalidate window.
    pub fn with_swr(mut self, duration: Duration) -> Self {
        self.stale_while_revalidate = Some(duration);
        self
    }

    /// Generate Cache-Control header value.
    pub fn cache_control_header(&self) -> String {
        let mut parts = vec!["public".to_string(), format!("max-age={}", self.ttl.as_secs())];

        if let Some(swr) = self.stale_while_revalidate {
            parts.push(format!("stale-while-revalidate={}", swr.as_secs()));
        }

        parts.join(", ")
    }

    /// Stamp `Cache-Control` and `CDN-Cache-Control` onto a response,
    /// replacing any origin values.
    pub fn apply_to(&self, response: &mut EdgeResponse) {
        let value = self.cache_control_header();
        response.set_header(http::header::CACHE_CONTROL.as_str(), value.clone());
        response.set_header(CDN_CACHE_CONTROL, value);
    }
}
