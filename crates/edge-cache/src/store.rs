//! Edge cache entries and the store abstraction.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use edge_core::EdgeResponse;
use serde::{Deserialize, Serialize};

use crate::key::CacheKey;

/// Result type for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;

/// Cache operation errors.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// Failed to open the backing store.
    #[error("failed to open store: {0}")]
    Open(String),

    /// Failed to serialize/deserialize cache entry.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Backend storage error.
    #[error("storage error: {0}")]
    Storage(String),
}

/// Status of a cache lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheStatus {
    /// Entry found on lookup.
    Hit,
    /// No entry; origin consulted.
    Miss,
    /// Entry served after the origin failed.
    Stale,
}

impl std::fmt::Display for CacheStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Hit => write!(f, "HIT"),
            Self::Miss => write!(f, "MISS"),
            Self::Stale => write!(f, "STALE"),
        }
    }
}

/// A stored response.
///
/// Entries are replaced wholesale, never edited in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedResponse {
    /// HTTP status.
    pub status: u16,
    /// Headers as stored, including the freshness headers.
    pub headers: Vec<(String, String)>,
    /// Body bytes (base64 in serialized form).
    #[serde(with = "body_base64")]
    pub body: Vec<u8>,
    /// When the entry was written.
    pub stored_at: DateTime<Utc>,
}

impl CachedResponse {
    /// Snapshot a response for storage.
    pub fn from_response(response: &EdgeResponse, stored_at: DateTime<Utc>) -> Self {
        Self {
            status: response.status,
            headers: response
                .headers()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            body: response.body.clone(),
            stored_at,
        }
    }

    /// Rebuild the response exactly as stored.
    pub fn into_response(self) -> EdgeResponse {
        EdgeResponse::from_parts(self.status, self.headers, self.body)
    }

    /// Seconds between `stored_at` and `now` (never negative).
    pub fn age_secs(&self, now: DateTime<Utc>) -> u64 {
        u64::try_from((now - self.stored_at).num_seconds()).unwrap_or(0)
    }

    /// Serialize for a byte-oriented store.
    pub fn to_bytes(&self) -> CacheResult<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Deserialize from a byte-oriented store.
    pub fn from_bytes(bytes: &[u8]) -> CacheResult<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

mod body_base64 {
    use base64::{engine::general_purpose, Engine as _};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(body: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&general_purpose::STANDARD.encode(body))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        general_purpose::STANDARD
            .decode(encoded)
            .map_err(serde::de::Error::custom)
    }
}

/// Shared edge cache.
///
/// Implementations must make `put` atomic: a concurrent `match_entry` sees
/// either the old entry or the new one. Last writer wins.
#[async_trait(?Send)]
pub trait EdgeCacheStore {
    /// Look up an entry, whatever its age.
    async fn match_entry(&self, key: &CacheKey) -> CacheResult<Option<CachedResponse>>;

    /// Store an entry, replacing any previous one.
    async fn put(&self, key: &CacheKey, entry: CachedResponse) -> CacheResult<()>;
}

/// In-memory store (for development/testing).
#[derive(Debug, Default)]
pub struct InMemoryStore {
    entries: RwLock<HashMap<String, CachedResponse>>,
}

impl InMemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait(?Send)]
impl EdgeCacheStore for InMemoryStore {
    async fn match_entry(&self, key: &CacheKey) -> CacheResult<Option<CachedResponse>> {
        let entries = self
            .entries
            .read()
            .map_err(|e| CacheError::Storage(e.to_string()))?;
        Ok(entries.get(key.as_str()).cloned())
    }

    async fn put(&self, key: &CacheKey, entry: CachedResponse) -> CacheResult<()> {
        let mut entries = self
            .entries
            .write()
            .map_err(|e| CacheError::Storage(e.to_string()))?;
        entries.insert(key.as_str().to_string(), entry);
        Ok(())
    }
}
