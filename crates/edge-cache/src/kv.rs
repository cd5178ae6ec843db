//! Edge cache backed by Spin's key-value store.

use async_trait::async_trait;

use crate::key::CacheKey;
use crate::store::{CacheError, CacheResult, CachedResponse, EdgeCacheStore};

/// Entries are stored as JSON under [`CacheKey::storage_key`].
pub struct KvCacheStore {
    store: spin_sdk::key_value::Store,
}

impl KvCacheStore {
    /// Open the default store.
    pub fn open_default() -> CacheResult<Self> {
        let store = spin_sdk::key_value::Store::open_default()
            .map_err(|e| CacheError::Open(e.to_string()))?;
        Ok(Self { store })
    }
}

#[async_trait(?Send)]
impl EdgeCacheStore for KvCacheStore {
    async fn match_entry(&self, key: &CacheKey) -> CacheResult<Option<CachedResponse>> {
        match self.store.get(&key.storage_key()) {
            Ok(Some(bytes)) => Ok(Some(CachedResponse::from_bytes(&bytes)?)),
            Ok(None) => Ok(None),
            Err(e) => Err(CacheError::Storage(e.to_string())),
        }
    }

    async fn put(&self, key: &CacheKey, entry: CachedResponse) -> CacheResult<()> {
        let bytes = entry.to_bytes()?;
        self.store
            .set(&key.storage_key(), &bytes)
            .map_err(|e| CacheError::Storage(e.to_string()))
    }
}
