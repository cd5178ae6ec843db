//! Edge cache manager: cache lookup, origin fetch and background store.

use std::rc::Rc;

use chrono::Utc;
use edge_cache::{CacheKey, CacheStatus, CachedResponse, EdgeCacheStore, RouteCachePolicy};
use edge_core::{ConfigError, EdgeResponse, TaskScheduler};
use edge_data::{normalize, FetchClient, NormalizeOutcome, OriginClient, Sleeper};
use edge_observability::StructuredLogger;
use futures::FutureExt;
use http::StatusCode;

use crate::fallback::apply_fallback;

/// Serves the upstream configuration through the edge cache.
///
/// The store and the fetcher are injected; the background-task scheduler is
/// passed per call.
pub struct EdgeCacheManager<C, S> {
    fetcher: FetchClient<C, S>,
    store: Rc<dyn EdgeCacheStore>,
    policy: RouteCachePolicy,
    logger: StructuredLogger,
}

impl<C, S> EdgeCacheManager<C, S>
where
    C: OriginClient,
    S: Sleeper,
{
    /// Create a manager with the default policy.
    pub fn new(
        fetcher: FetchClient<C, S>,
        store: Rc<dyn EdgeCacheStore>,
        logger: &StructuredLogger,
    ) -> Self {
        Self {
            fetcher,
            store,
            policy: RouteCachePolicy::default(),
            logger: logger.for_component("edge-cache"),
        }
    }

    /// Set the freshness policy stamped on fresh responses.
    pub fn with_policy(mut self, policy: RouteCachePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// The active freshness policy.
    pub fn policy(&self) -> &RouteCachePolicy {
        &self.policy
    }

    /// Return the configuration at `url`.
    ///
    /// A cached entry within max-age is returned as stored. Otherwise the
    /// origin response is normalized, stamped with the freshness headers,
    /// returned, and written to the cache through `scheduler`. When the
    /// origin cannot be reached the fallback decides between a cached entry
    /// of any age, or a 500.
    pub async fn get_config(&self, url: &str, scheduler: &dyn TaskScheduler) -> EdgeResponse {
        let key = match CacheKey::from_url(url) {
            Ok(key) => key,
            Err(e) => {
                let error = ConfigError::InvalidOriginUrl(e.to_string());
                self.logger.error(&error.to_string());
                let message = error.to_string();
                return EdgeResponse::plain_text(StatusCode::INTERNAL_SERVER_ERROR, message);
            }
        };

        if let Some(entry) = self.lookup(&key).await {
            let age_secs = entry.age_secs(Utc::now());
            if age_secs <= self.policy.ttl.as_secs() {
                self.logger
                    .info_builder("Cache HIT - returning cached config")
                    .field("cache", CacheStatus::Hit.to_string())
                    .field_u64("age_secs", age_secs)
                    .emit();
                return entry.into_response();
            }
            self.logger
                .debug_builder("Cached entry past max-age; revalidating")
                .field_u64("age_secs", age_secs)
                .emit();
        }

        self.logger
            .info_builder("Cache MISS - fetching from origin")
            .field("cache", CacheStatus::Miss.to_string())
            .field("key", key.as_str())
            .emit();

        let raw = match self.fetcher.fetch_with_retry(url).await {
            Ok(raw) => raw,
            Err(error) => {
                let store = self.store.as_ref();
                return apply_fallback(store, &key, &error.to_string(), &self.logger)
                    .await
                    .into_response();
            }
        };

        let normalized = normalize(&raw);
        self.log_normalization(normalized.outcome);

        let mut response = normalized.into_response();
        self.policy.apply_to(&mut response);
        self.schedule_store(scheduler, key, &response);

        self.logger.info("Config fetched from origin; cache write scheduled");
        response
    }

    async fn lookup(&self, key: &CacheKey) -> Option<CachedResponse> {
        match self.store.match_entry(key).await {
            Ok(entry) => entry,
            Err(e) => {
                self.logger
                    .warn_builder("Cache read failed, treating as miss")
                    .field("error", e.to_string())
                    .emit();
                None
            }
        }
    }

    fn schedule_store(
        &self,
        scheduler: &dyn TaskScheduler,
        key: CacheKey,
        response: &EdgeResponse,
    ) {
        let store = Rc::clone(&self.store);
        let logger = self.logger.clone();
        let entry = CachedResponse::from_response(response, Utc::now());

        scheduler.wait_until(
            async move {
                match store.put(&key, entry).await {
                    Ok(()) => logger
                        .debug_builder("Cache write complete")
                        .field("key", key.as_str())
                        .emit(),
                    Err(e) => logger
                        .error_builder("Cache write failed")
                        .field("key", key.as_str())
                        .field("error", e.to_string())
                        .emit(),
                }
            }
            .boxed_local(),
        );
    }

    fn log_normalization(&self, outcome: NormalizeOutcome) {
        match outcome {
            NormalizeOutcome::Declared => {
                self.logger.debug("Origin declared a charset; body not inspected")
            }
            NormalizeOutcome::Detected(detection) => self
                .logger
                .debug_builder("Charset detected")
                .field("charset", detection.charset.as_str())
                .field_u64("bom_len", detection.bom_len as u64)
                .emit(),
            NormalizeOutcome::Truncated => {
                self.logger.debug("Body too short for BOM inspection; assuming utf-8")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use edge_cache::InMemoryStore;
    use edge_core::{ExecutionContext, RequestId};
    use edge_data::{RecordingSleeper, RetryPolicy, ScriptedOrigin};
    use edge_observability::LogLevel;

    const URL: &str = "https://cfg.example.com/app.json";

    struct Harness {
        manager: EdgeCacheManager<ScriptedOrigin, RecordingSleeper>,
        origin: ScriptedOrigin,
        store: Rc<InMemoryStore>,
        ctx: ExecutionContext,
        log: edge_observability::MemoryLog,
    }

    fn harness(origin: ScriptedOrigin) -> Harness {
        let (logger, log) = StructuredLogger::memory(RequestId::from_string("m"));
        let store = Rc::new(InMemoryStore::new());
        let fetcher = FetchClient::new(origin.clone(), RecordingSleeper::new(), &logger)
            .with_policy(RetryPolicy::new(1));
        let manager = EdgeCacheManager::new(fetcher, store.clone(), &logger)
            .with_policy(RouteCachePolicy::from_ages(60, 300));
        Harness {
            manager,
            origin,
            store,
            ctx: ExecutionContext::new(RequestId::from_string("m")),
            log,
        }
    }

    #[tokio::test]
    async fn test_miss_defers_store_until_drained() {
        let h = harness(ScriptedOrigin::always(EdgeResponse::new(200).with_body(b"{}".to_vec())));

        let response = h.manager.get_config(URL, &h.ctx).await;
        assert_eq!(response.status, 200);
        assert_eq!(
            response.header("Cache-Control"),
            Some("public, max-age=60, stale-while-revalidate=300")
        );
        assert!(h.store.is_empty());
        assert_eq!(h.ctx.pending(), 1);

        h.ctx.drain().await;
        assert_eq!(h.store.len(), 1);
        assert!(h.log.contains(LogLevel::Info, "Cache MISS"));
    }

    #[tokio::test]
    async fn test_hit_skips_origin() {
        let h = harness(ScriptedOrigin::always(EdgeResponse::new(200).with_body(b"{}".to_vec())));

        let first = h.manager.get_config(URL, &h.ctx).await;
        h.ctx.drain().await;
        let second = h.manager.get_config("HTTPS://CFG.EXAMPLE.COM:443/app.json", &h.ctx).await;

        assert_eq!(h.origin.calls(), 1);
        assert_eq!(second, first);
        assert_eq!(h.ctx.pending(), 0);
        assert!(h.log.contains(LogLevel::Info, "Cache HIT"));
    }

    #[tokio::test]
    async fn test_expired_entry_is_refetched() {
        let h = harness(ScriptedOrigin::always(EdgeResponse::new(200).with_body(b"new".to_vec())));
        let key = CacheKey::from_url(URL).unwrap();
        let old = EdgeResponse::new(200).with_body(b"old".to_vec());
        let stored_at = Utc::now() - chrono::Duration::seconds(61);
        h.store
            .put(&key, CachedResponse::from_response(&old, stored_at))
            .await
            .unwrap();

        let response = h.manager.get_config(URL, &h.ctx).await;
        assert_eq!(response.text(), "new");
        assert_eq!(h.origin.calls(), 1);

        h.ctx.drain().await;
        let stored = h.store.match_entry(&key).await.unwrap().unwrap();
        assert_eq!(stored.body, b"new");
    }

    #[tokio::test]
    async fn test_invalid_url_is_configuration_error() {
        let h = harness(ScriptedOrigin::failing());
        let response = h.manager.get_config("not a url", &h.ctx).await;

        assert_eq!(response.status, 500);
        assert!(response.text().starts_with("Invalid JSON_CONFIG_URL"));
        assert_eq!(h.origin.calls(), 0);
    }

    #[tokio::test]
    async fn test_exhaustion_without_cache_is_500() {
        let h = harness(ScriptedOrigin::failing());
        let response = h.manager.get_config(URL, &h.ctx).await;

        assert_eq!(response.status, 500);
        assert_eq!(h.origin.calls(), 2);
        assert_eq!(h.ctx.pending(), 0);
    }
}
