//! Top-level request handler.

use std::rc::Rc;

use edge_cache::{EdgeCacheStore, RouteCachePolicy};
use edge_core::{EdgeResponse, GatewayConfig, RequestContext, TaskScheduler};
use edge_data::{FetchClient, OriginClient, RetryPolicy, Sleeper};
use edge_observability::StructuredLogger;
use edge_security::{Classification, ClientClassifier};
use http::StatusCode;

use crate::manager::EdgeCacheManager;

/// User-Agent prefix length kept in rejection logs.
const UA_LOG_LIMIT: usize = 100;

/// Gatekeeps the upstream configuration.
///
/// Every path yields a well-formed response: the configuration (fresh or
/// cached), a redirect for rejected clients, or a plain-text 500.
pub struct Gateway<C, S> {
    config: GatewayConfig,
    classifier: ClientClassifier,
    manager: EdgeCacheManager<C, S>,
    logger: StructuredLogger,
}

impl<C, S> Gateway<C, S>
where
    C: OriginClient,
    S: Sleeper,
{
    /// Wire a gateway from configuration and host capabilities.
    pub fn new(
        config: GatewayConfig,
        origin: C,
        sleeper: S,
        store: Rc<dyn EdgeCacheStore>,
        logger: &StructuredLogger,
    ) -> Self {
        let logger = logger.for_component("gateway");

        let classifier = ClientClassifier::from_config(&config);
        for rejected in classifier.patterns().rejected() {
            logger.error(&format!("Invalid regex pattern skipped: {rejected}"));
        }

        let fetcher = FetchClient::new(origin, sleeper, &logger)
            .with_policy(RetryPolicy::new(config.max_retries));
        let manager = EdgeCacheManager::new(fetcher, store, &logger).with_policy(
            RouteCachePolicy::from_ages(config.cache_max_age_secs, config.swr_max_age_secs),
        );

        Self {
            config,
            classifier,
            manager,
            logger,
        }
    }

    /// The active configuration.
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// The cache manager.
    pub fn manager(&self) -> &EdgeCacheManager<C, S> {
        &self.manager
    }

    /// Handle one request. Background cache writes go to `scheduler`.
    pub async fn handle(
        &self,
        request: &RequestContext,
        scheduler: &dyn TaskScheduler,
    ) -> EdgeResponse {
        self.logger
            .info_builder("Request received")
            .field("client_ip", request.client_ip())
            .field("path", request.path.as_str())
            .emit();

        match self.classifier.classify(request) {
            Classification::Accepted(client) => {
                self.logger
                    .info_builder("Client accepted")
                    .field("client_type", client.client_type)
                    .field("version", client.version)
                    .emit();
            }
            Classification::Rejected => {
                let user_agent: String = request.user_agent().chars().take(UA_LOG_LIMIT).collect();
                self.logger
                    .info_builder("Client rejected; redirecting")
                    .field("user_agent", user_agent)
                    .field("redirect_url", self.config.redirect_url.as_str())
                    .emit();
                return EdgeResponse::redirect(self.config.redirect_url.as_str());
            }
        }

        let url = match self.config.require_origin_url() {
            Ok(url) => url,
            Err(e) => {
                self.logger.error(&e.to_string());
                return EdgeResponse::plain_text(StatusCode::INTERNAL_SERVER_ERROR, e.to_string());
            }
        };

        self.manager.get_config(url, scheduler).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use edge_cache::InMemoryStore;
    use edge_core::{ExecutionContext, Method, RequestId};
    use edge_data::{RecordingSleeper, ScriptedOrigin};
    use edge_observability::{LogLevel, MemoryLog};

    type TestGateway = Gateway<ScriptedOrigin, RecordingSleeper>;

    fn gateway(config: GatewayConfig, origin: ScriptedOrigin) -> (TestGateway, MemoryLog) {
        let (logger, log) = StructuredLogger::memory(RequestId::from_string("g"));
        let store = Rc::new(InMemoryStore::new());
        let gw = Gateway::new(config, origin, RecordingSleeper::new(), store, &logger);
        (gw, log)
    }

    fn okhttp() -> RequestContext {
        RequestContext::new(Method::Get, "/").with_header("User-Agent", "okhttp/4.9.3")
    }

    #[tokio::test]
    async fn test_rejected_client_redirected_without_fetch() {
        let origin = ScriptedOrigin::always(EdgeResponse::new(200));
        let config = GatewayConfig::default()
            .with_origin_url("https://cfg.example.com/a.json");
        let (gw, log) = gateway(config, origin.clone());

        let request =
            RequestContext::new(Method::Get, "/").with_header("User-Agent", "x".repeat(300));
        let response = gw.handle(&request, &ExecutionContext::new(RequestId::generate())).await;

        assert_eq!(response.status, 302);
        assert_eq!(response.header("Location"), Some("https://www.google.com"));
        assert_eq!(origin.calls(), 0);

        let entry = log
            .entries()
            .into_iter()
            .find(|e| e.message.contains("rejected"))
            .unwrap();
        assert_eq!(entry.field("user_agent").and_then(|v| v.as_str()).map(str::len), Some(100));
    }

    #[tokio::test]
    async fn test_custom_redirect_url() {
        let config = GatewayConfig {
            redirect_url: "https://example.org/denied".to_string(),
            ..GatewayConfig::default()
        };
        let (gw, _) = gateway(config, ScriptedOrigin::failing());
        let request = RequestContext::new(Method::Get, "/");
        let response = gw.handle(&request, &ExecutionContext::new(RequestId::generate())).await;
        assert_eq!(response.header("location"), Some("https://example.org/denied"));
    }

    #[tokio::test]
    async fn test_client_ip_logged() {
        let config = GatewayConfig::default().with_origin_url("https://cfg.example.com/a.json");
        let (gw, log) = gateway(config, ScriptedOrigin::always(EdgeResponse::new(200)));
        let request = okhttp().with_header("CF-Connecting-IP", "203.0.113.7");
        gw.handle(&request, &ExecutionContext::new(RequestId::generate())).await;

        let entry = &log.entries()[0];
        assert_eq!(entry.message, "Request received");
        assert_eq!(entry.field("client_ip"), Some(&serde_json::json!("203.0.113.7")));
        assert!(log.contains(LogLevel::Info, "Client accepted"));
    }

    #[tokio::test]
    async fn test_invalid_pattern_logged_at_startup() {
        let config = GatewayConfig {
            ua_patterns: Some("broken(,okhttp".to_string()),
            ..GatewayConfig::default()
        };
        let (_, log) = gateway(config, ScriptedOrigin::failing());
        assert!(log.contains(LogLevel::Error, "Invalid regex pattern skipped"));
    }

    #[tokio::test]
    async fn test_retry_budget_from_config() {
        let config = GatewayConfig {
            max_retries: 0,
            ..GatewayConfig::default().with_origin_url("https://cfg.example.com/a.json")
        };
        let origin = ScriptedOrigin::failing();
        let (gw, _) = gateway(config, origin.clone());
        gw.handle(&okhttp(), &ExecutionContext::new(RequestId::generate())).await;
        assert_eq!(origin.calls(), 1);
    }
}
