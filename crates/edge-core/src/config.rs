//! Gateway configuration.

use serde::Serialize;

/// Configuration key names as exposed by the deployment environment.
pub mod config_keys {
    /// Required. URL of the upstream JSON configuration.
    pub const JSON_CONFIG_URL: &str = "JSON_CONFIG_URL";
    /// Cache max-age in seconds.
    pub const CACHE_MAX_AGE: &str = "CACHE_MAX_AGE";
    /// Stale-while-revalidate window in seconds.
    pub const SWR_MAX_AGE: &str = "SWR_MAX_AGE";
    /// Where rejected clients are redirected.
    pub const REDIRECT_URL: &str = "REDIRECT_URL";
    /// User-Agent patterns, JSON array or comma-separated.
    pub const UA_PATTERNS: &str = "UA_PATTERNS";
    /// Comma-separated bearer tokens.
    pub const ACCESS_TOKENS: &str = "ACCESS_TOKENS";
    /// Retries after the first origin attempt.
    pub const MAX_RETRIES: &str = "MAX_RETRIES";
}

/// Default cache max-age in seconds.
pub const DEFAULT_CACHE_MAX_AGE: u64 = 3600;
/// Default stale-while-revalidate window in seconds.
pub const DEFAULT_SWR_MAX_AGE: u64 = 86400;
/// Default redirect target for rejected clients.
pub const DEFAULT_REDIRECT_URL: &str = "https://www.google.com";
/// Default number of retries after the first attempt.
pub const DEFAULT_MAX_RETRIES: u32 = 2;

/// Error type for configuration problems.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing JSON_CONFIG_URL environment variable")]
    MissingOriginUrl,

    #[error("Invalid JSON_CONFIG_URL: {0}")]
    InvalidOriginUrl(String),
}

/// Deployment configuration for the gateway.
///
/// Every field except the origin URL is optional in the environment and
/// falls back to its default when absent or unparseable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GatewayConfig {
    /// Upstream configuration URL.
    pub origin_url: Option<String>,
    /// `max-age` advertised on fresh responses.
    pub cache_max_age_secs: u64,
    /// `stale-while-revalidate` advertised on fresh responses.
    pub swr_max_age_secs: u64,
    /// Redirect target for rejected clients.
    pub redirect_url: String,
    /// Raw User-Agent pattern configuration.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ua_patterns: Option<String>,
    /// Accepted bearer tokens.
    #[serde(skip_serializing)]
    pub access_tokens: Vec<String>,
    /// Retries after the first origin attempt.
    pub max_retries: u32,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            origin_url: None,
            cache_max_age_secs: DEFAULT_CACHE_MAX_AGE,
            swr_max_age_secs: DEFAULT_SWR_MAX_AGE,
            redirect_url: DEFAULT_REDIRECT_URL.to_string(),
            ua_patterns: None,
            access_tokens: Vec::new(),
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }
}

impl GatewayConfig {
    /// Build from an arbitrary key lookup (environment, platform variables, a map).
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Self {
            origin_url: get(config_keys::JSON_CONFIG_URL).map(|v| v.trim().to_string()),
            cache_max_age_secs: parse_seconds(
                get(config_keys::CACHE_MAX_AGE).as_deref(),
                DEFAULT_CACHE_MAX_AGE,
            ),
            swr_max_age_secs: parse_seconds(
                get(config_keys::SWR_MAX_AGE).as_deref(),
                DEFAULT_SWR_MAX_AGE,
            ),
            redirect_url: get(config_keys::REDIRECT_URL)
                .map(|v| v.trim().to_string())
                .unwrap_or_else(|| DEFAULT_REDIRECT_URL.to_string()),
            ua_patterns: get(config_keys::UA_PATTERNS),
            access_tokens: get(config_keys::ACCESS_TOKENS)
                .map(|v| split_list(&v))
                .unwrap_or_default(),
            max_retries: get(config_keys::MAX_RETRIES)
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(DEFAULT_MAX_RETRIES),
        }
    }

    /// Build from process environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Set the origin URL.
    pub fn with_origin_url(mut self, url: impl Into<String>) -> Self {
        self.origin_url = Some(url.into());
        self
    }

    /// The origin URL, or the fatal configuration error when unset.
    pub fn require_origin_url(&self) -> Result<&str, ConfigError> {
        self.origin_url
            .as_deref()
            .ok_or(ConfigError::MissingOriginUrl)
    }
}

/// Parse a non-negative seconds value, falling back to `default` on anything else.
pub fn parse_seconds(raw: Option<&str>, default: u64) -> u64 {
    raw.and_then(|v| v.trim().parse::<u64>().ok())
        .unwrap_or(default)
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_empty() {
        let config = GatewayConfig::from_lookup(|_| None);
        assert_eq!(config, GatewayConfig::default());
        assert_eq!(config.cache_max_age_secs, 3600);
        assert_eq!(config.swr_max_age_secs, 86400);
        assert_eq!(config.max_retries, 2);
        assert_eq!(config.require_origin_url(), Err(ConfigError::MissingOriginUrl));
    }

    #[test]
    fn test_parse_seconds_fallbacks() {
        assert_eq!(parse_seconds(Some("120"), 3600), 120);
        assert_eq!(parse_seconds(Some(" 0 "), 3600), 0);
        assert_eq!(parse_seconds(Some("-5"), 3600), 3600);
        assert_eq!(parse_seconds(Some("soon"), 3600), 3600);
        assert_eq!(parse_seconds(Some("1.5"), 3600), 3600);
        assert_eq!(parse_seconds(None, 86400), 86400);
    }

    #[test]
    fn test_from_lookup_reads_all_keys() {
        let config = GatewayConfig::from_lookup(lookup(&[
            ("JSON_CONFIG_URL", " https://origin.example/tv.json "),
            ("CACHE_MAX_AGE", "60"),
            ("SWR_MAX_AGE", "bogus"),
            ("REDIRECT_URL", "https://example.org"),
            ("ACCESS_TOKENS", "a, b,,c"),
            ("MAX_RETRIES", "4"),
        ]));

        assert_eq!(config.require_origin_url(), Ok("https://origin.example/tv.json"));
        assert_eq!(config.cache_max_age_secs, 60);
        assert_eq!(config.swr_max_age_secs, DEFAULT_SWR_MAX_AGE);
        assert_eq!(config.redirect_url, "https://example.org");
        assert_eq!(config.access_tokens, vec!["a", "b", "c"]);
        assert_eq!(config.max_retries, 4);
    }

    #[test]
    fn test_blank_origin_is_missing() {
        let config = GatewayConfig::from_lookup(lookup(&[("JSON_CONFIG_URL", "   ")]));
        assert_eq!(config.require_origin_url(), Err(ConfigError::MissingOriginUrl));
    }

    #[test]
    fn test_missing_message_mentions_key() {
        let message = ConfigError::MissingOriginUrl.to_string();
        assert_eq!(message, "Missing JSON_CONFIG_URL environment variable");
    }
}
