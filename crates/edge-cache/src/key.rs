//! Canonical cache keys.

use serde::{Deserialize, Serialize};

/// Prefix applied to every key written to a shared store.
pub const STORAGE_PREFIX: &str = "edge-cache:";

/// Errors raised while deriving a cache key.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KeyError {
    #[error("not an absolute URL: {0}")]
    NotAbsolute(String),

    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),

    #[error("missing host in URL: {0}")]
    MissingHost(String),

    #[error("invalid port: {0}")]
    InvalidPort(String),
}

/// A cache key identifying one upstream resource.
///
/// Built from the upstream URL in canonical form, so two spellings of the
/// same URL share an entry and a changed URL never reads an old one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey {
    key: String,
}

impl CacheKey {
    /// Derive the key for an absolute http(s) URL.
    ///
    /// Scheme and host are lowercased, a default port is dropped, an empty
    /// path becomes `/`, the fragment is removed and the query is kept as is.
    pub fn from_url(url: &str) -> Result<Self, KeyError> {
        let trimmed = url.trim();
        let (scheme, rest) = trimmed
            .split_once("://")
            .ok_or_else(|| KeyError::NotAbsolute(trimmed.to_string()))?;

        let scheme = scheme.to_ascii_lowercase();
        let default_port = match scheme.as_str() {
            "http" => "80",
            "https" => "443",
            _ => return Err(KeyError::UnsupportedScheme(scheme)),
        };

        let rest = rest.split('#').next().unwrap_or_default();
        let authority_end = rest.find(['/', '?']).unwrap_or(rest.len());
        let (authority, tail) = rest.split_at(authority_end);

        let (userinfo, host_port) = match authority.rsplit_once('@') {
            Some((userinfo, host_port)) => (Some(userinfo), host_port),
            None => (None, authority),
        };
        let (host, port) = split_host_port(host_port);
        if host.is_empty() {
            return Err(KeyError::MissingHost(trimmed.to_string()));
        }

        let port = match port {
            Some(p) if p.is_empty() || p == default_port => None,
            Some(p) if p.chars().all(|c| c.is_ascii_digit()) => Some(p),
            Some(p) => return Err(KeyError::InvalidPort(p.to_string())),
            None => None,
        };

        let mut key = format!("{scheme}://");
        if let Some(userinfo) = userinfo {
            key.push_str(userinfo);
            key.push('@');
        }
        key.push_str(&host.to_ascii_lowercase());
        if let Some(port) = port {
            key.push(':');
            key.push_str(port);
        }
        if !tail.starts_with('/') {
            key.push('/');
        }
        key.push_str(tail);

        Ok(Self { key })
    }

    /// Wrap an already-canonical key string.
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }

    /// Get the key string.
    pub fn as_str(&self) -> &str {
        &self.key
    }

    /// Key used in shared key-value stores.
    pub fn storage_key(&self) -> String {
        format!("{}{}", STORAGE_PREFIX, self.key)
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.key)
    }
}

// Handles bracketed IPv6 literals.
fn split_host_port(host_port: &str) -> (&str, Option<&str>) {
    if host_port.starts_with('[') {
        return match host_port.find(']') {
            Some(end) => {
                let (host, rest) = host_port.split_at(end + 1);
                (host, rest.strip_prefix(':'))
            }
            None => (host_port, None),
        };
    }

    match host_port.rsplit_once(':') {
        Some((host, port)) => (host, Some(port)),
        None => (host_port, None),
    }
}
