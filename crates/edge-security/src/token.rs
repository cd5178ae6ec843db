//! Access tokens that bypass User-Agent checks.

use std::collections::HashSet;

/// Configured access tokens. Empty means tokens are disabled.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccessTokens {
    tokens: HashSet<String>,
}

impl AccessTokens {
    /// Build from a list, ignoring blank entries.
    pub fn from_list<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            tokens: tokens
                .into_iter()
                .map(|t| t.as_ref().trim().to_string())
                .filter(|t| !t.is_empty())
                .collect(),
        }
    }

    /// Parse a comma-separated list.
    pub fn from_config(raw: Option<&str>) -> Self {
        Self::from_list(raw.unwrap_or_default().split(','))
    }

    /// Whether any token is configured.
    pub fn is_enabled(&self) -> bool {
        !self.tokens.is_empty()
    }

    /// Number of configured tokens.
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// Whether no token is configured.
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Whether `candidate` equals a configured token.
    pub fn verify(&self, candidate: &str) -> bool {
        !candidate.is_empty() && self.tokens.contains(candidate)
    }
}
