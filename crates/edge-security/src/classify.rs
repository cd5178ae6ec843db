//! Request classification: token first, then User-Agent.

use edge_core::{GatewayConfig, RequestContext};

use crate::token::AccessTokens;
use crate::ua::{ClientMatch, UaPatternSet, VERSION_UNKNOWN};

/// Client type reported for token-authenticated requests.
pub const TOKEN_CLIENT_TYPE: &str = "token";

/// Outcome of classifying a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    /// The request may proceed.
    Accepted(ClientMatch),
    /// Neither a token nor a User-Agent pattern matched.
    Rejected,
}

impl Classification {
    /// Whether the request may proceed.
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted(_))
    }
}

/// Decides whether a request may read the configuration.
#[derive(Debug, Default)]
pub struct ClientClassifier {
    patterns: UaPatternSet,
    tokens: AccessTokens,
}

impl ClientClassifier {
    /// Create a classifier.
    pub fn new(patterns: UaPatternSet, tokens: AccessTokens) -> Self {
        Self { patterns, tokens }
    }

    /// Build from gateway configuration.
    pub fn from_config(config: &GatewayConfig) -> Self {
        Self::new(
            UaPatternSet::from_config(config.ua_patterns.as_deref()),
            AccessTokens::from_list(&config.access_tokens),
        )
    }

    /// The compiled User-Agent patterns.
    pub fn patterns(&self) -> &UaPatternSet {
        &self.patterns
    }

    /// Classify a request. A valid token from either source wins over the
    /// User-Agent.
    pub fn classify(&self, request: &RequestContext) -> Classification {
        if request.presented_tokens().any(|token| self.tokens.verify(token)) {
            return Classification::Accepted(ClientMatch {
                client_type: TOKEN_CLIENT_TYPE.to_string(),
                version: VERSION_UNKNOWN.to_string(),
                description: "Access token".to_string(),
            });
        }

        match self.patterns.match_user_agent(request.user_agent()) {
            Some(client) => Classification::Accepted(client),
            None => Classification::Rejected,
        }
    }
}
