//! Client classification for the config gate.
//!
//! This crate provides:
//! - `UaPatternSet` - Ordered, case-insensitive User-Agent patterns with version capture
//! - `AccessTokens` - Tokens that bypass the User-Agent check
//! - `ClientClassifier` - Token-then-User-Agent decision for a request
//!
//! # Example
//!
//! ```ignore
//! use edge_security::{AccessTokens, ClientClassifier, UaPatternSet};
//!
//! let classifier = ClientClassifier::new(
//!     UaPatternSet::from_config(Some("okhttp/([\\d.]+),curl")),
//!     AccessTokens::from_config(Some("s3cret")),
//! );
//! let accepted = classifier.classify(&request).is_accepted();
//! ```

mod classify;
mod token;
mod ua;

pub use classify::*;
pub use token::*;
pub use ua::*;
