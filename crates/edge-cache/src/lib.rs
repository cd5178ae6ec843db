//! Edge cache for upstream responses.
//!
//! This crate provides:
//! - `CacheKey` - Canonical key derived from the upstream URL
//! - `RouteCachePolicy` - `Cache-Control` / `CDN-Cache-Control` rendering
//! - `CachedResponse` - Serializable stored entry
//! - `EdgeCacheStore` - Store abstraction, with `InMemoryStore` and
//!   (on wasm32) `KvCacheStore` over Spin key-value
//!
//! # Example
//!
//! ```ignore
//! use edge_cache::{CacheKey, RouteCachePolicy};
//!
//! let key = CacheKey::from_url("https://cfg.example.com/app.json")?;
//! let policy = RouteCachePolicy::from_ages(3600, 86400);
//! policy.apply_to(&mut response);
//! ```

mod key;
#[cfg(target_arch = "wasm32")]
mod kv;
mod policy;
mod store;

pub use key::*;
#[cfg(target_arch = "wasm32")]
pub use kv::*;
pub use policy::*;
pub use store::*;
