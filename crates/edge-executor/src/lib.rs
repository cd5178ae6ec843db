//! Config gate request pipeline.
//!
//! This crate wires the platform crates into a handler:
//! - `EdgeCacheManager` - Cache lookup, origin fetch, normalization, deferred store
//! - `apply_fallback` - Stale entry or 500 when the origin is unreachable
//! - `Gateway` - Client classification, configuration checks, delegation

mod fallback;
mod gateway;
mod manager;

pub use fallback::*;
pub use gateway::*;
pub use manager::*;
