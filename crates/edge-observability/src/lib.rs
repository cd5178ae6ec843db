//! Observability infrastructure for the config gate edge platform.
//!
//! This crate provides:
//! - `StructuredLogger` - Structured logging with request context
//! - `LogSink` - Stderr, `tracing` or in-memory destinations

mod logging;

pub use logging::*;

// Re-export RequestId from edge-core for convenience
pub use edge_core::RequestId;
