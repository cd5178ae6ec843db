//! Core abstractions for the config gate edge platform.
//!
//! This crate provides the fundamental types shared by every stage:
//! - `RequestContext` - Inbound request view with case-insensitive headers
//! - `EdgeResponse` - Fully buffered HTTP response
//! - `GatewayConfig` - Deployment configuration with lenient parsing
//! - `ExecutionContext` - Background tasks awaited after the response is sent

mod config;
mod context;
mod response;
mod tasks;

pub use config::*;
pub use context::*;
pub use response::*;
pub use tasks::*;
