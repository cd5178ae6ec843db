//! Origin fetch and response normalization.
//!
//! This crate provides:
//! - `FetchClient` - GET with bounded retries and exponential backoff
//! - `RetryPolicy` / `BackoffStrategy` - Retry budget and delay schedule
//! - `OriginClient` / `Sleeper` - Seams over the platform's HTTP and timers
//! - `normalize` - Byte-order-mark detection and charset stamping

mod client;
mod encoding;
mod retry;
mod sleep;

pub use client::*;
pub use encoding::*;
pub use retry::*;
pub use sleep::*;
