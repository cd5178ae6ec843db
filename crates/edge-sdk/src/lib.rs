//! Public SDK for the config gate edge platform.
//!
//! This crate re-exports all platform functionality:
//!
//! ```ignore
//! use edge_sdk::prelude::*;
//!
//! let request = RequestContext::new(Method::Get, "/");
//! let logger = StructuredLogger::new(request.request_id.clone());
//! let config = GatewayConfig::from_env();
//!
//! let gateway = Gateway::new(config, origin, sleeper, store, &logger);
//! let ctx = ExecutionContext::new(request.request_id.clone());
//! let response = gateway.handle(&request, &ctx).await;
//! // hand `response` to the host, then:
//! ctx.drain().await;
//! ```

pub use edge_cache;
pub use edge_core;
pub use edge_data;
pub use edge_executor;
pub use edge_observability;
pub use edge_security;

/// Prelude for convenient imports.
pub mod prelude {
    pub use edge_cache::*;
    pub use edge_core::*;
    pub use edge_data::*;
    pub use edge_executor::*;
    pub use edge_observability::*;
    pub use edge_security::*;
}
