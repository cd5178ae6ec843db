//! Config gate workload.
//!
//! Serves a remote JSON configuration to approved clients:
//! - Client classification by User-Agent pattern or access token
//! - Edge cache over Spin key-value with freshness headers
//! - Origin fetch with retries, stale fallback on failure
//! - Cache writes run after the response has been sent

#![cfg(target_arch = "wasm32")]

use std::rc::Rc;

use anyhow::{anyhow, Context, Result};
use futures::SinkExt;
use http::StatusCode;
use spin_sdk::http::{Fields, IncomingRequest, OutgoingResponse, ResponseOutparam};
use spin_sdk::http_component;

use edge_sdk::edge_cache::{EdgeCacheStore, InMemoryStore, KvCacheStore};
use edge_sdk::edge_core::{EdgeResponse, ExecutionContext, GatewayConfig, Method, RequestContext};
use edge_sdk::edge_data::{SpinOriginClient, WasiSleeper};
use edge_sdk::edge_executor::Gateway;
use edge_sdk::edge_observability::{LogFormat, StructuredLogger};

/// Main HTTP handler.
#[http_component]
async fn handle(req: IncomingRequest, response_out: ResponseOutparam) {
    let request = request_context(&req);
    let logger = StructuredLogger::new(request.request_id.clone()).with_format(LogFormat::Json);

    let config = GatewayConfig::from_lookup(spin_variable);
    let store = open_store(&logger);
    let gateway = Gateway::new(config, SpinOriginClient, WasiSleeper, store, &logger);

    let ctx = ExecutionContext::new(request.request_id.clone());
    let response = gateway.handle(&request, &ctx).await;

    if let Err(e) = send(response_out, &response).await {
        logger
            .error_builder("Failed to send response")
            .field("error", format!("{e:#}"))
            .emit();
    }

    // The host keeps the instance alive until this returns.
    let completed = ctx.drain().await;
    logger
        .debug_builder("Background tasks complete")
        .field_u64("tasks", completed as u64)
        .emit();
}

fn request_context(req: &IncomingRequest) -> RequestContext {
    use spin_sdk::http::Method as Wire;

    let method = match req.method() {
        Wire::Post => Method::Post,
        Wire::Put => Method::Put,
        Wire::Delete => Method::Delete,
        Wire::Patch => Method::Patch,
        Wire::Head => Method::Head,
        Wire::Options => Method::Options,
        _ => Method::Get,
    };

    req.headers().entries().into_iter().fold(
        RequestContext::new(method, req.path_with_query().unwrap_or_default()),
        |ctx, (name, value)| ctx.with_header(name, String::from_utf8_lossy(&value).into_owned()),
    )
}

/// Spin variable names are the lowercase configuration keys.
fn spin_variable(key: &str) -> Option<String> {
    spin_sdk::variables::get(&key.to_ascii_lowercase()).ok()
}

/// The key-value store, or a per-instance map when it cannot be opened.
fn open_store(logger: &StructuredLogger) -> Rc<dyn EdgeCacheStore> {
    match KvCacheStore::open_default() {
        Ok(store) => Rc::new(store),
        Err(e) => {
            logger
                .error_builder("Key-value store unavailable; caching disabled for this request")
                .field("error", e.to_string())
                .emit();
            Rc::new(InMemoryStore::new())
        }
    }
}

fn build_outgoing(response: &EdgeResponse) -> Result<OutgoingResponse> {
    let header_list: Vec<(String, Vec<u8>)> = response
        .headers()
        .map(|(name, value)| (name.to_owned(), value.as_bytes().to_vec()))
        .collect();

    let headers =
        Fields::from_list(&header_list).map_err(|e| anyhow!("invalid response headers: {e:?}"))?;
    let outgoing = OutgoingResponse::new(headers);
    outgoing
        .set_status_code(response.status)
        .map_err(|()| anyhow!("invalid status code {}", response.status))?;
    Ok(outgoing)
}

async fn send(response_out: ResponseOutparam, response: &EdgeResponse) -> Result<()> {
    let (outgoing, body) = match build_outgoing(response) {
        Ok(outgoing) => (outgoing, response.body.clone()),
        Err(e) => {
            let fallback =
                EdgeResponse::plain_text(StatusCode::INTERNAL_SERVER_ERROR, format!("{e:#}"));
            (build_outgoing(&fallback)?, fallback.body)
        }
    };

    let mut sink = outgoing.take_body();
    response_out.set(outgoing);
    sink.send(body)
        .await
        .map_err(|e| anyhow!("{e:?}"))
        .context("writing response body")
}
