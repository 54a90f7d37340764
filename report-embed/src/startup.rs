use axum::{middleware::from_fn, middleware::from_fn_with_state, routing::get, Router};
use service_core::middleware::{
    request_id_middleware, security_headers_middleware, EmbedFramePolicy, REQUEST_ID_HEADER,
};
use std::path::Path;
use std::sync::Arc;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::config::Settings;
use crate::handlers::{
    api::embed_data,
    app::{health_check, index},
    metrics::metrics,
};
use crate::middleware::metrics::metrics_middleware;
use crate::AppState;

/// CSP inputs derived from the configured embed origin and SDK location.
pub fn frame_policy(settings: &Settings) -> EmbedFramePolicy {
    EmbedFramePolicy {
        frame_sources: vec![settings.power_bi.embed_origin.clone()],
        script_sources: script_origin(&settings.power_bi.sdk_script_url)
            .into_iter()
            .collect(),
    }
}

/// `https://cdn.example.com/npm/x.js` -> `https://cdn.example.com`.
/// Same-origin paths need no extra source, `'self'` already covers them.
fn script_origin(url: &str) -> Option<String> {
    let (scheme, rest) = url.split_once("://")?;
    let host = rest.split('/').next().unwrap_or(rest);
    Some(format!("{}://{}", scheme, host))
}

pub fn build_router(state: AppState, policy: EmbedFramePolicy, static_dir: &Path) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/api/embed-data", get(embed_data))
        .route("/health", get(health_check))
        .route("/metrics", get(metrics))
        .nest_service("/static", ServeDir::new(static_dir))
        .layer(from_fn(metrics_middleware))
        .layer(from_fn_with_state(
            Arc::new(policy),
            security_headers_middleware,
        ))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get(REQUEST_ID_HEADER)
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                    version = ?request.version(),
                )
            }),
        )
        // Outermost, so the trace span above already sees the request id
        .layer(from_fn(request_id_middleware))
        .with_state(state)
}
