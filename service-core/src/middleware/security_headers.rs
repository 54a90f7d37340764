use axum::{
    extract::{Request, State},
    http::{HeaderValue, header},
    middleware::Next,
    response::IntoResponse,
};
use std::sync::Arc;

/// Content-Security-Policy inputs for pages that host an embedded report.
#[derive(Debug, Clone)]
pub struct EmbedFramePolicy {
    /// Origins allowed as iframe sources (the BI service's embed host).
    pub frame_sources: Vec<String>,
    /// Extra script origins, e.g. the CDN serving the embedding SDK.
    pub script_sources: Vec<String>,
}

impl EmbedFramePolicy {
    /// CSP for HTML pages: own scripts plus the SDK, frames only from the BI service.
    pub fn page_csp(&self) -> String {
        format!(
            "default-src 'self'; \
             script-src 'self' {}; \
             style-src 'self' 'unsafe-inline'; \
             img-src 'self' data:; \
             frame-src {}; \
             connect-src 'self'; \
             frame-ancestors 'none'",
            self.script_sources.join(" "),
            self.frame_sources.join(" "),
        )
    }
}

fn is_page_route(path: &str) -> bool {
    !(path.starts_with("/api/") || path == "/health" || path == "/metrics")
}

pub async fn security_headers_middleware(
    State(policy): State<Arc<EmbedFramePolicy>>,
    req: Request,
    next: Next,
) -> impl IntoResponse {
    let page = is_page_route(req.uri().path());

    let mut response = next.run(req).await;
    let headers = response.headers_mut();

    headers.insert(
        header::X_CONTENT_TYPE_OPTIONS,
        HeaderValue::from_static("nosniff"),
    );
    headers.insert(
        header::STRICT_TRANSPORT_SECURITY,
        HeaderValue::from_static("max-age=31536000; includeSubDomains"),
    );
    headers.insert(header::X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));
    // Embed tokens must not linger in shared caches.
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));

    let csp = if page {
        HeaderValue::from_str(&policy.page_csp()).ok()
    } else {
        Some(HeaderValue::from_static(
            "default-src 'none'; frame-ancestors 'none'",
        ))
    };
    if let Some(csp) = csp {
        headers.insert(header::CONTENT_SECURITY_POLICY, csp);
    }

    response
}
