use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder,
};
use std::sync::OnceLock;
use std::time::Instant;

pub struct Metrics {
    registry: Registry,
    pub http_requests_total: IntCounterVec,
    pub http_request_duration_seconds: HistogramVec,
    pub embed_pipeline_total: IntCounterVec,
    pub remote_call_duration_seconds: HistogramVec,
}

static METRICS: OnceLock<Metrics> = OnceLock::new();

fn build() -> Metrics {
    let registry = Registry::new();

    let http_requests_total = IntCounterVec::new(
        Opts::new("http_requests_total", "Total number of HTTP requests"),
        &["method", "path", "status"],
    )
    .expect("metric can be created");

    let http_request_duration_seconds = HistogramVec::new(
        HistogramOpts::new(
            "http_request_duration_seconds",
            "HTTP request duration in seconds",
        ),
        &["method", "path", "status"],
    )
    .expect("metric can be created");

    let embed_pipeline_total = IntCounterVec::new(
        Opts::new(
            "embed_pipeline_total",
            "Embed data requests by outcome (success or error kind)",
        ),
        &["outcome"],
    )
    .expect("metric can be created");

    let remote_call_duration_seconds = HistogramVec::new(
        HistogramOpts::new(
            "remote_call_duration_seconds",
            "Duration of identity provider and Power BI calls in seconds",
        ),
        &["call"],
    )
    .expect("metric can be created");

    for collector in [
        Box::new(http_requests_total.clone()) as Box<dyn prometheus::core::Collector>,
        Box::new(http_request_duration_seconds.clone()),
        Box::new(embed_pipeline_total.clone()),
        Box::new(remote_call_duration_seconds.clone()),
    ] {
        registry
            .register(collector)
            .expect("collector can be registered");
    }

    Metrics {
        registry,
        http_requests_total,
        http_request_duration_seconds,
        embed_pipeline_total,
        remote_call_duration_seconds,
    }
}

/// Process-wide metrics, created on first use.
pub fn metrics() -> &'static Metrics {
    METRICS.get_or_init(build)
}

pub fn init_metrics() {
    metrics();
}

pub fn record_embed_outcome(outcome: &str) {
    metrics()
        .embed_pipeline_total
        .with_label_values(&[outcome])
        .inc();
}

/// Observes the elapsed time of a remote call when dropped.
pub struct RemoteCallTimer {
    call: &'static str,
    started: Instant,
}

impl RemoteCallTimer {
    pub fn start(call: &'static str) -> Self {
        Self {
            call,
            started: Instant::now(),
        }
    }
}

impl Drop for RemoteCallTimer {
    fn drop(&mut self) {
        metrics()
            .remote_call_duration_seconds
            .with_label_values(&[self.call])
            .observe(self.started.elapsed().as_secs_f64());
    }
}

pub fn get_metrics() -> String {
    let mut buffer = Vec::new();
    let encoder = TextEncoder::new();
    let metric_families = metrics().registry.gather();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!(error = %e, "Failed to encode metrics");
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}
