use dotenvy::dotenv;
use report_embed::config::get_configuration;
use report_embed::services::EmbedService;
use report_embed::startup::{build_router, frame_policy};
use report_embed::AppState;
use service_core::observability::init_tracing;
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let configuration = get_configuration().map_err(|e| {
        eprintln!("Failed to read configuration: {}", e);
        anyhow::anyhow!("Configuration error: {}", e)
    })?;

    init_tracing("report-embed", &configuration.telemetry)?;

    report_embed::services::metrics::init_metrics();

    let report = configuration.report_reference()?;
    let embed_service = Arc::new(EmbedService::from_settings(&configuration)?);
    let state = AppState::new(
        embed_service,
        report,
        configuration.power_bi.effective_identity.clone(),
        configuration.power_bi.sdk_script_url.clone(),
    );

    if state.identity.is_some() {
        info!("Embed tokens will be scoped to the configured row-level-security identity");
    }

    let app = build_router(
        state,
        frame_policy(&configuration),
        &configuration.server.static_dir,
    );

    let address = format!(
        "{}:{}",
        configuration.server.host, configuration.server.port
    );
    let listener = tokio::net::TcpListener::bind(&address).await.map_err(|e| {
        tracing::error!("Failed to bind TCP listener to {}: {}", address, e);
        anyhow::anyhow!("Failed to bind to address {}: {}", address, e)
    })?;

    info!(
        workspace_id = %report.workspace_id,
        report_id = %report.report_id,
        "Starting report-embed on {}",
        address
    );
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| {
            tracing::error!("Server error: {}", e);
            anyhow::anyhow!("Server error: {}", e)
        })?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
