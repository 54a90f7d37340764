use axum::{extract::State, Json};
use service_core::error::AppError;

use crate::models::ReportEmbedData;
use crate::AppState;

/// `GET /api/embed-data`: the presentation payload as JSON.
#[tracing::instrument(skip_all)]
pub async fn embed_data(State(state): State<AppState>) -> Result<Json<ReportEmbedData>, AppError> {
    let embed_data = state
        .embed_service
        .build_embed_data(&state.report, state.effective_identity())
        .await?;

    Ok(Json(embed_data))
}
