use askama::Template;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use service_core::error::AppError;

use crate::error::EmbedError;
use crate::AppState;

#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexTemplate {
    pub report_id: String,
    pub sdk_script_url: String,
    /// Script-safe JSON for the `report-embed-data` data island.
    pub embed_data_json: String,
}

#[derive(Template)]
#[template(path = "error.html")]
pub struct ErrorTemplate {
    pub status: u16,
    pub message: &'static str,
}

impl ErrorTemplate {
    fn from_embed_error(err: EmbedError) -> (StatusCode, Self) {
        let message = err.user_message();
        let status = AppError::from(err).status_code();
        (
            status,
            Self {
                status: status.as_u16(),
                message,
            },
        )
    }
}

/// `GET /`: assemble embed data and render the report page.
#[tracing::instrument(skip_all)]
pub async fn index(State(state): State<AppState>) -> Response {
    let embed_data = match state
        .embed_service
        .build_embed_data(&state.report, state.effective_identity())
        .await
    {
        Ok(embed_data) => embed_data,
        Err(e) => return ErrorTemplate::from_embed_error(e).into_response(),
    };

    match embed_data.to_script_json() {
        Ok(embed_data_json) => IndexTemplate {
            report_id: embed_data.report_id,
            sdk_script_url: state.sdk_script_url.clone(),
            embed_data_json,
        }
        .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Failed to serialize embed data");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorTemplate {
                    status: 500,
                    message: "The report could not be loaded right now.",
                },
            )
                .into_response()
        }
    }
}

pub async fn health_check() -> &'static str {
    "OK"
}
