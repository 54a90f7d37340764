use service_core::error::AppError;
use thiserror::Error;
use uuid::Uuid;

/// Failures of the embed pipeline. None of them are retried.
#[derive(Debug, Error)]
pub enum EmbedError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Report {report_id} not found in workspace {workspace_id}")]
    ReportNotFound { workspace_id: Uuid, report_id: Uuid },

    #[error("Embed token generation failed: {0}")]
    TokenGeneration(String),

    #[error("Power BI service call failed: {0}")]
    Upstream(String),

    #[error("Remote call timed out: {0}")]
    Timeout(String),
}

impl EmbedError {
    /// Short label used for metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            EmbedError::Configuration(_) => "configuration",
            EmbedError::Authentication(_) => "authentication",
            EmbedError::ReportNotFound { .. } => "report_not_found",
            EmbedError::TokenGeneration(_) => "token_generation",
            EmbedError::Upstream(_) => "upstream",
            EmbedError::Timeout(_) => "timeout",
        }
    }

    /// Text safe to show an end user.
    pub fn user_message(&self) -> &'static str {
        match self {
            EmbedError::ReportNotFound { .. } => "The configured report could not be found.",
            EmbedError::Configuration(_) => "The application is not configured correctly.",
            EmbedError::Timeout(_) => "A remote service did not respond in time.",
            EmbedError::Authentication(_)
            | EmbedError::TokenGeneration(_)
            | EmbedError::Upstream(_) => "The report could not be loaded right now.",
        }
    }
}

impl From<config::ConfigError> for EmbedError {
    fn from(err: config::ConfigError) -> Self {
        EmbedError::Configuration(err.to_string())
    }
}

impl From<validator::ValidationErrors> for EmbedError {
    fn from(err: validator::ValidationErrors) -> Self {
        EmbedError::Configuration(err.to_string())
    }
}

impl From<EmbedError> for AppError {
    fn from(err: EmbedError) -> Self {
        match err {
            EmbedError::Configuration(msg) => AppError::ConfigError(anyhow::anyhow!(msg)),
            EmbedError::ReportNotFound { .. } => {
                AppError::NotFound(anyhow::anyhow!("Report not found"))
            }
            EmbedError::Timeout(call) => AppError::GatewayTimeout(call),
            EmbedError::Authentication(_) => {
                AppError::BadGateway("identity provider rejected the application".to_string())
            }
            EmbedError::TokenGeneration(_) => {
                AppError::BadGateway("embed token generation failed".to_string())
            }
            EmbedError::Upstream(_) => AppError::BadGateway("Power BI service error".to_string()),
        }
    }
}
