//! Power BI REST API wire types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::EffectiveIdentity;

/// Report metadata from `GET /groups/{groupId}/reports/{reportId}`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    pub embed_url: String,
    #[serde(default)]
    pub dataset_id: Option<String>,
    #[serde(default)]
    pub web_url: Option<String>,
}

/// Body of `POST /GenerateToken`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateTokenRequest {
    pub datasets: Vec<TokenRequestDataset>,
    pub reports: Vec<TokenRequestReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identities: Option<Vec<TokenRequestIdentity>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TokenRequestDataset {
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenRequestReport {
    pub id: String,
    pub allow_edit: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenRequestIdentity {
    pub username: String,
    pub roles: Vec<String>,
    pub datasets: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_data: Option<String>,
}

impl From<EffectiveIdentity> for TokenRequestIdentity {
    fn from(identity: EffectiveIdentity) -> Self {
        Self {
            username: identity.username,
            roles: identity.roles.into_iter().collect(),
            datasets: identity.dataset_ids.into_iter().collect(),
            custom_data: identity.custom_data,
        }
    }
}

/// Response of `POST /GenerateToken`.
#[derive(Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmbedToken {
    pub token: String,
    #[serde(default)]
    pub token_id: Option<String>,
    #[serde(default)]
    pub expiration: Option<DateTime<Utc>>,
}

/// Error envelope returned by the Power BI REST API.
#[derive(Debug, Deserialize)]
pub struct PowerBiErrorResponse {
    pub error: PowerBiErrorDetail,
}

#[derive(Debug, Deserialize)]
pub struct PowerBiErrorDetail {
    pub code: String,
    #[serde(default)]
    pub message: Option<String>,
}

impl PowerBiErrorResponse {
    /// Best-effort error code from a response body, `"Unknown"` if unparseable.
    pub fn code_from_body(body: &str) -> String {
        serde_json::from_str::<PowerBiErrorResponse>(body)
            .map(|e| e.error.code)
            .unwrap_or_else(|_| "Unknown".to_string())
    }
}
