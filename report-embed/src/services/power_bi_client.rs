//! Power BI REST API client.
//!
//! Only the two calls the embed pipeline needs: report lookup within a
//! workspace and multi-resource embed token generation.

use reqwest::{Client, StatusCode};
use service_core::observability::TracedClientExt;
use std::time::Duration;

use crate::error::EmbedError;
use crate::models::power_bi::{EmbedToken, GenerateTokenRequest, PowerBiErrorResponse, Report};
use crate::models::{AccessToken, ReportReference};
use crate::services::metrics::RemoteCallTimer;

#[derive(Clone)]
pub struct PowerBiClient {
    client: Client,
    api_root: String,
    timeout: Duration,
}

impl PowerBiClient {
    pub fn new(api_root: &str, timeout: Duration) -> Result<Self, EmbedError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| EmbedError::Configuration(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_root: api_root.trim_end_matches('/').to_string(),
            timeout,
        })
    }

    fn report_url(&self, report_ref: &ReportReference) -> String {
        format!(
            "{}/v1.0/myorg/groups/{}/reports/{}",
            self.api_root, report_ref.workspace_id, report_ref.report_id
        )
    }

    fn generate_token_url(&self) -> String {
        format!("{}/v1.0/myorg/GenerateToken", self.api_root)
    }

    /// Fetch report metadata. A 404 means the report is not in that workspace.
    #[tracing::instrument(
        skip(self, access_token),
        fields(workspace_id = %report_ref.workspace_id, report_id = %report_ref.report_id)
    )]
    pub async fn get_report_in_group(
        &self,
        access_token: &AccessToken,
        report_ref: &ReportReference,
    ) -> Result<Report, EmbedError> {
        let url = self.report_url(report_ref);

        let _timer = RemoteCallTimer::start("report_lookup");
        let response = self
            .client
            .traced_get(&url)
            .bearer_auth(access_token.secret())
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| transport_error("report lookup", e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| transport_error("report lookup", e))?;

        if status == StatusCode::NOT_FOUND {
            tracing::warn!(
                code = %PowerBiErrorResponse::code_from_body(&body),
                "Report not found in workspace"
            );
            return Err(EmbedError::ReportNotFound {
                workspace_id: report_ref.workspace_id,
                report_id: report_ref.report_id,
            });
        }

        if !status.is_success() {
            let code = PowerBiErrorResponse::code_from_body(&body);
            tracing::error!(status = %status, code = %code, "Report lookup failed");
            return Err(EmbedError::Upstream(format!(
                "report lookup returned {} ({})",
                status, code
            )));
        }

        let report: Report = serde_json::from_str(&body).map_err(|e| {
            EmbedError::Upstream(format!("unparseable report metadata: {}", e))
        })?;

        tracing::debug!(
            dataset_id = ?report.dataset_id,
            name = ?report.name,
            "Fetched report metadata"
        );

        Ok(report)
    }

    /// Request an embed token for the datasets, reports and identities in `request`.
    #[tracing::instrument(
        skip_all,
        fields(
            reports = request.reports.len(),
            identities = request.identities.as_ref().map_or(0, |i| i.len())
        )
    )]
    pub async fn generate_token(
        &self,
        access_token: &AccessToken,
        request: &GenerateTokenRequest,
    ) -> Result<EmbedToken, EmbedError> {
        let url = self.generate_token_url();

        let _timer = RemoteCallTimer::start("generate_token");
        let response = self
            .client
            .traced_post(&url)
            .bearer_auth(access_token.secret())
            .json(request)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| transport_error("token generation", e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| transport_error("token generation", e))?;

        if !status.is_success() {
            let code = PowerBiErrorResponse::code_from_body(&body);
            tracing::error!(status = %status, code = %code, "Embed token request rejected");
            return Err(EmbedError::TokenGeneration(format!("{} ({})", status, code)));
        }

        let token: EmbedToken = serde_json::from_str(&body).map_err(|e| {
            EmbedError::TokenGeneration(format!("unparseable embed token response: {}", e))
        })?;
        if token.token.is_empty() {
            return Err(EmbedError::TokenGeneration(
                "service returned an empty embed token".to_string(),
            ));
        }

        tracing::info!(
            token_id = ?token.token_id,
            expiration = ?token.expiration,
            "Embed token generated"
        );

        Ok(token)
    }
}

fn transport_error(call: &str, err: reqwest::Error) -> EmbedError {
    if err.is_timeout() {
        tracing::error!(call, "Power BI call timed out");
        EmbedError::Timeout(call.to_string())
    } else {
        tracing::error!(call, error = %err, "Power BI call failed");
        EmbedError::Upstream(format!("{} failed: {}", call, err))
    }
}
