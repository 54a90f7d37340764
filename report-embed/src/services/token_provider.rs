//! Application token acquisition via the OAuth client-credentials grant.
//!
//! Tokens are fetched on every call. A caching provider can be slotted in
//! behind [`TokenProvider`] without touching the embed pipeline.

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;
use service_core::observability::TracedClientExt;
use std::time::Duration;

use crate::error::EmbedError;
use crate::models::{AccessToken, ServiceCredential};
use crate::services::metrics;

/// Source of application access tokens for the BI service.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn acquire_application_token(
        &self,
        credential: &ServiceCredential,
    ) -> Result<AccessToken, EmbedError>;
}

/// Successful response from the identity provider's token endpoint.
#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    token_type: Option<String>,
    #[serde(default)]
    expires_in: Option<u64>,
}

/// Error response from the identity provider (`AADSTS...` codes).
#[derive(Debug, Deserialize)]
struct TokenErrorResponse {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

/// Client-credentials exchange against Microsoft Entra ID.
pub struct AzureAdTokenProvider {
    client: Client,
    timeout: Duration,
}

impl AzureAdTokenProvider {
    pub fn new(timeout: Duration) -> Result<Self, EmbedError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| EmbedError::Configuration(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, timeout })
    }
}

#[async_trait]
impl TokenProvider for AzureAdTokenProvider {
    #[tracing::instrument(
        skip_all,
        fields(tenant_id = %credential.tenant_id, client_id = %credential.client_id)
    )]
    async fn acquire_application_token(
        &self,
        credential: &ServiceCredential,
    ) -> Result<AccessToken, EmbedError> {
        credential.ensure_complete()?;

        let url = credential.token_endpoint();
        let scope = credential.default_scope();
        let form = [
            ("grant_type", "client_credentials"),
            ("client_id", credential.client_id.as_str()),
            ("client_secret", credential.client_secret.expose_secret().as_str()),
            ("scope", scope.as_str()),
        ];

        let _timer = metrics::RemoteCallTimer::start("identity_token");
        let response = self
            .client
            .traced_post(&url)
            .form(&form)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    tracing::error!("Identity provider timed out");
                    return EmbedError::Timeout("identity token".to_string());
                }
                tracing::error!(error = %e, "Failed to contact identity provider");
                EmbedError::Authentication(format!("identity provider unreachable: {}", e))
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            EmbedError::Authentication(format!("failed to read identity provider response: {}", e))
        })?;

        if !status.is_success() {
            let detail = serde_json::from_str::<TokenErrorResponse>(&body)
                .map(|e| match e.error_description {
                    Some(description) => format!("{}: {}", e.error, description),
                    None => e.error,
                })
                .unwrap_or_else(|_| format!("HTTP {}", status));
            tracing::error!(status = %status, error = %detail, "Client credentials exchange rejected");
            return Err(EmbedError::Authentication(detail));
        }

        let token: TokenResponse = serde_json::from_str(&body).map_err(|e| {
            EmbedError::Authentication(format!("unparseable token response: {}", e))
        })?;
        if token.access_token.is_empty() {
            return Err(EmbedError::Authentication(
                "identity provider returned an empty access token".to_string(),
            ));
        }

        tracing::debug!(expires_in = ?token.expires_in, "Acquired application token");

        Ok(AccessToken {
            value: Secret::new(token.access_token),
            token_type: token.token_type.unwrap_or_else(|| "Bearer".to_string()),
            expires_in: token.expires_in,
        })
    }
}
