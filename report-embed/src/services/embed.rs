//! Embed data assembly: application token, report metadata, embed token.

use std::sync::Arc;
use uuid::Uuid;

use crate::config::Settings;
use crate::error::EmbedError;
use crate::models::power_bi::{
    GenerateTokenRequest, Report, TokenRequestDataset, TokenRequestIdentity, TokenRequestReport,
};
use crate::models::{EffectiveIdentity, ReportEmbedData, ReportReference, ServiceCredential};
use crate::services::metrics;
use crate::services::power_bi_client::PowerBiClient;
use crate::services::token_provider::{AzureAdTokenProvider, TokenProvider};

pub struct EmbedService {
    credential: ServiceCredential,
    token_provider: Arc<dyn TokenProvider>,
    power_bi: PowerBiClient,
}

impl EmbedService {
    pub fn new(
        credential: ServiceCredential,
        token_provider: Arc<dyn TokenProvider>,
        power_bi: PowerBiClient,
    ) -> Self {
        Self {
            credential,
            token_provider,
            power_bi,
        }
    }

    /// Wire the production identity provider and Power BI client from settings.
    pub fn from_settings(settings: &Settings) -> Result<Self, EmbedError> {
        let timeout = settings.http.timeout();
        let token_provider = Arc::new(AzureAdTokenProvider::new(timeout)?);
        let power_bi = PowerBiClient::new(&settings.power_bi.service_api_root, timeout)?;

        Ok(Self::new(
            settings.service_credential()?,
            token_provider,
            power_bi,
        ))
    }

    /// Build everything the browser needs to embed `report_ref`.
    ///
    /// With an `identity` the embed token is scoped to that row-level-security
    /// identity; without one a plain view token is requested.
    #[tracing::instrument(
        skip(self, identity),
        fields(rls = identity.is_some())
    )]
    pub async fn build_embed_data(
        &self,
        report_ref: &ReportReference,
        identity: Option<EffectiveIdentity>,
    ) -> Result<ReportEmbedData, EmbedError> {
        let result = self.run_pipeline(report_ref, identity).await;

        match &result {
            Ok(_) => metrics::record_embed_outcome("success"),
            Err(e) => {
                tracing::warn!(kind = e.kind(), error = %e, "Embed pipeline failed");
                metrics::record_embed_outcome(e.kind());
            }
        }

        result
    }

    async fn run_pipeline(
        &self,
        report_ref: &ReportReference,
        identity: Option<EffectiveIdentity>,
    ) -> Result<ReportEmbedData, EmbedError> {
        let access_token = self
            .token_provider
            .acquire_application_token(&self.credential)
            .await?;

        let report = self
            .power_bi
            .get_report_in_group(&access_token, report_ref)
            .await?;

        if !describes(&report, report_ref) {
            tracing::warn!(
                requested = %report_ref.report_id,
                returned = %report.id,
                "Report lookup returned a different report id"
            );
        }

        let request = build_token_request(&report, identity)?;
        let embed_token = self.power_bi.generate_token(&access_token, &request).await?;

        Ok(ReportEmbedData {
            report_id: report_ref.report_id.to_string(),
            embed_url: report.embed_url,
            token: embed_token.token,
        })
    }
}

/// Whether the looked-up metadata is for the requested report.
fn describes(report: &Report, report_ref: &ReportReference) -> bool {
    Uuid::parse_str(&report.id).is_ok_and(|id| id == report_ref.report_id)
}

/// Token request naming the report and its dataset.
///
/// An identity that names no datasets is applied to the report's dataset.
/// It is an error if neither names one.
pub fn build_token_request(
    report: &Report,
    identity: Option<EffectiveIdentity>,
) -> Result<GenerateTokenRequest, EmbedError> {
    let datasets: Vec<TokenRequestDataset> = report
        .dataset_id
        .iter()
        .map(|id| TokenRequestDataset { id: id.clone() })
        .collect();

    let identities = match identity {
        Some(mut identity) => {
            if identity.dataset_ids.is_empty() {
                identity.dataset_ids.extend(report.dataset_id.iter().cloned());
            }
            if identity.dataset_ids.is_empty() {
                return Err(EmbedError::TokenGeneration(format!(
                    "report {} has no dataset to apply identity '{}' to",
                    report.id, identity.username
                )));
            }
            Some(vec![TokenRequestIdentity::from(identity)])
        }
        None => None,
    };

    Ok(GenerateTokenRequest {
        datasets,
        reports: vec![TokenRequestReport {
            id: report.id.clone(),
            allow_edit: false,
        }],
        identities,
    })
}
