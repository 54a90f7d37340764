//! Shared test harness: wiremock stand-ins for the identity provider and the
//! Power BI REST API, plus an `EmbedService` wired to them.
#![allow(dead_code)]

use axum::Router;
use report_embed::config::EffectiveIdentitySettings;
use report_embed::models::{ReportReference, ServiceCredential};
use report_embed::services::{AzureAdTokenProvider, EmbedService, PowerBiClient};
use report_embed::startup::build_router;
use report_embed::AppState;
use secrecy::Secret;
use serde_json::{json, Value};
use service_core::middleware::EmbedFramePolicy;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const TENANT_ID: &str = "33333333-3333-3333-3333-333333333333";
pub const WORKSPACE_ID: &str = "11111111-1111-1111-1111-111111111111";
pub const REPORT_ID: &str = "22222222-2222-2222-2222-222222222222";
pub const DATASET_ID: &str = "44444444-4444-4444-4444-444444444444";
pub const CLIENT_ID: &str = "55555555-5555-5555-5555-555555555555";
pub const CLIENT_SECRET: &str = "test-client-secret";
pub const RESOURCE_ID: &str = "https://analysis.windows.net/powerbi/api";

pub const APP_TOKEN: &str = "app-access-token";
pub const EMBED_TOKEN: &str = "H4sIAAAAAAAEAB2Wtw7sWBVE-stub-embed-token";
pub const EMBED_URL: &str = "https://app.powerbi.com/reportEmbed?reportId=22222222-2222-2222-2222-222222222222&groupId=11111111-1111-1111-1111-111111111111";

pub struct TestApp {
    pub identity_provider: MockServer,
    pub power_bi: MockServer,
    pub service: Arc<EmbedService>,
    pub report: ReportReference,
}

impl TestApp {
    pub async fn spawn() -> Self {
        Self::spawn_with_timeout(Duration::from_secs(5)).await
    }

    pub async fn spawn_with_timeout(timeout: Duration) -> Self {
        let identity_provider = MockServer::start().await;
        let power_bi = MockServer::start().await;

        let credential = credential().with_authority_host(identity_provider.uri());
        let token_provider =
            Arc::new(AzureAdTokenProvider::new(timeout).expect("Failed to build token provider"));
        let client = PowerBiClient::new(&format!("{}/", power_bi.uri()), timeout)
            .expect("Failed to build Power BI client");

        Self {
            identity_provider,
            power_bi,
            service: Arc::new(EmbedService::new(credential, token_provider, client)),
            report: report_reference(),
        }
    }

    pub fn router(&self, identity: Option<EffectiveIdentitySettings>) -> Router {
        let state = AppState::new(
            self.service.clone(),
            self.report,
            identity,
            "https://cdn.jsdelivr.net/npm/powerbi-client@2.23.1/dist/powerbi.min.js".to_string(),
        );
        let policy = EmbedFramePolicy {
            frame_sources: vec!["https://app.powerbi.com".to_string()],
            script_sources: vec!["https://cdn.jsdelivr.net".to_string()],
        };

        build_router(
            state,
            policy,
            &Path::new(env!("CARGO_MANIFEST_DIR")).join("static"),
        )
    }

    /// Identity provider accepts the client credentials.
    pub async fn mount_token_success(&self) {
        Mock::given(method("POST"))
            .and(path(token_path()))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "token_type": "Bearer",
                "expires_in": 3599,
                "ext_expires_in": 3599,
                "access_token": APP_TOKEN
            })))
            .mount(&self.identity_provider)
            .await;
    }

    /// Identity provider rejects the client secret.
    pub async fn mount_token_rejected(&self) {
        Mock::given(method("POST"))
            .and(path(token_path()))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "error": "invalid_client",
                "error_description": "AADSTS7000215: Invalid client secret provided.",
                "error_codes": [7000215]
            })))
            .mount(&self.identity_provider)
            .await;
    }

    pub async fn mount_report(&self) {
        Mock::given(method("GET"))
            .and(path(report_path()))
            .and(header("authorization", format!("Bearer {}", APP_TOKEN).as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": REPORT_ID,
                "reportType": "PowerBIReport",
                "name": "Regional Sales",
                "webUrl": format!("https://app.powerbi.com/groups/{}/reports/{}", WORKSPACE_ID, REPORT_ID),
                "embedUrl": EMBED_URL,
                "isFromPbix": true,
                "isOwnedByMe": true,
                "datasetId": DATASET_ID
            })))
            .mount(&self.power_bi)
            .await;
    }

    pub async fn mount_report_not_found(&self) {
        Mock::given(method("GET"))
            .and(path(report_path()))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "error": {
                    "code": "PowerBIEntityNotFound",
                    "pbi.error": { "code": "PowerBIEntityNotFound" }
                }
            })))
            .mount(&self.power_bi)
            .await;
    }

    /// Token generation succeeds; `expected_calls` is verified when the server drops.
    pub async fn mount_generate_token(&self, expected_calls: u64) {
        Mock::given(method("POST"))
            .and(path("/v1.0/myorg/GenerateToken"))
            .and(header("authorization", format!("Bearer {}", APP_TOKEN).as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "token": EMBED_TOKEN,
                "tokenId": "66666666-6666-6666-6666-666666666666",
                "expiration": "2030-01-01T01:00:00Z"
            })))
            .expect(expected_calls)
            .mount(&self.power_bi)
            .await;
    }

    /// JSON bodies of every GenerateToken call received so far.
    pub async fn generate_token_requests(&self) -> Vec<Value> {
        self.power_bi
            .received_requests()
            .await
            .unwrap_or_default()
            .into_iter()
            .filter(|request| request.url.path() == "/v1.0/myorg/GenerateToken")
            .map(|request| {
                serde_json::from_slice(&request.body).expect("GenerateToken body is JSON")
            })
            .collect()
    }

    /// Form bodies of every token endpoint call received so far.
    pub async fn token_requests(&self) -> Vec<String> {
        self.identity_provider
            .received_requests()
            .await
            .unwrap_or_default()
            .into_iter()
            .map(|request| String::from_utf8(request.body).expect("form body is UTF-8"))
            .collect()
    }
}

pub fn credential() -> ServiceCredential {
    ServiceCredential::new(
        TENANT_ID,
        CLIENT_ID,
        Secret::new(CLIENT_SECRET.to_string()),
        RESOURCE_ID,
    )
    .expect("test credential is complete")
}

pub fn report_reference() -> ReportReference {
    ReportReference {
        workspace_id: Uuid::parse_str(WORKSPACE_ID).unwrap(),
        report_id: Uuid::parse_str(REPORT_ID).unwrap(),
    }
}

pub fn token_path() -> String {
    format!("/{}/oauth2/v2.0/token", TENANT_ID)
}

pub fn report_path() -> String {
    format!("/v1.0/myorg/groups/{}/reports/{}", WORKSPACE_ID, REPORT_ID)
}
