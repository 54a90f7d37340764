mod common;

use common::{
    report_path, TestApp, DATASET_ID, EMBED_TOKEN, EMBED_URL, REPORT_ID, WORKSPACE_ID,
};
use report_embed::error::EmbedError;
use report_embed::models::EffectiveIdentity;
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

#[tokio::test]
async fn view_token_scenario_returns_stub_data() {
    let app = TestApp::spawn().await;
    app.mount_token_success().await;
    app.mount_report().await;
    app.mount_generate_token(1).await;

    let embed_data = app
        .service
        .build_embed_data(&app.report, None)
        .await
        .expect("Embed data should be built");

    assert_eq!(embed_data.report_id, REPORT_ID);
    assert_eq!(embed_data.embed_url, EMBED_URL);
    assert_eq!(embed_data.token, EMBED_TOKEN);

    let requests = app.generate_token_requests().await;
    assert_eq!(requests.len(), 1);
    assert_eq!(
        requests[0],
        json!({
            "datasets": [{ "id": DATASET_ID }],
            "reports": [{ "id": REPORT_ID, "allowEdit": false }]
        })
    );
    assert!(requests[0].get("identities").is_none());
}

#[tokio::test]
async fn row_level_security_scenario_sends_single_identity() {
    let app = TestApp::spawn().await;
    app.mount_token_success().await;
    app.mount_report().await;
    app.mount_generate_token(1).await;

    let identity = EffectiveIdentity::new("alice").with_role("Region_East");
    let embed_data = app
        .service
        .build_embed_data(&app.report, Some(identity))
        .await
        .expect("Embed data should be built");
    assert_eq!(embed_data.report_id, REPORT_ID);

    let requests = app.generate_token_requests().await;
    let identities = requests[0]["identities"]
        .as_array()
        .expect("identities array present");

    assert_eq!(identities.len(), 1);
    assert_eq!(identities[0]["username"], "alice");
    assert_eq!(identities[0]["roles"], json!(["Region_East"]));
    assert_eq!(identities[0]["datasets"], json!([DATASET_ID]));
    assert!(identities[0].get("customData").is_none());
}

#[tokio::test]
async fn custom_data_is_forwarded_with_identity() {
    let app = TestApp::spawn().await;
    app.mount_token_success().await;
    app.mount_report().await;
    app.mount_generate_token(1).await;

    let identity = EffectiveIdentity::new("bob")
        .with_role("Region_West")
        .with_custom_data("tier=gold");
    app.service
        .build_embed_data(&app.report, Some(identity))
        .await
        .expect("Embed data should be built");

    let requests = app.generate_token_requests().await;
    assert_eq!(requests[0]["identities"][0]["customData"], "tier=gold");
}

#[tokio::test]
async fn repeated_calls_agree_on_report_and_url() {
    let app = TestApp::spawn().await;
    app.mount_token_success().await;
    app.mount_report().await;
    app.mount_generate_token(2).await;

    let first = app
        .service
        .build_embed_data(&app.report, None)
        .await
        .expect("first call");
    let second = app
        .service
        .build_embed_data(&app.report, None)
        .await
        .expect("second call");

    assert_eq!(first.report_id, second.report_id);
    assert_eq!(first.embed_url, second.embed_url);

    // No token reuse: each call performs its own exchange.
    assert_eq!(app.token_requests().await.len(), 2);
}

#[tokio::test]
async fn missing_report_fails_without_token_generation() {
    let app = TestApp::spawn().await;
    app.mount_token_success().await;
    app.mount_report_not_found().await;
    app.mount_generate_token(0).await;

    let err = app
        .service
        .build_embed_data(&app.report, None)
        .await
        .unwrap_err();

    match err {
        EmbedError::ReportNotFound {
            workspace_id,
            report_id,
        } => {
            assert_eq!(workspace_id.to_string(), WORKSPACE_ID);
            assert_eq!(report_id.to_string(), REPORT_ID);
        }
        other => panic!("expected ReportNotFound, got {:?}", other),
    }
    assert!(app.generate_token_requests().await.is_empty());
}

#[tokio::test]
async fn authentication_failure_stops_the_pipeline() {
    let app = TestApp::spawn().await;
    app.mount_token_rejected().await;
    Mock::given(method("GET"))
        .and(path(report_path()))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&app.power_bi)
        .await;

    let err = app
        .service
        .build_embed_data(&app.report, None)
        .await
        .unwrap_err();

    assert!(matches!(err, EmbedError::Authentication(_)));
}

#[tokio::test]
async fn rejected_token_request_is_token_generation_error() {
    let app = TestApp::spawn().await;
    app.mount_token_success().await;
    app.mount_report().await;
    Mock::given(method("POST"))
        .and(path("/v1.0/myorg/GenerateToken"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({
            "error": { "code": "InsufficientPermissions" }
        })))
        .expect(1)
        .mount(&app.power_bi)
        .await;

    let err = app
        .service
        .build_embed_data(&app.report, None)
        .await
        .unwrap_err();

    match err {
        EmbedError::TokenGeneration(detail) => {
            assert!(detail.contains("InsufficientPermissions"))
        }
        other => panic!("expected TokenGeneration, got {:?}", other),
    }
}

#[tokio::test]
async fn report_lookup_server_error_is_upstream_error() {
    let app = TestApp::spawn().await;
    app.mount_token_success().await;
    Mock::given(method("GET"))
        .and(path(report_path()))
        .respond_with(ResponseTemplate::new(500))
        .mount(&app.power_bi)
        .await;
    app.mount_generate_token(0).await;

    let err = app
        .service
        .build_embed_data(&app.report, None)
        .await
        .unwrap_err();

    assert!(matches!(err, EmbedError::Upstream(_)));
}

#[tokio::test]
async fn slow_report_lookup_times_out() {
    let app = TestApp::spawn_with_timeout(Duration::from_millis(300)).await;
    app.mount_token_success().await;
    Mock::given(method("GET"))
        .and(path(report_path()))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
        .mount(&app.power_bi)
        .await;

    let err = app
        .service
        .build_embed_data(&app.report, None)
        .await
        .unwrap_err();

    assert!(matches!(err, EmbedError::Timeout(_)));
}

#[tokio::test]
async fn identity_for_report_without_dataset_is_rejected_before_token_generation() {
    let app = TestApp::spawn().await;
    app.mount_token_success().await;
    Mock::given(method("GET"))
        .and(path(report_path()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": REPORT_ID,
            "name": "Sales",
            "embedUrl": EMBED_URL
        })))
        .mount(&app.power_bi)
        .await;
    app.mount_generate_token(0).await;

    let err = app
        .service
        .build_embed_data(&app.report, Some(EffectiveIdentity::new("alice")))
        .await
        .unwrap_err();

    assert!(matches!(err, EmbedError::TokenGeneration(_)));
    assert!(app.generate_token_requests().await.is_empty());
}
