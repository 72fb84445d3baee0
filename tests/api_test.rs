use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::util::ServiceExt;

use vitals_dashboard::config::{DashboardConfig, DEFAULT_DASHBOARD_PORT};
use vitals_dashboard::db::DashboardDb;
use vitals_dashboard::server::build_router;
use vitals_dashboard::state::DashboardState;

fn test_router() -> (TempDir, Router) {
    let dir = tempfile::tempdir().unwrap();
    let config = DashboardConfig {
        data_dir: dir.path().to_path_buf(),
        port: DEFAULT_DASHBOARD_PORT,
        log_file: None,
        mail_endpoint: None,
        mail_from: "alerts@test.local".to_string(),
        llm_endpoint: None,
        llm_model: "test-model".to_string(),
        llm_api_key: None,
        dispatch_interval_secs: 300,
    };
    let db = DashboardDb::new(dir.path()).unwrap();
    let state = std::sync::Arc::new(DashboardState::new(config, db).unwrap());
    (dir, build_router(state))
}

fn post(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn create_site(router: &Router) -> i64 {
    let response = router
        .clone()
        .oneshot(post(
            "/websites",
            json!({"userId": 1, "url": "https://example.com", "name": "Example"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    json_body(response).await["id"].as_i64().unwrap()
}

#[tokio::test]
async fn test_health_endpoint() {
    let (_dir, router) = test_router();
    let response = router.oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_create_website_rejects_bad_url() {
    let (_dir, router) = test_router();
    let response = router
        .oneshot(post(
            "/websites",
            json!({"userId": 1, "url": "ftp://example.com", "name": "Example"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert!(body["error"].as_str().unwrap().contains("url"));
}

#[tokio::test]
async fn test_record_metric_for_unknown_website_is_404() {
    let (_dir, router) = test_router();
    let response = router
        .oneshot(post("/metrics/record", json!({"websiteId": 42, "lcp": 1000})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_record_metric_rejects_negative_lcp() {
    let (_dir, router) = test_router();
    let site_id = create_site(&router).await;
    let response = router
        .oneshot(post(
            "/metrics/record",
            json!({"websiteId": site_id, "lcp": -5}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_breach_pipeline_end_to_end() {
    let (_dir, router) = test_router();
    let site_id = create_site(&router).await;

    let response = router
        .clone()
        .oneshot(post(
            &format!("/websites/{site_id}/alerts"),
            json!({"metricType": "lcp", "thresholdValue": "2500"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = router
        .clone()
        .oneshot(post(
            "/metrics/record",
            json!({"websiteId": site_id, "lcp": 4000}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["deltas"][0]["kind"], "triggered");
    assert_eq!(body["deltas"][0]["severity"], "red");

    let response = router
        .clone()
        .oneshot(get(&format!("/websites/{site_id}/alert-events")))
        .await
        .unwrap();
    let events = json_body(response).await;
    assert_eq!(events.as_array().unwrap().len(), 1);
    assert_eq!(events[0]["metricType"], "lcp");
    assert_eq!(events[0]["isResolved"], false);

    let response = router
        .oneshot(get(&format!("/websites/{site_id}/metrics")))
        .await
        .unwrap();
    let samples = json_body(response).await;
    assert_eq!(samples.as_array().unwrap().len(), 1);
    assert_eq!(samples[0]["lcp"], 4000);
}

#[tokio::test]
async fn test_rule_rejects_malformed_threshold() {
    let (_dir, router) = test_router();
    let site_id = create_site(&router).await;
    let response = router
        .oneshot(post(
            &format!("/websites/{site_id}/alerts"),
            json!({"metricType": "cls", "thresholdValue": "0.1.2"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_analysis_without_llm_is_503() {
    let (_dir, router) = test_router();
    let site_id = create_site(&router).await;
    let response = router
        .oneshot(post(&format!("/websites/{site_id}/analysis"), json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_subscription_rejects_bad_recipient() {
    let (_dir, router) = test_router();
    let site_id = create_site(&router).await;
    let response = router
        .oneshot(post(
            "/subscriptions",
            json!({
                "userId": 1,
                "websiteId": site_id,
                "recipient": "not-an-address",
                "frequency": "weekly"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_subscription_lifecycle() {
    let (_dir, router) = test_router();
    let site_id = create_site(&router).await;

    let response = router
        .clone()
        .oneshot(post(
            "/subscriptions",
            json!({
                "userId": 1,
                "websiteId": site_id,
                "recipient": "ops@example.com",
                "frequency": "monthly"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["frequency"], "monthly");
    assert!(body["lastSentAt"].is_null());

    let response = router
        .oneshot(get("/subscriptions?userId=1"))
        .await
        .unwrap();
    let subs = json_body(response).await;
    assert_eq!(subs.as_array().unwrap().len(), 1);
    assert_eq!(subs[0]["websiteName"], "Example");
}

#[tokio::test]
async fn test_deactivate_unknown_website_is_404() {
    let (_dir, router) = test_router();
    let response = router
        .oneshot(post("/websites/999/deactivate", json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
