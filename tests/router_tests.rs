// HTTP surface tests driven through the router with oneshot requests
// Author: kelexine (https://github.com/kelexine)

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use sentimark::config::AppConfig;
use sentimark::context::AppContext;
use sentimark::error::Result;
use sentimark::reports::{PrintBackend, PrintOptions};
use sentimark::server::create_router;
use serde_json::{json, Value};
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

struct EchoBackend;

#[async_trait]
impl PrintBackend for EchoBackend {
    async fn print_pdf(&self, html: &str, _options: &PrintOptions) -> Result<Vec<u8>> {
        Ok(html.as_bytes().to_vec())
    }

    fn name(&self) -> &'static str {
        "echo"
    }
}

fn app_with(config: AppConfig) -> Router {
    let ctx = AppContext::with_backend(config, Arc::new(EchoBackend)).unwrap();
    create_router(Arc::new(ctx)).unwrap()
}

fn app(dir: &TempDir) -> Router {
    let mut config = AppConfig::default();
    config.reports.output_dir = dir.path().to_string_lossy().to_string();
    app_with(config)
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_intelligence_requires_market_id() {
    let dir = tempfile::tempdir().unwrap();
    for route in ["context", "news", "experts", "brief", "trends"] {
        let response = app(&dir)
            .oneshot(get(&format!("/api/intelligence/{}", route)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = json_body(response).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["error"]["code"], "INVALID_INPUT");
        assert_eq!(body["error"]["message"], "marketId parameter is required");
    }
}

#[tokio::test]
async fn test_intelligence_without_api_key_is_unavailable() {
    let dir = tempfile::tempdir().unwrap();
    let response = app(&dir)
        .oneshot(get("/api/intelligence/news?marketId=m1"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json_body(response).await["error"]["code"], "SERVICE_UNAVAILABLE");
}

#[tokio::test]
async fn test_intelligence_sets_cache_control() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/chat/completions")
        .with_status(200)
        .with_body(r#"{"choices":[{"message":{"content":"{\"breaking\": []}"}}]}"#)
        .create_async()
        .await;

    let dir = tempfile::tempdir().unwrap();
    let mut config = AppConfig::default();
    config.reports.output_dir = dir.path().to_string_lossy().to_string();
    config.perplexity.api_key = "pplx-test".to_string();
    config.perplexity.api_base_url = server.url();
    let app = app_with(config);

    let fresh = app.clone().oneshot(get("/api/intelligence/news?marketId=m1")).await.unwrap();
    assert_eq!(fresh.status(), StatusCode::OK);
    assert_eq!(fresh.headers()[header::CACHE_CONTROL], "public, max-age=300");

    let cached = app.oneshot(get("/api/intelligence/news?marketId=m1")).await.unwrap();
    assert_eq!(cached.headers()[header::CACHE_CONTROL], "public, max-age=900");
    let body = json_body(cached).await;
    assert_eq!(body["data"]["metadata"]["cached"], true);
    assert_eq!(body["data"]["data"]["type"], "news");
}

#[tokio::test]
async fn test_generate_status_and_download() {
    let dir = tempfile::tempdir().unwrap();
    let app = app(&dir);

    let response = app
        .clone()
        .oneshot(post_json(
            "/api/reports/generate",
            json!({"marketId": "m1", "userId": "u1", "includePerplexity": false}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-generation-time"));

    let body = json_body(response).await;
    let report_id = body["data"]["reportId"].as_str().unwrap().to_string();
    assert_eq!(body["data"]["status"], "completed");
    assert_eq!(body["data"]["pageCount"], 10);
    assert_eq!(
        body["data"]["downloadUrl"],
        format!("/api/reports/download/{}", report_id)
    );

    let status = app
        .clone()
        .oneshot(get(&format!("/api/reports/status?reportId={}", report_id)))
        .await
        .unwrap();
    assert_eq!(status.status(), StatusCode::OK);
    assert_eq!(json_body(status).await["data"]["marketId"], "unknown");

    let download = app
        .oneshot(get(&format!("/api/reports/download/{}", report_id)))
        .await
        .unwrap();
    assert_eq!(download.status(), StatusCode::OK);
    assert_eq!(download.headers()[header::CONTENT_TYPE], "application/pdf");
    assert_eq!(
        download.headers()[header::CONTENT_DISPOSITION],
        format!("attachment; filename=\"sentimark_report_{}.pdf\"", report_id).as_str()
    );
    assert_eq!(download.headers()[header::CACHE_CONTROL], "private, max-age=3600");
    assert_eq!(download.headers()["x-report-id"], report_id.as_str());
}

#[tokio::test]
async fn test_report_validation_and_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let app = app(&dir);

    let missing = app
        .clone()
        .oneshot(post_json("/api/reports/generate", json!({"marketId": "m1"})))
        .await
        .unwrap();
    assert_eq!(missing.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        json_body(missing).await["error"]["message"],
        "marketId and userId are required"
    );

    let no_id = app.clone().oneshot(get("/api/reports/status")).await.unwrap();
    assert_eq!(no_id.status(), StatusCode::BAD_REQUEST);

    let unknown = app
        .clone()
        .oneshot(get("/api/reports/status?reportId=4f1c2d8e-9a7b-4c3d-8e2f-1a2b3c4d5e6f"))
        .await
        .unwrap();
    assert_eq!(unknown.status(), StatusCode::NOT_FOUND);
    assert_eq!(json_body(unknown).await["error"]["code"], "NOT_FOUND");

    let download = app
        .oneshot(get("/api/reports/download/not-a-report"))
        .await
        .unwrap();
    assert_eq!(download.status(), StatusCode::NOT_FOUND);
    assert_eq!(
        json_body(download).await["error"]["message"],
        "Report not found or has expired"
    );
}

#[tokio::test]
async fn test_subscription_routes_without_stripe() {
    let dir = tempfile::tempdir().unwrap();
    let app = app(&dir);

    let checkout = app
        .clone()
        .oneshot(post_json("/api/subscriptions/checkout", json!({"tierId": "pro"})))
        .await
        .unwrap();
    assert_eq!(checkout.status(), StatusCode::SERVICE_UNAVAILABLE);

    let invalid = app
        .clone()
        .oneshot(post_json("/api/subscriptions/checkout", json!({"tierId": "free"})))
        .await
        .unwrap();
    assert_eq!(invalid.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        json_body(invalid).await["error"]["message"],
        "Invalid subscription tier"
    );

    let status = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/subscriptions/status")
                .header("x-user-id", "u42")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(status.status(), StatusCode::OK);
    let body = json_body(status).await;
    assert_eq!(body["data"]["userId"], "u42");
    assert_eq!(body["data"]["tier"], "free");
    assert_eq!(body["data"]["usage"]["pdfReportsLimit"], 0);

    let webhook = app
        .oneshot(post_json("/api/subscriptions/webhook", json!({})))
        .await
        .unwrap();
    assert_eq!(webhook.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_health_and_metrics() {
    let dir = tempfile::tempdir().unwrap();
    let app = app(&dir);

    let health = app.clone().oneshot(get("/health")).await.unwrap();
    assert_eq!(health.status(), StatusCode::OK);
    let body = json_body(health).await;
    assert_eq!(body["status"], "degraded");
    assert_eq!(body["checks"]["reports"]["status"], "ok");

    let metrics = app.oneshot(get("/metrics")).await.unwrap();
    assert_eq!(metrics.status(), StatusCode::OK);
    let text = metrics.into_body().collect().await.unwrap().to_bytes();
    assert!(String::from_utf8_lossy(&text).contains("requests_total"));
}
