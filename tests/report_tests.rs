// Report generation flow tests with an in-process print backend
// Author: kelexine (https://github.com/kelexine)

use async_trait::async_trait;
use chrono::{Duration, Utc};
use sentimark::config::AppConfig;
use sentimark::context::AppContext;
use sentimark::error::{AppError, Result};
use sentimark::models::{
    ReportRequest, ReportStatus, SubscriptionStatus, SubscriptionTier, UsageKind,
};
use sentimark::reports::{PrintBackend, PrintOptions};
use sentimark::subscriptions::{
    MemoryStore, SubscriptionRecord, SubscriptionStore, UsagePeriod,
};
use serde_json::json;
use std::sync::Arc;
use tempfile::TempDir;

/// Returns the populated HTML instead of a PDF.
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

struct FailingBackend;

#[async_trait]
impl PrintBackend for FailingBackend {
    async fn print_pdf(&self, _html: &str, _options: &PrintOptions) -> Result<Vec<u8>> {
        Err(AppError::PdfGeneration("browser crashed".to_string()))
    }

    fn name(&self) -> &'static str {
        "failing"
    }
}

fn config(dir: &TempDir) -> AppConfig {
    let mut config = AppConfig::default();
    config.reports.output_dir = dir.path().to_string_lossy().to_string();
    config
}

fn request(market_id: &str, include_perplexity: bool) -> ReportRequest {
    ReportRequest {
        market_id: market_id.to_string(),
        user_id: "u1".to_string(),
        include_perplexity,
    }
}

async fn rendered(ctx: &AppContext, report_id: &str) -> String {
    let (_, bytes) = ctx.reports.download(report_id).await.unwrap();
    String::from_utf8(bytes).unwrap()
}

#[tokio::test]
async fn test_basic_report_omits_premium_pages() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = AppContext::with_backend(config(&dir), Arc::new(EchoBackend)).unwrap();

    let report = ctx.reports.generate(&request("m1", false)).await.unwrap();
    let html = rendered(&ctx, &report.metadata.report_id).await;

    assert!(!html.contains("Market Context"));
    assert!(!html.contains("Historical Comparison"));
    assert!(!html.contains("{{"));
    assert!(html.contains("Executive Summary"));
    assert_eq!(report.metadata.market_id, "m1");
    assert_eq!(report.metadata.status, ReportStatus::Completed);
    assert_eq!(report.metadata.page_count, 10);
}

#[tokio::test]
async fn test_premium_report_includes_sample_pages_without_research_client() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = AppContext::with_backend(config(&dir), Arc::new(EchoBackend)).unwrap();

    let report = ctx.reports.generate(&request("m1", true)).await.unwrap();
    let html = rendered(&ctx, &report.metadata.report_id).await;

    assert!(html.contains("Market Context"));
    assert!(html.contains("Historical Comparison"));
}

#[tokio::test]
async fn test_premium_pages_come_from_research() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/chat/completions")
        .match_body(mockito::Matcher::PartialJson(json!({"model": "sonar-pro"})))
        .with_status(200)
        .with_body(
            json!({"choices": [{"message": {"content": json!({
                "background": "Turnout <decides> this one.",
                "keyEvents": [{"date": "2025-11-01", "event": "Debate", "impact": "high"}],
                "expertOpinions": []
            }).to_string()}}]})
            .to_string(),
        )
        .create_async()
        .await;
    server
        .mock("POST", "/chat/completions")
        .match_body(mockito::Matcher::PartialJson(json!({"model": "sonar-reasoning-pro"})))
        .with_status(500)
        .with_body("boom")
        .create_async()
        .await;

    let dir = tempfile::tempdir().unwrap();
    let mut config = config(&dir);
    config.perplexity.api_key = "pplx-test".to_string();
    config.perplexity.api_base_url = server.url();
    let ctx = AppContext::with_backend(config, Arc::new(EchoBackend)).unwrap();

    let report = ctx.reports.generate(&request("m1", true)).await.unwrap();
    let html = rendered(&ctx, &report.metadata.report_id).await;

    assert!(html.contains("Turnout &lt;decides&gt; this one."));
    assert!(html.contains("2025-11-01: Debate (high impact)"));
    // Trends failed upstream, so that page is left out.
    assert!(!html.contains("Historical Comparison"));
}

#[tokio::test]
async fn test_missing_ids_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = AppContext::with_backend(config(&dir), Arc::new(EchoBackend)).unwrap();

    let err = ctx.reports.generate(&request(" ", false)).await.unwrap_err();
    assert!(matches!(err, AppError::InvalidInput(ref m) if m == "marketId and userId are required"));
}

#[tokio::test]
async fn test_status_rederives_metadata() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = AppContext::with_backend(config(&dir), Arc::new(EchoBackend)).unwrap();

    let report = ctx.reports.generate(&request("m1", false)).await.unwrap();
    let status = ctx.reports.status(&report.metadata.report_id).await.unwrap();

    assert_eq!(status.report_id, report.metadata.report_id);
    assert_eq!(status.generated_at, report.metadata.generated_at);
    assert_eq!(status.file_size, report.metadata.file_size);
    assert_eq!(status.market_id, "unknown");
    assert_eq!(status.user_id, "unknown");
}

#[tokio::test]
async fn test_print_failure_is_a_generation_error() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = AppContext::with_backend(config(&dir), Arc::new(FailingBackend)).unwrap();

    let err = ctx.reports.generate(&request("m1", false)).await.unwrap_err();
    assert_eq!(err.code().as_str(), "PDF_GENERATION_ERROR");
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

async fn seed_pro(store: &MemoryStore, user_id: &str) {
    let now = Utc::now();
    store
        .save_subscription(SubscriptionRecord {
            user_id: user_id.to_string(),
            tier: SubscriptionTier::Pro,
            status: SubscriptionStatus::Active,
            stripe_subscription_id: "sub_1".to_string(),
            stripe_customer_id: Some("cus_1".to_string()),
            stripe_price_id: Some("price_pro".to_string()),
            current_period_start: now,
            current_period_end: now + Duration::days(30),
            cancel_at_period_end: false,
            canceled_at: None,
            created_at: now,
            updated_at: now,
        })
        .await
        .unwrap();
}

fn gated_config(dir: &TempDir) -> AppConfig {
    let mut config = config(dir);
    config.reports.enforce_feature_gates = true;
    config
}

#[tokio::test]
async fn test_feature_gates_when_enforced() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(MemoryStore::new([]));
    let ctx =
        AppContext::with_parts(gated_config(&dir), Arc::new(EchoBackend), store.clone()).unwrap();

    let err = ctx.reports.generate(&request("m1", false)).await.unwrap_err();
    assert!(matches!(err, AppError::SubscriptionRequired(_)));

    seed_pro(&store, "u1").await;

    ctx.reports.generate(&request("m1", true)).await.unwrap();
    let usage = store.usage("u1", UsagePeriod::current()).await.unwrap();
    assert_eq!(usage.get(UsageKind::PdfReport), 1);

    // Pro allows ten reports per month.
    for _ in 0..9 {
        ctx.reports.generate(&request("m1", false)).await.unwrap();
    }
    let err = ctx.reports.generate(&request("m1", false)).await.unwrap_err();
    assert!(matches!(err, AppError::UsageLimitExceeded(_)));
}

#[tokio::test]
async fn test_failed_generations_do_not_use_quota() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(MemoryStore::new([]));
    seed_pro(&store, "u1").await;
    let ctx =
        AppContext::with_parts(gated_config(&dir), Arc::new(FailingBackend), store.clone()).unwrap();

    // More failures than the monthly Pro allowance.
    for _ in 0..11 {
        let err = ctx.reports.generate(&request("m1", false)).await.unwrap_err();
        assert_eq!(err.code().as_str(), "PDF_GENERATION_ERROR");
    }

    let usage = store.usage("u1", UsagePeriod::current()).await.unwrap();
    assert_eq!(usage.get(UsageKind::PdfReport), 0);
}

#[tokio::test]
async fn test_storage_failure_is_a_generation_error() {
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("not-a-directory");
    std::fs::write(&blocker, b"occupied").unwrap();

    let mut config = gated_config(&dir);
    config.reports.output_dir = blocker.to_string_lossy().to_string();
    let store = Arc::new(MemoryStore::new([]));
    seed_pro(&store, "u1").await;
    let ctx = AppContext::with_parts(config, Arc::new(EchoBackend), store.clone()).unwrap();

    let err = ctx.reports.generate(&request("m1", false)).await.unwrap_err();
    assert!(matches!(err, AppError::PdfGeneration(_)));
    assert_eq!(err.status().as_u16(), 500);

    let usage = store.usage("u1", UsagePeriod::current()).await.unwrap();
    assert_eq!(usage.get(UsageKind::PdfReport), 0);
}
