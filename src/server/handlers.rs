// Health and metrics handlers
// Author: kelexine (https://github.com/kelexine)

use crate::context::AppContext;
use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub checks: HashMap<String, HealthCheck>,
    pub timestamp: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthCheck {
    pub status: String,
    pub message: String,
}

impl HealthCheck {
    fn ok(message: impl Into<String>) -> Self {
        Self {
            status: "ok".to_string(),
            message: message.into(),
        }
    }

    fn warning(message: impl Into<String>) -> Self {
        Self {
            status: "warning".to_string(),
            message: message.into(),
        }
    }
}

/// Component overview. Missing upstream credentials degrade the service
/// without making it unhealthy; the remaining routes keep working.
pub async fn health_handler(State(ctx): State<Arc<AppContext>>) -> Json<HealthResponse> {
    let mut checks = HashMap::new();
    let mut overall_status = HealthStatus::Healthy;

    // Perplexity intelligence
    let intelligence_check = match ctx.intelligence() {
        Ok(client) => {
            let stats = client.cache_stats();
            HealthCheck::ok(format!(
                "{} cached entries ({} hits, {} misses)",
                client.cached_entries(),
                stats.hits,
                stats.misses
            ))
        }
        Err(_) => {
            overall_status = HealthStatus::Degraded;
            HealthCheck::warning("PERPLEXITY_API_KEY not configured")
        }
    };
    checks.insert("perplexity".to_string(), intelligence_check);

    // Stripe billing
    let stripe_check = if ctx.subscriptions.is_configured() {
        HealthCheck::ok("Stripe configured")
    } else {
        overall_status = HealthStatus::Degraded;
        HealthCheck::warning("STRIPE_SECRET_KEY not configured")
    };
    checks.insert("stripe".to_string(), stripe_check);

    // Report storage
    let dir = ctx.reports.store().dir().display().to_string();
    let reports_check = match tokio::fs::create_dir_all(ctx.reports.store().dir()).await {
        Ok(()) => HealthCheck::ok(format!("Writing reports to {}", dir)),
        Err(e) => {
            overall_status = HealthStatus::Unhealthy;
            HealthCheck {
                status: "error".to_string(),
                message: format!("Report directory {} unusable: {}", dir, e),
            }
        }
    };
    checks.insert("reports".to_string(), reports_check);

    Json(HealthResponse {
        status: overall_status,
        checks,
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

/// Prometheus text exposition.
pub async fn metrics_handler() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        crate::metrics::gather_metrics(),
    )
}
