// HTTP routes configuration
// Author: kelexine (https://github.com/kelexine)

use super::handlers::{health_handler, metrics_handler};
use super::middleware::{request_id_layers, track_metrics};
use super::{intelligence, reports, subscriptions};
use crate::context::AppContext;
use crate::error::Result;
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Shared state handed to every handler.
pub type AppState = Arc<AppContext>;

pub fn create_router(ctx: AppState) -> Result<Router> {
    let (set_request_id, propagate_request_id) = request_id_layers();

    let app = Router::new()
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        // Intelligence
        .route("/api/intelligence/context", get(intelligence::context_handler))
        .route("/api/intelligence/news", get(intelligence::news_handler))
        .route("/api/intelligence/experts", get(intelligence::experts_handler))
        .route("/api/intelligence/brief", get(intelligence::brief_handler))
        .route("/api/intelligence/trends", get(intelligence::trends_handler))
        // Reports
        .route("/api/reports/generate", post(reports::generate_handler))
        .route("/api/reports/status", get(reports::status_handler))
        .route("/api/reports/download/:id", get(reports::download_handler))
        // Subscriptions
        .route("/api/subscriptions/checkout", post(subscriptions::checkout_handler))
        .route("/api/subscriptions/portal", post(subscriptions::portal_handler))
        .route("/api/subscriptions/status", get(subscriptions::status_handler))
        .route("/api/subscriptions/cancel", post(subscriptions::cancel_handler))
        .route("/api/subscriptions/change-plan", post(subscriptions::change_plan_handler))
        .route("/api/subscriptions/webhook", post(subscriptions::webhook_handler))
        .route_layer(middleware::from_fn(track_metrics))
        // Request bodies are small JSON documents or webhook payloads
        .layer(tower_http::limit::RequestBodyLimitLayer::new(1024 * 1024))
        .layer(TraceLayer::new_for_http())
        .layer(propagate_request_id)
        .layer(set_request_id)
        .with_state(ctx);

    Ok(app)
}
