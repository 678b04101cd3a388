// Report route handlers
// Author: kelexine (https://github.com/kelexine)

use crate::context::AppContext;
use crate::error::{AppError, Result};
use crate::models::{ApiResponse, ReportRequest};
use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderName};
use axum::response::{IntoResponse, Response};
use axum::Json;
use bytes::Bytes;
use serde::Deserialize;
use std::sync::Arc;

pub const GENERATION_TIME_HEADER: HeaderName = HeaderName::from_static("x-generation-time");
pub const REPORT_ID_HEADER: HeaderName = HeaderName::from_static("x-report-id");

pub async fn generate_handler(
    State(ctx): State<Arc<AppContext>>,
    body: Bytes,
) -> Result<Response> {
    let request: ReportRequest = serde_json::from_slice(&body)
        .map_err(|e| AppError::InvalidInput(format!("Invalid request body: {}", e)))?;

    let report = ctx.reports.generate(&request).await?;

    Ok((
        [(GENERATION_TIME_HEADER, report.duration.as_millis().to_string())],
        Json(ApiResponse::ok(report.metadata)),
    )
        .into_response())
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusQuery {
    pub report_id: Option<String>,
}

pub async fn status_handler(
    State(ctx): State<Arc<AppContext>>,
    Query(query): Query<StatusQuery>,
) -> Result<Response> {
    let report_id = query
        .report_id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| {
            AppError::InvalidInput("reportId query parameter is required".to_string())
        })?;

    let metadata = ctx.reports.status(report_id).await?;
    Ok(Json(ApiResponse::ok(metadata)).into_response())
}

pub async fn download_handler(
    State(ctx): State<Arc<AppContext>>,
    Path(report_id): Path<String>,
) -> Result<Response> {
    let (stored, pdf) = ctx.reports.download(&report_id).await.map_err(|e| match e {
        AppError::NotFound(_) => AppError::NotFound("Report not found or has expired".to_string()),
        other => other,
    })?;

    let id = stored.report_id.to_string();
    let disposition = format!("attachment; filename=\"sentimark_report_{}.pdf\"", id);

    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
            (header::CACHE_CONTROL, "private, max-age=3600".to_string()),
            (REPORT_ID_HEADER, id),
        ],
        pdf,
    )
        .into_response())
}
