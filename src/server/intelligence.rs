// Intelligence route handlers
// Author: kelexine (https://github.com/kelexine)

use crate::context::AppContext;
use crate::error::{AppError, Result};
use crate::models::{ApiResponse, Endpoint};
use axum::extract::{Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use std::sync::Arc;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketQuery {
    pub market_id: Option<String>,
}

async fn serve(ctx: &AppContext, endpoint: Endpoint, query: MarketQuery) -> Result<Response> {
    let market_id = query
        .market_id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| AppError::InvalidInput("marketId parameter is required".to_string()))?;

    let intelligence = ctx.intelligence()?.fetch(endpoint, market_id).await?;
    let cache_control = endpoint.cache_control(intelligence.metadata.cached);

    Ok((
        [(header::CACHE_CONTROL, cache_control)],
        Json(ApiResponse::ok(intelligence)),
    )
        .into_response())
}

pub async fn context_handler(
    State(ctx): State<Arc<AppContext>>,
    Query(query): Query<MarketQuery>,
) -> Result<Response> {
    serve(&ctx, Endpoint::Context, query).await
}

pub async fn news_handler(
    State(ctx): State<Arc<AppContext>>,
    Query(query): Query<MarketQuery>,
) -> Result<Response> {
    serve(&ctx, Endpoint::News, query).await
}

pub async fn experts_handler(
    State(ctx): State<Arc<AppContext>>,
    Query(query): Query<MarketQuery>,
) -> Result<Response> {
    serve(&ctx, Endpoint::Experts, query).await
}

pub async fn brief_handler(
    State(ctx): State<Arc<AppContext>>,
    Query(query): Query<MarketQuery>,
) -> Result<Response> {
    serve(&ctx, Endpoint::Brief, query).await
}

pub async fn trends_handler(
    State(ctx): State<Arc<AppContext>>,
    Query(query): Query<MarketQuery>,
) -> Result<Response> {
    serve(&ctx, Endpoint::Trends, query).await
}
