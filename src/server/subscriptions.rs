// Subscription route handlers
// Author: kelexine (https://github.com/kelexine)

use super::middleware::ActingUser;
use crate::context::AppContext;
use crate::error::{AppError, Result};
use crate::models::{ApiResponse, SubscriptionTier, UserSubscription};
use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub const STRIPE_SIGNATURE_HEADER: &str = "stripe-signature";

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TierRequest {
    pub tier_id: Option<String>,
}

impl TierRequest {
    fn paid_tier(&self) -> Result<SubscriptionTier> {
        self.tier_id
            .as_deref()
            .and_then(|t| t.parse::<SubscriptionTier>().ok())
            .filter(SubscriptionTier::is_paid)
            .ok_or_else(|| AppError::InvalidInput("Invalid subscription tier".to_string()))
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutResponse {
    pub session_id: String,
    pub url: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PortalResponse {
    pub portal_url: String,
}

#[derive(Debug, Serialize)]
pub struct WebhookAck {
    pub received: bool,
}

fn parse_body<T: for<'de> Deserialize<'de> + Default>(body: &[u8]) -> Result<T> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body)
        .map_err(|e| AppError::InvalidInput(format!("Invalid request body: {}", e)))
}

pub async fn checkout_handler(
    State(ctx): State<Arc<AppContext>>,
    ActingUser(user_id): ActingUser,
    body: Bytes,
) -> Result<Json<ApiResponse<CheckoutResponse>>> {
    let tier = parse_body::<TierRequest>(&body)?.paid_tier()?;
    let link = ctx
        .subscriptions
        .create_checkout_session(tier, &user_id)
        .await?;

    Ok(Json(ApiResponse::ok(CheckoutResponse {
        session_id: link.session_id,
        url: link.checkout_url,
    })))
}

pub async fn portal_handler(
    State(ctx): State<Arc<AppContext>>,
    ActingUser(user_id): ActingUser,
) -> Result<Json<ApiResponse<PortalResponse>>> {
    let portal_url = ctx.subscriptions.create_portal_session(&user_id).await?;
    Ok(Json(ApiResponse::ok(PortalResponse { portal_url })))
}

pub async fn status_handler(
    State(ctx): State<Arc<AppContext>>,
    ActingUser(user_id): ActingUser,
) -> Result<Json<ApiResponse<UserSubscription>>> {
    let subscription = ctx.subscriptions.get_subscription_status(&user_id).await?;
    Ok(Json(ApiResponse::ok(subscription)))
}

pub async fn cancel_handler(
    State(ctx): State<Arc<AppContext>>,
    ActingUser(user_id): ActingUser,
) -> Result<Json<ApiResponse<UserSubscription>>> {
    ctx.subscriptions.cancel_subscription(&user_id).await?;
    let subscription = ctx.subscriptions.get_subscription_status(&user_id).await?;
    Ok(Json(ApiResponse::ok(subscription)))
}

pub async fn change_plan_handler(
    State(ctx): State<Arc<AppContext>>,
    ActingUser(user_id): ActingUser,
    body: Bytes,
) -> Result<Json<ApiResponse<UserSubscription>>> {
    let tier = parse_body::<TierRequest>(&body)?.paid_tier()?;
    let subscription = ctx.subscriptions.change_plan(&user_id, tier).await?;
    Ok(Json(ApiResponse::ok(subscription)))
}

/// Stripe posts here; the body must stay byte-exact for signature checks.
pub async fn webhook_handler(
    State(ctx): State<Arc<AppContext>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookAck>> {
    let signature = headers
        .get(STRIPE_SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok());

    ctx.subscriptions.handle_webhook(&body, signature).await?;
    Ok(Json(WebhookAck { received: true }))
}
