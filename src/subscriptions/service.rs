// Subscription lifecycle, feature gates and usage tracking
// Author: kelexine (https://github.com/kelexine)

use super::store::{SubscriptionRecord, SubscriptionStore, UsagePeriod};
use super::stripe::{CheckoutRequest, StripeClient};
use super::webhook::{self, EventKind, WebhookEvent};
use crate::config::StripeConfig;
use crate::error::{AppError, Result};
use crate::models::{
    feature_gate, usage_limit, Feature, SubscriptionStatus, SubscriptionTier, UsageKind,
    UsageSummary, UserSubscription,
};
use chrono::Utc;
use std::sync::Arc;
use tracing::{info, warn};
use zeroize::Zeroizing;

/// Checkout session handed back to the browser.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckoutLink {
    pub session_id: String,
    pub checkout_url: String,
}

/// Billing operations on top of a [`SubscriptionStore`].
///
/// Stripe is optional: without a secret key every operation that talks to
/// Stripe fails with `SERVICE_UNAVAILABLE`, while status lookups, feature
/// gates and usage tracking keep working from the store alone.
pub struct SubscriptionService {
    store: Arc<dyn SubscriptionStore>,
    stripe: Option<StripeClient>,
    public_base_url: String,
    webhook_secret: Zeroizing<String>,
    webhook_tolerance_secs: i64,
}

impl SubscriptionService {
    pub fn new(config: &StripeConfig, store: Arc<dyn SubscriptionStore>) -> Result<Self> {
        let stripe = if config.is_configured() {
            Some(StripeClient::new(config)?)
        } else {
            info!("Stripe secret key not set; billing routes are disabled");
            None
        };

        Ok(Self {
            store,
            stripe,
            public_base_url: config.public_base_url.trim_end_matches('/').to_string(),
            webhook_secret: Zeroizing::new(config.webhook_secret.clone()),
            webhook_tolerance_secs: config.webhook_tolerance_seconds,
        })
    }

    pub fn is_configured(&self) -> bool {
        self.stripe.is_some()
    }

    fn stripe(&self) -> Result<&StripeClient> {
        self.stripe.as_ref().ok_or_else(|| {
            AppError::ServiceUnavailable("Stripe billing is not configured".to_string())
        })
    }

    pub async fn create_checkout_session(
        &self,
        tier: SubscriptionTier,
        user_id: &str,
    ) -> Result<CheckoutLink> {
        if !tier.is_paid() {
            return Err(AppError::InvalidInput("Invalid subscription tier".to_string()));
        }
        let stripe = self.stripe()?;

        let tier_config = self
            .store
            .tier_config(tier)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Subscription tier '{}' not found", tier)))?;
        let customer_id = self.customer_for(stripe, user_id).await?;

        let success_url = format!(
            "{}/dashboard?session_id={{CHECKOUT_SESSION_ID}}",
            self.public_base_url
        );
        let cancel_url = format!("{}/pricing", self.public_base_url);

        let session = stripe
            .create_checkout_session(&CheckoutRequest {
                customer_id: &customer_id,
                price_id: &tier_config.stripe_price_id,
                trial_days: tier_config.trial_days,
                user_id,
                tier: tier.as_str(),
                success_url: &success_url,
                cancel_url: &cancel_url,
            })
            .await?;

        let checkout_url = session
            .url
            .ok_or_else(|| AppError::Stripe("Checkout session has no URL".to_string()))?;

        info!("Checkout session {} created for {} ({})", session.id, user_id, tier);
        Ok(CheckoutLink {
            session_id: session.id,
            checkout_url,
        })
    }

    /// Billing portal URL for a user who already has a Stripe customer.
    pub async fn create_portal_session(&self, user_id: &str) -> Result<String> {
        let stripe = self.stripe()?;
        let customer_id = self
            .store
            .user(user_id)
            .await?
            .and_then(|u| u.stripe_customer_id)
            .ok_or_else(|| AppError::NotFound("No Stripe customer found".to_string()))?;

        let return_url = format!("{}/settings/billing", self.public_base_url);
        let session = stripe.create_portal_session(&customer_id, &return_url).await?;
        Ok(session.url)
    }

    /// Current tier, period and usage. Users without a live subscription are
    /// on the free tier for the current calendar month.
    pub async fn get_subscription_status(&self, user_id: &str) -> Result<UserSubscription> {
        let period = UsagePeriod::current();
        let usage = self.store.usage(user_id, period).await?;
        let customer_id = self.store.user(user_id).await?.and_then(|u| u.stripe_customer_id);
        let active = self.store.active_subscription(user_id).await?;

        let tier = active.as_ref().map(|s| s.tier).unwrap_or_default();
        let usage = UsageSummary {
            pdf_reports_generated: usage.pdf_reports,
            pdf_reports_limit: usage_limit(tier, UsageKind::PdfReport),
            api_calls_used: usage.api_calls,
            api_calls_limit: usage_limit(tier, UsageKind::ApiCall),
        };

        Ok(match active {
            Some(sub) => UserSubscription {
                user_id: user_id.to_string(),
                tier,
                status: sub.status,
                current_period_start: sub.current_period_start.to_rfc3339(),
                current_period_end: sub.current_period_end.to_rfc3339(),
                cancel_at_period_end: sub.cancel_at_period_end,
                usage,
                stripe_customer_id: sub.stripe_customer_id.or(customer_id),
                stripe_subscription_id: Some(sub.stripe_subscription_id),
                stripe_price_id: sub.stripe_price_id,
            },
            None => UserSubscription {
                user_id: user_id.to_string(),
                tier,
                status: SubscriptionStatus::Active,
                current_period_start: period.start.to_rfc3339(),
                current_period_end: period.end.to_rfc3339(),
                cancel_at_period_end: false,
                usage,
                stripe_customer_id: customer_id,
                stripe_subscription_id: None,
                stripe_price_id: None,
            },
        })
    }

    /// Stop renewal; access continues until the period ends.
    pub async fn cancel_subscription(&self, user_id: &str) -> Result<()> {
        let stripe = self.stripe()?;
        let mut record = self.changeable_subscription(user_id).await?;

        stripe
            .cancel_at_period_end(&record.stripe_subscription_id)
            .await?;

        let now = Utc::now();
        record.cancel_at_period_end = true;
        record.canceled_at = Some(now);
        record.updated_at = now;
        info!("Subscription {} set to cancel at period end", record.stripe_subscription_id);
        self.store.save_subscription(record).await
    }

    /// Move the subscription to `tier`'s price with prorations.
    pub async fn change_plan(&self, user_id: &str, tier: SubscriptionTier) -> Result<UserSubscription> {
        if !tier.is_paid() {
            return Err(AppError::InvalidInput("Invalid subscription tier".to_string()));
        }
        let stripe = self.stripe()?;
        let mut record = self.changeable_subscription(user_id).await?;
        let tier_config = self
            .store
            .tier_config(tier)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Tier '{}' not found", tier)))?;

        let current = stripe
            .retrieve_subscription(&record.stripe_subscription_id)
            .await?;
        let item = current.first_item().ok_or_else(|| {
            AppError::Stripe(format!("Subscription {} has no items", current.id))
        })?;
        let updated = stripe
            .change_price(&current.id, &item.id, &tier_config.stripe_price_id)
            .await?;

        info!(
            "Subscription {} moved from {} to {}",
            record.stripe_subscription_id, record.tier, tier
        );
        record.tier = tier;
        record.status = updated.status;
        record.stripe_price_id = Some(tier_config.stripe_price_id);
        record.updated_at = Utc::now();
        self.store.save_subscription(record).await?;

        self.get_subscription_status(user_id).await
    }

    /// Count one unit of `kind`, refusing once the tier's quota is used up.
    pub async fn track_usage(&self, user_id: &str, kind: UsageKind) -> Result<()> {
        let tier = self.current_tier(user_id).await?;
        let recorded = self
            .store
            .record_usage(user_id, kind, UsagePeriod::current(), usage_limit(tier, kind))
            .await?;

        if !recorded {
            return Err(usage_exceeded(kind));
        }
        Ok(())
    }

    /// `USAGE_LIMIT_EXCEEDED` when one more unit of `kind` would go over the
    /// tier's quota. Nothing is recorded.
    pub async fn ensure_quota(&self, user_id: &str, kind: UsageKind) -> Result<()> {
        let tier = self.current_tier(user_id).await?;
        let Some(limit) = usage_limit(tier, kind) else {
            return Ok(());
        };

        let used = self.store.usage(user_id, UsagePeriod::current()).await?.get(kind);
        if used >= limit {
            return Err(usage_exceeded(kind));
        }
        Ok(())
    }

    /// Whether the user's tier includes `feature`. Lookup failures deny.
    pub async fn check_feature_access(&self, user_id: &str, feature: Feature) -> bool {
        match self.current_tier(user_id).await {
            Ok(tier) => feature_gate(tier).features.allows(feature),
            Err(e) => {
                warn!("Feature check for {} failed: {}", user_id, e);
                false
            }
        }
    }

    /// `SUBSCRIPTION_REQUIRED` unless the user's tier includes `feature`.
    pub async fn require_feature(&self, user_id: &str, feature: Feature) -> Result<()> {
        if self.check_feature_access(user_id, feature).await {
            return Ok(());
        }
        Err(AppError::SubscriptionRequired(format!(
            "Your plan does not include {}",
            feature.as_str()
        )))
    }

    /// Verify and dispatch one webhook delivery.
    pub async fn handle_webhook(&self, payload: &[u8], signature: Option<&str>) -> Result<WebhookEvent> {
        let signature = signature
            .ok_or_else(|| AppError::InvalidInput("Missing signature".to_string()))?;
        if self.webhook_secret.is_empty() {
            return Err(AppError::ServiceUnavailable(
                "Webhook secret not configured".to_string(),
            ));
        }

        if let Err(e) = webhook::verify(
            payload,
            signature,
            &self.webhook_secret,
            self.webhook_tolerance_secs,
            Utc::now().timestamp(),
        ) {
            warn!("Rejected webhook: {}", e);
            crate::metrics::record_webhook_event("unknown", "rejected");
            return Err(e);
        }

        let event: WebhookEvent = serde_json::from_slice(payload)
            .map_err(|e| AppError::InvalidInput(format!("Invalid webhook payload: {}", e)))?;

        let outcome = match self.dispatch(&event).await {
            Ok(()) if event.kind() == EventKind::Unhandled => "unhandled",
            Ok(()) => "handled",
            Err(_) => "error",
        };
        crate::metrics::record_webhook_event(&event.event_type, outcome);

        if outcome == "error" {
            return Err(AppError::Internal(format!(
                "Webhook handler failed for {}",
                event.event_type
            )));
        }
        Ok(event)
    }

    async fn dispatch(&self, event: &WebhookEvent) -> Result<()> {
        let object_id = event.object_str("id").unwrap_or("unknown");

        match event.kind() {
            EventKind::CheckoutSessionCompleted => {
                info!("Checkout completed: {}", object_id);
                if let (Some(subscription_id), Some(stripe)) =
                    (event.object_str("subscription"), self.stripe.as_ref())
                {
                    let subscription = stripe
                        .retrieve_subscription(subscription_id)
                        .await
                        .map_err(|e| {
                            warn!("Failed to load subscription {}: {}", subscription_id, e);
                            e
                        })?;
                    info!(
                        "Subscription {} is {:?}",
                        subscription.id, subscription.status
                    );
                }
            }
            EventKind::SubscriptionUpdated => {
                info!(
                    "Subscription updated: {} ({})",
                    object_id,
                    event.object_str("status").unwrap_or("unknown")
                );
            }
            EventKind::SubscriptionDeleted => {
                info!("Subscription deleted: {}", object_id);
            }
            EventKind::InvoicePaymentSucceeded => {
                info!(
                    "Payment succeeded: {} (${:.2})",
                    object_id,
                    event.object_amount("amount_paid")
                );
            }
            EventKind::InvoicePaymentFailed => {
                warn!(
                    "Payment failed: {} (${:.2})",
                    object_id,
                    event.object_amount("amount_due")
                );
            }
            EventKind::Unhandled => {
                info!("Unhandled event type: {}", event.event_type);
            }
        }
        Ok(())
    }

    async fn current_tier(&self, user_id: &str) -> Result<SubscriptionTier> {
        Ok(self
            .store
            .active_subscription(user_id)
            .await?
            .map(|s| s.tier)
            .unwrap_or_default())
    }

    /// Active or trialing subscription; past-due ones cannot be changed.
    async fn changeable_subscription(&self, user_id: &str) -> Result<SubscriptionRecord> {
        self.store
            .active_subscription(user_id)
            .await?
            .filter(|s| {
                matches!(
                    s.status,
                    SubscriptionStatus::Active | SubscriptionStatus::Trialing
                )
            })
            .ok_or_else(|| AppError::NotFound("No active subscription found".to_string()))
    }

    async fn customer_for(&self, stripe: &StripeClient, user_id: &str) -> Result<String> {
        let user = self.store.user(user_id).await?;
        if let Some(id) = user.as_ref().and_then(|u| u.stripe_customer_id.clone()) {
            return Ok(id);
        }

        let email = user.and_then(|u| u.email);
        let customer = stripe.create_customer(user_id, email.as_deref()).await?;
        self.store.set_customer_id(user_id, &customer.id).await?;
        info!("Created Stripe customer {} for {}", customer.id, user_id);
        Ok(customer.id)
    }
}

fn usage_exceeded(kind: UsageKind) -> AppError {
    AppError::UsageLimitExceeded(format!("Usage limit exceeded for {}", kind.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subscriptions::store::MemoryStore;

    fn offline_service() -> SubscriptionService {
        SubscriptionService::new(&StripeConfig::default(), Arc::new(MemoryStore::new([]))).unwrap()
    }

    #[tokio::test]
    async fn test_free_status_by_default() {
        let status = offline_service().get_subscription_status("u1").await.unwrap();
        assert_eq!(status.tier, SubscriptionTier::Free);
        assert_eq!(status.status, SubscriptionStatus::Active);
        assert_eq!(status.usage.pdf_reports_limit, Some(0));
        assert_eq!(status.usage.api_calls_limit, Some(5));
        assert!(status.stripe_subscription_id.is_none());
    }

    #[tokio::test]
    async fn test_free_tier_quota() {
        let service = offline_service();
        let err = service.track_usage("u1", UsageKind::PdfReport).await.unwrap_err();
        assert!(matches!(err, AppError::UsageLimitExceeded(ref m) if m == "Usage limit exceeded for pdf_report"));

        for _ in 0..5 {
            service.track_usage("u1", UsageKind::ApiCall).await.unwrap();
        }
        assert!(service.track_usage("u1", UsageKind::ApiCall).await.is_err());
        assert_eq!(
            service.get_subscription_status("u1").await.unwrap().usage.api_calls_used,
            5
        );
    }

    #[tokio::test]
    async fn test_quota_check_does_not_record() {
        let service = offline_service();
        for _ in 0..3 {
            service.ensure_quota("u1", UsageKind::ApiCall).await.unwrap();
        }
        assert_eq!(
            service.get_subscription_status("u1").await.unwrap().usage.api_calls_used,
            0
        );

        for _ in 0..5 {
            service.track_usage("u1", UsageKind::ApiCall).await.unwrap();
        }
        assert!(matches!(
            service.ensure_quota("u1", UsageKind::ApiCall).await,
            Err(AppError::UsageLimitExceeded(_))
        ));
        assert!(matches!(
            service.ensure_quota("u1", UsageKind::PdfReport).await,
            Err(AppError::UsageLimitExceeded(_))
        ));
    }

    #[tokio::test]
    async fn test_stripe_operations_need_configuration() {
        let service = offline_service();
        assert!(!service.is_configured());
        assert!(matches!(
            service.create_checkout_session(SubscriptionTier::Pro, "u1").await,
            Err(AppError::ServiceUnavailable(_))
        ));
        assert!(matches!(
            service.create_checkout_session(SubscriptionTier::Free, "u1").await,
            Err(AppError::InvalidInput(_))
        ));
        assert!(!service.check_feature_access("u1", Feature::PdfReports).await);
        assert!(matches!(
            service.require_feature("u1", Feature::PdfReports).await,
            Err(AppError::SubscriptionRequired(_))
        ));
    }

    #[tokio::test]
    async fn test_webhook_requires_signature_and_secret() {
        let service = offline_service();
        assert!(matches!(
            service.handle_webhook(b"{}", None).await,
            Err(AppError::InvalidInput(ref m)) if m == "Missing signature"
        ));
        assert!(matches!(
            service.handle_webhook(b"{}", Some("t=1,v1=00")).await,
            Err(AppError::ServiceUnavailable(_))
        ));
    }
}
