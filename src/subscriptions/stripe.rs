// Stripe REST client (form-encoded requests, bearer secret key)
// Author: kelexine (https://github.com/kelexine)

use crate::config::StripeConfig;
use crate::error::{AppError, Result};
use crate::models::SubscriptionStatus;
use crate::utils::logging::sanitize;
use reqwest::{Client, Method};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};
use zeroize::Zeroizing;

#[derive(Debug, Deserialize)]
struct StripeErrorBody {
    error: StripeErrorDetail,
}

#[derive(Debug, Deserialize)]
struct StripeErrorDetail {
    #[serde(default)]
    message: Option<String>,
    #[serde(default, rename = "type")]
    kind: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Customer {
    pub id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PortalSession {
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Price {
    pub id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubscriptionItem {
    pub id: String,
    pub price: Price,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubscriptionItems {
    #[serde(default)]
    pub data: Vec<SubscriptionItem>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Subscription {
    pub id: String,
    pub status: SubscriptionStatus,
    #[serde(default)]
    pub customer: Option<String>,
    #[serde(default)]
    pub items: SubscriptionItems,
    #[serde(default)]
    pub current_period_start: Option<i64>,
    #[serde(default)]
    pub current_period_end: Option<i64>,
    #[serde(default)]
    pub cancel_at_period_end: bool,
    #[serde(default)]
    pub canceled_at: Option<i64>,
}

impl Subscription {
    pub fn first_item(&self) -> Option<&SubscriptionItem> {
        self.items.data.first()
    }
}

/// Checkout parameters for a subscription-mode session.
#[derive(Debug, Clone)]
pub struct CheckoutRequest<'a> {
    pub customer_id: &'a str,
    pub price_id: &'a str,
    pub trial_days: u32,
    pub user_id: &'a str,
    pub tier: &'a str,
    pub success_url: &'a str,
    pub cancel_url: &'a str,
}

/// Thin client over the Stripe endpoints the billing flow needs.
pub struct StripeClient {
    http_client: Client,
    secret_key: Zeroizing<String>,
    base_url: String,
}

impl StripeClient {
    pub fn new(config: &StripeConfig) -> Result<Self> {
        if !config.is_configured() {
            return Err(AppError::Config(
                "STRIPE_SECRET_KEY is required (stripe.secret_key)".to_string(),
            ));
        }

        let http_client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .connect_timeout(Duration::from_secs(10))
            .use_rustls_tls()
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            secret_key: Zeroizing::new(config.secret_key.clone()),
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
        })
    }

    pub async fn create_customer(&self, user_id: &str, email: Option<&str>) -> Result<Customer> {
        let mut form = vec![("metadata[userId]", user_id.to_string())];
        if let Some(email) = email {
            form.push(("email", email.to_string()));
        }
        self.send(Method::POST, "customers", "create_customer", &form)
            .await
    }

    pub async fn create_checkout_session(
        &self,
        request: &CheckoutRequest<'_>,
    ) -> Result<CheckoutSession> {
        let mut form = vec![
            ("customer", request.customer_id.to_string()),
            ("mode", "subscription".to_string()),
            ("payment_method_types[0]", "card".to_string()),
            ("line_items[0][price]", request.price_id.to_string()),
            ("line_items[0][quantity]", "1".to_string()),
            ("success_url", request.success_url.to_string()),
            ("cancel_url", request.cancel_url.to_string()),
            ("subscription_data[metadata][userId]", request.user_id.to_string()),
            ("subscription_data[metadata][tier]", request.tier.to_string()),
        ];
        if request.trial_days > 0 {
            form.push((
                "subscription_data[trial_period_days]",
                request.trial_days.to_string(),
            ));
        }
        self.send(Method::POST, "checkout/sessions", "create_checkout_session", &form)
            .await
    }

    pub async fn create_portal_session(
        &self,
        customer_id: &str,
        return_url: &str,
    ) -> Result<PortalSession> {
        let form = [
            ("customer", customer_id.to_string()),
            ("return_url", return_url.to_string()),
        ];
        self.send(Method::POST, "billing_portal/sessions", "create_portal_session", &form)
            .await
    }

    pub async fn retrieve_subscription(&self, subscription_id: &str) -> Result<Subscription> {
        let path = format!("subscriptions/{}", subscription_id);
        self.send::<Subscription, (&str, String)>(Method::GET, &path, "retrieve_subscription", &[])
            .await
    }

    pub async fn cancel_at_period_end(&self, subscription_id: &str) -> Result<Subscription> {
        let path = format!("subscriptions/{}", subscription_id);
        let form = [("cancel_at_period_end", "true".to_string())];
        self.send(Method::POST, &path, "cancel_subscription", &form)
            .await
    }

    /// Point `item_id` at `price_id`, prorating the difference.
    pub async fn change_price(
        &self,
        subscription_id: &str,
        item_id: &str,
        price_id: &str,
    ) -> Result<Subscription> {
        let path = format!("subscriptions/{}", subscription_id);
        let form = [
            ("items[0][id]", item_id.to_string()),
            ("items[0][price]", price_id.to_string()),
            ("proration_behavior", "create_prorations".to_string()),
        ];
        self.send(Method::POST, &path, "update_subscription", &form)
            .await
    }

    async fn send<T, P>(&self, method: Method, path: &str, operation: &str, form: &[P]) -> Result<T>
    where
        T: DeserializeOwned,
        P: serde::Serialize,
    {
        let url = format!("{}/{}", self.base_url, path);
        debug!("Stripe {} {}", method, url);

        let mut request = self
            .http_client
            .request(method.clone(), &url)
            .bearer_auth(self.secret_key.as_str());
        if !form.is_empty() {
            request = request.form(form);
        }

        let response = request.send().await.map_err(|e| {
            crate::metrics::record_stripe_call(operation, "error");
            AppError::Stripe(e.to_string())
        })?;

        let status = response.status();
        crate::metrics::record_stripe_call(operation, status.as_str());

        let body = response
            .text()
            .await
            .map_err(|e| AppError::Stripe(format!("Failed to read response: {}", e)))?;

        if !status.is_success() {
            let message = match serde_json::from_str::<StripeErrorBody>(&body) {
                Ok(parsed) => parsed
                    .error
                    .message
                    .or(parsed.error.kind)
                    .unwrap_or_else(|| "unknown error".to_string()),
                Err(_) => body.chars().take(200).collect(),
            };
            warn!(
                "Stripe {} failed with {}: {}",
                operation,
                status,
                sanitize(&message)
            );
            return Err(AppError::StripeStatus {
                status: status.as_u16(),
                message,
            });
        }

        serde_json::from_str(&body)
            .map_err(|e| AppError::Stripe(format!("Unexpected {} response: {}", operation, e)))
    }
}
