// Subscription persistence seam and its in-memory implementation
// Author: kelexine (https://github.com/kelexine)

use crate::config::StripeConfig;
use crate::error::Result;
use crate::models::{SubscriptionStatus, SubscriptionTier, UsageKind};
use async_trait::async_trait;
use chrono::{DateTime, Datelike, Duration, TimeZone, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;

/// Billing settings of one tier.
#[derive(Debug, Clone, PartialEq)]
pub struct TierConfig {
    pub tier: SubscriptionTier,
    pub stripe_price_id: String,
    pub trial_days: u32,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserRecord {
    pub user_id: String,
    pub email: Option<String>,
    pub stripe_customer_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SubscriptionRecord {
    pub user_id: String,
    pub tier: SubscriptionTier,
    pub status: SubscriptionStatus,
    pub stripe_subscription_id: String,
    pub stripe_customer_id: Option<String>,
    pub stripe_price_id: Option<String>,
    pub current_period_start: DateTime<Utc>,
    pub current_period_end: DateTime<Utc>,
    pub cancel_at_period_end: bool,
    pub canceled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Usage counted in one billing period.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UsageCounts {
    pub pdf_reports: u64,
    pub api_calls: u64,
}

impl UsageCounts {
    pub fn get(&self, kind: UsageKind) -> u64 {
        match kind {
            UsageKind::PdfReport => self.pdf_reports,
            UsageKind::ApiCall => self.api_calls,
        }
    }

    fn increment(&mut self, kind: UsageKind) {
        match kind {
            UsageKind::PdfReport => self.pdf_reports += 1,
            UsageKind::ApiCall => self.api_calls += 1,
        }
    }
}

/// A calendar-month usage period in UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UsagePeriod {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl UsagePeriod {
    /// The month containing `now`; `end` is the last millisecond of the month.
    pub fn month_of(now: DateTime<Utc>) -> Self {
        let start = Utc
            .with_ymd_and_hms(now.year(), now.month(), 1, 0, 0, 0)
            .single()
            .unwrap_or(now);
        let (next_year, next_month) = if now.month() == 12 {
            (now.year() + 1, 1)
        } else {
            (now.year(), now.month() + 1)
        };
        let next = Utc
            .with_ymd_and_hms(next_year, next_month, 1, 0, 0, 0)
            .single()
            .unwrap_or(now);

        Self {
            start,
            end: next - Duration::milliseconds(1),
        }
    }

    pub fn current() -> Self {
        Self::month_of(Utc::now())
    }
}

/// Storage behind the subscription service.
#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    async fn tier_config(&self, tier: SubscriptionTier) -> Result<Option<TierConfig>>;

    async fn user(&self, user_id: &str) -> Result<Option<UserRecord>>;

    async fn set_customer_id(&self, user_id: &str, customer_id: &str) -> Result<()>;

    /// Most recent subscription whose status still grants its tier.
    async fn active_subscription(&self, user_id: &str) -> Result<Option<SubscriptionRecord>>;

    /// Insert or replace, keyed by the Stripe subscription id.
    async fn save_subscription(&self, record: SubscriptionRecord) -> Result<()>;

    async fn usage(&self, user_id: &str, period: UsagePeriod) -> Result<UsageCounts>;

    /// Count one unit of `kind` unless `limit` is already reached.
    /// Returns whether the unit was recorded.
    async fn record_usage(
        &self,
        user_id: &str,
        kind: UsageKind,
        period: UsagePeriod,
        limit: Option<u64>,
    ) -> Result<bool>;
}

#[derive(Default)]
struct MemoryState {
    users: HashMap<String, UserRecord>,
    subscriptions: HashMap<String, SubscriptionRecord>,
    usage: HashMap<(String, UsagePeriod), UsageCounts>,
}

/// Process-local store. Tier prices come from configuration; everything
/// else lives until the process exits.
pub struct MemoryStore {
    tiers: HashMap<SubscriptionTier, TierConfig>,
    state: RwLock<MemoryState>,
}

impl MemoryStore {
    pub fn new(tiers: impl IntoIterator<Item = TierConfig>) -> Self {
        Self {
            tiers: tiers.into_iter().map(|t| (t.tier, t)).collect(),
            state: RwLock::new(MemoryState::default()),
        }
    }

    /// Paid tiers with a configured price id.
    pub fn from_config(config: &StripeConfig) -> Self {
        let tiers = [
            (SubscriptionTier::Pro, &config.pro_price_id),
            (SubscriptionTier::Enterprise, &config.enterprise_price_id),
        ]
        .into_iter()
        .filter(|(_, price)| !price.is_empty())
        .map(|(tier, price)| TierConfig {
            tier,
            stripe_price_id: price.clone(),
            trial_days: config.trial_days,
        });
        Self::new(tiers)
    }

    pub fn insert_user(&self, user: UserRecord) {
        self.state.write().users.insert(user.user_id.clone(), user);
    }
}

#[async_trait]
impl SubscriptionStore for MemoryStore {
    async fn tier_config(&self, tier: SubscriptionTier) -> Result<Option<TierConfig>> {
        Ok(self.tiers.get(&tier).cloned())
    }

    async fn user(&self, user_id: &str) -> Result<Option<UserRecord>> {
        Ok(self.state.read().users.get(user_id).cloned())
    }

    async fn set_customer_id(&self, user_id: &str, customer_id: &str) -> Result<()> {
        let mut state = self.state.write();
        let user = state
            .users
            .entry(user_id.to_string())
            .or_insert_with(|| UserRecord {
                user_id: user_id.to_string(),
                ..Default::default()
            });
        user.stripe_customer_id = Some(customer_id.to_string());
        Ok(())
    }

    async fn active_subscription(&self, user_id: &str) -> Result<Option<SubscriptionRecord>> {
        Ok(self
            .state
            .read()
            .subscriptions
            .values()
            .filter(|s| s.user_id == user_id && s.status.is_current())
            .max_by_key(|s| s.created_at)
            .cloned())
    }

    async fn save_subscription(&self, record: SubscriptionRecord) -> Result<()> {
        self.state
            .write()
            .subscriptions
            .insert(record.stripe_subscription_id.clone(), record);
        Ok(())
    }

    async fn usage(&self, user_id: &str, period: UsagePeriod) -> Result<UsageCounts> {
        Ok(self
            .state
            .read()
            .usage
            .get(&(user_id.to_string(), period))
            .copied()
            .unwrap_or_default())
    }

    async fn record_usage(
        &self,
        user_id: &str,
        kind: UsageKind,
        period: UsagePeriod,
        limit: Option<u64>,
    ) -> Result<bool> {
        let mut state = self.state.write();
        let counts = state
            .usage
            .entry((user_id.to_string(), period))
            .or_default();

        if limit.is_some_and(|limit| counts.get(kind) >= limit) {
            return Ok(false);
        }
        counts.increment(kind);
        Ok(true)
    }
}
