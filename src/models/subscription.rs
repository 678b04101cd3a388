//! Subscription tiers, feature gates and usage limits.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionTier {
    #[default]
    Free,
    Pro,
    Enterprise,
}

impl SubscriptionTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionTier::Free => "free",
            SubscriptionTier::Pro => "pro",
            SubscriptionTier::Enterprise => "enterprise",
        }
    }

    /// Tiers that can be bought through checkout.
    pub fn is_paid(&self) -> bool {
        !matches!(self, SubscriptionTier::Free)
    }
}

impl fmt::Display for SubscriptionTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SubscriptionTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "free" => Ok(SubscriptionTier::Free),
            "pro" => Ok(SubscriptionTier::Pro),
            "enterprise" => Ok(SubscriptionTier::Enterprise),
            other => Err(format!("unknown subscription tier '{}'", other)),
        }
    }
}

/// Mirrors Stripe's subscription status values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    #[default]
    Active,
    Trialing,
    PastDue,
    Canceled,
    Unpaid,
    Incomplete,
    IncompleteExpired,
    Paused,
}

impl SubscriptionStatus {
    /// Statuses that still grant the tier's features.
    pub fn is_current(&self) -> bool {
        matches!(
            self,
            SubscriptionStatus::Active | SubscriptionStatus::Trialing | SubscriptionStatus::PastDue
        )
    }
}

/// Usage counters and limits for the current billing period.
/// A `None` limit means unlimited and serializes as `null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageSummary {
    pub pdf_reports_generated: u64,
    pub pdf_reports_limit: Option<u64>,
    pub api_calls_used: u64,
    pub api_calls_limit: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSubscription {
    pub user_id: String,
    pub tier: SubscriptionTier,
    pub status: SubscriptionStatus,
    pub current_period_start: String,
    pub current_period_end: String,
    pub cancel_at_period_end: bool,
    pub usage: UsageSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stripe_customer_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stripe_subscription_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stripe_price_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UsageKind {
    PdfReport,
    ApiCall,
}

impl UsageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            UsageKind::PdfReport => "pdf_report",
            UsageKind::ApiCall => "api_call",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Feature {
    PerplexityIntelligence,
    PdfReports,
    UnlimitedPdfReports,
    ApiAccess,
    PrioritySupport,
}

impl Feature {
    pub fn as_str(&self) -> &'static str {
        match self {
            Feature::PerplexityIntelligence => "perplexityIntelligence",
            Feature::PdfReports => "pdfReports",
            Feature::UnlimitedPdfReports => "unlimitedPdfReports",
            Feature::ApiAccess => "apiAccess",
            Feature::PrioritySupport => "prioritySupport",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureSet {
    pub perplexity_intelligence: bool,
    pub pdf_reports: bool,
    pub unlimited_pdf_reports: bool,
    pub api_access: bool,
    pub priority_support: bool,
}

impl FeatureSet {
    pub fn allows(&self, feature: Feature) -> bool {
        match feature {
            Feature::PerplexityIntelligence => self.perplexity_intelligence,
            Feature::PdfReports => self.pdf_reports,
            Feature::UnlimitedPdfReports => self.unlimited_pdf_reports,
            Feature::ApiAccess => self.api_access,
            Feature::PrioritySupport => self.priority_support,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureGate {
    pub tier: SubscriptionTier,
    pub features: FeatureSet,
}

/// Static tier → feature table.
pub const fn feature_gate(tier: SubscriptionTier) -> FeatureGate {
    let features = match tier {
        SubscriptionTier::Free => FeatureSet {
            perplexity_intelligence: false,
            pdf_reports: false,
            unlimited_pdf_reports: false,
            api_access: false,
            priority_support: false,
        },
        SubscriptionTier::Pro => FeatureSet {
            perplexity_intelligence: true,
            pdf_reports: true,
            unlimited_pdf_reports: false,
            api_access: false,
            priority_support: false,
        },
        SubscriptionTier::Enterprise => FeatureSet {
            perplexity_intelligence: true,
            pdf_reports: true,
            unlimited_pdf_reports: true,
            api_access: true,
            priority_support: true,
        },
    };
    FeatureGate { tier, features }
}

/// Per-period quota of `kind` for `tier`; `None` is unlimited.
pub const fn usage_limit(tier: SubscriptionTier, kind: UsageKind) -> Option<u64> {
    match (tier, kind) {
        (SubscriptionTier::Free, UsageKind::PdfReport) => Some(0),
        (SubscriptionTier::Free, UsageKind::ApiCall) => Some(5),
        (SubscriptionTier::Pro, UsageKind::PdfReport) => Some(10),
        (SubscriptionTier::Pro, UsageKind::ApiCall) => Some(10_000),
        (SubscriptionTier::Enterprise, _) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feature_gates() {
        let free = feature_gate(SubscriptionTier::Free).features;
        assert!(!free.allows(Feature::PdfReports));
        assert!(!free.allows(Feature::PerplexityIntelligence));

        let pro = feature_gate(SubscriptionTier::Pro).features;
        assert!(pro.allows(Feature::PerplexityIntelligence));
        assert!(pro.allows(Feature::PdfReports));
        assert!(!pro.allows(Feature::UnlimitedPdfReports));
        assert!(!pro.allows(Feature::ApiAccess));

        let enterprise = feature_gate(SubscriptionTier::Enterprise).features;
        assert!(enterprise.allows(Feature::PrioritySupport));
        assert!(enterprise.allows(Feature::UnlimitedPdfReports));
    }

    #[test]
    fn test_usage_limits() {
        assert_eq!(usage_limit(SubscriptionTier::Free, UsageKind::PdfReport), Some(0));
        assert_eq!(usage_limit(SubscriptionTier::Pro, UsageKind::PdfReport), Some(10));
        assert_eq!(usage_limit(SubscriptionTier::Pro, UsageKind::ApiCall), Some(10_000));
        assert_eq!(usage_limit(SubscriptionTier::Enterprise, UsageKind::ApiCall), None);
    }

    #[test]
    fn test_unlimited_serializes_as_null() {
        let usage = UsageSummary {
            pdf_reports_generated: 4,
            pdf_reports_limit: None,
            api_calls_used: 0,
            api_calls_limit: Some(5),
        };
        let json = serde_json::to_value(&usage).unwrap();
        assert!(json["pdfReportsLimit"].is_null());
        assert_eq!(json["apiCallsLimit"], 5);
    }

    #[test]
    fn test_tier_parsing() {
        assert_eq!("pro".parse::<SubscriptionTier>().unwrap(), SubscriptionTier::Pro);
        assert!("platinum".parse::<SubscriptionTier>().is_err());
        assert_eq!(
            serde_json::to_value(SubscriptionStatus::PastDue).unwrap(),
            "past_due"
        );
    }
}
