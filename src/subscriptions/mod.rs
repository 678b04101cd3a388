// Stripe-backed subscriptions
// Author: kelexine (https://github.com/kelexine)

pub mod service;
pub mod store;
pub mod stripe;
pub mod webhook;

pub use service::{CheckoutLink, SubscriptionService};
pub use store::{
    MemoryStore, SubscriptionRecord, SubscriptionStore, TierConfig, UsageCounts, UsagePeriod,
    UserRecord,
};
pub use stripe::StripeClient;
pub use webhook::{EventKind, WebhookEvent};
