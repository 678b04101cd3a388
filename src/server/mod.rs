//! Axum-based HTTP server for the sentimark service.
//!
//! Every JSON route answers with the uniform `{success, data?, error?, timestamp}`
//! envelope; failures are converted by [`crate::error::AppError`].
//!
//! # Components
//!
//! - `handlers`: health and Prometheus metrics.
//! - `intelligence`: the five cached research routes.
//! - `reports`: report generation, status and download.
//! - `subscriptions`: checkout, portal, plan changes and the Stripe webhook.
//! - `middleware`: request IDs, request metrics and the acting-user extractor.
//! - `routes`: the router tying everything together.
//!
//! Author: kelexine (<https://github.com/kelexine>)

mod handlers;
mod intelligence;
mod middleware;
mod reports;
mod routes;
mod subscriptions;

pub use handlers::{HealthResponse, HealthStatus};
pub use middleware::{ActingUser, USER_ID_HEADER};
pub use routes::{create_router, AppState};
pub use subscriptions::STRIPE_SIGNATURE_HEADER;
