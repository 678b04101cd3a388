//! Perplexity research integration.
//!
//! - `client`: cached, rate-limited client for the five intelligence endpoints.
//! - `endpoint`: per-endpoint models, cache keys, TTLs and `Cache-Control`.
//! - `parse`: lenient parsing of model output with a raw-text fallback.
//! - `prompts`: the prompts sent upstream.
//! - `rate_limit`: sliding-window limiter shared by all endpoints.
//!
//! Author: kelexine (<https://github.com/kelexine>)

pub mod client;
pub mod endpoint;
pub mod parse;
pub mod prompts;
pub mod rate_limit;

pub use client::{calculate_confidence, PerplexityClient, QueryResult};
pub use parse::RawFallback;
pub use rate_limit::RateLimiter;
