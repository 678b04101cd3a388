// sentimark - prediction-market intelligence, PDF reports and subscriptions
// Author: kelexine (https://github.com/kelexine)

pub mod cache;
pub mod cli;
pub mod config;
pub mod context;
pub mod error;
pub mod metrics;
pub mod models;
pub mod perplexity;
pub mod reports;
pub mod server;
pub mod subscriptions;
pub mod utils;
