// Cache management module
// Author: kelexine (https://github.com/kelexine)

pub mod manager;
pub mod models;

pub use manager::TtlCache;
pub use models::{CacheEntry, CacheStats};
