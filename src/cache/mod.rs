//! In-memory key-value cache with TTL expiry and LRU eviction.
//!
//! A single generic store backs both bundle memoization and any other
//! per-process cache. Instances are constructed explicitly and shared via
//! `Arc`, so tests can use isolated stores.
//!
//! ```ignore
//! let cache = CacheManager::<String>::new(CacheOptions::bounded(128));
//! cache.set("key", "value".into(), SetOptions::default());
//! assert_eq!(cache.get("key").as_deref(), Some("value"));
//! ```

mod entry;
mod manager;

pub use entry::CacheEntry;
pub use manager::{CacheManager, CacheOptions, CacheStats, SetOptions};
