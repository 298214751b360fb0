//! `[cache]` section configuration.
//!
//! ```toml
//! [cache]
//! max_size = 128          # Cached bundles (0 = unbounded)
//! ttl = 0                 # Seconds (0 = no expiry)
//! etag_memo_size = 1000   # Memoized ETag tokens
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::cache::CacheOptions;
use crate::freshness::DEFAULT_MEMO_SIZE;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub max_size: usize,
    pub ttl: u64,
    pub etag_memo_size: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_size: 128,
            ttl: 0,
            etag_memo_size: DEFAULT_MEMO_SIZE,
        }
    }
}

impl CacheConfig {
    pub fn options(&self) -> CacheOptions {
        CacheOptions {
            max_size: (self.max_size > 0).then_some(self.max_size),
            default_ttl: (self.ttl > 0).then(|| Duration::from_secs(self.ttl)),
        }
    }
}
