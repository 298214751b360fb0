//! Cache entry bookkeeping.

use std::time::{Duration, Instant};

/// A stored value plus its access metadata.
#[derive(Debug, Clone)]
pub struct CacheEntry<T> {
    pub value: T,
    pub created_at: Instant,
    /// `None` means the entry never expires.
    pub expires_at: Option<Instant>,
    pub last_accessed: Instant,
    pub hits: u64,
    /// Caller-supplied weight, kept as metadata. Eviction ignores it.
    pub priority: u8,
    /// Monotonic access stamp, breaks `last_accessed` ties.
    pub(super) access_seq: u64,
}

impl<T> CacheEntry<T> {
    pub(super) fn new(value: T, ttl: Option<Duration>, priority: u8, seq: u64) -> Self {
        let now = Instant::now();
        Self {
            value,
            created_at: now,
            expires_at: ttl.map(|ttl| now + ttl),
            last_accessed: now,
            hits: 0,
            priority,
            access_seq: seq,
        }
    }

    /// Expired once `now >= created_at + ttl`.
    #[inline]
    pub fn is_expired_at(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }

    #[inline]
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Instant::now())
    }

    pub(super) fn touch(&mut self, seq: u64) {
        self.last_accessed = Instant::now();
        self.access_seq = seq;
        self.hits += 1;
    }

    /// Eviction order key: least recently accessed first.
    #[inline]
    pub(super) fn eviction_rank(&self) -> (Instant, u64) {
        (self.last_accessed, self.access_seq)
    }
}
