//! ETag generation, validation and comparison.
//!
//! Tokens are `"<digest>"` (strong) or `W/"<digest>"` (weak). Generation is
//! memoized per `(content, options)` in a FIFO-bounded table: recomputing a
//! token is cheap and deterministic, so insertion order is a good enough
//! eviction policy.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use parking_lot::Mutex;
use regex::Regex;
use rustc_hash::{FxHashMap, FxHasher};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::VecDeque;
use std::hash::Hasher;
use std::sync::{Arc, LazyLock};

/// Default number of memoized tokens.
pub const DEFAULT_MEMO_SIZE: usize = 1000;

/// Digest used for the token payload.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    #[default]
    Blake3,
    Sha256,
}

/// Text encoding of the digest.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Encoding {
    #[default]
    Hex,
    Base64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ETagOptions {
    pub weak: bool,
    pub algorithm: HashAlgorithm,
    pub encoding: Encoding,
}

impl ETagOptions {
    pub const fn weak() -> Self {
        Self {
            weak: true,
            algorithm: HashAlgorithm::Blake3,
            encoding: Encoding::Hex,
        }
    }
}

struct MemoEntry {
    content: Arc<[u8]>,
    options: ETagOptions,
    token: String,
}

/// Tokens bucketed by content fingerprint; `order` holds insertion order.
#[derive(Default)]
struct Memo {
    buckets: FxHashMap<u64, Vec<MemoEntry>>,
    order: VecDeque<(u64, Arc<[u8]>, ETagOptions)>,
}

impl Memo {
    fn lookup(&self, fingerprint: u64, content: &[u8], options: ETagOptions) -> Option<String> {
        self.buckets.get(&fingerprint)?.iter().find_map(|entry| {
            (entry.options == options && *entry.content == *content).then(|| entry.token.clone())
        })
    }

    fn insert(&mut self, fingerprint: u64, content: &[u8], options: ETagOptions, token: String) {
        let content: Arc<[u8]> = Arc::from(content);
        self.order
            .push_back((fingerprint, Arc::clone(&content), options));
        self.buckets.entry(fingerprint).or_default().push(MemoEntry {
            content,
            options,
            token,
        });
    }

    fn evict_oldest(&mut self) {
        let Some((fingerprint, content, options)) = self.order.pop_front() else {
            return;
        };
        if let Some(bucket) = self.buckets.get_mut(&fingerprint) {
            bucket.retain(|entry| !(entry.options == options && Arc::ptr_eq(&entry.content, &content)));
            if bucket.is_empty() {
                self.buckets.remove(&fingerprint);
            }
        }
    }

    fn len(&self) -> usize {
        self.order.len()
    }
}

/// Generates HTTP validator tokens from content.
pub struct ETagGenerator {
    memo: Mutex<Memo>,
    max_cache_size: usize,
}

impl ETagGenerator {
    pub fn new(max_cache_size: usize) -> Self {
        Self {
            memo: Mutex::new(Memo::default()),
            max_cache_size,
        }
    }

    /// Produce the token for `content`.
    pub fn generate(&self, content: impl AsRef<[u8]>, options: &ETagOptions) -> String {
        let content = content.as_ref();
        let fingerprint = fingerprint(content);

        if let Some(token) = self.memo.lock().lookup(fingerprint, content, *options) {
            return token;
        }

        let token = compute_token(content, options);

        if self.max_cache_size > 0 {
            let mut memo = self.memo.lock();
            if memo.lookup(fingerprint, content, *options).is_none() {
                memo.insert(fingerprint, content, *options, token.clone());
                while memo.len() > self.max_cache_size {
                    memo.evict_oldest();
                }
            }
        }

        token
    }

    /// Number of memoized tokens.
    pub fn cached(&self) -> usize {
        self.memo.lock().len()
    }

    pub fn clear(&self) {
        *self.memo.lock() = Memo::default();
    }

    /// Syntactic check: `"<hex>"` or `W/"<hex>"`.
    pub fn is_valid(token: &str) -> bool {
        static RE_ETAG: LazyLock<Regex> =
            LazyLock::new(|| Regex::new(r#"^(?:W/)?"[0-9a-fA-F]+"$"#).unwrap());
        RE_ETAG.is_match(token)
    }

    /// Weak comparison: the `W/` prefix is ignored on both sides.
    pub fn compare(a: &str, b: &str) -> bool {
        strip_weak(a.trim()) == strip_weak(b.trim())
    }

    /// Evaluate an `If-None-Match` header value against the current token.
    ///
    /// Handles `*` and comma-separated lists.
    pub fn matches_header(if_none_match: &str, etag: &str) -> bool {
        if_none_match
            .split(',')
            .map(str::trim)
            .filter(|candidate| !candidate.is_empty())
            .any(|candidate| candidate == "*" || Self::compare(candidate, etag))
    }
}

impl Default for ETagGenerator {
    fn default() -> Self {
        Self::new(DEFAULT_MEMO_SIZE)
    }
}

fn strip_weak(token: &str) -> &str {
    token.strip_prefix("W/").unwrap_or(token)
}

fn fingerprint(content: &[u8]) -> u64 {
    let mut hasher = FxHasher::default();
    hasher.write(content);
    hasher.write_usize(content.len());
    hasher.finish()
}

fn compute_token(content: &[u8], options: &ETagOptions) -> String {
    let digest: Vec<u8> = match options.algorithm {
        HashAlgorithm::Blake3 => blake3::hash(content).as_bytes().to_vec(),
        HashAlgorithm::Sha256 => Sha256::digest(content).to_vec(),
    };
    let payload = match options.encoding {
        Encoding::Hex => hex::encode(digest),
        Encoding::Base64 => BASE64.encode(digest),
    };
    if options.weak {
        format!("W/\"{payload}\"")
    } else {
        format!("\"{payload}\"")
    }
}
