//! Content hashing and cache validators.
//!
//! - [`ContentHash`]: blake3 digest used for bundle hashes
//! - [`ETagGenerator`]: HTTP validator tokens with a bounded memo

mod etag;
mod hash;

pub use etag::{DEFAULT_MEMO_SIZE, ETagGenerator, ETagOptions, Encoding, HashAlgorithm};
pub use hash::ContentHash;
