//! Configuration section definitions.
//!
//! Each module corresponds to a section in `bale.toml`:
//!
//! | Module    | TOML Section | Purpose                                  |
//! |-----------|--------------|------------------------------------------|
//! | `bundle`  | `[bundle]`   | Entry points, route and bundle options   |
//! | `cache`   | `[cache]`    | Bundle cache and ETag memo sizing        |
//! | `serve`   | `[serve]`    | HTTP listener, workers, middleware       |
//! | `statics` | `[static]`   | Static root and caching headers          |

mod bundle;
mod cache;
mod serve;
mod statics;

pub use bundle::BundleConfig;
pub use cache::CacheConfig;
pub use serve::ServeConfig;
pub use statics::StaticConfig;
