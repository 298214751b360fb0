//! Bundle options.
//!
//! Options are part of the cache key, so everything here serializes
//! deterministically (field order is declaration order).

use serde::{Deserialize, Serialize};

use crate::deps::{DEFAULT_EXTENSIONS, DEFAULT_MAX_DEPTH};

/// Where the bundle runs.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Target {
    /// Module registry prelude with per-file factories.
    #[default]
    Browser,
    /// Plain concatenation in traversal order.
    Server,
}

/// Minification engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Minifier {
    /// Literal-aware comment and whitespace stripper.
    #[default]
    Strip,
    /// oxc compress + mangle, falling back to `Strip` on parse errors.
    Oxc,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BundleOptions {
    pub target: Target,
    pub minify: bool,
    pub minifier: Minifier,
    /// Emit `// File: <path>` markers (server target).
    pub comments: bool,
    /// Append the hydration bootstrap.
    pub hydration: bool,
    pub extensions: Vec<String>,
    pub max_depth: usize,
    pub strict_depth: bool,
    /// Regular expressions for specifiers/paths to skip.
    pub ignore: Vec<String>,
}

impl Default for BundleOptions {
    fn default() -> Self {
        Self {
            target: Target::default(),
            minify: false,
            minifier: Minifier::default(),
            comments: true,
            hydration: false,
            extensions: DEFAULT_EXTENSIONS.iter().map(|e| (*e).to_string()).collect(),
            max_depth: DEFAULT_MAX_DEPTH,
            strict_depth: false,
            ignore: vec!["node_modules".to_string()],
        }
    }
}

impl BundleOptions {
    /// Stable string form used in cache keys.
    pub fn fingerprint(&self) -> String {
        // Plain data with string keys; serialization cannot fail.
        serde_json::to_string(self).unwrap_or_default()
    }
}
