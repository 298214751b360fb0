//! `[bundle]` section configuration.
//!
//! ```toml
//! [bundle]
//! route = "/dist"                 # Bundles are served at <route>/<name>.js
//! entries = { app = "src/app.js" }
//! target = "browser"              # browser | server
//! minify = false
//! minifier = "strip"              # strip | oxc
//! comments = true
//! hydration = false
//! extensions = ["js", "mjs", "cjs", "jsx"]
//! max_depth = 64
//! strict_depth = false
//! ignore = ["node_modules"]
//! revalidate = false              # Re-stat dependencies on every request
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::bundle::{BundleOptions, Minifier, Target};
use crate::deps::{DEFAULT_EXTENSIONS, DEFAULT_MAX_DEPTH};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BundleConfig {
    /// URL prefix for bundle requests.
    pub route: String,
    /// Bundle name to entry file, relative to the project root.
    pub entries: BTreeMap<String, PathBuf>,
    pub target: Target,
    pub minify: bool,
    pub minifier: Minifier,
    pub comments: bool,
    pub hydration: bool,
    pub extensions: Vec<String>,
    pub max_depth: usize,
    pub strict_depth: bool,
    pub ignore: Vec<String>,
    pub revalidate: bool,
}

impl Default for BundleConfig {
    fn default() -> Self {
        let defaults = BundleOptions::default();
        Self {
            route: "/dist".into(),
            entries: BTreeMap::from([("bundle".to_string(), PathBuf::from("index.js"))]),
            target: defaults.target,
            minify: defaults.minify,
            minifier: defaults.minifier,
            comments: defaults.comments,
            hydration: defaults.hydration,
            extensions: DEFAULT_EXTENSIONS.iter().map(|e| (*e).to_string()).collect(),
            max_depth: DEFAULT_MAX_DEPTH,
            strict_depth: defaults.strict_depth,
            ignore: defaults.ignore,
            revalidate: false,
        }
    }
}

impl BundleConfig {
    pub fn options(&self) -> BundleOptions {
        BundleOptions {
            target: self.target,
            minify: self.minify,
            minifier: self.minifier,
            comments: self.comments,
            hydration: self.hydration,
            extensions: self.extensions.clone(),
            max_depth: self.max_depth,
            strict_depth: self.strict_depth,
            ignore: self.ignore.clone(),
        }
    }

    /// Entry file for a bundle name.
    pub fn entry(&self, name: &str) -> Option<&Path> {
        self.entries.get(name).map(PathBuf::as_path)
    }

    /// Bundle name from a request path, e.g. `/dist/app.js` -> `app`.
    pub fn bundle_name<'a>(&self, path: &'a str) -> Option<&'a str> {
        path.strip_prefix(self.route.as_str())?
            .strip_prefix('/')?
            .strip_suffix(".js")
            .filter(|name| !name.is_empty() && !name.contains('/'))
    }

    pub(in crate::config) fn validate(&self, errors: &mut Vec<String>) {
        static RE_NAME: LazyLock<Regex> =
            LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]+$").unwrap());

        if !self.route.starts_with('/') || self.route.len() < 2 || self.route.ends_with('/') {
            errors.push(format!(
                "[bundle] route `{}` must start with `/` and not end with one",
                self.route
            ));
        }
        if self.entries.is_empty() {
            errors.push("[bundle] entries must name at least one entry point".into());
        }
        for name in self.entries.keys() {
            if !RE_NAME.is_match(name) {
                errors.push(format!(
                    "[bundle] entry name `{name}` may only use letters, digits, `_` and `-`"
                ));
            }
        }
        if self.extensions.is_empty() {
            errors.push("[bundle] extensions must not be empty".into());
        }
        if self.max_depth == 0 {
            errors.push("[bundle] max_depth must be at least 1".into());
        }
        for pattern in &self.ignore {
            if let Err(e) = Regex::new(pattern) {
                errors.push(format!("[bundle] ignore pattern `{pattern}`: {e}"));
            }
        }
    }
}
