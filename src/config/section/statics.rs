//! `[static]` section configuration.
//!
//! ```toml
//! [static]
//! root = "public"
//! index = ["index.html"]
//! dotfiles = "ignore"         # deny | ignore | allow
//! etag = true
//! weak_etag = false
//! max_age = 0
//! compression = true
//! stream_threshold = 1048576
//! ```

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::statics::{DEFAULT_STREAM_THRESHOLD, DotfilePolicy, StaticOptions};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StaticConfig {
    /// Directory served at `/`, relative to the project root.
    pub root: PathBuf,
    pub index: Vec<String>,
    pub dotfiles: DotfilePolicy,
    pub etag: bool,
    pub weak_etag: bool,
    /// `Cache-Control` max-age in seconds.
    pub max_age: u64,
    pub compression: bool,
    pub stream_threshold: u64,
}

impl Default for StaticConfig {
    fn default() -> Self {
        Self {
            root: "public".into(),
            index: vec!["index.html".into()],
            dotfiles: DotfilePolicy::default(),
            etag: true,
            weak_etag: false,
            max_age: 0,
            compression: true,
            stream_threshold: DEFAULT_STREAM_THRESHOLD,
        }
    }
}

impl StaticConfig {
    pub fn options(&self) -> StaticOptions {
        StaticOptions {
            index: self.index.clone(),
            dotfiles: self.dotfiles,
            etag: self.etag,
            weak_etag: self.weak_etag,
            max_age: self.max_age,
            compression: self.compression,
            stream_threshold: self.stream_threshold,
        }
    }

    pub(in crate::config) fn validate(&self, errors: &mut Vec<String>) {
        for name in &self.index {
            if name.is_empty() || name.contains(['/', '\\']) || name.starts_with('.') {
                errors.push(format!("[static] index `{name}` must be a plain file name"));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_parse_config;

    #[test]
    fn test_static_defaults_match_server() {
        let config = test_parse_config("");
        assert_eq!(config.statics.root, PathBuf::from("public"));
        assert_eq!(config.statics.options(), StaticOptions::default());
    }

    #[test]
    fn test_static_config() {
        let config = test_parse_config(
            "[static]\nroot = \"site\"\ndotfiles = \"deny\"\nweak_etag = true\nmax_age = 600\ncompression = false",
        );
        let options = config.statics.options();
        assert_eq!(config.statics.root, PathBuf::from("site"));
        assert_eq!(options.dotfiles, DotfilePolicy::Deny);
        assert!(options.weak_etag);
        assert_eq!(options.max_age, 600);
        assert!(!options.compression);
    }

    #[test]
    fn test_index_names_validated() {
        let config = test_parse_config("[static]\nindex = [\"index.html\", \"../x\", \"\"]");
        let mut errors = Vec::new();
        config.statics.validate(&mut errors);
        assert_eq!(errors.len(), 2);
    }
}
