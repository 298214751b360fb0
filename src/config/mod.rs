//! Project configuration for `bale.toml`.
//!
//! # Module Structure
//!
//! ```text
//! config/
//! ├── section/       # Configuration section definitions
//! │   ├── bundle     # [bundle]
//! │   ├── cache      # [cache]
//! │   ├── serve      # [serve]
//! │   └── statics    # [static]
//! ├── types/         # Utility types
//! │   ├── error      # ConfigError
//! │   └── handle     # Global config handle
//! └── mod.rs         # BaleConfig (this file)
//! ```
//!
//! Every section is optional; a project without `bale.toml` runs on defaults
//! rooted at the working directory.

pub mod section;
pub mod types;
mod util;

use util::find_config_file;

pub use section::{BundleConfig, CacheConfig, ServeConfig, StaticConfig};
pub use types::{ConfigError, cfg, init_config};

use crate::{
    cli::{Cli, Commands},
    log,
    utils::path::normalize_path,
};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

// ============================================================================
// root configuration
// ============================================================================

/// Root configuration structure representing bale.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BaleConfig {
    /// Absolute path to the config file (internal use only)
    #[serde(skip)]
    pub config_path: PathBuf,

    /// Project root directory - parent of config file (internal use only)
    #[serde(skip)]
    pub root: PathBuf,

    #[serde(default)]
    pub bundle: BundleConfig,

    #[serde(default)]
    pub serve: ServeConfig,

    #[serde(default, rename = "static")]
    pub statics: StaticConfig,

    #[serde(default)]
    pub cache: CacheConfig,
}

impl BaleConfig {
    /// Load configuration for a CLI invocation.
    ///
    /// Searches upward from cwd for the config file. The project root is the
    /// config file's parent directory, or cwd when no file exists.
    pub fn load(cli: &Cli) -> Result<Self> {
        let cwd = std::env::current_dir().context("Failed to get current working directory")?;

        let mut config = match find_config_file(&cli.config) {
            Some(path) => {
                let mut config = Self::from_path(&path)?;
                config.config_path = normalize_path(&path);
                config
            }
            None => {
                crate::debug!("config"; "{} not found, using defaults", cli.config.display());
                Self {
                    config_path: cwd.join(&cli.config),
                    ..Self::default()
                }
            }
        };

        let root = config
            .config_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or(cwd);
        config.finalize(&root, cli);
        config.validate()?;

        Ok(config)
    }

    /// Load configuration from file path with unknown field detection.
    fn from_path(path: &Path) -> Result<Self> {
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;

        let (config, ignored) = Self::parse_with_ignored(&content)?;
        if !ignored.is_empty() {
            Self::print_unknown_fields_warning(&ignored, path);
        }

        Ok(config)
    }

    /// Parse TOML content, collecting any unknown fields.
    fn parse_with_ignored(content: &str) -> Result<(Self, Vec<String>), ConfigError> {
        let mut ignored = Vec::new();
        let deserializer = toml::Deserializer::new(content);
        let config = serde_ignored::deserialize(deserializer, |path: serde_ignored::Path| {
            ignored.push(path.to_string());
        })?;
        Ok((config, ignored))
    }

    fn print_unknown_fields_warning(fields: &[String], path: &Path) {
        let display_path = path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_else(|| path.to_string_lossy());
        log!("warning"; "unknown fields in {}, ignoring:", display_path);
        for field in fields {
            eprintln!("- {}", field);
        }
    }

    /// Resolve paths against `root` and apply CLI overrides.
    fn finalize(&mut self, root: &Path, cli: &Cli) {
        self.root = normalize_path(root);
        self.statics.root = normalize_path(&self.root.join(&self.statics.root));
        self.apply_command_options(cli);
    }

    pub fn get_root(&self) -> &Path {
        &self.root
    }

    /// Join a path with the root directory.
    pub fn root_join(&self, path: impl AsRef<Path>) -> PathBuf {
        self.root.join(path)
    }

    // ========================================================================
    // cli configuration updates
    // ========================================================================

    fn apply_command_options(&mut self, cli: &Cli) {
        crate::logger::set_verbose(cli.verbose);

        match &cli.command {
            Commands::Serve { interface, port } => {
                Self::update_option(&mut self.serve.interface, interface.as_ref());
                Self::update_option(&mut self.serve.port, port.as_ref());
            }
            Commands::Bundle { target, minify, .. } => {
                Self::update_option(&mut self.bundle.target, target.as_ref());
                Self::update_option(&mut self.bundle.minify, minify.as_ref());
            }
        }
    }

    /// Update config option if CLI value is provided.
    fn update_option<T: Clone>(config_option: &mut T, cli_option: Option<&T>) {
        if let Some(option) = cli_option {
            *config_option = option.clone();
        }
    }

    // ========================================================================
    // validation
    // ========================================================================

    /// Check every section, reporting all problems at once.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();
        self.bundle.validate(&mut errors);
        self.serve.validate(&mut errors);
        self.statics.validate(&mut errors);

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors.join("; ")))
        }
    }
}

// ============================================================================
// Test Helpers (available to all modules via `use crate::config::test_*`)
// ============================================================================

/// Parse config, panicking on unknown fields (to catch config typos in tests).
#[cfg(test)]
pub fn test_parse_config(content: &str) -> BaleConfig {
    let (parsed, ignored) = BaleConfig::parse_with_ignored(content).unwrap();
    assert!(
        ignored.is_empty(),
        "test config has unknown fields: {:?}",
        ignored
    );
    parsed
}

// ============================================================================
// tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundle::Target;
    use clap::Parser;
    use tempfile::TempDir;

    #[test]
    fn test_invalid_toml() {
        let result = BaleConfig::parse_with_ignored("[serve\nport = 1");
        assert!(matches!(result, Err(ConfigError::Toml(_))));
    }

    #[test]
    fn test_unknown_fields_detected() {
        let content = "[serve]\nport = 9000\nwatch = true\n[unknown_section]\nfield = \"value\"";
        let (config, ignored) = BaleConfig::parse_with_ignored(content).unwrap();

        assert_eq!(config.serve.port, 9000);
        assert!(ignored.iter().any(|f| f == "serve.watch"));
        assert!(ignored.iter().any(|f| f.contains("unknown_section")));
    }

    #[test]
    fn test_static_section_name() {
        let config = test_parse_config("[static]\nroot = \"www\"");
        assert_eq!(config.statics.root, PathBuf::from("www"));
    }

    #[test]
    fn test_finalize_resolves_static_root() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("public")).unwrap();
        let cli = Cli::parse_from(["bale", "serve"]);

        let mut config = BaleConfig::default();
        config.finalize(dir.path(), &cli);

        let root = dir.path().canonicalize().unwrap();
        assert_eq!(config.get_root(), root);
        assert_eq!(config.statics.root, root.join("public"));
        assert_eq!(config.root_join("index.js"), root.join("index.js"));
    }

    #[test]
    fn test_cli_overrides_serve() {
        let cli = Cli::parse_from(["bale", "serve", "-p", "9000", "-i", "0.0.0.0"]);
        let mut config = test_parse_config("[serve]\nport = 8000");
        config.apply_command_options(&cli);

        assert_eq!(config.serve.port, 9000);
        assert_eq!(config.serve.interface.to_string(), "0.0.0.0");
    }

    #[test]
    fn test_cli_overrides_bundle() {
        let cli = Cli::parse_from(["bale", "bundle", "app", "--target", "server", "--minify"]);
        let mut config = test_parse_config("[bundle]\nminify = false");
        config.apply_command_options(&cli);

        assert_eq!(config.bundle.target, Target::Server);
        assert!(config.bundle.minify);
    }

    #[test]
    fn test_cli_absent_flags_keep_config() {
        let cli = Cli::parse_from(["bale", "serve"]);
        let mut config = test_parse_config("[serve]\nport = 8000");
        config.apply_command_options(&cli);
        assert_eq!(config.serve.port, 8000);
    }

    #[test]
    fn test_validate_collects_all_errors() {
        let config = test_parse_config("[serve]\nworkers = 0\n[bundle]\nentries = {}");
        let err = config.validate().unwrap_err();
        let message = err.to_string();
        assert!(message.contains("workers"));
        assert!(message.contains("entries"));

        assert!(BaleConfig::default().validate().is_ok());
    }

    #[test]
    fn test_from_path_reads_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bale.toml");
        fs::write(&path, "[cache]\nmax_size = 4\n").unwrap();

        let config = BaleConfig::from_path(&path).unwrap();
        assert_eq!(config.cache.max_size, 4);

        let missing = BaleConfig::from_path(&dir.path().join("nope.toml")).unwrap_err();
        assert!(missing.downcast_ref::<ConfigError>().is_some());
    }
}
