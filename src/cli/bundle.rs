//! `bale bundle`: build one bundle outside the server.

use anyhow::{Context, Result};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::bundle::{BundleResult, Bundler};
use crate::cache::{CacheManager, CacheOptions};
use crate::config::BaleConfig;
use crate::log;
use crate::utils::path::resolve_path;

/// Bundle `entry` and write it to `output`, or stdout when `None`.
pub fn write_bundle(config: &BaleConfig, entry: &str, output: Option<&Path>) -> Result<()> {
    let result = build(config, entry)?;

    match output {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("failed to create {}", parent.display()))?;
            }
            std::fs::write(path, &result.code)
                .with_context(|| format!("failed to write {}", path.display()))?;
            log!("bundle"; "{} ({} file(s), {} bytes, {})",
                path.display(), result.dependencies.len(), result.code.len(), &result.hash[..12]);
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(result.code.as_bytes())?;
            stdout.flush()?;
        }
    }
    Ok(())
}

/// Entry names from `[bundle.entries]` win over paths.
fn entry_path(config: &BaleConfig, entry: &str) -> PathBuf {
    match config.bundle.entry(entry) {
        Some(path) => config.root_join(path),
        None => resolve_path(Path::new(entry), config.get_root()),
    }
}

fn build(config: &BaleConfig, entry: &str) -> Result<BundleResult> {
    let cache = Arc::new(CacheManager::new(CacheOptions::bounded(1)));
    let bundler = Bundler::new(config.get_root(), cache);
    let result = bundler.generate_bundle(&entry_path(config, entry), &config.bundle.options())?;
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundle::Target;
    use std::fs;
    use tempfile::TempDir;

    fn project() -> (TempDir, BaleConfig) {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("src")).unwrap();
        fs::write(dir.path().join("src/main.js"), "import './util.js';\nrun();\n").unwrap();
        fs::write(dir.path().join("src/util.js"), "function run() {}\n").unwrap();

        let mut config = crate::config::test_parse_config(
            "[bundle]\nentries = { main = \"src/main.js\" }\ntarget = \"server\"",
        );
        config.root = dir.path().canonicalize().unwrap();
        (dir, config)
    }

    #[test]
    fn test_entry_name_or_path() {
        let (_dir, config) = project();
        assert_eq!(entry_path(&config, "main"), config.root.join("src/main.js"));
        assert_eq!(entry_path(&config, "src/util.js"), config.root.join("src/util.js"));
    }

    #[test]
    fn test_write_bundle_to_file() {
        let (dir, config) = project();
        assert_eq!(config.bundle.target, Target::Server);

        let output = dir.path().join("out/main.js");
        write_bundle(&config, "main", Some(&output)).unwrap();

        let code = fs::read_to_string(&output).unwrap();
        assert!(code.contains("// File: src/main.js"));
        assert!(code.find("src/main.js").unwrap() < code.find("src/util.js").unwrap());
    }

    #[test]
    fn test_missing_entry_is_an_error() {
        let (_dir, config) = project();
        let err = build(&config, "src/nope.js").unwrap_err();
        assert!(format!("{err:#}").contains("nope.js"));
    }
}
