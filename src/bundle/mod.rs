//! JavaScript bundling.
//!
//! # Pipeline
//!
//! ```text
//! entry ─► cache lookup ─► resolve graph ─► wrap (browser | server)
//!                                              │
//!                      store ◄─ hash ◄─ minify ◄┘ (+ hydration)
//! ```
//!
//! Results are cached as JSON in an injected [`CacheManager`], keyed by the
//! entry and the serialized options. Concurrent misses for the same key are
//! coalesced: one caller builds, the rest wait and read the cache.

mod error;
pub mod minify;
mod options;
mod registry;

use dashmap::DashMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use crate::cache::{CacheManager, SetOptions};
use crate::deps::{DependencyResolver, FsSource, ResolveOptions, SourceReader};
use crate::freshness::ContentHash;

pub use error::{BundleError, BundleFailure};
pub use options::{BundleOptions, Minifier, Target};
pub use registry::REGISTRY_GLOBAL;

/// Output of one bundling run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleResult {
    pub code: String,
    /// The hydration bootstrap, also appended to `code`.
    pub hydration_code: Option<String>,
    /// Canonical paths of every bundled file, entry first.
    pub dependencies: Vec<PathBuf>,
    /// blake3 hex digest of `code`.
    pub hash: String,
}

/// Modification time of a dependency at build time.
#[derive(Debug, Serialize, Deserialize)]
struct Stamp {
    path: PathBuf,
    modified: SystemTime,
}

/// Cached form: the result plus optional staleness stamps.
#[derive(Debug, Serialize, Deserialize)]
struct CachedBundle {
    result: BundleResult,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    stamps: Vec<Stamp>,
}

pub struct Bundler<S: SourceReader = FsSource> {
    root: PathBuf,
    source: S,
    cache: Arc<CacheManager<String>>,
    inflight: DashMap<String, Arc<Mutex<()>>>,
    revalidate: bool,
}

impl Bundler<FsSource> {
    pub fn new(root: impl Into<PathBuf>, cache: Arc<CacheManager<String>>) -> Self {
        Self::with_source(root, FsSource, cache)
    }
}

impl<S: SourceReader> Bundler<S> {
    pub fn with_source(root: impl Into<PathBuf>, source: S, cache: Arc<CacheManager<String>>) -> Self {
        Self {
            root: root.into(),
            source,
            cache,
            inflight: DashMap::new(),
            revalidate: false,
        }
    }

    /// Check dependency mtimes on every cache hit; a change forces a rebuild.
    pub fn revalidate(mut self, enabled: bool) -> Self {
        self.revalidate = enabled;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Drop every cached bundle.
    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    /// Bundle `entry` (relative to the project root, or absolute).
    pub fn generate_bundle(
        &self,
        entry: &Path,
        options: &BundleOptions,
    ) -> Result<BundleResult, BundleError> {
        let wrap = |source: BundleFailure| BundleError::Generation {
            entry: entry.to_path_buf(),
            source,
        };
        let key = cache_key(entry, options);

        if let Some(hit) = self.lookup(&key).map_err(wrap)? {
            return Ok(hit);
        }

        let gate = Arc::clone(&self.inflight.entry(key.clone()).or_default());
        let guard = gate.lock();

        // Another caller may have finished while we waited.
        if let Some(hit) = self.lookup(&key).map_err(wrap)? {
            return Ok(hit);
        }

        let built = self.build(entry, options).and_then(|(result, stamps)| {
            let json = serde_json::to_string(&CachedBundle {
                result: result.clone(),
                stamps,
            })?;
            self.cache.set(key.clone(), json, SetOptions::default());
            Ok(result)
        });

        drop(guard);
        self.inflight.remove(&key);

        if let Ok(result) = &built {
            crate::debug!("bundle"; "{} -> {} file(s), {} bytes, {}",
                entry.display(), result.dependencies.len(), result.code.len(), &result.hash[..16]);
        }
        built.map_err(wrap)
    }

    fn lookup(&self, key: &str) -> Result<Option<BundleResult>, BundleFailure> {
        let Some(json) = self.cache.get(key) else {
            return Ok(None);
        };
        let cached: CachedBundle = serde_json::from_str(&json)?;

        if self.revalidate && !self.is_fresh(&cached.stamps) {
            crate::debug!("bundle"; "sources changed, rebuilding");
            self.cache.delete(key);
            return Ok(None);
        }
        Ok(Some(cached.result))
    }

    fn is_fresh(&self, stamps: &[Stamp]) -> bool {
        stamps.iter().all(|stamp| {
            self.source
                .modified(&stamp.path)
                .is_ok_and(|modified| modified == stamp.modified)
        })
    }

    fn build(
        &self,
        entry: &Path,
        options: &BundleOptions,
    ) -> Result<(BundleResult, Vec<Stamp>), BundleFailure> {
        let resolve = ResolveOptions {
            extensions: options.extensions.clone(),
            max_depth: options.max_depth,
            strict_depth: options.strict_depth,
            ignore: options.ignore.clone(),
            base_dir: self.root.clone(),
        };
        let stamped = Stamped {
            inner: &self.source,
            stamps: self.revalidate.then(Mutex::default),
        };
        let (graph, sources) = DependencyResolver::new(&stamped, &resolve)?.resolve_sources(entry)?;
        let stamps = stamped.stamps.map(Mutex::into_inner).unwrap_or_default();

        let root = self
            .source
            .canonicalize(&self.root)
            .map_err(|source| BundleFailure::Read {
                path: self.root.clone(),
                source,
            })?;

        let ids: Vec<String> = graph.iter().map(|path| module_id(&root, path)).collect();
        let modules: Vec<registry::Module<'_>> = ids
            .iter()
            .zip(&sources)
            .map(|(id, source)| registry::Module {
                id: id.as_str(),
                source: source.as_str(),
            })
            .collect();

        let mut code = match options.target {
            Target::Browser => registry::browser(&modules, &options.extensions),
            Target::Server => registry::server(&modules, options.comments),
        };

        let hydration_code = options
            .hydration
            .then(|| registry::hydration(ids.first().map_or("", String::as_str)));
        if let Some(snippet) = &hydration_code {
            code.push_str(snippet);
        }

        if options.minify {
            code = match options.minifier {
                Minifier::Strip => minify::strip(&code),
                Minifier::Oxc => minify::oxc(&code).unwrap_or_else(|| {
                    crate::debug!("bundle"; "oxc could not parse bundle, using stripper");
                    minify::strip(&code)
                }),
            };
        }

        let hash = ContentHash::of(&code).to_hex();
        let result = BundleResult {
            code,
            hydration_code,
            dependencies: graph.into_paths(),
            hash,
        };
        Ok((result, stamps))
    }
}

/// Source that records each file's mtime just before reading it, so an edit
/// racing the build leaves a stamp older than the file.
struct Stamped<'a, S> {
    inner: &'a S,
    stamps: Option<Mutex<Vec<Stamp>>>,
}

impl<S: SourceReader> SourceReader for Stamped<'_, S> {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        let Some(stamps) = &self.stamps else {
            return self.inner.read_to_string(path);
        };
        let modified = self.inner.modified(path)?;
        let content = self.inner.read_to_string(path)?;
        stamps.lock().push(Stamp {
            path: path.to_path_buf(),
            modified,
        });
        Ok(content)
    }

    fn is_file(&self, path: &Path) -> bool {
        self.inner.is_file(path)
    }

    fn canonicalize(&self, path: &Path) -> io::Result<PathBuf> {
        self.inner.canonicalize(path)
    }

    fn modified(&self, path: &Path) -> io::Result<SystemTime> {
        self.inner.modified(path)
    }
}

fn cache_key(entry: &Path, options: &BundleOptions) -> String {
    format!("{}{}", entry.display(), options.fingerprint())
}

/// Root-relative id with `/` separators.
fn module_id(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .to_string_lossy()
        .replace('\\', "/")
}
