//! Transitive dependency resolution from an entry file.
//!
//! Traversal is breadth-first over an explicit queue with a per-item depth
//! counter, so a file's depth is its shortest import distance from the entry.
//! A file is marked seen before its imports are queued, so cyclic imports
//! find each other already visited and terminate.

use regex::RegexSet;
use rustc_hash::FxHashSet;
use std::collections::VecDeque;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

use super::scan::{is_path_specifier, specifiers};
use super::{DependencyGraph, SourceReader};

/// Default extensions followed by the resolver.
pub const DEFAULT_EXTENSIONS: &[&str] = &["js", "mjs", "cjs", "jsx"];

/// Default traversal depth limit.
pub const DEFAULT_MAX_DEPTH: usize = 64;

#[derive(Debug, Error)]
pub enum ResolutionError {
    #[error("cannot read `{}`", path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot resolve `{specifier}` imported from `{}`", from.display())]
    Unresolved { specifier: String, from: PathBuf },

    #[error("`{}` resolves outside of `{}`", path.display(), root.display())]
    OutsideRoot { path: PathBuf, root: PathBuf },

    #[error("`{}` exceeds the maximum import depth of {max_depth}", path.display())]
    DepthExceeded { path: PathBuf, max_depth: usize },

    #[error("invalid ignore pattern")]
    InvalidPattern(#[from] regex::Error),
}

/// Settings for a single resolution.
#[derive(Debug, Clone)]
pub struct ResolveOptions {
    /// Followed file extensions, without the leading dot.
    pub extensions: Vec<String>,
    /// Imports of files at this depth are not followed (entry = 0).
    pub max_depth: usize,
    /// Fail instead of truncating when `max_depth` is hit.
    pub strict_depth: bool,
    /// Regular expressions; matching specifiers or paths are skipped.
    pub ignore: Vec<String>,
    /// Project root. Nothing outside it is read.
    pub base_dir: PathBuf,
}

impl ResolveOptions {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            extensions: DEFAULT_EXTENSIONS.iter().map(|e| (*e).to_string()).collect(),
            max_depth: DEFAULT_MAX_DEPTH,
            strict_depth: false,
            ignore: vec!["node_modules".to_string()],
            base_dir: base_dir.into(),
        }
    }
}

/// Builds the set of files reachable from an entry point.
pub struct DependencyResolver<'a, S: SourceReader> {
    source: &'a S,
    options: &'a ResolveOptions,
    extensions: Vec<&'a str>,
    ignore: RegexSet,
}

impl<'a, S: SourceReader> DependencyResolver<'a, S> {
    pub fn new(source: &'a S, options: &'a ResolveOptions) -> Result<Self, ResolutionError> {
        let extensions = options
            .extensions
            .iter()
            .map(|ext| ext.trim_start_matches('.'))
            .collect();
        let ignore = RegexSet::new(&options.ignore)?;
        Ok(Self {
            source,
            options,
            extensions,
            ignore,
        })
    }

    /// Resolve the graph rooted at `entry` (absolute, or relative to `base_dir`).
    pub fn resolve(&self, entry: &Path) -> Result<DependencyGraph, ResolutionError> {
        self.walk(entry, |_, _| {})
    }

    /// Like [`resolve`](Self::resolve), also returning each file's contents
    /// in graph order. Every file is read exactly once.
    pub fn resolve_sources(
        &self,
        entry: &Path,
    ) -> Result<(DependencyGraph, Vec<String>), ResolutionError> {
        let mut sources = Vec::new();
        let graph = self.walk(entry, |_, content| sources.push(content))?;
        Ok((graph, sources))
    }

    fn walk(
        &self,
        entry: &Path,
        mut visit: impl FnMut(&Path, String),
    ) -> Result<DependencyGraph, ResolutionError> {
        let root = self
            .source
            .canonicalize(&self.options.base_dir)
            .map_err(|source| ResolutionError::Unreadable {
                path: self.options.base_dir.clone(),
                source,
            })?;

        let entry = self.canonical_within(&root, &root.join(entry))?;

        let mut graph = DependencyGraph::new();
        let mut queued = FxHashSet::default();
        queued.insert(entry.clone());
        let mut worklist = VecDeque::from([(entry, 0)]);

        while let Some((path, depth)) = worklist.pop_front() {
            if !graph.insert(path.clone()) {
                continue;
            }

            let content =
                self.source
                    .read_to_string(&path)
                    .map_err(|source| ResolutionError::Unreadable {
                        path: path.clone(),
                        source,
                    })?;

            let imports = self.imports_of(&root, &path, &content)?;
            visit(&path, content);
            let pending: Vec<PathBuf> = imports
                .into_iter()
                .filter(|p| !queued.contains(p))
                .collect();

            if pending.is_empty() {
                continue;
            }

            if depth >= self.options.max_depth {
                if self.options.strict_depth {
                    return Err(ResolutionError::DepthExceeded {
                        path: pending[0].clone(),
                        max_depth: self.options.max_depth,
                    });
                }
                crate::debug!("deps"; "depth limit reached at {}, {} import(s) skipped",
                    path.display(), pending.len());
                continue;
            }

            for import in pending {
                queued.insert(import.clone());
                worklist.push_back((import, depth + 1));
            }
        }

        Ok(graph)
    }

    /// Canonical paths of the followed imports of one file, in source order.
    fn imports_of(
        &self,
        root: &Path,
        file: &Path,
        content: &str,
    ) -> Result<Vec<PathBuf>, ResolutionError> {
        let dir = file.parent().unwrap_or(root);
        let mut out = Vec::new();

        for spec in specifiers(content) {
            if !is_path_specifier(&spec) || self.ignore.is_match(&spec) {
                continue;
            }
            let Some(resolved) = self.resolve_specifier(root, dir, file, &spec)? else {
                continue;
            };
            let canonical = self.canonical_within(root, &resolved)?;
            if self.ignore.is_match(&canonical.to_string_lossy()) {
                continue;
            }
            if !out.contains(&canonical) {
                out.push(canonical);
            }
        }

        Ok(out)
    }

    /// Map a path specifier to a file. `None` means "exists but not followed".
    fn resolve_specifier(
        &self,
        root: &Path,
        dir: &Path,
        from: &Path,
        spec: &str,
    ) -> Result<Option<PathBuf>, ResolutionError> {
        // `./a.js?raw` and `./a.js#x` name the same file
        let clean = spec.split(['?', '#']).next().unwrap_or(spec);
        let base = match clean.strip_prefix('/') {
            Some(rooted) => root.join(rooted),
            None => dir.join(clean),
        };

        let ext = base.extension().and_then(|e| e.to_str());
        let followed = ext.is_some_and(|e| self.extensions.contains(&e));

        if self.source.is_file(&base) {
            return Ok(followed.then_some(base));
        }

        for ext in &self.extensions {
            let candidate = append_extension(&base, ext);
            if self.source.is_file(&candidate) {
                return Ok(Some(candidate));
            }
        }

        for ext in &self.extensions {
            let candidate = base.join(format!("index.{ext}"));
            if self.source.is_file(&candidate) {
                return Ok(Some(candidate));
            }
        }

        // A missing `./style.css` is not ours to report.
        if ext.is_some() && !followed {
            return Ok(None);
        }

        Err(ResolutionError::Unresolved {
            specifier: spec.to_string(),
            from: from.to_path_buf(),
        })
    }

    fn canonical_within(&self, root: &Path, path: &Path) -> Result<PathBuf, ResolutionError> {
        let canonical =
            self.source
                .canonicalize(path)
                .map_err(|source| ResolutionError::Unreadable {
                    path: path.to_path_buf(),
                    source,
                })?;

        if !canonical.starts_with(root) {
            return Err(ResolutionError::OutsideRoot {
                path: canonical,
                root: root.to_path_buf(),
            });
        }
        Ok(canonical)
    }
}

/// `a/b.config` + `js` -> `a/b.config.js` (append, never replace).
fn append_extension(path: &Path, ext: &str) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".");
    name.push(ext);
    PathBuf::from(name)
}
