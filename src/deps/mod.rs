//! Dependency discovery for JavaScript sources.
//!
//! - `scan`: textual import detection
//! - `source`: filesystem seam ([`SourceReader`])
//! - `resolver`: transitive resolution into a [`DependencyGraph`]

mod resolver;
mod scan;
mod source;

use rustc_hash::FxHashSet;
use std::path::{Path, PathBuf};

pub use resolver::{
    DEFAULT_EXTENSIONS, DEFAULT_MAX_DEPTH, DependencyResolver, ResolutionError, ResolveOptions,
};
pub use scan::{is_path_specifier, specifiers};
pub use source::{FsSource, SourceReader};

#[cfg(test)]
pub(crate) use source::testing;

/// Files reachable from an entry, in discovery order.
///
/// # Invariants
/// - The entry is always first
/// - Each canonical path appears exactly once
#[derive(Debug, Default, Clone)]
pub struct DependencyGraph {
    order: Vec<PathBuf>,
    seen: FxHashSet<PathBuf>,
}

impl DependencyGraph {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a file. Returns `false` if it was already present.
    pub fn insert(&mut self, path: PathBuf) -> bool {
        if self.seen.contains(&path) {
            return false;
        }
        self.seen.insert(path.clone());
        self.order.push(path);
        true
    }

    #[inline]
    pub fn contains(&self, path: &Path) -> bool {
        self.seen.contains(path)
    }

    /// The entry file, if any file was recorded.
    #[inline]
    pub fn entry(&self) -> Option<&Path> {
        self.order.first().map(PathBuf::as_path)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Path> {
        self.order.iter().map(PathBuf::as_path)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn into_paths(self) -> Vec<PathBuf> {
        self.order
    }
}
