//! Filesystem access used by dependency resolution and bundling.
//!
//! Abstracted behind a trait so resolution can run against an instrumented
//! or in-memory source in tests.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

/// Read-only view of project sources.
pub trait SourceReader: Send + Sync {
    fn read_to_string(&self, path: &Path) -> io::Result<String>;

    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn canonicalize(&self, path: &Path) -> io::Result<PathBuf> {
        path.canonicalize()
    }

    fn modified(&self, path: &Path) -> io::Result<SystemTime> {
        fs::metadata(path)?.modified()
    }
}

/// Sources read straight from disk.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsSource;

impl SourceReader for FsSource {
    #[inline]
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        fs::read_to_string(path)
    }
}

impl<S: SourceReader + ?Sized> SourceReader for Arc<S> {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        (**self).read_to_string(path)
    }

    fn is_file(&self, path: &Path) -> bool {
        (**self).is_file(path)
    }

    fn canonicalize(&self, path: &Path) -> io::Result<PathBuf> {
        (**self).canonicalize(path)
    }

    fn modified(&self, path: &Path) -> io::Result<SystemTime> {
        (**self).modified(path)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Disk source that counts `read_to_string` calls.
    #[derive(Default)]
    pub struct CountingSource {
        reads: AtomicUsize,
    }

    impl CountingSource {
        pub fn reads(&self) -> usize {
            self.reads.load(Ordering::SeqCst)
        }
    }

    impl SourceReader for CountingSource {
        fn read_to_string(&self, path: &Path) -> io::Result<String> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            fs::read_to_string(path)
        }
    }
}
