use std::io;
use std::path::PathBuf;
use thiserror::Error;

use crate::deps::ResolutionError;

/// Error returned by [`Bundler::generate_bundle`](super::Bundler::generate_bundle).
#[derive(Debug, Error)]
pub enum BundleError {
    #[error("failed to bundle `{}`", entry.display())]
    Generation {
        entry: PathBuf,
        #[source]
        source: BundleFailure,
    },
}

impl BundleError {
    pub fn failure(&self) -> &BundleFailure {
        match self {
            Self::Generation { source, .. } => source,
        }
    }
}

/// Underlying cause of a bundling failure.
#[derive(Debug, Error)]
pub enum BundleFailure {
    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    #[error("cannot read `{}`", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cached bundle is corrupt")]
    Codec(#[from] serde_json::Error),
}
