//! Static file serving.
//!
//! # Request flow
//!
//! ```text
//! GET/HEAD ─► decode path ─► `..`? 403 ─► dotfile policy ─► stat
//!   ─► dir? index ─► symlink guard ─► conditional (304)
//!   ─► range (206/416) | gzip | full 200
//! ```
//!
//! [`StaticFileServer::handle`] never touches a socket: it maps a
//! [`RequestHead`] to an [`Outcome`], and [`delivery`] sends the result.

mod compress;
pub mod delivery;
mod path;
mod range;
mod reply;
mod request;

use serde::{Deserialize, Serialize};
use std::fs::{self, Metadata};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;
use thiserror::Error;
use tiny_http::Method;

use crate::freshness::{ETagGenerator, ETagOptions};
use crate::utils::{date, mime};

pub use compress::{DEFAULT_STREAM_THRESHOLD, gzip};
pub use range::ByteRange;
pub use reply::{Body, Reply};
pub use request::RequestHead;

/// Handling of paths with a segment starting with `.`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DotfilePolicy {
    /// Respond 403.
    Deny,
    /// Pass to the next handler.
    #[default]
    Ignore,
    /// Serve like any other file.
    Allow,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticOptions {
    /// Files tried, in order, when a directory is requested.
    pub index: Vec<String>,
    pub dotfiles: DotfilePolicy,
    pub etag: bool,
    pub weak_etag: bool,
    /// `Cache-Control: public, max-age=<max_age>` (seconds).
    pub max_age: u64,
    pub compression: bool,
    /// Files larger than this are gzip-streamed instead of compressed in memory.
    pub stream_threshold: u64,
}

impl Default for StaticOptions {
    fn default() -> Self {
        Self {
            index: vec!["index.html".to_string()],
            dotfiles: DotfilePolicy::default(),
            etag: true,
            weak_etag: false,
            max_age: 0,
            compression: true,
            stream_threshold: DEFAULT_STREAM_THRESHOLD,
        }
    }
}

#[derive(Debug, Error)]
pub enum ServeError {
    #[error("path escapes the static root")]
    PathTraversal,

    #[error("dotfile access denied")]
    DotfileDenied,

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("not found")]
    NotFound,

    #[error("cannot access `{}`", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl ServeError {
    /// Status answered directly by the file server, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::PathTraversal | Self::DotfileDenied => Some(403),
            Self::BadRequest(_) => Some(400),
            Self::NotFound | Self::Io { .. } => None,
        }
    }
}

/// What the dispatcher should do with a request.
#[derive(Debug)]
pub enum Outcome {
    Reply(Reply),
    /// Declined; try the next handler.
    Next,
}

/// Stat result for a servable file.
#[derive(Debug, Clone)]
pub struct FileStat {
    pub path: PathBuf,
    pub size: u64,
    pub mtime: SystemTime,
    pub is_dir: bool,
}

impl FileStat {
    fn from_metadata(path: PathBuf, meta: &Metadata) -> Self {
        Self {
            path,
            size: meta.len(),
            mtime: meta.modified().unwrap_or(SystemTime::UNIX_EPOCH),
            is_dir: meta.is_dir(),
        }
    }
}

pub struct StaticFileServer {
    root: PathBuf,
    options: StaticOptions,
    etags: Arc<ETagGenerator>,
}

impl StaticFileServer {
    pub fn new(root: impl Into<PathBuf>, options: StaticOptions, etags: Arc<ETagGenerator>) -> Self {
        Self {
            root: root.into(),
            options,
            etags,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Serve `request` from the root, or decline with [`Outcome::Next`].
    pub fn handle(&self, request: &RequestHead) -> Result<Outcome, ServeError> {
        if !matches!(request.method, Method::Get | Method::Head) {
            return Ok(Outcome::Next);
        }

        match self.locate(request.path()) {
            Ok(file) => self.serve_file(request, &file).map(Outcome::Reply),
            Err(ServeError::NotFound) => Ok(Outcome::Next),
            Err(e) => match e.status() {
                Some(status) => {
                    crate::debug!("static"; "{} {}: {}", status, request.url, e);
                    Ok(Outcome::Reply(Reply::text(status, reason(status))))
                }
                None => Err(e),
            },
        }
    }

    /// Map a URL path to a regular file under the root.
    fn locate(&self, url_path: &str) -> Result<FileStat, ServeError> {
        let segments = path::decode_segments(url_path)?;

        if path::has_dotfile(&segments) {
            match self.options.dotfiles {
                DotfilePolicy::Deny => return Err(ServeError::DotfileDenied),
                DotfilePolicy::Ignore => return Err(ServeError::NotFound),
                DotfilePolicy::Allow => {}
            }
        }

        let full: PathBuf = segments.iter().fold(self.root.clone(), |p, s| p.join(s));
        let Some(meta) = stat(&full)? else {
            return Err(ServeError::NotFound);
        };

        if !meta.is_dir() {
            self.guard(&full)?;
            return Ok(FileStat::from_metadata(full, &meta));
        }

        for name in &self.options.index {
            let candidate = full.join(name);
            if let Some(meta) = stat(&candidate)?
                && meta.is_file()
            {
                self.guard(&candidate)?;
                return Ok(FileStat::from_metadata(candidate, &meta));
            }
        }
        Err(ServeError::NotFound)
    }

    /// Symlinks must not lead outside the root.
    fn guard(&self, path: &Path) -> Result<(), ServeError> {
        let io_err = |path: &Path| {
            let path = path.to_path_buf();
            move |source: io::Error| ServeError::Io { path, source }
        };
        let root = self.root.canonicalize().map_err(io_err(&self.root))?;
        let resolved = path.canonicalize().map_err(io_err(path))?;
        if resolved.starts_with(&root) {
            Ok(())
        } else {
            Err(ServeError::PathTraversal)
        }
    }

    fn serve_file(&self, request: &RequestHead, file: &FileStat) -> Result<Reply, ServeError> {
        if file.is_dir {
            return Err(ServeError::NotFound);
        }
        let content_type = mime::from_path(&file.path);

        let mut validators = Reply::new(200)
            .with_header(
                "Cache-Control",
                format!("public, max-age={}", self.options.max_age),
            )
            .with_header("Last-Modified", date::http_date(file.mtime))
            .with_header("Accept-Ranges", "bytes");

        let etag = self.options.etag.then(|| self.etag_for(file));
        if let Some(etag) = &etag {
            validators.set_header("ETag", etag.as_str());
        }

        if is_not_modified(request, etag.as_deref(), file.mtime) {
            validators.status = 304;
            return Ok(validators);
        }

        let mut reply = validators.with_header("Content-Type", content_type);

        if let Some(header) = request.header("range") {
            match ByteRange::parse(header, file.size) {
                ByteRange::Partial { start, end } => {
                    let len = end - start + 1;
                    reply.status = 206;
                    reply.set_header("Content-Range", format!("bytes {start}-{end}/{}", file.size));
                    reply.set_header("Content-Length", len.to_string());
                    if !request.is_head() {
                        reply.body = Body::File {
                            path: file.path.clone(),
                            offset: start,
                            len,
                        };
                    }
                    return Ok(reply);
                }
                ByteRange::Unsatisfiable => {
                    let mut reply = Reply::new(416)
                        .with_header("Content-Range", format!("bytes */{}", file.size))
                        .with_header("Accept-Ranges", "bytes");
                    if let Some(etag) = &etag {
                        reply.set_header("ETag", etag.as_str());
                    }
                    return Ok(reply);
                }
                ByteRange::Full => {}
            }
        }

        let compressible = self.options.compression && mime::is_compressible(content_type);
        if compressible {
            reply.set_header("Vary", "Accept-Encoding");
        }

        if compressible && file.size > 0 && request.accepts_gzip() {
            reply.set_header("Content-Encoding", "gzip");
            if file.size > self.options.stream_threshold {
                if !request.is_head() {
                    reply.body = Body::Gzip {
                        path: file.path.clone(),
                    };
                }
            } else if !request.is_head() {
                let raw = fs::read(&file.path).map_err(|source| ServeError::Io {
                    path: file.path.clone(),
                    source,
                })?;
                let packed = gzip(&raw).map_err(|source| ServeError::Io {
                    path: file.path.clone(),
                    source,
                })?;
                reply.set_header("Content-Length", packed.len().to_string());
                reply.body = Body::Bytes(packed);
            }
            return Ok(reply);
        }

        reply.set_header("Content-Length", file.size.to_string());
        if !request.is_head() {
            reply.body = Body::File {
                path: file.path.clone(),
                offset: 0,
                len: file.size,
            };
        }
        Ok(reply)
    }

    /// Validator derived from path and modification time.
    fn etag_for(&self, file: &FileStat) -> String {
        let seed = format!("{}{}", file.path.display(), date::iso_string(file.mtime));
        let options = ETagOptions {
            weak: self.options.weak_etag,
            ..ETagOptions::default()
        };
        self.etags.generate(seed, &options)
    }
}

/// A matching `If-None-Match`, else a fresh `If-Modified-Since`.
fn is_not_modified(request: &RequestHead, etag: Option<&str>, mtime: SystemTime) -> bool {
    let etag_match = request
        .header("if-none-match")
        .zip(etag)
        .is_some_and(|(if_none_match, etag)| ETagGenerator::matches_header(if_none_match, etag));
    if etag_match {
        return true;
    }
    request
        .header("if-modified-since")
        .and_then(date::parse_http_date)
        .is_some_and(|since| since >= date::truncate_to_secs(mtime))
}

/// `None` for missing paths (including a file used as a directory).
fn stat(path: &Path) -> Result<Option<Metadata>, ServeError> {
    match fs::metadata(path) {
        Ok(meta) => Ok(Some(meta)),
        Err(e) if matches!(e.kind(), io::ErrorKind::NotFound | io::ErrorKind::NotADirectory) => {
            Ok(None)
        }
        Err(source) => Err(ServeError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

pub fn reason(status: u16) -> &'static str {
    match status {
        400 => "Bad Request",
        403 => "Forbidden",
        404 => "Not Found",
        405 => "Method Not Allowed",
        416 => "Range Not Satisfiable",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => "",
    }
}
