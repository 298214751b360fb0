//! Body delivery.
//!
//! tiny_http pulls the body through [`Read`], so the socket paces the file
//! reads. Each delivery moves through
//!
//! ```text
//! Idle ─► Streaming   ─┬─► Done
//!     └─► Compressing ─┴─► Errored
//! ```
//!
//! and reaches exactly one terminal state. The source (and its file
//! handle) is released on that transition.

use flate2::Compression;
use flate2::read::GzEncoder;
use std::fs::File;
use std::io::{self, Cursor, Read, Seek, SeekFrom, Take};
use std::path::PathBuf;
use tiny_http::{Header, Response, StatusCode};

use super::reply::{Body, Reply};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryState {
    Idle,
    Streaming,
    Compressing,
    Done,
    Errored,
}

impl DeliveryState {
    #[inline]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Errored)
    }
}

enum Source {
    Empty,
    Bytes(Cursor<Vec<u8>>),
    File(Take<File>),
    Gzip(Box<GzEncoder<File>>),
}

impl Read for Source {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Self::Empty => Ok(0),
            Self::Bytes(cursor) => cursor.read(buf),
            Self::File(file) => file.read(buf),
            Self::Gzip(encoder) => encoder.read(buf),
        }
    }
}

/// A response body being sent.
pub struct Delivery {
    state: DeliveryState,
    source: Option<Source>,
    pending: Option<Body>,
    /// For diagnostics only.
    origin: Option<PathBuf>,
}

impl Delivery {
    pub fn new(body: Body) -> Self {
        let origin = match &body {
            Body::File { path, .. } | Body::Gzip { path } => Some(path.clone()),
            Body::Empty | Body::Bytes(_) => None,
        };
        Self {
            state: DeliveryState::Idle,
            source: None,
            pending: Some(body),
            origin,
        }
    }

    /// Open the source: `Idle` to `Streaming` or `Compressing`.
    ///
    /// Fails (and moves to `Errored`) when the file cannot be opened, so the
    /// caller can still send an error status.
    pub fn begin(&mut self) -> io::Result<()> {
        if self.state != DeliveryState::Idle {
            return Ok(());
        }
        let body = self.pending.take().unwrap_or(Body::Empty);
        let opened = match body {
            Body::Empty => Ok((Source::Empty, DeliveryState::Streaming)),
            Body::Bytes(bytes) => Ok((Source::Bytes(Cursor::new(bytes)), DeliveryState::Streaming)),
            Body::File { path, offset, len } => File::open(&path).and_then(|mut file| {
                file.seek(SeekFrom::Start(offset))?;
                Ok((Source::File(file.take(len)), DeliveryState::Streaming))
            }),
            Body::Gzip { path } => File::open(&path).map(|file| {
                let encoder = GzEncoder::new(file, Compression::default());
                (Source::Gzip(Box::new(encoder)), DeliveryState::Compressing)
            }),
        };

        match opened {
            Ok((source, state)) => {
                self.source = Some(source);
                self.state = state;
                Ok(())
            }
            Err(e) => {
                self.finish(DeliveryState::Errored);
                Err(e)
            }
        }
    }

    #[inline]
    pub fn state(&self) -> DeliveryState {
        self.state
    }

    /// Single terminal transition. Later calls are no-ops.
    fn finish(&mut self, terminal: DeliveryState) {
        if self.state.is_terminal() {
            return;
        }
        self.state = terminal;
        self.source = None;
        if terminal == DeliveryState::Errored
            && let Some(path) = &self.origin
        {
            crate::debug!("serve"; "delivery of {} aborted", path.display());
        }
    }
}

impl Read for Delivery {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.state == DeliveryState::Idle {
            self.begin()?;
        }
        let Some(source) = self.source.as_mut() else {
            return Ok(0);
        };
        match source.read(buf) {
            Ok(0) if !buf.is_empty() => {
                self.finish(DeliveryState::Done);
                Ok(0)
            }
            Ok(n) => Ok(n),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => Err(e),
            Err(e) => {
                self.finish(DeliveryState::Errored);
                Err(e)
            }
        }
    }
}

impl Drop for Delivery {
    fn drop(&mut self) {
        // Dropped mid-stream: the client went away.
        if matches!(self.state, DeliveryState::Streaming | DeliveryState::Compressing) {
            self.finish(DeliveryState::Errored);
        }
    }
}

/// Build the tiny_http response for a reply, opening its body.
pub fn into_response(reply: Reply) -> io::Result<Response<Delivery>> {
    let length = match (&reply.body, reply.header("content-encoding")) {
        // HEAD of a streamed gzip body: length unknown.
        (Body::Empty, Some(_)) if reply.header("content-length").is_none() => None,
        (body, _) => body.len().and_then(|n| usize::try_from(n).ok()),
    };

    let headers = reply
        .headers
        .iter()
        .filter_map(|(name, value)| Header::from_bytes(name.as_bytes(), value.as_bytes()).ok())
        .collect();

    let mut delivery = Delivery::new(reply.body);
    delivery.begin()?;

    Ok(Response::new(
        StatusCode(reply.status),
        headers,
        delivery,
        length,
        None,
    ))
}
