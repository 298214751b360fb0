//! Response description produced by handlers.
//!
//! A [`Reply`] says what to send; [`super::delivery`] turns it into bytes on
//! the wire. Bodies referencing files are opened only at delivery time.

use std::path::PathBuf;

use crate::utils::mime::types;

/// Response payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Body {
    /// No payload (HEAD, 304, 416 ...).
    Empty,
    /// In-memory payload, possibly already gzip-encoded.
    Bytes(Vec<u8>),
    /// `len` bytes of a file starting at `offset`.
    File { path: PathBuf, offset: u64, len: u64 },
    /// Whole file, gzip-encoded while streaming. Length unknown up front.
    Gzip { path: PathBuf },
}

impl Body {
    /// Exact payload length, when known before sending.
    pub fn len(&self) -> Option<u64> {
        match self {
            Self::Empty => Some(0),
            Self::Bytes(bytes) => Some(bytes.len() as u64),
            Self::File { len, .. } => Some(*len),
            Self::Gzip { .. } => None,
        }
    }
}

/// Status, headers and body of a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Body,
}

impl Reply {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: Body::Empty,
        }
    }

    /// Plain-text reply with a short message body.
    pub fn text(status: u16, message: &str) -> Self {
        Self::new(status)
            .with_header("Content-Type", types::PLAIN)
            .with_body(Body::Bytes(message.as_bytes().to_vec()))
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_header(name, value);
        self
    }

    pub fn with_body(mut self, body: Body) -> Self {
        self.body = body;
        self
    }

    /// Set a header, replacing any existing value.
    pub fn set_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self
            .headers
            .iter_mut()
            .find(|(field, _)| field.eq_ignore_ascii_case(&name))
        {
            Some(existing) => existing.1 = value,
            None => self.headers.push((name, value)),
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(field, _)| field.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}
