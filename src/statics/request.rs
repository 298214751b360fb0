//! Transport-independent view of an incoming request.

use tiny_http::{Method, Request};

/// Method, raw URL and headers of a request.
#[derive(Debug, Clone)]
pub struct RequestHead {
    pub method: Method,
    pub url: String,
    headers: Vec<(String, String)>,
}

impl RequestHead {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Vec::new(),
        }
    }

    pub fn from_request(request: &Request) -> Self {
        let headers = request
            .headers()
            .iter()
            .map(|h| (h.field.as_str().as_str().to_owned(), h.value.as_str().to_owned()))
            .collect();
        Self {
            method: request.method().clone(),
            url: request.url().to_owned(),
            headers,
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// First value of a header (case-insensitive name).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(field, _)| field.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// URL without query string or fragment.
    pub fn path(&self) -> &str {
        self.url.split(['?', '#']).next().unwrap_or(&self.url)
    }

    #[inline]
    pub fn is_head(&self) -> bool {
        self.method == Method::Head
    }

    /// Whether the client accepts a gzip response.
    ///
    /// An explicit `gzip` item decides over `*`, and `q=0` rejects.
    pub fn accepts_gzip(&self) -> bool {
        let Some(accept) = self.header("accept-encoding") else {
            return false;
        };
        let mut gzip = None;
        let mut wildcard = None;
        for item in accept.split(',') {
            let mut parts = item.split(';').map(str::trim);
            let coding = parts.next().unwrap_or_default();
            let accepted = !parts.any(|param| {
                param
                    .strip_prefix("q=")
                    .and_then(|q| q.parse::<f32>().ok())
                    .is_some_and(|q| q <= 0.0)
            });
            if coding.eq_ignore_ascii_case("gzip") {
                gzip = Some(accepted);
            } else if coding == "*" {
                wildcard = Some(accepted);
            }
        }
        gzip.or(wildcard).unwrap_or(false)
    }
}
