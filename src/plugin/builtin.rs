//! Built-in middleware.

use tiny_http::Method;

use super::{Factory, Middleware};
use crate::statics::{Reply, RequestHead};

pub(super) const BUILTINS: &[(&str, Factory)] = &[("request-log", request_log), ("cors", cors)];

fn request_log() -> Box<dyn Middleware> {
    Box::new(RequestLog)
}

fn cors() -> Box<dyn Middleware> {
    Box::new(Cors::default())
}

/// Logs `METHOD url -> status` for each request.
pub struct RequestLog;

impl Middleware for RequestLog {
    fn name(&self) -> &str {
        "request-log"
    }

    fn after(&self, request: &RequestHead, reply: &mut Reply) {
        crate::log!("serve"; "{} {} -> {}", request.method, request.url, reply.status);
    }
}

/// Permissive CORS: answers preflights and tags every reply.
pub struct Cors {
    pub allow_origin: String,
    pub allow_methods: String,
    pub allow_headers: String,
    pub max_age: u64,
}

impl Default for Cors {
    fn default() -> Self {
        Self {
            allow_origin: "*".to_string(),
            allow_methods: "GET, HEAD, OPTIONS".to_string(),
            allow_headers: "Content-Type, If-None-Match, If-Modified-Since, Range".to_string(),
            max_age: 3600,
        }
    }
}

impl Middleware for Cors {
    fn name(&self) -> &str {
        "cors"
    }

    fn before(&self, request: &RequestHead) -> Option<Reply> {
        let preflight = request.method == Method::Options
            && request.header("access-control-request-method").is_some();
        preflight.then(|| {
            Reply::new(204)
                .with_header("Access-Control-Allow-Methods", self.allow_methods.as_str())
                .with_header("Access-Control-Allow-Headers", self.allow_headers.as_str())
                .with_header("Access-Control-Max-Age", self.max_age.to_string())
        })
    }

    fn after(&self, _request: &RequestHead, reply: &mut Reply) {
        reply.set_header("Access-Control-Allow-Origin", self.allow_origin.as_str());
        reply.set_header("Access-Control-Expose-Headers", "ETag, Content-Range, Content-Length");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugin::MiddlewareRegistry;

    #[test]
    fn test_cors_preflight() {
        let chain = MiddlewareRegistry::with_builtins()
            .build(&["cors".into()])
            .unwrap();
        let preflight = RequestHead::new(Method::Options, "/dist/bundle.js")
            .with_header("Origin", "http://localhost:3000")
            .with_header("Access-Control-Request-Method", "GET");

        let reply = chain.run(&preflight, |_| Reply::new(404));
        assert_eq!(reply.status, 204);
        assert_eq!(reply.header("access-control-allow-origin"), Some("*"));
        assert_eq!(reply.header("access-control-max-age"), Some("3600"));
    }

    #[test]
    fn test_cors_tags_normal_replies() {
        let chain = MiddlewareRegistry::with_builtins()
            .build(&["request-log".into(), "cors".into()])
            .unwrap();
        let reply = chain.run(&RequestHead::new(Method::Get, "/"), |_| Reply::new(200));
        assert_eq!(reply.status, 200);
        assert_eq!(reply.header("access-control-allow-origin"), Some("*"));
    }
}
