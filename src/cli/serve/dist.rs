//! `<route>/<name>.js`: configured entry points, bundled on demand.

use std::path::Path;
use std::sync::Arc;
use tiny_http::Method;

use crate::bundle::{BundleOptions, Bundler};
use crate::config::BundleConfig;
use crate::freshness::{ETagGenerator, ETagOptions};
use crate::statics::{Body, Reply, RequestHead, gzip, reason};
use crate::utils::mime::types;
use crate::{debug, log};

pub struct DistHandler {
    bundler: Bundler,
    config: BundleConfig,
    options: BundleOptions,
    etags: Arc<ETagGenerator>,
    compression: bool,
}

impl DistHandler {
    pub fn new(
        bundler: Bundler,
        config: BundleConfig,
        etags: Arc<ETagGenerator>,
        compression: bool,
    ) -> Self {
        let options = config.options();
        Self {
            bundler,
            config,
            options,
            etags,
            compression,
        }
    }

    /// Reply for requests under the bundle route, `None` for anything else.
    pub fn handle(&self, request: &RequestHead) -> Option<Reply> {
        let path = request.path();
        let under_route = path
            .strip_prefix(self.config.route.as_str())
            .is_some_and(|rest| rest.starts_with('/'));
        if !under_route {
            return None;
        }

        if !matches!(request.method, Method::Get | Method::Head) {
            return Some(Reply::text(405, reason(405)).with_header("Allow", "GET, HEAD"));
        }

        let entry = self
            .config
            .bundle_name(path)
            .and_then(|name| self.config.entry(name));
        Some(match entry {
            Some(entry) => self.serve_bundle(request, entry),
            None => Reply::text(404, reason(404)),
        })
    }

    fn serve_bundle(&self, request: &RequestHead, entry: &Path) -> Reply {
        let result = match self.bundler.generate_bundle(entry, &self.options) {
            Ok(result) => result,
            Err(e) => {
                log!("bundle"; "{:#}", anyhow::Error::new(e));
                return Reply::text(500, reason(500));
            }
        };

        let etag = self
            .etags
            .generate(result.code.as_bytes(), &ETagOptions::default());
        let mut reply = Reply::new(200)
            .with_header("Cache-Control", "no-cache")
            .with_header("ETag", etag.as_str());

        if request
            .header("if-none-match")
            .is_some_and(|header| ETagGenerator::matches_header(header, &etag))
        {
            reply.status = 304;
            return reply;
        }

        reply.set_header("Content-Type", types::JAVASCRIPT);
        let mut body = result.code.into_bytes();
        if self.compression {
            reply.set_header("Vary", "Accept-Encoding");
            if request.accepts_gzip() {
                match gzip(&body) {
                    Ok(packed) => {
                        reply.set_header("Content-Encoding", "gzip");
                        body = packed;
                    }
                    Err(e) => debug!("bundle"; "gzip failed, sending identity: {}", e),
                }
            }
        }

        reply.set_header("Content-Length", body.len().to_string());
        if !request.is_head() {
            reply.body = Body::Bytes(body);
        }
        reply
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CacheManager, CacheOptions};
    use flate2::read::GzDecoder;
    use std::collections::BTreeMap;
    use std::fs;
    use std::io::Read;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn project() -> (TempDir, DistHandler) {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("src")).unwrap();
        fs::write(
            dir.path().join("src/app.js"),
            "import { greet } from './greet.js';\ngreet('bale');\n",
        )
        .unwrap();
        fs::write(
            dir.path().join("src/greet.js"),
            "export function greet(name) { console.log('hi ' + name); }\n",
        )
        .unwrap();
        fs::write(dir.path().join("src/broken.js"), "import './gone.js';\n").unwrap();

        let config = BundleConfig {
            entries: BTreeMap::from([
                ("app".to_string(), PathBuf::from("src/app.js")),
                ("broken".to_string(), PathBuf::from("src/broken.js")),
            ]),
            ..BundleConfig::default()
        };
        let cache = Arc::new(CacheManager::new(CacheOptions::bounded(8)));
        let bundler = Bundler::new(dir.path(), cache);
        let handler = DistHandler::new(bundler, config, Arc::new(ETagGenerator::default()), true);
        (dir, handler)
    }

    fn get(url: &str) -> RequestHead {
        RequestHead::new(Method::Get, url)
    }

    #[test]
    fn test_serves_configured_entry() {
        let (_dir, handler) = project();
        let reply = handler.handle(&get("/dist/app.js")).unwrap();

        assert_eq!(reply.status, 200);
        assert_eq!(reply.header("content-type"), Some(types::JAVASCRIPT));
        assert_eq!(reply.header("cache-control"), Some("no-cache"));
        assert!(reply.header("etag").is_some_and(ETagGenerator::is_valid));

        let Body::Bytes(body) = &reply.body else {
            panic!("expected bytes body");
        };
        let code = String::from_utf8(body.clone()).unwrap();
        assert!(code.contains("src/greet.js"));
        assert_eq!(reply.header("content-length"), Some(body.len().to_string().as_str()));
    }

    #[test]
    fn test_other_routes_pass_through() {
        let (_dir, handler) = project();
        assert!(handler.handle(&get("/index.html")).is_none());
        assert!(handler.handle(&get("/distribution/app.js")).is_none());
    }

    #[test]
    fn test_unknown_bundle_is_404() {
        let (_dir, handler) = project();
        assert_eq!(handler.handle(&get("/dist/nope.js")).unwrap().status, 404);
        assert_eq!(handler.handle(&get("/dist/app.css")).unwrap().status, 404);
    }

    #[test]
    fn test_method_not_allowed() {
        let (_dir, handler) = project();
        let reply = handler
            .handle(&RequestHead::new(Method::Post, "/dist/app.js"))
            .unwrap();
        assert_eq!(reply.status, 405);
        assert_eq!(reply.header("allow"), Some("GET, HEAD"));
    }

    #[test]
    fn test_if_none_match_revalidates() {
        let (_dir, handler) = project();
        let first = handler.handle(&get("/dist/app.js")).unwrap();
        let etag = first.header("etag").unwrap().to_string();

        let second = handler
            .handle(&get("/dist/app.js?v=2").with_header("If-None-Match", etag.as_str()))
            .unwrap();
        assert_eq!(second.status, 304);
        assert_eq!(second.body, Body::Empty);
        assert_eq!(second.header("etag"), Some(etag.as_str()));
    }

    #[test]
    fn test_gzip_when_accepted() {
        let (_dir, handler) = project();
        let plain = handler.handle(&get("/dist/app.js")).unwrap();
        let packed = handler
            .handle(&get("/dist/app.js").with_header("Accept-Encoding", "gzip, br"))
            .unwrap();

        assert_eq!(packed.header("content-encoding"), Some("gzip"));
        assert_eq!(packed.header("vary"), Some("Accept-Encoding"));
        assert_eq!(packed.header("etag"), plain.header("etag"));

        let (Body::Bytes(plain), Body::Bytes(packed)) = (&plain.body, &packed.body) else {
            panic!("expected bytes bodies");
        };
        let mut decoded = Vec::new();
        GzDecoder::new(&packed[..]).read_to_end(&mut decoded).unwrap();
        assert_eq!(&decoded, plain);
    }

    #[test]
    fn test_head_has_length_without_body() {
        let (_dir, handler) = project();
        let full = handler.handle(&get("/dist/app.js")).unwrap();
        let head = handler
            .handle(&RequestHead::new(Method::Head, "/dist/app.js"))
            .unwrap();

        assert_eq!(head.status, 200);
        assert_eq!(head.body, Body::Empty);
        assert_eq!(head.header("content-length"), full.header("content-length"));
    }

    #[test]
    fn test_bundle_failure_is_generic_500() {
        let (_dir, handler) = project();
        let reply = handler.handle(&get("/dist/broken.js")).unwrap();
        assert_eq!(reply.status, 500);
        assert_eq!(reply.body, Body::Bytes(reason(500).as_bytes().to_vec()));
    }
}
