//! HTTP server for bundles and static files.
//!
//! Each request runs through the middleware chain around this dispatch:
//!
//! ```text
//! <route>/<name>.js ─► DistHandler
//! everything else   ─► StaticFileServer ─► Next ─► 404
//! ```

mod dist;
mod lifecycle;

use anyhow::{Context, Result};
use std::io;
use std::sync::Arc;
use tiny_http::{Request, Response, Server};

use crate::bundle::Bundler;
use crate::cache::CacheManager;
use crate::config::{BaleConfig, cfg};
use crate::core::{is_shutdown, register_server};
use crate::freshness::ETagGenerator;
use crate::plugin::{Chain, MiddlewareRegistry};
use crate::statics::{Outcome, Reply, RequestHead, StaticFileServer, delivery, reason};
use crate::{debug, log};

use dist::DistHandler;

/// Everything a worker needs to answer a request.
pub struct App {
    chain: Chain,
    dist: DistHandler,
    statics: StaticFileServer,
}

impl App {
    /// Wire caches, bundler, file server and middleware from config.
    ///
    /// Unknown middleware names fail here, before anything binds.
    pub fn from_config(config: &BaleConfig) -> Result<Self> {
        let chain = MiddlewareRegistry::with_builtins()
            .build(&config.serve.middleware)
            .context("invalid [serve] middleware")?;

        let etags = Arc::new(ETagGenerator::new(config.cache.etag_memo_size));
        let cache = Arc::new(CacheManager::new(config.cache.options()));
        let bundler = Bundler::new(config.get_root(), cache).revalidate(config.bundle.revalidate);

        let dist = DistHandler::new(
            bundler,
            config.bundle.clone(),
            Arc::clone(&etags),
            config.statics.compression,
        );
        let statics =
            StaticFileServer::new(config.statics.root.clone(), config.statics.options(), etags);

        Ok(Self {
            chain,
            dist,
            statics,
        })
    }

    pub fn respond(&self, request: &RequestHead) -> Reply {
        self.chain.run(request, |request| self.dispatch(request))
    }

    fn dispatch(&self, request: &RequestHead) -> Reply {
        if is_shutdown() {
            return Reply::text(503, reason(503));
        }

        if let Some(reply) = self.dist.handle(request) {
            return reply;
        }

        match self.statics.handle(request) {
            Ok(Outcome::Reply(reply)) => reply,
            Ok(Outcome::Next) => Reply::text(404, reason(404)),
            Err(e) => {
                log!("error"; "{} {}: {:#}", request.method, request.url, anyhow::Error::new(e));
                Reply::text(500, reason(500))
            }
        }
    }
}

/// Bind and run the request loop until Ctrl+C.
pub fn serve() -> Result<()> {
    let config = cfg();
    let app = Arc::new(App::from_config(&config)?);

    let (server, addr) = lifecycle::bind_with_retry(config.serve.interface, config.serve.port)?;
    let server = Arc::new(server);
    register_server(Arc::clone(&server));

    log!("serve"; "http://{}", addr);
    debug!("serve"; "static root {}", config.statics.root.display());
    for (name, entry) in &config.bundle.entries {
        debug!("serve"; "{}/{}.js -> {}", config.bundle.route, name, entry.display());
    }
    if !app.chain.is_empty() {
        log!("serve"; "middleware: {}", app.chain.names().join(", "));
    }

    run_request_loop(&server, &app, config.serve.workers)
}

fn run_request_loop(server: &Server, app: &Arc<App>, workers: usize) -> Result<()> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .thread_name(|i| format!("bale-worker-{i}"))
        .build()
        .context("failed to create thread pool")?;

    for request in server.incoming_requests() {
        let app = Arc::clone(app);
        pool.spawn(move || {
            if let Err(e) = handle_request(request, &app) {
                debug!("serve"; "request error: {}", e);
            }
        });
    }
    Ok(())
}

/// Answer a single HTTP request.
fn handle_request(request: Request, app: &App) -> io::Result<()> {
    let head = RequestHead::from_request(&request);
    let reply = app.respond(&head);

    match delivery::into_response(reply) {
        Ok(response) => request.respond(response),
        Err(e) => {
            log!("error"; "{} {}: {}", head.method, head.url, e);
            request.respond(Response::from_string(reason(500)).with_status_code(500))
        }
    }
}
