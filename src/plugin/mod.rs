//! Named request middleware.
//!
//! A [`MiddlewareRegistry`] maps names to factories. `serve.middleware` in
//! the config lists names; [`MiddlewareRegistry::build`] turns that list into
//! a [`Chain`] at startup and rejects unknown names before the server binds.
//!
//! Each layer may answer a request outright in [`Middleware::before`] and may
//! amend every reply in [`Middleware::after`]. `after` hooks run in reverse
//! registration order, including for replies produced by an earlier `before`.

mod builtin;

use regex::Regex;
use std::sync::{Arc, LazyLock};
use thiserror::Error;

use crate::statics::{Reply, RequestHead};

pub use builtin::{Cors, RequestLog};

pub trait Middleware: Send + Sync {
    fn name(&self) -> &str;

    /// Short-circuit with a reply, or `None` to continue.
    fn before(&self, _request: &RequestHead) -> Option<Reply> {
        None
    }

    fn after(&self, _request: &RequestHead, _reply: &mut Reply) {}
}

pub type Factory = fn() -> Box<dyn Middleware>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PluginError {
    #[error("invalid middleware name `{0}` (expected lowercase letters, digits and `-`)")]
    InvalidName(String),

    #[error("middleware `{0}` is already registered")]
    Duplicate(String),

    #[error("unknown middleware `{name}` (available: {available})")]
    Unknown { name: String, available: String },
}

/// Name to factory table, in registration order.
#[derive(Default)]
pub struct MiddlewareRegistry {
    factories: Vec<(String, Factory)>,
}

impl MiddlewareRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry preloaded with `request-log` and `cors`.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        for (name, factory) in builtin::BUILTINS {
            // Built-in names are valid and distinct.
            let _ = registry.register(name, *factory);
        }
        registry
    }

    pub fn register(&mut self, name: &str, factory: Factory) -> Result<(), PluginError> {
        static RE_NAME: LazyLock<Regex> =
            LazyLock::new(|| Regex::new(r"^[a-z0-9]+(?:-[a-z0-9]+)*$").unwrap());

        if !RE_NAME.is_match(name) {
            return Err(PluginError::InvalidName(name.to_string()));
        }
        if self.contains(name) {
            return Err(PluginError::Duplicate(name.to_string()));
        }
        self.factories.push((name.to_string(), factory));
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.iter().any(|(n, _)| n == name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.factories.iter().map(|(n, _)| n.as_str())
    }

    /// Instantiate the listed middleware, in list order.
    pub fn build(&self, names: &[String]) -> Result<Chain, PluginError> {
        let layers = names
            .iter()
            .map(|name| {
                self.factories
                    .iter()
                    .find(|(n, _)| n == name)
                    .map(|(_, factory)| Arc::from(factory()))
                    .ok_or_else(|| PluginError::Unknown {
                        name: name.clone(),
                        available: self.names().collect::<Vec<_>>().join(", "),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Chain { layers })
    }
}

/// Instantiated middleware around a handler.
#[derive(Clone, Default)]
pub struct Chain {
    layers: Vec<Arc<dyn Middleware>>,
}

impl Chain {
    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.layers.iter().map(|layer| layer.name()).collect()
    }

    /// Run `handler` inside the chain.
    pub fn run(&self, request: &RequestHead, handler: impl FnOnce(&RequestHead) -> Reply) -> Reply {
        let mut entered = 0;
        let mut reply = None;

        for layer in &self.layers {
            entered += 1;
            if let Some(early) = layer.before(request) {
                reply = Some(early);
                break;
            }
        }

        let mut reply = reply.unwrap_or_else(|| handler(request));
        for layer in self.layers[..entered].iter().rev() {
            layer.after(request, &mut reply);
        }
        reply
    }
}
