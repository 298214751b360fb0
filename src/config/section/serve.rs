//! `[serve]` section configuration.
//!
//! # Example
//!
//! ```toml
//! [serve]
//! interface = "127.0.0.1"     # Network interface (127.0.0.1 = localhost only)
//! port = 5280                 # HTTP port number
//! workers = 4                 # Request handler threads
//! middleware = ["request-log", "cors"]
//! ```
//!
//! Use `interface = "0.0.0.0"` to make the server accessible from LAN.

use std::net::{IpAddr, Ipv4Addr};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServeConfig {
    /// Network interface to bind.
    /// - `127.0.0.1` (default): localhost only
    /// - `0.0.0.0`: all interfaces (LAN accessible)
    pub interface: IpAddr,

    /// HTTP port number. The next free port is tried when taken.
    pub port: u16,

    /// Size of the request handling pool.
    pub workers: usize,

    /// Middleware names, outermost first.
    pub middleware: Vec<String>,
}

impl Default for ServeConfig {
    fn default() -> Self {
        Self {
            interface: IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)),
            port: 5280,
            workers: 4,
            middleware: Vec::new(),
        }
    }
}

impl ServeConfig {
    pub(in crate::config) fn validate(&self, errors: &mut Vec<String>) {
        if self.workers == 0 {
            errors.push("[serve] workers must be at least 1".into());
        }
    }
}
