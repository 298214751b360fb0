//! Server lifecycle management.

use anyhow::{Result, bail};
use std::net::{IpAddr, SocketAddr};
use tiny_http::Server;

use crate::log;

/// Maximum number of port binding attempts.
const MAX_PORT_RETRIES: u16 = 10;

/// Bind to the specified interface and port, with automatic port retry.
pub fn bind_with_retry(interface: IpAddr, base_port: u16) -> Result<(Server, SocketAddr)> {
    let mut last_error = None;

    for offset in 0..MAX_PORT_RETRIES {
        let Some(port) = base_port.checked_add(offset) else {
            break;
        };
        let addr = SocketAddr::new(interface, port);

        match Server::http(addr) {
            Ok(server) => {
                if offset > 0 {
                    log!("serve"; "port {} in use, using {} instead", base_port, port);
                }
                return Ok((server, addr));
            }
            Err(e) => last_error = Some(e),
        }
    }

    match last_error {
        Some(e) => bail!(
            "failed to bind {} after {} attempts from port {}: {}",
            interface,
            MAX_PORT_RETRIES,
            base_port,
            e
        ),
        None => bail!("no port available at or above {}", base_port),
    }
}
