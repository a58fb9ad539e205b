//! Host identity: addresses, hostname, and instance id of this node.

use std::io;
use std::net::{IpAddr, Ipv4Addr, UdpSocket};

use log::warn;

use crate::config::AgentConfig;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostIdentity {
    pub public_addr:   String,
    pub private_addr:  String,
    pub hostname:      String,
    pub instance_name: String,
}

impl HostIdentity {
    /// Resolve identity from config, detecting anything left empty.
    ///
    /// Without a configured public address the private one is used; nodes
    /// with a single interface have no separate public address.
    pub fn resolve(cfg: &AgentConfig) -> Self {
        let private_addr = if cfg.private_addr.is_empty() {
            get_own_ip()
        } else {
            cfg.private_addr.clone()
        };
        let public_addr = if cfg.public_addr.is_empty() {
            private_addr.clone()
        } else {
            cfg.public_addr.clone()
        };
        let hostname = if cfg.hostname.is_empty() {
            read_hostname()
        } else {
            cfg.hostname.clone()
        };

        Self {
            public_addr,
            private_addr,
            hostname,
            instance_name: cfg.instance_name.clone(),
        }
    }
}

/// Detect the node's primary outbound IP address by making a dummy UDP
/// connection (no packets actually sent).  Falls back to "0.0.0.0".
pub fn get_own_ip() -> String {
    let ip = (|| -> io::Result<IpAddr> {
        let sock = UdpSocket::bind("0.0.0.0:0")?;
        sock.connect("8.8.8.8:80")?;
        Ok(sock.local_addr()?.ip())
    })()
    .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED));
    ip.to_string()
}

/// Kernel hostname; empty on failure.
pub fn read_hostname() -> String {
    match nix::unistd::gethostname() {
        Ok(name) => name.to_string_lossy().into_owned(),
        Err(e) => {
            warn!("gethostname failed: {e}");
            String::new()
        }
    }
}
