//! Certificate material delivered over the certificates relation.
//!
//! Values are transient: built from the relation on each dispatch and
//! dropped once the handler returns.

use std::fmt;
use std::path::PathBuf;

/// Which certificate/key pair a write targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairKind {
    Server,
    Client,
}

impl PairKind {
    /// File names `(certificate, key)` under the base directory.
    pub fn file_names(self) -> (&'static str, &'static str) {
        match self {
            PairKind::Server => ("server.cert", "server.key"),
            PairKind::Client => ("client.cert", "client.key"),
        }
    }
}

impl fmt::Display for PairKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PairKind::Server => f.write_str("server"),
            PairKind::Client => f.write_str("client"),
        }
    }
}

/// Single-file material.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SingleKind {
    Ca,
}

impl SingleKind {
    pub fn file_name(self) -> &'static str {
        match self {
            SingleKind::Ca => "ca.crt",
        }
    }
}

impl fmt::Display for SingleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SingleKind::Ca => f.write_str("CA"),
        }
    }
}

/// PEM-encoded material as read from the relation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CertificateMaterial {
    Ca(String),
    ServerPair { cert: String, key: String },
    ClientPair { cert: String, key: String },
}

/// Result of a store operation that may legitimately do nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreOutcome {
    /// Files written, in write order.
    Written(Vec<PathBuf>),
    /// Material was incomplete; nothing touched.
    Skipped,
}

impl StoreOutcome {
    pub fn is_written(&self) -> bool {
        matches!(self, StoreOutcome::Written(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pair_file_names() {
        assert_eq!(PairKind::Server.file_names(), ("server.cert", "server.key"));
        assert_eq!(PairKind::Client.file_names(), ("client.cert", "client.key"));
        assert_eq!(SingleKind::Ca.file_name(), "ca.crt");
    }
}
