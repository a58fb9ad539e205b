//! Signal dispatch: reacts to relation states by requesting, storing, and
//! trusting certificate material.
//!
//! Each signal is handled on its own and holds no state between calls, so
//! repeated or reordered signals converge on the same files.  An error aborts
//! the handler it came from; files written earlier in that handler stay.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use log::{debug, info};

use crate::config::AgentConfig;
use crate::error::{AgentError, Result};
use crate::host::HostIdentity;
use crate::material::{CertificateMaterial, PairKind, StoreOutcome};
use crate::relation::Relation;
use crate::request::{build_identity_request, IdentityRequest};
use crate::store::CertificateMaterialStore;
use crate::trust::TrustStoreInstaller;

/// Relation states the lifecycle runtime can raise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Signal {
    /// First run on the node.
    Install,
    CaAvailable,
    /// The certificates relation is joined and accepts requests.
    CertificatesAvailable,
    ServerCertAvailable,
    ClientCertAvailable,
}

impl Signal {
    /// Every signal, in the order a full reconcile dispatches them.
    pub const ALL: [Signal; 5] = [
        Signal::Install,
        Signal::CaAvailable,
        Signal::CertificatesAvailable,
        Signal::ServerCertAvailable,
        Signal::ClientCertAvailable,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Signal::Install               => "tls-client.install",
            Signal::CaAvailable           => "certificates.ca.available",
            Signal::CertificatesAvailable => "certificates.available",
            Signal::ServerCertAvailable   => "certificates.server.cert.available",
            Signal::ClientCertAvailable   => "certificates.client.cert.available",
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Signal {
    type Err = AgentError;

    fn from_str(s: &str) -> Result<Self> {
        Signal::ALL
            .into_iter()
            .find(|sig| sig.as_str() == s)
            .ok_or_else(|| AgentError::UnknownSignal(s.to_string()))
    }
}

/// What a handler did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reaction {
    /// Destination directories exist.
    Prepared(Vec<PathBuf>),
    /// CA trusted system-wide and stored.
    CaInstalled { anchor: PathBuf, stored: StoreOutcome },
    Requested(IdentityRequest),
    Stored(StoreOutcome),
    /// The relation has not delivered this material yet.
    NotAvailable,
}

pub struct DistributionCoordinator<R: Relation> {
    store:        CertificateMaterialStore,
    installer:    TrustStoreInstaller,
    relation:     R,
    host:         HostIdentity,
    service_name: String,
    dedup_sans:   bool,
}

impl<R: Relation> DistributionCoordinator<R> {
    pub fn new(cfg: &AgentConfig, host: HostIdentity, relation: R) -> Self {
        Self {
            store:        CertificateMaterialStore::from_config(cfg),
            installer:    TrustStoreInstaller::from_config(cfg),
            relation,
            host,
            service_name: cfg.service_name.clone(),
            dedup_sans:   cfg.dedup_sans,
        }
    }

    #[cfg(test)]
    pub fn relation(&self) -> &R {
        &self.relation
    }

    /// Run the handler for `signal` to completion.
    pub async fn dispatch(&mut self, signal: Signal) -> Result<Reaction> {
        debug!("dispatching {signal}");
        let reaction = match signal {
            Signal::Install               => self.prepare().await?,
            Signal::CaAvailable           => self.store_ca().await?,
            Signal::CertificatesAvailable => self.send_request()?,
            Signal::ServerCertAvailable   => self.store_pair(PairKind::Server).await?,
            Signal::ClientCertAvailable   => self.store_pair(PairKind::Client).await?,
        };
        debug!("{signal}: {reaction:?}");
        Ok(reaction)
    }

    async fn prepare(&self) -> Result<Reaction> {
        self.store.ensure_base_dir().await?;
        tokio::fs::create_dir_all(self.installer.anchor_dir()).await?;
        info!("tls-client installed");
        Ok(Reaction::Prepared(vec![
            self.store.base_dir().to_path_buf(),
            self.installer.anchor_dir().to_path_buf(),
        ]))
    }

    async fn store_ca(&self) -> Result<Reaction> {
        let Some(ca) = self.relation.ca() else {
            return Ok(Reaction::NotAvailable);
        };
        if ca.is_empty() {
            return Ok(Reaction::Stored(self.store.store(&CertificateMaterial::Ca(ca)).await?));
        }

        let anchor = self.installer.install_ca(&self.service_name, &ca).await?;
        let stored = self.store.store(&CertificateMaterial::Ca(ca)).await?;
        Ok(Reaction::CaInstalled { anchor, stored })
    }

    fn send_request(&mut self) -> Result<Reaction> {
        let mut req = build_identity_request(
            &self.host.public_addr,
            &self.host.private_addr,
            &self.host.hostname,
            &self.host.instance_name,
        );
        if self.dedup_sans {
            req = req.dedup_sans();
        }
        self.relation.request_server_cert(&req)?;
        Ok(Reaction::Requested(req))
    }

    async fn store_pair(&self, kind: PairKind) -> Result<Reaction> {
        let material = match kind {
            PairKind::Server => self
                .relation
                .server_cert()
                .map(|(cert, key)| CertificateMaterial::ServerPair { cert, key }),
            PairKind::Client => self
                .relation
                .client_cert()
                .map(|(cert, key)| CertificateMaterial::ClientPair { cert, key }),
        };
        let Some(material) = material else {
            return Ok(Reaction::NotAvailable);
        };
        Ok(Reaction::Stored(self.store.store(&material).await?))
    }
}
