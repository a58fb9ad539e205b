//! Certificates relation collaborator.
//!
//! The lifecycle runtime owns the relation protocol; the agent only reads
//! what has been delivered and posts a server-certificate request.
//!
//! [`FileRelation`] is the on-node exchange: the runtime drops the relation
//! data as JSON
//!
//! ```json
//! { "ca": "-----BEGIN CERTIFICATE-----...",
//!   "server": { "cert": "...", "key": "..." },
//!   "client": { "cert": "...", "key": "..." } }
//! ```
//!
//! and picks up requests from `request_file`.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::error::{AgentError, Result};
use crate::request::IdentityRequest;

pub trait Relation {
    /// The CA, if the relation has delivered one.
    fn ca(&self) -> Option<String>;
    /// `(cert, key)` for this unit's server certificate.
    fn server_cert(&self) -> Option<(String, String)>;
    /// `(cert, key)` for the shared client certificate.
    fn client_cert(&self) -> Option<(String, String)>;
    /// Ask the issuer for a server certificate.
    fn request_server_cert(&mut self, req: &IdentityRequest) -> Result<()>;
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PairData {
    #[serde(default)]
    pub cert: String,
    #[serde(default)]
    pub key:  String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RelationData {
    #[serde(default)]
    pub ca:     Option<String>,
    #[serde(default)]
    pub server: Option<PairData>,
    #[serde(default)]
    pub client: Option<PairData>,
}

#[derive(Debug, Serialize)]
struct RequestRecord<'a> {
    #[serde(flatten)]
    request:      &'a IdentityRequest,
    requested_at: String,
}

/// Relation backed by JSON files on the node.
#[derive(Debug)]
pub struct FileRelation {
    data:         RelationData,
    request_file: PathBuf,
}

impl FileRelation {
    pub fn new(data: RelationData, request_file: impl Into<PathBuf>) -> Self {
        Self { data, request_file: request_file.into() }
    }

    /// Read `relation_file`.  A missing file is an empty relation.
    pub async fn load(relation_file: &Path, request_file: &Path) -> Result<Self> {
        let data = match tokio::fs::read_to_string(relation_file).await {
            Ok(text) => serde_json::from_str(&text).map_err(|e| {
                AgentError::Relation(format!("{}: {e}", relation_file.display()))
            })?,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("no relation data at {}", relation_file.display());
                RelationData::default()
            }
            Err(e) => return Err(e.into()),
        };
        Ok(Self::new(data, request_file))
    }
}

impl Relation for FileRelation {
    fn ca(&self) -> Option<String> {
        self.data.ca.clone()
    }

    fn server_cert(&self) -> Option<(String, String)> {
        self.data.server.as_ref().map(|p| (p.cert.clone(), p.key.clone()))
    }

    fn client_cert(&self) -> Option<(String, String)> {
        self.data.client.as_ref().map(|p| (p.cert.clone(), p.key.clone()))
    }

    fn request_server_cert(&mut self, req: &IdentityRequest) -> Result<()> {
        if let Some(parent) = self.request_file.parent() {
            fs::create_dir_all(parent)?;
        }
        let record = RequestRecord {
            request:      req,
            requested_at: chrono::Utc::now().to_rfc3339(),
        };
        fs::write(&self.request_file, serde_json::to_vec_pretty(&record)?)?;
        info!(
            "requested server certificate {} (cn={}) via {}",
            req.certificate_name,
            req.common_name,
            self.request_file.display()
        );
        Ok(())
    }
}
