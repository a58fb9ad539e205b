//! System trust store integration.
//!
//! Drops the CA into the trust anchor directory as `<service>.crt`, then runs
//! the regenerator (`update-ca-certificates` on Debian/Ubuntu nodes) so that
//! every process reading the system bundle picks it up.  The regenerator is
//! run synchronously with no timeout; its exit status is the only signal.

use std::path::{Path, PathBuf};

use log::{info, warn};
use tokio::process::Command;

use crate::config::AgentConfig;
use crate::error::{AgentError, Result};
use crate::store::write_file;

#[derive(Debug, Clone)]
pub struct TrustStoreInstaller {
    anchor_dir: PathBuf,
    /// Program followed by its arguments.
    command:    Vec<String>,
}

impl TrustStoreInstaller {
    pub fn new(anchor_dir: impl Into<PathBuf>, command: Vec<String>) -> Self {
        Self { anchor_dir: anchor_dir.into(), command }
    }

    pub fn from_config(cfg: &AgentConfig) -> Self {
        Self::new(&cfg.trust_anchor_dir, cfg.trust_update_cmd.clone())
    }

    pub fn anchor_dir(&self) -> &Path {
        &self.anchor_dir
    }

    /// Destination of the CA owned by `name`.
    pub fn anchor_path(&self, name: &str) -> PathBuf {
        self.anchor_dir.join(format!("{name}.crt"))
    }

    /// Install `cert_pem` as the trust anchor for `name` and regenerate the
    /// system bundle.  Runs the regenerator on every call.
    pub async fn install_ca(&self, name: &str, cert_pem: &str) -> Result<PathBuf> {
        if cert_pem.is_empty() {
            return Err(AgentError::MissingMaterial(format!("CA for {name} is empty")));
        }

        tokio::fs::create_dir_all(&self.anchor_dir).await?;
        let ca_file = self.anchor_path(name);
        info!("writing CA to {}", ca_file.display());
        write_file(&ca_file, cert_pem.as_bytes(), None).await?;

        self.regenerate().await?;
        info!("generated ca-certificates.crt for {name}");
        Ok(ca_file)
    }

    /// Run the trust store regenerator.
    async fn regenerate(&self) -> Result<()> {
        let (program, args) = self
            .command
            .split_first()
            .ok_or_else(|| AgentError::Config("trust_update_cmd is empty".into()))?;

        let output = Command::new(program).args(args).output().await?;
        if output.status.success() {
            return Ok(());
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        warn!("{program} failed: {}", stderr.trim());
        Err(AgentError::TrustStoreUpdate(format!(
            "{program} exit code {}: {}",
            output.status.code().unwrap_or(-1),
            stderr.trim()
        )))
    }
}
