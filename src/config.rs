//! Agent configuration file parser.
//!
//! Plain `key = value` lines, `#` comments. Defaults reproduce the fixed
//! layout the agent has always used on a node:
//!
//! ```text
//! /usr/local/share/ca-certificates/<service>.crt
//! /srv/kubernetes/{ca.crt,server.cert,server.key,client.cert,client.key}
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{AgentError, Result};

const KEY_MODE: u32 = 0o600;

/// Full agent configuration.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    // ── Destinations ──────────────────────────────────────────────────────────
    /// Directory receiving `ca.crt` and the server/client pairs.
    pub base_dir: PathBuf,
    /// Source directory of the OS trust store.
    pub trust_anchor_dir: PathBuf,
    /// Trust store regenerator, program followed by its arguments.
    pub trust_update_cmd: Vec<String>,
    /// Mode applied to private-key files.
    pub key_mode: u32,
    // ── Identity ──────────────────────────────────────────────────────────────
    /// Owning service; names the trust anchor file.
    pub service_name: String,
    /// Local instance id, e.g. `kubernetes-worker/3`.
    pub instance_name: String,
    /// Overrides for host identity detection (empty = detect).
    pub public_addr:  String,
    pub private_addr: String,
    pub hostname:     String,
    // ── Relation exchange ─────────────────────────────────────────────────────
    pub relation_file: PathBuf,
    pub request_file:  PathBuf,
    // ── Behaviour ─────────────────────────────────────────────────────────────
    pub dedup_sans:      bool,
    pub strict_material: bool,
    pub log_syslog:      bool,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            base_dir:         PathBuf::from("/srv/kubernetes"),
            trust_anchor_dir: PathBuf::from("/usr/local/share/ca-certificates"),
            trust_update_cmd: vec!["update-ca-certificates".to_string()],
            key_mode:         KEY_MODE,
            service_name:     "tls-client".to_string(),
            instance_name:    "tls-client/0".to_string(),
            public_addr:      String::new(),
            private_addr:     String::new(),
            hostname:         String::new(),
            relation_file:    PathBuf::from("/var/lib/tls-client/relation.json"),
            request_file:     PathBuf::from("/var/lib/tls-client/request.json"),
            dedup_sans:       false,
            strict_material:  false,
            log_syslog:       true,
        }
    }
}

/// Parse `path` as a `tls-client.conf` key=value configuration file.
pub fn load_config(path: &Path) -> Result<AgentConfig> {
    let content = fs::read_to_string(path)
        .map_err(|e| AgentError::Config(format!("cannot read {}: {e}", path.display())))?;
    parse_config(&content)
}

/// Parse configuration text; split out from [`load_config`] for tests.
pub fn parse_config(content: &str) -> Result<AgentConfig> {
    let mut cfg = AgentConfig::default();

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let mut parts = line.splitn(2, '=');
        let key = match parts.next() {
            Some(k) => k.trim().to_ascii_lowercase(),
            None => continue,
        };
        let val = match parts.next() {
            Some(v) => v.trim().to_string(),
            None => continue,
        };
        if val.is_empty() {
            continue;
        }

        match key.as_str() {
            "base_dir"         => cfg.base_dir         = PathBuf::from(&val),
            "trust_anchor_dir" => cfg.trust_anchor_dir = PathBuf::from(&val),
            "trust_update_cmd" => cfg.trust_update_cmd = val.split_whitespace().map(String::from).collect(),
            "key_mode"         => cfg.key_mode         = parse_mode(&val)?,
            "service_name"     => cfg.service_name     = val,
            "instance_name"    => cfg.instance_name    = val,
            "public_addr"      => cfg.public_addr      = val,
            "private_addr"     => cfg.private_addr     = val,
            "hostname"         => cfg.hostname         = val,
            "relation_file"    => cfg.relation_file    = PathBuf::from(&val),
            "request_file"     => cfg.request_file     = PathBuf::from(&val),
            "dedup_sans"       => cfg.dedup_sans       = is_true(&val),
            "strict_material"  => cfg.strict_material  = is_true(&val),
            "log_syslog"       => cfg.log_syslog       = is_true(&val),
            _ => {} // ignore unknown keys
        }
    }

    Ok(cfg)
}

fn is_true(val: &str) -> bool {
    val == "true" || val == "1" || val == "yes"
}

/// Parse an octal file mode such as `0600` or `600`.
fn parse_mode(val: &str) -> Result<u32> {
    let digits = val.trim_start_matches("0o");
    u32::from_str_radix(digits, 8)
        .map_err(|e| AgentError::Config(format!("key_mode {val:?}: {e}")))
}

/// Validate that required fields are populated.
pub fn validate_config(cfg: &AgentConfig) -> Result<()> {
    if cfg.base_dir.as_os_str().is_empty() {
        return Err(AgentError::Config("base_dir is required".into()));
    }
    if cfg.trust_anchor_dir.as_os_str().is_empty() {
        return Err(AgentError::Config("trust_anchor_dir is required".into()));
    }
    if cfg.trust_update_cmd.is_empty() {
        return Err(AgentError::Config("trust_update_cmd is required".into()));
    }
    if cfg.service_name.is_empty() {
        return Err(AgentError::Config("service_name is required".into()));
    }
    if cfg.instance_name.is_empty() {
        return Err(AgentError::Config("instance_name is required".into()));
    }
    // Private keys stay owner-only.
    if cfg.key_mode & 0o077 != 0 {
        return Err(AgentError::Config(format!(
            "key_mode {:o} grants group/other access",
            cfg.key_mode
        )));
    }
    Ok(())
}
