//! TLS client agent: installs CA, server, and client certificates delivered
//! over the certificates relation.
//!
//! Usage:
//!   tls-client -c /etc/tls-client/tls-client.conf certificates.ca.available
//!   tls-client --all --stderr        # reconcile every signal, log to stderr

mod config;
mod coordinator;
mod error;
mod host;
mod material;
mod relation;
mod request;
mod store;
mod trust;

use std::path::PathBuf;
use std::process;

use anyhow::Context;
use clap::Parser;
use log::{error, info};

use crate::coordinator::{DistributionCoordinator, Reaction, Signal};
use crate::host::HostIdentity;
use crate::material::StoreOutcome;
use crate::relation::FileRelation;

// ── CLI ───────────────────────────────────────────────────────────────────────

#[derive(Debug, Parser)]
#[command(name = "tls-client", about = "Distribute relation certificates onto this node")]
struct Cli {
    /// Path to the configuration file (built-in defaults when omitted).
    #[arg(short = 'c', long = "config")]
    config: Option<PathBuf>,

    /// Log to stderr instead of syslog (useful for debugging).
    #[arg(long)]
    stderr: bool,

    /// Dispatch every signal in order.
    #[arg(long, conflicts_with = "signals")]
    all: bool,

    /// Signals to dispatch, e.g. `certificates.server.cert.available`.
    #[arg(required_unless_present = "all")]
    signals: Vec<Signal>,
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();

    let cfg = match &cli.config {
        Some(path) => match config::load_config(path) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("tls-client: config error: {e}");
                process::exit(1);
            }
        },
        None => config::AgentConfig::default(),
    };
    if let Err(e) = config::validate_config(&cfg) {
        eprintln!("tls-client: config validation: {e}");
        process::exit(1);
    }

    let use_syslog = cfg.log_syslog && !cli.stderr;
    setup_logging(use_syslog).expect("failed to set up logging");

    let signals = if cli.all { Signal::ALL.to_vec() } else { cli.signals };

    if let Err(e) = run(&cfg, &signals).await {
        error!("{e:#}");
        process::exit(1);
    }
}

/// Dispatch `signals` in order; the first failure stops the run.
async fn run(cfg: &config::AgentConfig, signals: &[Signal]) -> anyhow::Result<()> {
    let relation = FileRelation::load(&cfg.relation_file, &cfg.request_file)
        .await
        .with_context(|| format!("loading relation data from {}", cfg.relation_file.display()))?;
    let host = HostIdentity::resolve(cfg);
    info!(
        "tls-client {} (public={} private={} hostname={})",
        host.instance_name, host.public_addr, host.private_addr, host.hostname
    );

    let mut coordinator = DistributionCoordinator::new(cfg, host, relation);
    for &signal in signals {
        let reaction = coordinator
            .dispatch(signal)
            .await
            .with_context(|| format!("handling {signal}"))?;
        log_reaction(signal, &reaction);
    }
    Ok(())
}

fn log_reaction(signal: Signal, reaction: &Reaction) {
    match reaction {
        Reaction::Prepared(dirs) => info!("{signal}: prepared {dirs:?}"),
        Reaction::CaInstalled { anchor, stored } => {
            info!("{signal}: trusted {} (stored: {})", anchor.display(), stored.is_written());
        }
        Reaction::Requested(req) => {
            info!("{signal}: requested {} for {:?}", req.certificate_name, req.sans);
        }
        Reaction::Stored(StoreOutcome::Written(paths)) => info!("{signal}: wrote {paths:?}"),
        Reaction::Stored(StoreOutcome::Skipped) => {
            info!("{signal}: material incomplete, nothing written");
        }
        Reaction::NotAvailable => info!("{signal}: nothing delivered yet"),
    }
}

// ── Logging setup ─────────────────────────────────────────────────────────────

fn setup_logging(use_syslog: bool) -> anyhow::Result<()> {
    if use_syslog {
        let formatter = syslog::Formatter3164 {
            facility: syslog::Facility::LOG_DAEMON,
            hostname: None,
            process:  "tls-client".into(),
            pid:      process::id(),
        };
        let logger = syslog::unix(formatter)
            .map_err(|e| anyhow::anyhow!("syslog connect failed: {e}"))?;
        log::set_boxed_logger(Box::new(syslog::BasicLogger::new(logger)))
            .map(|()| log::set_max_level(log::LevelFilter::Info))
            .map_err(|e| anyhow::anyhow!("set_logger: {e}"))?;
    } else {
        env_logger::Builder::from_default_env()
            .filter_level(log::LevelFilter::Debug)
            .init();
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parses_signals() {
        let cli = Cli::try_parse_from([
            "tls-client",
            "-c",
            "/etc/tls-client.conf",
            "certificates.ca.available",
            "certificates.client.cert.available",
        ])
        .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/etc/tls-client.conf")));
        assert_eq!(
            cli.signals,
            vec![Signal::CaAvailable, Signal::ClientCertAvailable]
        );
    }

    #[test]
    fn cli_requires_signal_or_all() {
        assert!(Cli::try_parse_from(["tls-client"]).is_err());
        assert!(Cli::try_parse_from(["tls-client", "--all"]).unwrap().all);
        assert!(Cli::try_parse_from(["tls-client", "certificates.bogus"]).is_err());
    }

    #[tokio::test]
    async fn run_reconciles_from_relation_file() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        std::fs::write(
            root.join("relation.json"),
            r#"{"ca":"CA","server":{"cert":"SC","key":"SK"},"client":{"cert":"CC","key":""}}"#,
        )
        .unwrap();
        let cfg = config::AgentConfig {
            base_dir:         root.join("srv"),
            trust_anchor_dir: root.join("anchors"),
            trust_update_cmd: vec!["true".into()],
            relation_file:    root.join("relation.json"),
            request_file:     root.join("request.json"),
            public_addr:      "1.2.3.4".into(),
            private_addr:     "10.0.0.1".into(),
            hostname:         "node1".into(),
            ..config::AgentConfig::default()
        };

        run(&cfg, &Signal::ALL).await.unwrap();

        assert_eq!(std::fs::read_to_string(root.join("anchors/tls-client.crt")).unwrap(), "CA");
        assert_eq!(std::fs::read_to_string(root.join("srv/ca.crt")).unwrap(), "CA");
        assert_eq!(std::fs::read_to_string(root.join("srv/server.key")).unwrap(), "SK");
        assert!(!root.join("srv/client.cert").exists());
        assert!(root.join("request.json").exists());
    }
}
