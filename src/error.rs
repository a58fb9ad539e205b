//! Error types for the TLS client agent.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),

    #[error("trust store update: {0}")]
    TrustStoreUpdate(String),

    #[error("missing material: {0}")]
    MissingMaterial(String),

    #[error("Config: {0}")]
    Config(String),

    #[error("unknown signal: {0}")]
    UnknownSignal(String),

    #[error("relation: {0}")]
    Relation(String),

    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, AgentError>;
