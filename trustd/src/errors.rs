//! Node Errors

use thiserror::Error;

use lib_governance::LedgerError;
use lib_tokens::TokenError;
use lib_trust::TrustError;

/// Error raised by the node service
#[derive(Error, Debug)]
pub enum NodeError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to parse configuration: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Trust registry: {0}")]
    Trust(#[from] TrustError),

    #[error("Governance ledger: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Token ledger: {0}")]
    Token(#[from] TokenError),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Oracle bridge: {0}")]
    Oracle(String),

    #[error("Service stopped")]
    ServiceStopped,
}

/// Result type for node operations
pub type NodeResult<T> = Result<T, NodeError>;
