//! Token Ledger Errors

use lib_types::{Address, Amount};
use thiserror::Error;

/// Error during token operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("Insufficient balance: have {have}, need {need}")]
    InsufficientBalance { have: Amount, need: Amount },

    #[error("Zero amount not allowed")]
    ZeroAmount,

    #[error("Arithmetic overflow")]
    Overflow,

    #[error("Arithmetic underflow")]
    Underflow,

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Zero address not allowed: {0}")]
    ZeroAddress(&'static str),

    #[error("Recipient {recipient:?} rejected the transfer: {reason}")]
    Rejected { recipient: Address, reason: String },
}

/// Result type for token operations
pub type TokenResult<T> = Result<T, TokenError>;
