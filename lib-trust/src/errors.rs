//! Trust Registry Errors

use lib_types::{Amount, ChallengeId};
use thiserror::Error;

/// Error during registry operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TrustError {
    #[error("Precondition failed: {0}")]
    PreconditionFailed(String),

    #[error("No challenge with id {0} was found")]
    NotFound(ChallengeId),

    #[error("Insufficient payment: paid {paid}, required {required}")]
    InsufficientPayment { paid: Amount, required: Amount },

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Challenge {0} was already resolved")]
    Replay(ChallengeId),

    #[error("Oracle request failed: {0}")]
    Oracle(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type for registry operations
pub type TrustResult<T> = Result<T, TrustError>;
