//! Governance Ledger Errors

use thiserror::Error;

use lib_tokens::TokenError;
use lib_types::{Amount, BlockHeight, TokenId};

/// Error during ledger operations
///
/// Every variant aborts the whole operation; nothing is partially applied.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("Precondition failed: {0}")]
    PreconditionFailed(String),

    #[error("Insufficient balance: have {have}, need {need}")]
    InsufficientBalance { have: Amount, need: Amount },

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Wrong asset: expected {expected}, got {got}")]
    WrongAsset { expected: TokenId, got: TokenId },

    #[error("Command expired at block {block_expiry}, current block is {current_height}")]
    Expired {
        block_expiry: BlockHeight,
        current_height: BlockHeight,
    },

    #[error("Nonce {0} was already used")]
    Replay(String),

    #[error("Insufficient quorum: {cumulative} of {total_locked} locked voting rights")]
    InsufficientQuorum { cumulative: Amount, total_locked: Amount },

    #[error("Ledger has been dissolved")]
    Terminal,

    #[error("Arithmetic overflow")]
    Overflow,

    #[error("Token ledger error: {0}")]
    Token(TokenError),
}

impl From<TokenError> for LedgerError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::InsufficientBalance { have, need } => {
                LedgerError::InsufficientBalance { have, need }
            }
            TokenError::Unauthorized(reason) => LedgerError::Unauthorized(reason),
            other => LedgerError::Token(other),
        }
    }
}

/// Result type for ledger operations
pub type LedgerResult<T> = Result<T, LedgerError>;

/// Shorthand for a failed precondition
pub(crate) fn precondition(reason: impl Into<String>) -> LedgerError {
    LedgerError::PreconditionFailed(reason.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_errors_map_to_ledger_taxonomy() {
        let err: LedgerError = TokenError::InsufficientBalance { have: 1, need: 2 }.into();
        assert_eq!(err, LedgerError::InsufficientBalance { have: 1, need: 2 });

        let err: LedgerError = TokenError::Unauthorized("not owner".to_string()).into();
        assert!(matches!(err, LedgerError::Unauthorized(_)));

        let err: LedgerError = TokenError::ZeroAmount.into();
        assert_eq!(err, LedgerError::Token(TokenError::ZeroAmount));
    }
}
