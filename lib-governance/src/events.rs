//! Governance Ledger Events

use serde::{Deserialize, Serialize};

use lib_types::{Address, Amount, BlockHeight};

use crate::params::ProtocolParam;

/// Ledger events, drained by the host after each operation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum LedgerEvent {
    // ------------------------------------------------------------------
    // Token lock
    // ------------------------------------------------------------------
    TokensLocked {
        holder: Address,
        amount: Amount,
        block_height: BlockHeight,
    },

    TokensUnlocked {
        holder: Address,
        amount: Amount,
        block_height: BlockHeight,
    },

    // ------------------------------------------------------------------
    // Delegation
    // ------------------------------------------------------------------
    VotingRightsDelegated {
        from: Address,
        to: Address,
        amount: Amount,
    },

    VotingRightsDelegationWithdrawn {
        from: Address,
        to: Address,
        amount: Amount,
    },

    PoSaTDelegated {
        from: Address,
        to: Address,
        amount: Amount,
    },

    PoSaTDelegationWithdrawn {
        from: Address,
        to: Address,
        amount: Amount,
    },

    // ------------------------------------------------------------------
    // O10 and votes of confidence
    // ------------------------------------------------------------------
    O10Authorized {
        holder: Address,
        reserve: Amount,
        block_height: BlockHeight,
    },

    O10Deauthorized {
        holder: Address,
        released: Amount,
        block_height: BlockHeight,
    },

    VoteOfConfidence {
        truster: Address,
        trustee: Address,
        locked: Amount,
        block_height: BlockHeight,
    },

    VoteRevoked {
        truster: Address,
        trustee: Address,
        released: Amount,
        block_height: BlockHeight,
    },

    RewardGranted {
        truster: Address,
        trustee: Address,
        cycles: u64,
        amount: Amount,
        block_height: BlockHeight,
    },

    // ------------------------------------------------------------------
    // O5 channel
    // ------------------------------------------------------------------
    O5Authorized {
        function_signature: String,
        cumulative_vote: Amount,
        signers: Vec<Address>,
        block_height: BlockHeight,
    },

    ParameterModified {
        param: ProtocolParam,
        old: u128,
        new: u128,
    },

    NoConfidence {
        target: Address,
    },

    Dissolved {
        submitter: Address,
        block_height: BlockHeight,
    },

    DissolutionWithdrawal {
        holder: Address,
        amount: Amount,
    },
}
