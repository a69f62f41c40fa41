//! Trust Registry Events
//!
//! Every state change in the registry emits an event. Callers drain them
//! after each operation.

use serde::{Deserialize, Serialize};

use lib_types::{Address, Amount, BlockHeight, ChallengeId};

/// Registry events
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum TrustEvent {
    /// Ring 3 self-declaration recorded
    RingThreeDeclared {
        address: Address,
        name: String,
        email: String,
        phone: String,
        info: String,
        block_height: BlockHeight,
    },

    /// Domain declared for ring 2
    RingTwoDeclared {
        address: Address,
        domain: String,
        block_height: BlockHeight,
    },

    /// Challenge opened against a target
    ChallengeInitiated {
        challenge_id: ChallengeId,
        target: Address,
        requester: Address,
        block_height: BlockHeight,
    },

    /// Fetch handed to the oracle
    ChallengeRequested {
        challenge_id: ChallengeId,
        url: String,
        fee: Amount,
        block_height: BlockHeight,
    },

    /// Oracle callback processed
    ChallengeResolved {
        challenge_id: ChallengeId,
        target: Address,
        domain: String,
        /// Expiry of the grant, 0 when unsuccessful
        expiration: BlockHeight,
        successful: bool,
        block_height: BlockHeight,
    },
}
