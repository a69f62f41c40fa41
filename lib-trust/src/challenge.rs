//! Domain Challenges
//!
//! A challenge asks the oracle to fetch `<domain>/_<address>.html` and
//! compare it with `<html><body><address></body></html>`, both with the
//! address in lowercase hex.

use serde::{Deserialize, Serialize};

use lib_types::{Address, BlockHeight, ChallengeId};

/// Domain separator for challenge ids
const CHALLENGE_ID_DOMAIN: &[u8] = b"TRUST_REGISTRY_CHALLENGE_V1";

/// Lifecycle of a challenge. Only ever moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChallengeState {
    /// Created, no fetch requested yet
    Pending,
    /// Fetch requested, waiting for the oracle callback
    Requested { at: BlockHeight },
    /// Callback delivered
    Resolved { successful: bool, at: BlockHeight },
}

/// A domain-ownership challenge
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Challenge {
    pub id: ChallengeId,
    /// Address whose domain is being checked
    pub target: Address,
    /// Domain declared by the target when the challenge was created
    pub domain: String,
    /// Whoever opened the challenge
    pub requester: Address,
    pub created_at: BlockHeight,
    /// Target's declaration epoch when the challenge was created
    pub epoch: u64,
    pub state: ChallengeState,
}

impl Challenge {
    /// Where the target must publish the proof
    pub fn artifact_url(&self) -> String {
        artifact_url(&self.domain, &self.target)
    }

    /// What the proof must contain, byte for byte
    pub fn expected_content(&self) -> String {
        expected_content(&self.target)
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self.state, ChallengeState::Resolved { .. })
    }
}

/// Location and content of a challenge proof
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChallengeArtifact {
    pub url: String,
    pub expected: String,
}

pub fn artifact_url(domain: &str, target: &Address) -> String {
    format!("{}/_{}.html", domain, target.to_hex())
}

pub fn expected_content(target: &Address) -> String {
    format!("<html><body>{}</body></html>", target.to_hex())
}

/// Derive a challenge id (deterministic)
///
/// The registry-wide counter makes ids unique even for repeated requests
/// in the same block.
pub fn derive_challenge_id(
    target: &Address,
    requester: &Address,
    height: BlockHeight,
    counter: u64,
) -> ChallengeId {
    let mut hasher = blake3::Hasher::new();
    hasher.update(CHALLENGE_ID_DOMAIN);
    hasher.update(target.as_bytes());
    hasher.update(requester.as_bytes());
    hasher.update(&height.to_le_bytes());
    hasher.update(&counter.to_le_bytes());
    ChallengeId::new(*hasher.finalize().as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_artifact_format() {
        let target = Address::new([0xAB; 32]);
        let hex = "ab".repeat(32);

        assert_eq!(
            artifact_url("https://abc.xyz", &target),
            format!("https://abc.xyz/_{}.html", hex)
        );
        assert_eq!(
            expected_content(&target),
            format!("<html><body>{}</body></html>", hex)
        );
    }

    #[test]
    fn test_challenge_id_unique_per_counter() {
        let target = Address::new([1u8; 32]);
        let requester = Address::new([2u8; 32]);

        let a = derive_challenge_id(&target, &requester, 5, 0);
        let b = derive_challenge_id(&target, &requester, 5, 1);
        assert_ne!(a, b);
        assert_eq!(a, derive_challenge_id(&target, &requester, 5, 0));
    }
}
