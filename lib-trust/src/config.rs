//! Registry Configuration

use serde::{Deserialize, Serialize};

use lib_types::BlockHeight;

use crate::errors::{TrustError, TrustResult};

/// Blocks a ring 2 grant stays valid (about six months at 15s blocks)
pub const DEFAULT_RING_TWO_VALIDITY_PERIOD: BlockHeight = 1_051_200;

/// Deployment constants of the trust registry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrustConfig {
    /// Blocks between a successful challenge and the grant's expiry
    #[serde(default = "default_validity_period")]
    pub ring_two_validity_period: BlockHeight,
}

fn default_validity_period() -> BlockHeight {
    DEFAULT_RING_TWO_VALIDITY_PERIOD
}

impl Default for TrustConfig {
    fn default() -> Self {
        Self {
            ring_two_validity_period: DEFAULT_RING_TWO_VALIDITY_PERIOD,
        }
    }
}

impl TrustConfig {
    /// Reject configurations the registry cannot run with
    pub fn validate(&self) -> TrustResult<()> {
        if self.ring_two_validity_period == 0 {
            return Err(TrustError::InvalidConfig(
                "ring_two_validity_period must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
