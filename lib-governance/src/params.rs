//! Protocol Parameters
//!
//! Defines the parameters the O5 channel may amend. Amendments take
//! effect immediately.

use serde::{Deserialize, Serialize};

use lib_tokens::ONE_TOKEN;
use lib_types::{Amount, BlockHeight, Percent};

use crate::errors::{precondition, LedgerResult};

// =============================================================================
// DEFAULTS
// =============================================================================

/// Default initial token supply (90,000,000 tokens)
pub const DEFAULT_INITIAL_SUPPLY: Amount = 90_000_000 * ONE_TOKEN;

/// PoSaT credits an O10 must lock: 10% of the initial supply
pub const DEFAULT_O10_REQUIREMENT: Amount = DEFAULT_INITIAL_SUPPLY / 10;

/// PoSaT credits locked per vote of confidence (10,000 tokens)
pub const DEFAULT_VOC_REQUIREMENT: Amount = 10_000 * ONE_TOKEN;

/// Reward per cycle, as a percentage of the vote of confidence requirement
pub const DEFAULT_POSAT_REWARD_RATE: Percent = 5;

/// Blocks per reward cycle (about one year at 15s blocks)
pub const DEFAULT_POSAT_BLOCK_REQUIREMENT: BlockHeight = 2_102_400;

/// Share of all locked tokens a target's endorsers must hold for ring 1
pub const DEFAULT_RING_ONE_REQUIREMENT: Percent = 25;

// =============================================================================
// PARAMETER SET
// =============================================================================

/// Parameters that can be modified through the O5 channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProtocolParam {
    /// Ring 1 endorsement threshold (percent of cumulative locked tokens)
    RingOneRequirement,
    /// Blocks per PoSaT reward cycle
    PoSaTRequirement,
    /// Reward rate (percent of the VoC requirement per cycle)
    PoSaTReward,
    /// PoSaT locked per vote of confidence
    VoCRequirement,
    /// PoSaT locked for O10 authorization
    O10Requirement,
}

impl ProtocolParam {
    /// Every amendable parameter
    pub const ALL: [ProtocolParam; 5] = [
        ProtocolParam::RingOneRequirement,
        ProtocolParam::PoSaTRequirement,
        ProtocolParam::PoSaTReward,
        ProtocolParam::VoCRequirement,
        ProtocolParam::O10Requirement,
    ];

    /// Function signature an O5 command uses to amend this parameter
    pub fn o5_signature(&self) -> &'static str {
        match self {
            ProtocolParam::RingOneRequirement => "O5ModifyRingOneRequirement",
            ProtocolParam::PoSaTRequirement => "O5ModifyPoSaTRequirement",
            ProtocolParam::PoSaTReward => "O5ModifyPoSaTReward",
            ProtocolParam::VoCRequirement => "O5ModifyVoCRequirement",
            ProtocolParam::O10Requirement => "O5ModifyO10Requirement",
        }
    }

    /// Get human-readable description
    pub fn description(&self) -> &'static str {
        match self {
            ProtocolParam::RingOneRequirement => "Ring 1 endorsement threshold (percent)",
            ProtocolParam::PoSaTRequirement => "Blocks per PoSaT reward cycle",
            ProtocolParam::PoSaTReward => "PoSaT reward rate (percent)",
            ProtocolParam::VoCRequirement => "Vote of confidence requirement",
            ProtocolParam::O10Requirement => "O10 authorization requirement",
        }
    }

    /// Check a proposed value
    pub fn validate(&self, value: u128) -> LedgerResult<()> {
        match self {
            ProtocolParam::RingOneRequirement if value > 100 => {
                Err(precondition("ring 1 requirement cannot exceed 100 percent"))
            }
            ProtocolParam::PoSaTRequirement if value == 0 => {
                Err(precondition("PoSaT block requirement must be positive"))
            }
            ProtocolParam::PoSaTRequirement if value > BlockHeight::MAX as u128 => {
                Err(precondition("PoSaT block requirement does not fit a block height"))
            }
            _ => Ok(()),
        }
    }
}

/// Current values of the amendable parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolParams {
    pub o10_requirement: Amount,
    pub voc_requirement: Amount,
    pub posat_reward_rate: Percent,
    pub posat_block_requirement: BlockHeight,
    pub ring_one_requirement: Percent,
}

impl Default for ProtocolParams {
    fn default() -> Self {
        Self {
            o10_requirement: DEFAULT_O10_REQUIREMENT,
            voc_requirement: DEFAULT_VOC_REQUIREMENT,
            posat_reward_rate: DEFAULT_POSAT_REWARD_RATE,
            posat_block_requirement: DEFAULT_POSAT_BLOCK_REQUIREMENT,
            ring_one_requirement: DEFAULT_RING_ONE_REQUIREMENT,
        }
    }
}

impl ProtocolParams {
    /// Read a parameter
    pub fn get(&self, param: ProtocolParam) -> u128 {
        match param {
            ProtocolParam::RingOneRequirement => self.ring_one_requirement,
            ProtocolParam::PoSaTRequirement => self.posat_block_requirement as u128,
            ProtocolParam::PoSaTReward => self.posat_reward_rate,
            ProtocolParam::VoCRequirement => self.voc_requirement,
            ProtocolParam::O10Requirement => self.o10_requirement,
        }
    }

    /// Validate and write a parameter, returning the previous value
    pub fn set(&mut self, param: ProtocolParam, value: u128) -> LedgerResult<u128> {
        param.validate(value)?;
        let old = self.get(param);
        match param {
            ProtocolParam::RingOneRequirement => self.ring_one_requirement = value,
            ProtocolParam::PoSaTRequirement => self.posat_block_requirement = value as BlockHeight,
            ProtocolParam::PoSaTReward => self.posat_reward_rate = value,
            ProtocolParam::VoCRequirement => self.voc_requirement = value,
            ProtocolParam::O10Requirement => self.o10_requirement = value,
        }
        Ok(old)
    }

    /// Reject parameter sets the ledger cannot run with
    pub fn validate(&self) -> LedgerResult<()> {
        for param in ProtocolParam::ALL {
            param.validate(self.get(param))?;
        }
        Ok(())
    }
}
