//! Ledger Configuration
//!
//! TOML has no 128-bit integers, so requirements are configured in whole
//! tokens and scaled by `10^decimals` when the ledger is built.

use serde::{Deserialize, Serialize};

use lib_tokens::DEFAULT_DECIMALS;
use lib_types::{Amount, BlockHeight};

use crate::errors::{precondition, LedgerError, LedgerResult};
use crate::params::{
    ProtocolParams, DEFAULT_POSAT_BLOCK_REQUIREMENT, DEFAULT_POSAT_REWARD_RATE,
    DEFAULT_RING_ONE_REQUIREMENT,
};

/// Initial governance parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Decimals of the governance token
    pub decimals: u8,
    /// Whole tokens an O10 locks
    pub o10_requirement_tokens: u64,
    /// Whole tokens locked per vote of confidence
    pub voc_requirement_tokens: u64,
    /// Percent of the VoC requirement paid per reward cycle
    pub posat_reward_rate: u64,
    /// Blocks per reward cycle
    pub posat_block_requirement: BlockHeight,
    /// Ring 1 endorsement threshold in percent
    pub ring_one_requirement: u64,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            decimals: DEFAULT_DECIMALS,
            o10_requirement_tokens: 9_000_000,
            voc_requirement_tokens: 10_000,
            posat_reward_rate: DEFAULT_POSAT_REWARD_RATE as u64,
            posat_block_requirement: DEFAULT_POSAT_BLOCK_REQUIREMENT,
            ring_one_requirement: DEFAULT_RING_ONE_REQUIREMENT as u64,
        }
    }
}

impl LedgerConfig {
    /// Base units in one whole token
    pub fn unit(&self) -> LedgerResult<Amount> {
        10u128
            .checked_pow(self.decimals as u32)
            .ok_or_else(|| precondition(format!("{} decimals overflow the amount type", self.decimals)))
    }

    /// Scale to base units and validate
    pub fn to_params(&self) -> LedgerResult<ProtocolParams> {
        let unit = self.unit()?;
        let params = ProtocolParams {
            o10_requirement: (self.o10_requirement_tokens as Amount)
                .checked_mul(unit)
                .ok_or(LedgerError::Overflow)?,
            voc_requirement: (self.voc_requirement_tokens as Amount)
                .checked_mul(unit)
                .ok_or(LedgerError::Overflow)?,
            posat_reward_rate: self.posat_reward_rate as Amount,
            posat_block_requirement: self.posat_block_requirement,
            ring_one_requirement: self.ring_one_requirement as Amount,
        };
        params.validate()?;
        Ok(params)
    }
}
