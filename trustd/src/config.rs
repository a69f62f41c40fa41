//! Node Configuration
//!
//! One TOML file with a section per component. Every section and field is
//! optional; missing values fall back to the deployment defaults.
//!
//! ```toml
//! [trust]
//! ring_two_validity_period = 1051200
//!
//! [ledger]
//! voc_requirement_tokens = 10000
//!
//! [token]
//! symbol = "TRUST"
//! treasury = "<64 hex chars>"
//!
//! [oracle]
//! callback_address = "<64 hex chars>"
//! timeout_secs = 10
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::info;

use lib_governance::{LedgerConfig, ProtocolParams};
use lib_trust::{OracleFee, TrustConfig};
use lib_types::{Address, Amount};

use crate::errors::{NodeError, NodeResult};

/// Complete node configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    pub trust: TrustConfig,
    pub ledger: LedgerConfig,
    pub token: TokenSection,
    pub oracle: OracleSection,
}

/// Governance token deployment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenSection {
    pub name: String,
    pub symbol: String,
    /// Whole tokens minted to the treasury at start
    pub initial_supply_tokens: u64,
    /// Receives the initial supply
    pub treasury: Address,
}

impl Default for TokenSection {
    fn default() -> Self {
        Self {
            name: "Trust".to_string(),
            symbol: "TRUST".to_string(),
            initial_supply_tokens: 90_000_000,
            treasury: Address::new([0x7E; 32]),
        }
    }
}

/// Domain oracle bridge
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OracleSection {
    /// Address the bridge signs callbacks with
    pub callback_address: Address,
    /// Gas charged for one callback
    pub callback_gas: u64,
    /// Flat fee added to each quote
    pub flat_fee: u64,
    /// Gas price used when the node quotes on a requester's behalf
    pub gas_price: u64,
    /// HTTP timeout per fetch
    pub timeout_secs: u64,
}

impl Default for OracleSection {
    fn default() -> Self {
        Self {
            callback_address: Address::new([0x0C; 32]),
            callback_gas: lib_trust::oracle::DEFAULT_CALLBACK_GAS as u64,
            flat_fee: 0,
            gas_price: 1,
            timeout_secs: 10,
        }
    }
}

impl OracleSection {
    pub fn fee(&self) -> OracleFee {
        OracleFee {
            callback_gas: self.callback_gas as Amount,
            flat_fee: self.flat_fee as Amount,
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl NodeConfig {
    /// Parse and validate TOML
    pub fn from_toml_str(content: &str) -> NodeResult<Self> {
        let config: NodeConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file
    pub async fn load(path: &Path) -> NodeResult<Self> {
        let content = tokio::fs::read_to_string(path).await?;
        let config = Self::from_toml_str(&content)?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Initial protocol parameters in base units
    pub fn protocol_params(&self) -> NodeResult<ProtocolParams> {
        Ok(self.ledger.to_params()?)
    }

    /// Initial supply in base units
    pub fn initial_supply(&self) -> NodeResult<Amount> {
        let unit = self.ledger.unit()?;
        (self.token.initial_supply_tokens as Amount)
            .checked_mul(unit)
            .ok_or_else(|| NodeError::Config("initial supply overflows".to_string()))
    }

    /// Reject configurations the node cannot start with
    pub fn validate(&self) -> NodeResult<()> {
        self.trust.validate()?;
        self.ledger.to_params()?;
        self.initial_supply()?;

        if self.token.symbol.is_empty() {
            return Err(NodeError::Config("token symbol must not be empty".to_string()));
        }
        if self.token.treasury.is_zero() {
            return Err(NodeError::Config("token treasury must not be the zero address".to_string()));
        }
        if self.oracle.callback_address.is_zero() {
            return Err(NodeError::Config("oracle callback address must not be zero".to_string()));
        }
        if self.oracle.timeout_secs == 0 {
            return Err(NodeError::Config("oracle timeout must be positive".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = NodeConfig::from_toml_str("").unwrap();
        assert_eq!(config, NodeConfig::default());
        assert_eq!(config.trust.ring_two_validity_period, 1_051_200);
        assert_eq!(config.initial_supply().unwrap(), 90_000_000 * 10u128.pow(18));
    }

    #[test]
    fn test_sections_override_defaults() {
        let treasury = "11".repeat(32);
        let content = format!(
            r#"
            [trust]
            ring_two_validity_period = 50

            [ledger]
            posat_block_requirement = 10

            [token]
            symbol = "TST"
            treasury = "{}"

            [oracle]
            timeout_secs = 3
            "#,
            treasury
        );

        let config = NodeConfig::from_toml_str(&content).unwrap();
        assert_eq!(config.trust.ring_two_validity_period, 50);
        assert_eq!(config.protocol_params().unwrap().posat_block_requirement, 10);
        assert_eq!(config.token.symbol, "TST");
        assert_eq!(config.token.name, "Trust");
        assert_eq!(config.token.treasury, Address::new([0x11; 32]));
        assert_eq!(config.oracle.timeout(), Duration::from_secs(3));
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(NodeConfig::from_toml_str("[trust]\nring_two_validity_period = 0").is_err());
        assert!(NodeConfig::from_toml_str("[oracle]\ntimeout_secs = 0").is_err());
        assert!(NodeConfig::from_toml_str("[token]\ntreasury = \"xyz\"").is_err());
    }
}
