//! TokenContract
//!
//! Metadata and ownership of the fungible token that backs the ledger.
//! Only the owner may mint, and ownership can be handed over exactly
//! like any other owned contract.

use serde::{Deserialize, Serialize};

use lib_types::{Address, Amount, TokenId};

use crate::errors::{TokenError, TokenResult};

// =============================================================================
// CONSTANTS
// =============================================================================

/// Default number of decimal places
pub const DEFAULT_DECIMALS: u8 = 18;

/// One whole token in base units at [`DEFAULT_DECIMALS`]
pub const ONE_TOKEN: Amount = 1_000_000_000_000_000_000;

// =============================================================================
// TOKEN CONTRACT
// =============================================================================

/// Token contract state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenContract {
    // =========================================================================
    // Identity
    // =========================================================================
    /// Unique token identifier
    pub id: TokenId,

    // =========================================================================
    // Metadata
    // =========================================================================
    /// Human-readable token name
    pub name: String,
    /// Token symbol (e.g., "CDT")
    pub symbol: String,
    /// Number of decimal places (display only)
    pub decimals: u8,

    // =========================================================================
    // Authority
    // =========================================================================
    /// Sole address allowed to mint and to hand over ownership
    pub owner: Address,

    // =========================================================================
    // Ledger State
    // =========================================================================
    /// Total supply in circulation
    pub total_supply: Amount,
}

impl TokenContract {
    /// Create a new token contract owned by `owner`
    pub fn new(name: String, symbol: String, decimals: u8, owner: Address) -> Self {
        Self {
            id: TokenId::from_symbol(&symbol),
            name,
            symbol,
            decimals,
            owner,
            total_supply: 0,
        }
    }

    /// Check if an address owns the contract
    pub fn is_owner(&self, address: &Address) -> bool {
        self.owner == *address
    }

    /// Reject callers other than the owner
    pub fn ensure_owner(&self, caller: &Address) -> TokenResult<()> {
        if self.is_owner(caller) {
            Ok(())
        } else {
            Err(TokenError::Unauthorized(format!(
                "caller {} is not the owner",
                caller
            )))
        }
    }

    /// Hand ownership to `new_owner`
    pub fn transfer_ownership(&mut self, caller: &Address, new_owner: Address) -> TokenResult<()> {
        self.ensure_owner(caller)?;
        if new_owner.is_zero() {
            return Err(TokenError::ZeroAddress("new owner"));
        }
        self.owner = new_owner;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_contract() -> TokenContract {
        TokenContract::new("Test".to_string(), "TST".to_string(), DEFAULT_DECIMALS, Address::new([1u8; 32]))
    }

    #[test]
    fn test_token_id_derived_from_symbol() {
        let contract = create_test_contract();
        assert_eq!(contract.id, TokenId::from_symbol("TST"));
        assert_eq!(contract.total_supply, 0);
    }

    #[test]
    fn test_transfer_ownership() {
        let mut contract = create_test_contract();
        let owner = Address::new([1u8; 32]);
        let next = Address::new([2u8; 32]);

        contract.transfer_ownership(&owner, next).unwrap();
        assert!(contract.is_owner(&next));
        assert!(!contract.is_owner(&owner));
    }

    #[test]
    fn test_transfer_ownership_rejects_zero_address() {
        let mut contract = create_test_contract();
        let owner = Address::new([1u8; 32]);

        let result = contract.transfer_ownership(&owner, Address::zero());
        assert_eq!(result, Err(TokenError::ZeroAddress("new owner")));
        assert!(contract.is_owner(&owner));
    }

    #[test]
    fn test_transfer_ownership_rejects_non_owner() {
        let mut contract = create_test_contract();
        let stranger = Address::new([3u8; 32]);

        let result = contract.transfer_ownership(&stranger, stranger);
        assert!(matches!(result, Err(TokenError::Unauthorized(_))));
    }
}
