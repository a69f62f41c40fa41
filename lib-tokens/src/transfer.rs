//! Token Transfer Execution
//!
//! `apply_token_transfer` and `apply_token_mint` are the canonical way to
//! move or create balance with full validation. Both compute every new
//! balance before writing any of them.

use lib_types::{Address, Amount};

use crate::contract::TokenContract;
use crate::errors::{TokenError, TokenResult};

/// Trait for token balance storage
///
/// This is the minimal storage interface needed for transfers and mints.
pub trait TokenStore {
    /// Get token balance for an address
    fn get_token_balance(&self, address: &Address) -> Amount;

    /// Set token balance for an address
    fn set_token_balance(&mut self, address: &Address, amount: Amount);
}

/// Apply a token transfer with full validation
///
/// # Enforcement
///
/// - **Amount**: zero-value transfers are rejected
/// - **Balance**: sender must hold at least `amount`
/// - **Conservation**: sender debit equals recipient credit
pub fn apply_token_transfer(
    store: &mut dyn TokenStore,
    from: Address,
    to: Address,
    amount: Amount,
) -> TokenResult<()> {
    // =========================================================================
    // Check 1: Amount > 0
    // =========================================================================
    if amount == 0 {
        return Err(TokenError::ZeroAmount);
    }

    // =========================================================================
    // Check 2: Sufficient balance
    // =========================================================================
    let from_balance = store.get_token_balance(&from);
    if from_balance < amount {
        return Err(TokenError::InsufficientBalance {
            have: from_balance,
            need: amount,
        });
    }

    if from == to {
        return Ok(());
    }

    // =========================================================================
    // Compute new balances, then write
    // =========================================================================
    let new_from_balance = from_balance
        .checked_sub(amount)
        .ok_or(TokenError::Underflow)?;
    let new_to_balance = store
        .get_token_balance(&to)
        .checked_add(amount)
        .ok_or(TokenError::Overflow)?;

    store.set_token_balance(&from, new_from_balance);
    store.set_token_balance(&to, new_to_balance);

    Ok(())
}

/// Mint new supply to `to` on behalf of `caller`
///
/// Only the contract owner may mint.
pub fn apply_token_mint(
    store: &mut dyn TokenStore,
    contract: &mut TokenContract,
    caller: Address,
    to: Address,
    amount: Amount,
) -> TokenResult<()> {
    contract.ensure_owner(&caller)?;

    if to.is_zero() {
        return Err(TokenError::ZeroAddress("mint recipient"));
    }
    if amount == 0 {
        return Err(TokenError::ZeroAmount);
    }

    let new_supply = contract
        .total_supply
        .checked_add(amount)
        .ok_or(TokenError::Overflow)?;
    let new_balance = store
        .get_token_balance(&to)
        .checked_add(amount)
        .ok_or(TokenError::Overflow)?;

    store.set_token_balance(&to, new_balance);
    contract.total_supply = new_supply;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    /// Mock token store for testing
    #[derive(Default)]
    struct MockTokenStore {
        balances: HashMap<Address, Amount>,
    }

    impl TokenStore for MockTokenStore {
        fn get_token_balance(&self, address: &Address) -> Amount {
            *self.balances.get(address).unwrap_or(&0)
        }

        fn set_token_balance(&mut self, address: &Address, amount: Amount) {
            self.balances.insert(*address, amount);
        }
    }

    fn create_test_contract(owner: Address) -> TokenContract {
        TokenContract::new("Test".to_string(), "TST".to_string(), 18, owner)
    }

    #[test]
    fn test_basic_transfer() {
        let mut store = MockTokenStore::default();
        let from = Address::new([1u8; 32]);
        let to = Address::new([2u8; 32]);
        store.set_token_balance(&from, 10_000);

        apply_token_transfer(&mut store, from, to, 1_000).unwrap();

        assert_eq!(store.get_token_balance(&from), 9_000);
        assert_eq!(store.get_token_balance(&to), 1_000);
    }

    #[test]
    fn test_transfer_insufficient_balance() {
        let mut store = MockTokenStore::default();
        let from = Address::new([1u8; 32]);
        let to = Address::new([2u8; 32]);
        store.set_token_balance(&from, 500);

        let result = apply_token_transfer(&mut store, from, to, 1_000);
        assert!(matches!(result, Err(TokenError::InsufficientBalance { have: 500, need: 1_000 })));
        assert_eq!(store.get_token_balance(&from), 500);
        assert_eq!(store.get_token_balance(&to), 0);
    }

    #[test]
    fn test_transfer_zero_amount() {
        let mut store = MockTokenStore::default();
        let from = Address::new([1u8; 32]);
        let to = Address::new([2u8; 32]);

        let result = apply_token_transfer(&mut store, from, to, 0);
        assert!(matches!(result, Err(TokenError::ZeroAmount)));
    }

    #[test]
    fn test_mint_by_owner() {
        let mut store = MockTokenStore::default();
        let owner = Address::new([9u8; 32]);
        let to = Address::new([3u8; 32]);
        let mut contract = create_test_contract(owner);

        apply_token_mint(&mut store, &mut contract, owner, to, 100).unwrap();
        assert_eq!(store.get_token_balance(&to), 100);
        assert_eq!(contract.total_supply, 100);
    }

    #[test]
    fn test_mint_by_non_owner_rejected() {
        let mut store = MockTokenStore::default();
        let owner = Address::new([9u8; 32]);
        let stranger = Address::new([4u8; 32]);
        let mut contract = create_test_contract(owner);

        let result = apply_token_mint(&mut store, &mut contract, stranger, stranger, 100);
        assert!(matches!(result, Err(TokenError::Unauthorized(_))));
        assert_eq!(store.get_token_balance(&stranger), 0);
        assert_eq!(contract.total_supply, 0);
    }
}
