//! Token Ledger Collaborator
//!
//! [`TokenLedger`] is the surface the governance ledger consumes: balance
//! queries, plain transfers, owner-only minting and ownership hand-over.
//! [`send_with_notify`] adds the receive hook so that a contract holding
//! funds can refuse assets it does not accept.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use lib_types::{Address, Amount, BlockHeight, TokenId};

use crate::contract::TokenContract;
use crate::errors::{TokenError, TokenResult};
use crate::transfer::{apply_token_mint, apply_token_transfer, TokenStore};

/// Fungible-token ledger consumed by the governance ledger
pub trait TokenLedger {
    /// Identifier of the asset this ledger tracks
    fn asset(&self) -> TokenId;

    /// Balance of `who`
    fn balance_of(&self, who: &Address) -> Amount;

    /// Total supply in circulation
    fn total_supply(&self) -> Amount;

    /// Move `amount` from `from` to `to`
    fn transfer(&mut self, from: Address, to: Address, amount: Amount) -> TokenResult<()>;

    /// Create `amount` for `to`. Only the owner may call this.
    fn mint(&mut self, caller: Address, to: Address, amount: Amount) -> TokenResult<()>;

    /// Current owner
    fn owner(&self) -> Address;

    /// Hand ownership over. Only the owner may call this.
    fn transfer_ownership(&mut self, caller: Address, new_owner: Address) -> TokenResult<()>;
}

/// Receive hook run after funds arrive at a contract address
pub trait TokenRecipient {
    /// Called once the transfer has been applied. Returning an error
    /// rolls the transfer back.
    fn tokens_received(
        &mut self,
        asset: TokenId,
        from: Address,
        amount: Amount,
        height: BlockHeight,
    ) -> Result<(), String>;
}

/// Transfer and notify the recipient, undoing the transfer if the hook
/// refuses it
pub fn send_with_notify<L, R>(
    ledger: &mut L,
    recipient: &mut R,
    from: Address,
    to: Address,
    amount: Amount,
    height: BlockHeight,
) -> TokenResult<()>
where
    L: TokenLedger + ?Sized,
    R: TokenRecipient + ?Sized,
{
    ledger.transfer(from, to, amount)?;

    if let Err(reason) = recipient.tokens_received(ledger.asset(), from, amount, height) {
        debug!("Recipient {} rejected {} units: {}", to, amount, reason);
        ledger.transfer(to, from, amount)?;
        return Err(TokenError::Rejected { recipient: to, reason });
    }

    Ok(())
}

// =============================================================================
// IN-MEMORY LEDGER
// =============================================================================

/// In-memory token ledger
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryTokenLedger {
    contract: TokenContract,
    balances: HashMap<Address, Amount>,
}

impl MemoryTokenLedger {
    /// Create a ledger and mint the initial supply to `initial_holder`
    pub fn new(
        contract: TokenContract,
        initial_holder: Address,
        initial_supply: Amount,
    ) -> TokenResult<Self> {
        if initial_holder.is_zero() {
            return Err(TokenError::ZeroAddress("initial holder"));
        }

        let owner = contract.owner;
        let mut ledger = Self {
            contract,
            balances: HashMap::new(),
        };
        if initial_supply > 0 {
            apply_token_mint(&mut ledger.balances, &mut ledger.contract, owner, initial_holder, initial_supply)?;
        }

        info!(
            "Token {} created: supply={}, holder={}",
            ledger.contract.symbol, initial_supply, initial_holder
        );
        Ok(ledger)
    }

    /// Contract metadata
    pub fn contract(&self) -> &TokenContract {
        &self.contract
    }
}

impl TokenStore for HashMap<Address, Amount> {
    fn get_token_balance(&self, address: &Address) -> Amount {
        self.get(address).copied().unwrap_or(0)
    }

    fn set_token_balance(&mut self, address: &Address, amount: Amount) {
        self.insert(*address, amount);
    }
}

impl TokenLedger for MemoryTokenLedger {
    fn asset(&self) -> TokenId {
        self.contract.id
    }

    fn balance_of(&self, who: &Address) -> Amount {
        self.balances.get_token_balance(who)
    }

    fn total_supply(&self) -> Amount {
        self.contract.total_supply
    }

    fn transfer(&mut self, from: Address, to: Address, amount: Amount) -> TokenResult<()> {
        apply_token_transfer(&mut self.balances, from, to, amount)
    }

    fn mint(&mut self, caller: Address, to: Address, amount: Amount) -> TokenResult<()> {
        apply_token_mint(&mut self.balances, &mut self.contract, caller, to, amount)?;
        debug!("Minted {} {} to {}", amount, self.contract.symbol, to);
        Ok(())
    }

    fn owner(&self) -> Address {
        self.contract.owner
    }

    fn transfer_ownership(&mut self, caller: Address, new_owner: Address) -> TokenResult<()> {
        self.contract.transfer_ownership(&caller, new_owner)?;
        info!("Token {} ownership transferred to {}", self.contract.symbol, new_owner);
        Ok(())
    }
}
