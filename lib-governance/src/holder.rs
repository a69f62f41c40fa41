//! Holder Balances
//!
//! A holder's own voting rights and own PoSaT credits always equal the
//! tokens it has locked, so only `tokens_locked` is stored. Everything
//! else is derived:
//!
//! ```text
//! voting rights   = tokens_locked - delegated_out_voting + received_voting
//! PoSaT held      = tokens_locked - delegated_out_posat  + received_posat
//! PoSaT available = PoSaT held - posat_locked
//! ```
//!
//! Only the own, undelegated part is ever delegatable; received credits
//! can be used but never passed on.

use serde::{Deserialize, Serialize};

use lib_types::Amount;

use crate::errors::{LedgerError, LedgerResult};

/// Per-address ledger balances
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Holder {
    pub tokens_locked: Amount,
    pub delegated_out_voting: Amount,
    pub delegated_out_posat: Amount,
    pub received_voting: Amount,
    pub received_posat: Amount,
    /// PoSaT credits tied up in O10 reserve and votes of confidence
    pub posat_locked: Amount,
}

impl Holder {
    pub fn own_voting_rights(&self) -> Amount {
        self.tokens_locked
    }

    pub fn own_posat(&self) -> Amount {
        self.tokens_locked
    }

    /// Net voting rights
    pub fn voting_rights(&self) -> Amount {
        self.tokens_locked
            .saturating_sub(self.delegated_out_voting)
            .saturating_add(self.received_voting)
    }

    /// PoSaT credits held, locked or not
    pub fn posat_held(&self) -> Amount {
        self.tokens_locked
            .saturating_sub(self.delegated_out_posat)
            .saturating_add(self.received_posat)
    }

    /// PoSaT credits free to lock
    pub fn available_posat(&self) -> Amount {
        self.posat_held().saturating_sub(self.posat_locked)
    }

    /// Own voting rights not yet delegated
    pub fn delegatable_voting(&self) -> Amount {
        self.tokens_locked.saturating_sub(self.delegated_out_voting)
    }

    /// Own PoSaT not delegated and not locked
    pub fn delegatable_posat(&self) -> Amount {
        self.tokens_locked
            .saturating_sub(self.delegated_out_posat)
            .min(self.available_posat())
    }

    /// Tokens that can leave without breaking any balance invariant
    pub fn withdrawable(&self) -> Amount {
        self.delegatable_voting()
            .min(self.tokens_locked.saturating_sub(self.delegated_out_posat))
            .min(self.available_posat())
    }

    /// Lock `amount` of available PoSaT
    pub(crate) fn lock_posat(&mut self, amount: Amount) -> LedgerResult<()> {
        let have = self.available_posat();
        if have < amount {
            return Err(LedgerError::InsufficientBalance { have, need: amount });
        }
        self.posat_locked += amount;
        Ok(())
    }

    /// Release `amount` of locked PoSaT
    pub(crate) fn unlock_posat(&mut self, amount: Amount) -> LedgerResult<()> {
        self.posat_locked = self
            .posat_locked
            .checked_sub(amount)
            .ok_or(LedgerError::InsufficientBalance { have: self.posat_locked, need: amount })?;
        Ok(())
    }

    /// Check the balance invariants
    pub fn is_consistent(&self) -> bool {
        self.tokens_locked >= self.delegated_out_voting
            && self.tokens_locked >= self.delegated_out_posat
            && self.posat_held() >= self.posat_locked
    }

    /// Whether the entry carries no state at all
    pub fn is_empty(&self) -> bool {
        *self == Holder::default()
    }
}
