//! Governance Ledger
//!
//! Holds locked governance tokens in a custody account and tracks, per
//! holder, the voting rights and PoSaT credits those tokens carry.
//!
//! # Atomicity
//!
//! Every mutator validates against copies of the affected entries, then
//! calls the token ledger, then commits. A failure at any step leaves the
//! ledger untouched.
//!
//! The O10, vote-of-confidence and reward operations live in
//! [`crate::posat`]; the multisig channel lives in [`crate::o5`].

use std::collections::{HashMap, HashSet};

use tracing::{debug, info, warn};

use lib_tokens::{TokenLedger, TokenRecipient};
use lib_types::{Address, Amount, BlockHeight, CallContext, TokenId};

use crate::errors::{precondition, LedgerError, LedgerResult};
use crate::events::LedgerEvent;
use crate::holder::Holder;
use crate::params::ProtocolParams;
use crate::posat::{O10Status, VoteOfConfidence};

/// Domain separator for the custody address
const CUSTODY_DOMAIN: &[u8] = b"TRUST_LEDGER_CUSTODY_V1";

/// Account holding every locked token of `asset`
///
/// The token's owner must be this address for rewards to be minted.
pub fn custody_address(asset: &TokenId) -> Address {
    let mut hasher = blake3::Hasher::new();
    hasher.update(CUSTODY_DOMAIN);
    hasher.update(asset.as_bytes());
    Address::new(*hasher.finalize().as_bytes())
}

/// Which delegated right an operation moves
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DelegationKind {
    Voting,
    PoSaT,
}

/// Ledger state
#[derive(Debug)]
pub struct GovernanceLedger<T> {
    pub(crate) token: T,
    pub(crate) custody: Address,
    pub(crate) params: ProtocolParams,
    pub(crate) cumulative_token_locked: Amount,
    pub(crate) holders: HashMap<Address, Holder>,

    // Delegation edges (from, to) -> amount
    pub(crate) voting_delegations: HashMap<(Address, Address), Amount>,
    pub(crate) posat_delegations: HashMap<(Address, Address), Amount>,

    // O10 and votes of confidence
    pub(crate) o10: HashMap<Address, O10Status>,
    pub(crate) votes: HashMap<(Address, Address), VoteOfConfidence>,
    /// Trustee -> voters in voting order; revoked votes leave `None`
    pub(crate) voters: HashMap<Address, Vec<Option<Address>>>,

    // O5 channel
    pub(crate) vetoed: HashSet<Address>,
    pub(crate) consumed_nonces: HashSet<[u8; 32]>,
    pub(crate) dissolved: bool,

    pub(crate) events: Vec<LedgerEvent>,
}

impl<T: TokenLedger> GovernanceLedger<T> {
    /// Create a ledger over `token`
    pub fn new(token: T, params: ProtocolParams) -> LedgerResult<Self> {
        params.validate()?;

        let custody = custody_address(&token.asset());
        if token.owner() != custody {
            warn!(
                "Token {} is owned by {}, not the ledger custody {}; rewards cannot be minted",
                token.asset(),
                token.owner(),
                custody
            );
        }

        info!("Governance ledger created: custody={}", custody);
        Ok(Self {
            token,
            custody,
            params,
            cumulative_token_locked: 0,
            holders: HashMap::new(),
            voting_delegations: HashMap::new(),
            posat_delegations: HashMap::new(),
            o10: HashMap::new(),
            votes: HashMap::new(),
            voters: HashMap::new(),
            vetoed: HashSet::new(),
            consumed_nonces: HashSet::new(),
            dissolved: false,
            events: Vec::new(),
        })
    }

    pub(crate) fn ensure_active(&self) -> LedgerResult<()> {
        if self.dissolved {
            return Err(LedgerError::Terminal);
        }
        Ok(())
    }

    // =========================================================================
    // Token lock
    // =========================================================================

    /// Move `amount` from the caller into custody and credit it
    pub fn lock_tokens(&mut self, ctx: &CallContext, amount: Amount) -> LedgerResult<()> {
        self.ensure_active()?;
        if amount == 0 {
            return Err(precondition("amount must be positive"));
        }
        let holder = self.credited(&ctx.caller, amount)?;

        self.token.transfer(ctx.caller, self.custody, amount)?;
        self.commit_deposit(ctx.caller, holder, amount, ctx.height);
        Ok(())
    }

    /// Deposit hook, run by the token ledger after funds reached custody
    pub fn on_tokens_received(
        &mut self,
        asset: TokenId,
        from: Address,
        amount: Amount,
        height: BlockHeight,
    ) -> LedgerResult<()> {
        self.ensure_active()?;
        let expected = self.token.asset();
        if asset != expected {
            return Err(LedgerError::WrongAsset { expected, got: asset });
        }
        if amount == 0 {
            return Err(precondition("amount must be positive"));
        }

        let backing = self.token.balance_of(&self.custody);
        let required = self
            .cumulative_token_locked
            .checked_add(amount)
            .ok_or(LedgerError::Overflow)?;
        if backing < required {
            return Err(LedgerError::Unauthorized(format!(
                "deposit of {} is not backed by custody balance {}",
                amount, backing
            )));
        }

        let holder = self.credited(&from, amount)?;
        self.commit_deposit(from, holder, amount, height);
        Ok(())
    }

    fn credited(&self, who: &Address, amount: Amount) -> LedgerResult<Holder> {
        self.cumulative_token_locked
            .checked_add(amount)
            .ok_or(LedgerError::Overflow)?;
        let mut holder = self.holder(who);
        holder.tokens_locked = holder
            .tokens_locked
            .checked_add(amount)
            .ok_or(LedgerError::Overflow)?;
        Ok(holder)
    }

    fn commit_deposit(&mut self, who: Address, holder: Holder, amount: Amount, height: BlockHeight) {
        self.holders.insert(who, holder);
        self.cumulative_token_locked += amount;

        info!("Locked {} tokens for {} (total locked {})", amount, who, self.cumulative_token_locked);
        self.events.push(LedgerEvent::TokensLocked {
            holder: who,
            amount,
            block_height: height,
        });
    }

    /// Return locked tokens to the caller
    ///
    /// Fails unless the remaining tokens still cover everything delegated
    /// out and every locked PoSaT credit.
    pub fn withdraw_tokens(&mut self, ctx: &CallContext, amount: Amount) -> LedgerResult<()> {
        self.ensure_active()?;
        if amount == 0 {
            return Err(precondition("amount must be positive"));
        }

        let mut holder = self.holder(&ctx.caller);
        let have = holder.withdrawable();
        if have < amount {
            return Err(LedgerError::InsufficientBalance { have, need: amount });
        }
        holder.tokens_locked -= amount;

        self.token.transfer(self.custody, ctx.caller, amount)?;

        self.holders.insert(ctx.caller, holder);
        self.cumulative_token_locked -= amount;

        info!("Unlocked {} tokens for {}", amount, ctx.caller);
        self.events.push(LedgerEvent::TokensUnlocked {
            holder: ctx.caller,
            amount,
            block_height: ctx.height,
        });
        Ok(())
    }

    // =========================================================================
    // Delegation
    // =========================================================================

    /// Delegate own voting rights to `to`
    pub fn delegate_voting_rights(&mut self, ctx: &CallContext, to: Address, amount: Amount) -> LedgerResult<()> {
        self.delegate(ctx, to, amount, DelegationKind::Voting)
    }

    /// Take back voting rights delegated to `to`
    pub fn withdraw_delegated_voting_rights(
        &mut self,
        ctx: &CallContext,
        to: Address,
        amount: Amount,
    ) -> LedgerResult<()> {
        self.undelegate(ctx, to, amount, DelegationKind::Voting)
    }

    /// Delegate own available PoSaT credits to `to`
    pub fn delegate_posat(&mut self, ctx: &CallContext, to: Address, amount: Amount) -> LedgerResult<()> {
        self.delegate(ctx, to, amount, DelegationKind::PoSaT)
    }

    /// Take back PoSaT credits delegated to `to`
    ///
    /// The delegate must not have locked the credits being taken back.
    pub fn withdraw_delegated_posat(&mut self, ctx: &CallContext, to: Address, amount: Amount) -> LedgerResult<()> {
        self.undelegate(ctx, to, amount, DelegationKind::PoSaT)
    }

    fn check_delegation_target(ctx: &CallContext, to: &Address, amount: Amount) -> LedgerResult<()> {
        if amount == 0 {
            return Err(precondition("amount must be positive"));
        }
        if to.is_zero() {
            return Err(precondition("cannot delegate to the zero address"));
        }
        if *to == ctx.caller {
            return Err(precondition("cannot delegate to self"));
        }
        Ok(())
    }

    fn delegate(&mut self, ctx: &CallContext, to: Address, amount: Amount, kind: DelegationKind) -> LedgerResult<()> {
        self.ensure_active()?;
        Self::check_delegation_target(ctx, &to, amount)?;

        let mut from_holder = self.holder(&ctx.caller);
        let mut to_holder = self.holder(&to);
        let key = (ctx.caller, to);

        let have = match kind {
            DelegationKind::Voting => from_holder.delegatable_voting(),
            DelegationKind::PoSaT => from_holder.delegatable_posat(),
        };
        if have < amount {
            return Err(LedgerError::InsufficientBalance { have, need: amount });
        }

        let edge = self.edges(kind).get(&key).copied().unwrap_or(0);
        let edge = edge.checked_add(amount).ok_or(LedgerError::Overflow)?;
        match kind {
            DelegationKind::Voting => {
                from_holder.delegated_out_voting += amount;
                to_holder.received_voting = to_holder
                    .received_voting
                    .checked_add(amount)
                    .ok_or(LedgerError::Overflow)?;
            }
            DelegationKind::PoSaT => {
                from_holder.delegated_out_posat += amount;
                to_holder.received_posat = to_holder
                    .received_posat
                    .checked_add(amount)
                    .ok_or(LedgerError::Overflow)?;
            }
        }

        self.edges_mut(kind).insert(key, edge);
        self.holders.insert(ctx.caller, from_holder);
        self.holders.insert(to, to_holder);

        info!("{} delegated {} {:?} to {}", ctx.caller, amount, kind, to);
        self.events.push(match kind {
            DelegationKind::Voting => LedgerEvent::VotingRightsDelegated { from: ctx.caller, to, amount },
            DelegationKind::PoSaT => LedgerEvent::PoSaTDelegated { from: ctx.caller, to, amount },
        });
        Ok(())
    }

    fn undelegate(&mut self, ctx: &CallContext, to: Address, amount: Amount, kind: DelegationKind) -> LedgerResult<()> {
        self.ensure_active()?;
        Self::check_delegation_target(ctx, &to, amount)?;

        let key = (ctx.caller, to);
        let edge = self.edges(kind).get(&key).copied().unwrap_or(0);
        if edge < amount {
            return Err(LedgerError::InsufficientBalance { have: edge, need: amount });
        }

        let mut from_holder = self.holder(&ctx.caller);
        let mut to_holder = self.holder(&to);
        match kind {
            DelegationKind::Voting => {
                from_holder.delegated_out_voting -= amount;
                to_holder.received_voting -= amount;
            }
            DelegationKind::PoSaT => {
                let have = to_holder.available_posat();
                if have < amount {
                    debug!("Delegate {} has only {} unlocked PoSaT", to, have);
                    return Err(LedgerError::InsufficientBalance { have, need: amount });
                }
                from_holder.delegated_out_posat -= amount;
                to_holder.received_posat -= amount;
            }
        }

        let remaining = edge - amount;
        if remaining == 0 {
            self.edges_mut(kind).remove(&key);
        } else {
            self.edges_mut(kind).insert(key, remaining);
        }
        self.holders.insert(ctx.caller, from_holder);
        self.holders.insert(to, to_holder);

        info!("{} withdrew {} {:?} delegated to {}", ctx.caller, amount, kind, to);
        self.events.push(match kind {
            DelegationKind::Voting => LedgerEvent::VotingRightsDelegationWithdrawn { from: ctx.caller, to, amount },
            DelegationKind::PoSaT => LedgerEvent::PoSaTDelegationWithdrawn { from: ctx.caller, to, amount },
        });
        Ok(())
    }

    fn edges(&self, kind: DelegationKind) -> &HashMap<(Address, Address), Amount> {
        match kind {
            DelegationKind::Voting => &self.voting_delegations,
            DelegationKind::PoSaT => &self.posat_delegations,
        }
    }

    fn edges_mut(&mut self, kind: DelegationKind) -> &mut HashMap<(Address, Address), Amount> {
        match kind {
            DelegationKind::Voting => &mut self.voting_delegations,
            DelegationKind::PoSaT => &mut self.posat_delegations,
        }
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Balances of `who` (all zero if never seen)
    pub fn holder(&self, who: &Address) -> Holder {
        self.holders.get(who).copied().unwrap_or_default()
    }

    pub fn tokens_locked(&self, who: &Address) -> Amount {
        self.holder(who).tokens_locked
    }

    /// Net voting rights
    pub fn voting_rights(&self, who: &Address) -> Amount {
        self.holder(who).voting_rights()
    }

    pub fn available_posat(&self, who: &Address) -> Amount {
        self.holder(who).available_posat()
    }

    pub fn locked_posat(&self, who: &Address) -> Amount {
        self.holder(who).posat_locked
    }

    /// Voting rights `from` has delegated to `to`
    pub fn delegated_voting_rights(&self, from: &Address, to: &Address) -> Amount {
        self.voting_delegations.get(&(*from, *to)).copied().unwrap_or(0)
    }

    /// PoSaT credits `from` has delegated to `to`
    pub fn delegated_posat(&self, from: &Address, to: &Address) -> Amount {
        self.posat_delegations.get(&(*from, *to)).copied().unwrap_or(0)
    }

    /// Sum of all tokens currently locked
    pub fn cumulative_token_locked(&self) -> Amount {
        self.cumulative_token_locked
    }

    pub fn params(&self) -> &ProtocolParams {
        &self.params
    }

    pub fn custody(&self) -> Address {
        self.custody
    }

    pub fn token(&self) -> &T {
        &self.token
    }

    /// Direct access to the token ledger for transfers between accounts.
    /// Funds sent to custody this way are not credited to anyone.
    pub fn token_mut(&mut self) -> &mut T {
        &mut self.token
    }

    pub fn is_dissolved(&self) -> bool {
        self.dissolved
    }

    pub fn is_vetoed(&self, who: &Address) -> bool {
        self.vetoed.contains(who)
    }

    /// Whether an O5 nonce has been consumed
    pub fn is_seed_used(&self, nonce: &[u8; 32]) -> bool {
        self.consumed_nonces.contains(nonce)
    }

    /// Take all events emitted since the last drain
    pub fn drain_events(&mut self) -> Vec<LedgerEvent> {
        std::mem::take(&mut self.events)
    }
}

impl<T: TokenLedger> TokenRecipient for GovernanceLedger<T> {
    fn tokens_received(
        &mut self,
        asset: TokenId,
        from: Address,
        amount: Amount,
        height: BlockHeight,
    ) -> Result<(), String> {
        self.on_tokens_received(asset, from, amount, height)
            .map_err(|e| e.to_string())
    }
}
