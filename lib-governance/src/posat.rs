//! Proof of Stake and Trust
//!
//! An address becomes an O10 by locking the O10 requirement of its
//! available PoSaT credits. An O10 vouches for another address with a vote
//! of confidence, locking the VoC requirement per vote. Votes on ring 2
//! targets earn a minted reward per full cycle of the PoSaT block
//! requirement, and the combined credits of a target's voters may lift it
//! to ring 1.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use lib_tokens::TokenLedger;
use lib_trust::IdentityAuthority;
use lib_types::{Address, Amount, BlockHeight, CallContext, Percent, Ring};

use crate::errors::{precondition, LedgerError, LedgerResult};
use crate::events::LedgerEvent;
use crate::ledger::GovernanceLedger;

/// Standing of an active O10
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct O10Status {
    /// PoSaT locked at authorization, released on deauthorization
    pub reserve: Amount,
    pub since: BlockHeight,
    /// Votes of confidence currently cast
    pub active_votes: u64,
}

/// A vote of confidence edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteOfConfidence {
    /// PoSaT locked for this vote
    pub locked: Amount,
    pub since: BlockHeight,
    /// Block from which the next reward cycle is counted
    pub checkpoint: BlockHeight,
}

/// Ring of an address given its registry ring and endorsement
///
/// Vetoed addresses are ring 4. A ring 2 address whose endorsement is at
/// least `threshold` percent of all locked tokens is ring 1.
pub fn derive_ring(
    vetoed: bool,
    registry_ring: Ring,
    endorsement: Amount,
    threshold: Percent,
    cumulative_token_locked: Amount,
) -> Ring {
    if vetoed {
        return Ring::Four;
    }
    if registry_ring == Ring::Two
        && endorsement.saturating_mul(100) >= threshold.saturating_mul(cumulative_token_locked)
    {
        return Ring::One;
    }
    registry_ring
}

impl<T: TokenLedger> GovernanceLedger<T> {
    // =========================================================================
    // O10
    // =========================================================================

    /// Become an O10 by locking the O10 requirement
    pub fn o10_authorize(&mut self, ctx: &CallContext) -> LedgerResult<()> {
        self.ensure_active()?;
        if self.o10.contains_key(&ctx.caller) {
            return Err(precondition("already an active O10"));
        }

        let reserve = self.params.o10_requirement;
        let mut holder = self.holder(&ctx.caller);
        holder.lock_posat(reserve)?;

        self.holders.insert(ctx.caller, holder);
        self.o10.insert(
            ctx.caller,
            O10Status {
                reserve,
                since: ctx.height,
                active_votes: 0,
            },
        );

        info!("{} authorized as O10 with reserve {}", ctx.caller, reserve);
        self.events.push(LedgerEvent::O10Authorized {
            holder: ctx.caller,
            reserve,
            block_height: ctx.height,
        });
        Ok(())
    }

    /// Stop being an O10 and release the reserve
    ///
    /// Every vote of confidence must be revoked first.
    pub fn o10_deauthorize(&mut self, ctx: &CallContext) -> LedgerResult<()> {
        self.ensure_active()?;
        let status = self.active_o10(&ctx.caller)?;
        if status.active_votes > 0 {
            return Err(precondition(format!(
                "{} votes of confidence are still active",
                status.active_votes
            )));
        }

        let mut holder = self.holder(&ctx.caller);
        holder.unlock_posat(status.reserve)?;

        self.holders.insert(ctx.caller, holder);
        self.o10.remove(&ctx.caller);

        info!("{} deauthorized as O10", ctx.caller);
        self.events.push(LedgerEvent::O10Deauthorized {
            holder: ctx.caller,
            released: status.reserve,
            block_height: ctx.height,
        });
        Ok(())
    }

    fn active_o10(&self, who: &Address) -> LedgerResult<O10Status> {
        self.o10
            .get(who)
            .copied()
            .ok_or_else(|| precondition("caller is not an active O10"))
    }

    fn ensure_not_vetoed(&self, target: &Address) -> LedgerResult<()> {
        if self.vetoed.contains(target) {
            return Err(precondition(format!("{} has been vetoed", target)));
        }
        Ok(())
    }

    // =========================================================================
    // Votes of confidence
    // =========================================================================

    /// Vouch for `target`, locking the VoC requirement
    pub fn o10_vote_confidence(&mut self, ctx: &CallContext, target: Address) -> LedgerResult<()> {
        self.ensure_active()?;
        let mut status = self.active_o10(&ctx.caller)?;
        if target.is_zero() {
            return Err(precondition("cannot vote for the zero address"));
        }
        self.ensure_not_vetoed(&target)?;
        let key = (ctx.caller, target);
        if self.votes.contains_key(&key) {
            return Err(precondition("vote of confidence already cast"));
        }

        let locked = self.params.voc_requirement;
        let mut holder = self.holder(&ctx.caller);
        holder.lock_posat(locked)?;
        status.active_votes += 1;

        self.holders.insert(ctx.caller, holder);
        self.o10.insert(ctx.caller, status);
        self.votes.insert(
            key,
            VoteOfConfidence {
                locked,
                since: ctx.height,
                checkpoint: ctx.height,
            },
        );
        self.voters.entry(target).or_default().push(Some(ctx.caller));

        info!("{} cast a vote of confidence for {}", ctx.caller, target);
        self.events.push(LedgerEvent::VoteOfConfidence {
            truster: ctx.caller,
            trustee: target,
            locked,
            block_height: ctx.height,
        });
        Ok(())
    }

    /// Withdraw a vote of confidence and release its lock
    pub fn o10_revoke_vote(&mut self, ctx: &CallContext, target: Address) -> LedgerResult<()> {
        self.ensure_active()?;
        let mut status = self.active_o10(&ctx.caller)?;
        self.ensure_not_vetoed(&target)?;
        let key = (ctx.caller, target);
        let vote = self
            .votes
            .get(&key)
            .copied()
            .ok_or_else(|| precondition("no vote of confidence to revoke"))?;

        let mut holder = self.holder(&ctx.caller);
        holder.unlock_posat(vote.locked)?;
        status.active_votes -= 1;

        self.holders.insert(ctx.caller, holder);
        self.o10.insert(ctx.caller, status);
        self.votes.remove(&key);
        if let Some(list) = self.voters.get_mut(&target) {
            if let Some(slot) = list.iter_mut().find(|slot| **slot == Some(ctx.caller)) {
                *slot = None;
            }
        }

        info!("{} revoked the vote of confidence for {}", ctx.caller, target);
        self.events.push(LedgerEvent::VoteRevoked {
            truster: ctx.caller,
            trustee: target,
            released: vote.locked,
            block_height: ctx.height,
        });
        Ok(())
    }

    // =========================================================================
    // Rewards
    // =========================================================================

    /// Claim the reward for every full cycle the vote on `target` has
    /// stood while the target held ring 2
    ///
    /// Returns the minted amount.
    pub fn o10_get_reward<A>(&mut self, ctx: &CallContext, target: Address, authority: &A) -> LedgerResult<Amount>
    where
        A: IdentityAuthority + ?Sized,
    {
        self.ensure_active()?;
        self.active_o10(&ctx.caller)?;
        let key = (ctx.caller, target);
        let mut vote = self
            .votes
            .get(&key)
            .copied()
            .ok_or_else(|| precondition("no vote of confidence on target"))?;
        self.ensure_not_vetoed(&target)?;

        let identity = authority.status(&target, ctx.height);
        if identity.ring != Ring::Two {
            return Err(precondition(format!("target is {}, not ring 2", identity.ring)));
        }

        let requirement = self.params.posat_block_requirement;
        let since_issue = ctx.height.saturating_sub(identity.issued_at);
        let since_checkpoint = ctx.height.saturating_sub(vote.checkpoint);
        if since_issue < requirement || since_checkpoint < requirement {
            debug!(
                "Reward not due: {} blocks since issue, {} since checkpoint, {} required",
                since_issue, since_checkpoint, requirement
            );
            return Err(precondition("reward cycle not complete"));
        }

        let cycles = since_issue.min(since_checkpoint) / requirement;
        let amount = (cycles as Amount)
            .checked_mul(self.params.voc_requirement)
            .and_then(|v| v.checked_mul(self.params.posat_reward_rate))
            .ok_or(LedgerError::Overflow)?
            / 100;
        vote.checkpoint = vote
            .checkpoint
            .checked_add(cycles * requirement)
            .ok_or(LedgerError::Overflow)?;

        if amount > 0 {
            self.token.mint(self.custody, ctx.caller, amount)?;
        }
        self.votes.insert(key, vote);

        info!(
            "{} rewarded {} for {} cycles of confidence in {}",
            ctx.caller, amount, cycles, target
        );
        self.events.push(LedgerEvent::RewardGranted {
            truster: ctx.caller,
            trustee: target,
            cycles,
            amount,
            block_height: ctx.height,
        });
        Ok(amount)
    }

    // =========================================================================
    // Reads
    // =========================================================================

    pub fn o10_status(&self, who: &Address) -> Option<O10Status> {
        self.o10.get(who).copied()
    }

    pub fn is_o10(&self, who: &Address) -> bool {
        self.o10.contains_key(who)
    }

    /// Votes of confidence `who` currently has cast
    pub fn active_vote_count(&self, who: &Address) -> u64 {
        self.o10.get(who).map(|s| s.active_votes).unwrap_or(0)
    }

    pub fn vote(&self, truster: &Address, trustee: &Address) -> Option<VoteOfConfidence> {
        self.votes.get(&(*truster, *trustee)).copied()
    }

    /// Everyone who ever voted for `trustee`, in order; revoked votes are `None`
    pub fn voters(&self, trustee: &Address) -> &[Option<Address>] {
        self.voters.get(trustee).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Total PoSaT credits held by the active voters of `target`
    pub fn endorsement(&self, target: &Address) -> Amount {
        self.voters(target)
            .iter()
            .flatten()
            .map(|voter| self.holder(voter).posat_held())
            .fold(0, Amount::saturating_add)
    }

    /// Ring of `who` at `now`, as seen through `authority`
    pub fn current_ring<A>(&self, who: &Address, now: BlockHeight, authority: &A) -> Ring
    where
        A: IdentityAuthority + ?Sized,
    {
        derive_ring(
            self.is_vetoed(who),
            authority.status(who, now).ring,
            self.endorsement(who),
            self.params.ring_one_requirement,
            self.cumulative_token_locked,
        )
    }
}
