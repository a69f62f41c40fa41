//! Trust Registry
//!
//! Grants addresses rings 3 and 2.
//!
//! # Lifecycle
//!
//! 1. `declare_ring_three`: self-declaration, always accepted
//! 2. `declare_ring_two`: record the domain the address controls
//! 3. `init_challenge`: anyone opens a challenge against the target
//! 4. `solve_challenge`: pay the oracle, which fetches asynchronously
//! 5. `resolve_challenge`: the oracle's callback grants or denies ring 2
//!
//! Expiry is lazy: a grant whose expiry block has been reached simply
//! reads as ring 3.

use std::collections::HashMap;

use tracing::{debug, info, warn};

use lib_types::{Address, Amount, BlockHeight, CallContext, ChallengeId};

use crate::challenge::{derive_challenge_id, Challenge, ChallengeArtifact, ChallengeState};
use crate::config::TrustConfig;
use crate::errors::{TrustError, TrustResult};
use crate::events::TrustEvent;
use crate::oracle::{DomainOracle, FetchRequest};
use crate::record::{Declaration, IdentityAuthority, IdentityRecord, IdentityStatus, RingTwoGrant};

/// Registry state
#[derive(Debug)]
pub struct TrustRegistry<O> {
    config: TrustConfig,
    oracle: O,
    records: HashMap<Address, IdentityRecord>,
    challenges: HashMap<ChallengeId, Challenge>,
    /// Number of challenges ever created
    challenge_counter: u64,
    events: Vec<TrustEvent>,
}

impl<O: DomainOracle> TrustRegistry<O> {
    /// Create an empty registry
    pub fn new(config: TrustConfig, oracle: O) -> TrustResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            oracle,
            records: HashMap::new(),
            challenges: HashMap::new(),
            challenge_counter: 0,
            events: Vec::new(),
        })
    }

    // =========================================================================
    // Declarations
    // =========================================================================

    /// Ring 3 self-declaration
    ///
    /// Always succeeds. Replaces any earlier declaration and wipes ring 2
    /// state, including the declared domain.
    pub fn declare_ring_three(&mut self, ctx: &CallContext, declaration: Declaration) -> TrustResult<()> {
        let record = self.records.entry(ctx.caller).or_default();
        record.declaration = Some(declaration.clone());
        record.domain = None;
        record.reset_ring_two();

        info!("Ring 3 declared by {}", ctx.caller);
        self.events.push(TrustEvent::RingThreeDeclared {
            address: ctx.caller,
            name: declaration.name,
            email: declaration.email,
            phone: declaration.phone,
            info: declaration.info,
            block_height: ctx.height,
        });
        Ok(())
    }

    /// Declare the domain used for ring 2
    ///
    /// Requires a ring 3 declaration. Always drops back to ring 3, even if
    /// a live grant exists: the domain has to be proven again.
    pub fn declare_ring_two(&mut self, ctx: &CallContext, domain: String) -> TrustResult<()> {
        if domain.is_empty() {
            return Err(TrustError::PreconditionFailed("domain must not be empty".to_string()));
        }

        let record = self
            .records
            .get_mut(&ctx.caller)
            .filter(|record| record.declaration.is_some())
            .ok_or_else(|| {
                TrustError::PreconditionFailed(
                    "ring 3 validation is required before ring 2 validation".to_string(),
                )
            })?;

        record.domain = Some(domain.clone());
        record.reset_ring_two();

        info!("Ring 2 domain {} declared by {}", domain, ctx.caller);
        self.events.push(TrustEvent::RingTwoDeclared {
            address: ctx.caller,
            domain,
            block_height: ctx.height,
        });
        Ok(())
    }

    // =========================================================================
    // Challenges
    // =========================================================================

    /// Open a challenge against `target`
    ///
    /// Anyone may open one. The target must have declared a domain.
    pub fn init_challenge(&mut self, ctx: &CallContext, target: Address) -> TrustResult<ChallengeId> {
        let record = self.records.get(&target).ok_or_else(|| {
            TrustError::PreconditionFailed("target has not completed ring 2 declaration".to_string())
        })?;
        let domain = record.domain.clone().ok_or_else(|| {
            TrustError::PreconditionFailed("target has not completed ring 2 declaration".to_string())
        })?;
        let epoch = record.epoch;

        let id = derive_challenge_id(&target, &ctx.caller, ctx.height, self.challenge_counter);
        let next_counter = self
            .challenge_counter
            .checked_add(1)
            .ok_or_else(|| TrustError::PreconditionFailed("challenge counter exhausted".to_string()))?;

        self.challenges.insert(
            id,
            Challenge {
                id,
                target,
                domain,
                requester: ctx.caller,
                created_at: ctx.height,
                epoch,
                state: ChallengeState::Pending,
            },
        );
        self.challenge_counter = next_counter;

        info!("Challenge {} opened by {} against {}", id, ctx.caller, target);
        self.events.push(TrustEvent::ChallengeInitiated {
            challenge_id: id,
            target,
            requester: ctx.caller,
            block_height: ctx.height,
        });
        Ok(id)
    }

    /// Pay for and request the fetch of a challenge artifact
    ///
    /// Returns as soon as the oracle has the request. The result arrives
    /// later through [`Self::resolve_challenge`], or never.
    pub fn solve_challenge(
        &mut self,
        ctx: &CallContext,
        id: ChallengeId,
        fee: Amount,
        gas_price: Amount,
    ) -> TrustResult<()> {
        let challenge = self.challenges.get(&id).ok_or(TrustError::NotFound(id))?;

        match challenge.state {
            ChallengeState::Pending => {}
            ChallengeState::Requested { .. } => {
                return Err(TrustError::PreconditionFailed(
                    "a fetch for this challenge is already in flight".to_string(),
                ))
            }
            ChallengeState::Resolved { .. } => {
                return Err(TrustError::PreconditionFailed(
                    "challenge was already resolved".to_string(),
                ))
            }
        }

        let required = self.oracle.quote(gas_price);
        if fee < required {
            return Err(TrustError::InsufficientPayment { paid: fee, required });
        }

        let url = challenge.artifact_url();
        self.oracle.request_fetch(FetchRequest {
            challenge_id: id,
            url: url.clone(),
        })?;

        if let Some(challenge) = self.challenges.get_mut(&id) {
            challenge.state = ChallengeState::Requested { at: ctx.height };
        }

        info!("Challenge {} fetch requested: {}", id, url);
        self.events.push(TrustEvent::ChallengeRequested {
            challenge_id: id,
            url,
            fee,
            block_height: ctx.height,
        });
        Ok(())
    }

    /// Oracle callback
    ///
    /// Runs exactly once per challenge. Returns whether ring 2 was granted.
    /// A fetch that failed (`body == None`) or returned anything other than
    /// the expected content leaves the target at ring 3.
    pub fn resolve_challenge(
        &mut self,
        ctx: &CallContext,
        id: ChallengeId,
        body: Option<&str>,
    ) -> TrustResult<bool> {
        if ctx.caller != self.oracle.callback_address() {
            warn!("Rejected challenge callback from {}", ctx.caller);
            return Err(TrustError::Unauthorized(format!(
                "{} is not the oracle callback address",
                ctx.caller
            )));
        }

        let challenge = self.challenges.get(&id).ok_or(TrustError::NotFound(id))?;
        match challenge.state {
            ChallengeState::Requested { .. } => {}
            ChallengeState::Resolved { .. } => return Err(TrustError::Replay(id)),
            ChallengeState::Pending => {
                return Err(TrustError::PreconditionFailed(
                    "no fetch was requested for this challenge".to_string(),
                ))
            }
        }

        let target = challenge.target;
        let domain = challenge.domain.clone();
        let content_matches = body == Some(challenge.expected_content().as_str());
        let current_epoch = self.records.get(&target).map(|r| r.epoch);
        let successful = content_matches && current_epoch == Some(challenge.epoch);

        if content_matches && !successful {
            debug!("Challenge {} is stale: {} redeclared since it was opened", id, target);
        }

        let mut expiration = 0;
        if successful {
            let validity = self.config.ring_two_validity_period;
            if let Some(record) = self.records.get_mut(&target) {
                // Renewal before expiry keeps the original issue block
                let issued_at = record
                    .valid_grant(ctx.height)
                    .map(|grant| grant.issued_at)
                    .unwrap_or(ctx.height);
                expiration = ctx.height.saturating_add(validity);
                record.grant = Some(RingTwoGrant {
                    issued_at,
                    expires_at: expiration,
                });
            }
        }

        if let Some(challenge) = self.challenges.get_mut(&id) {
            challenge.state = ChallengeState::Resolved {
                successful,
                at: ctx.height,
            };
        }

        if successful {
            info!("Challenge {} succeeded: {} holds ring 2 until block {}", id, target, expiration);
        } else {
            info!("Challenge {} failed for {}", id, target);
        }
        self.events.push(TrustEvent::ChallengeResolved {
            challenge_id: id,
            target,
            domain,
            expiration,
            successful,
            block_height: ctx.height,
        });
        Ok(successful)
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Artifact URL and expected content of a challenge
    pub fn challenge(&self, id: &ChallengeId) -> TrustResult<ChallengeArtifact> {
        let challenge = self.challenges.get(id).ok_or(TrustError::NotFound(*id))?;
        Ok(ChallengeArtifact {
            url: challenge.artifact_url(),
            expected: challenge.expected_content(),
        })
    }

    /// Full challenge record
    pub fn challenge_record(&self, id: &ChallengeId) -> Option<&Challenge> {
        self.challenges.get(id)
    }

    /// Identity record of an address
    pub fn record(&self, address: &Address) -> Option<&IdentityRecord> {
        self.records.get(address)
    }

    /// Oracle cost at `gas_price`
    pub fn oracle_cost(&self, gas_price: Amount) -> Amount {
        self.oracle.quote(gas_price)
    }

    pub fn ring_two_validity_period(&self) -> BlockHeight {
        self.config.ring_two_validity_period
    }

    pub fn oracle(&self) -> &O {
        &self.oracle
    }

    pub fn oracle_mut(&mut self) -> &mut O {
        &mut self.oracle
    }

    /// Take all events emitted since the last drain
    pub fn drain_events(&mut self) -> Vec<TrustEvent> {
        std::mem::take(&mut self.events)
    }
}

impl<O> IdentityAuthority for TrustRegistry<O> {
    fn status(&self, address: &Address, now: BlockHeight) -> IdentityStatus {
        self.records
            .get(address)
            .map(|record| IdentityStatus::of(record, now))
            .unwrap_or_else(IdentityStatus::unknown)
    }
}
