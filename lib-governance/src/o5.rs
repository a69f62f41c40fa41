//! O5 Multisig Channel
//!
//! Holders controlling a strict majority of all locked voting rights can
//! amend protocol parameters, veto an address, or dissolve the ledger.
//!
//! # Rules
//!
//! 1. **Bounded life**: a command expires after `block_expiry`
//! 2. **Single use**: each nonce executes at most once
//! 3. **Bound signatures**: signers sign a hash over the custody address,
//!    function signature, amended value, expiry and nonce
//! 4. **Majority**: distinct signers must hold more than half of the
//!    cumulative locked tokens in net voting rights
//! 5. **All or nothing**: a command that fails validation consumes nothing

use std::collections::HashSet;

use ed25519_dalek::{Signature, Signer, SigningKey, VerifyingKey};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use lib_tokens::TokenLedger;
use lib_types::{Address, Amount, CallContext};

use crate::errors::{precondition, LedgerError, LedgerResult};
use crate::events::LedgerEvent;
use crate::ledger::GovernanceLedger;
use crate::params::ProtocolParam;

/// Domain separator for the command binding hash
const O5_DOMAIN: &[u8] = b"TRUST_LEDGER_O5_V1";

/// Most signatures a command may carry
pub const MAX_O5_SIGNATURES: usize = 5;

pub const O5_VOTE_NO_CONFIDENCE: &str = "O5VoteNoConfidence";
pub const O5_DISSOLVE: &str = "O5DissolveDAO";

// =============================================================================
// COMMAND
// =============================================================================

/// One signer's approval
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct O5Signature {
    #[serde(with = "hex::serde")]
    pub public_key: [u8; 32],
    #[serde(with = "hex::serde")]
    pub signature: Vec<u8>,
}

impl O5Signature {
    /// Sign a binding hash with `key`
    pub fn sign(key: &SigningKey, digest: &[u8; 32]) -> Self {
        Self {
            public_key: key.verifying_key().to_bytes(),
            signature: key.sign(digest).to_bytes().to_vec(),
        }
    }
}

/// A signed O5 command
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct O5Command {
    /// Last block at which the command may execute
    pub block_expiry: u64,
    #[serde(with = "hex::serde")]
    pub nonce: [u8; 32],
    pub signatures: Vec<O5Signature>,
    pub function_signature: String,
    /// 32-byte big-endian argument: an amount or an address
    #[serde(with = "hex::serde")]
    pub amended_value: [u8; 32],
}

impl O5Command {
    /// Unsigned command
    pub fn new(function_signature: impl Into<String>, amended_value: [u8; 32], block_expiry: u64, nonce: [u8; 32]) -> Self {
        Self {
            block_expiry,
            nonce,
            signatures: Vec::new(),
            function_signature: function_signature.into(),
            amended_value,
        }
    }

    /// Command amending `param` to `value`
    pub fn modify(param: ProtocolParam, value: u128, block_expiry: u64, nonce: [u8; 32]) -> Self {
        Self::new(param.o5_signature(), encode_amount(value), block_expiry, nonce)
    }

    /// Command vetoing `target`
    pub fn vote_no_confidence(target: Address, block_expiry: u64, nonce: [u8; 32]) -> Self {
        Self::new(O5_VOTE_NO_CONFIDENCE, target.0, block_expiry, nonce)
    }

    /// Command dissolving the ledger
    pub fn dissolve(block_expiry: u64, nonce: [u8; 32]) -> Self {
        Self::new(O5_DISSOLVE, [0u8; 32], block_expiry, nonce)
    }

    /// Hash every signer signs, bound to one ledger by its custody address
    pub fn binding_hash(&self, custody: &Address) -> [u8; 32] {
        let mut hasher = blake3::Hasher::new();
        hasher.update(O5_DOMAIN);
        hasher.update(custody.as_bytes());
        hasher.update(&(self.function_signature.len() as u32).to_le_bytes());
        hasher.update(self.function_signature.as_bytes());
        hasher.update(&self.amended_value);
        hasher.update(&self.block_expiry.to_le_bytes());
        hasher.update(&self.nonce);
        *hasher.finalize().as_bytes()
    }

    /// Add `key`'s signature
    pub fn sign(&mut self, key: &SigningKey, custody: &Address) {
        let digest = self.binding_hash(custody);
        self.signatures.push(O5Signature::sign(key, &digest));
    }
}

/// Encode an amount as a 32-byte big-endian value
pub fn encode_amount(value: u128) -> [u8; 32] {
    let mut out = [0u8; 32];
    out[16..].copy_from_slice(&value.to_be_bytes());
    out
}

/// Decode a 32-byte big-endian value that must fit an [`Amount`]
pub fn decode_amount(value: &[u8; 32]) -> LedgerResult<Amount> {
    if value[..16].iter().any(|b| *b != 0) {
        return Err(precondition("amended value does not fit an amount"));
    }
    let mut low = [0u8; 16];
    low.copy_from_slice(&value[16..]);
    Ok(u128::from_be_bytes(low))
}

/// What a command does once authorized
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum O5Action {
    Modify { param: ProtocolParam, value: u128 },
    VoteNoConfidence { target: Address },
    Dissolve,
    /// Accepted and authorized, but does nothing
    Unrecognized,
}

impl O5Action {
    /// Resolve and validate the command's function
    pub fn parse(function_signature: &str, amended_value: &[u8; 32]) -> LedgerResult<Self> {
        if let Some(param) = ProtocolParam::ALL
            .iter()
            .copied()
            .find(|p| p.o5_signature() == function_signature)
        {
            let value = decode_amount(amended_value)?;
            param.validate(value)?;
            return Ok(O5Action::Modify { param, value });
        }

        match function_signature {
            O5_VOTE_NO_CONFIDENCE => {
                let target = Address::new(*amended_value);
                if target.is_zero() {
                    return Err(precondition("cannot veto the zero address"));
                }
                Ok(O5Action::VoteNoConfidence { target })
            }
            O5_DISSOLVE => Ok(O5Action::Dissolve),
            _ => Ok(O5Action::Unrecognized),
        }
    }
}

// =============================================================================
// SIGNATURE RECOVERY
// =============================================================================

/// Host-supplied signature check
pub trait SignatureRecovery {
    /// Address that produced `signature` over `digest`, if valid
    fn recover(&self, digest: &[u8; 32], signature: &O5Signature) -> Option<Address>;
}

/// Ed25519 recovery: the signature must verify under the embedded key,
/// whose address is the signer
#[derive(Debug, Clone, Copy, Default)]
pub struct Ed25519Recovery;

impl SignatureRecovery for Ed25519Recovery {
    fn recover(&self, digest: &[u8; 32], signature: &O5Signature) -> Option<Address> {
        let key = VerifyingKey::from_bytes(&signature.public_key).ok()?;
        let sig = Signature::from_slice(&signature.signature).ok()?;
        key.verify_strict(digest, &sig).ok()?;
        Some(Address::from_public_key(&signature.public_key))
    }
}

// =============================================================================
// EXECUTION
// =============================================================================

impl<T: TokenLedger> GovernanceLedger<T> {
    /// Authorize and execute an O5 command
    ///
    /// Returns the executed action.
    pub fn execute_o5<R>(&mut self, ctx: &CallContext, command: &O5Command, recovery: &R) -> LedgerResult<O5Action>
    where
        R: SignatureRecovery + ?Sized,
    {
        self.ensure_active()?;
        if ctx.height > command.block_expiry {
            return Err(LedgerError::Expired {
                block_expiry: command.block_expiry,
                current_height: ctx.height,
            });
        }
        if self.consumed_nonces.contains(&command.nonce) {
            return Err(LedgerError::Replay(hex::encode(command.nonce)));
        }
        if command.signatures.len() > MAX_O5_SIGNATURES {
            return Err(precondition(format!(
                "{} signatures exceed the maximum of {}",
                command.signatures.len(),
                MAX_O5_SIGNATURES
            )));
        }

        let digest = command.binding_hash(&self.custody);
        let mut signers = Vec::new();
        let mut seen = HashSet::new();
        for signature in &command.signatures {
            match recovery.recover(&digest, signature) {
                Some(signer) if seen.insert(signer) => signers.push(signer),
                Some(signer) => debug!("Duplicate O5 signer {} ignored", signer),
                None => debug!("Invalid O5 signature dropped"),
            }
        }

        let cumulative_vote = signers
            .iter()
            .map(|s| self.voting_rights(s))
            .fold(0, Amount::saturating_add);
        if cumulative_vote.saturating_mul(2) <= self.cumulative_token_locked {
            warn!(
                "O5 {} lacks quorum: {} of {}",
                command.function_signature, cumulative_vote, self.cumulative_token_locked
            );
            return Err(LedgerError::InsufficientQuorum {
                cumulative: cumulative_vote,
                total_locked: self.cumulative_token_locked,
            });
        }

        let action = O5Action::parse(&command.function_signature, &command.amended_value)?;
        if action == O5Action::Dissolve {
            self.token.transfer_ownership(self.custody, ctx.caller)?;
        }

        self.consumed_nonces.insert(command.nonce);
        info!(
            "O5 {} authorized by {} signers with {} votes",
            command.function_signature,
            signers.len(),
            cumulative_vote
        );
        self.events.push(LedgerEvent::O5Authorized {
            function_signature: command.function_signature.clone(),
            cumulative_vote,
            signers,
            block_height: ctx.height,
        });

        match &action {
            O5Action::Modify { param, value } => {
                let old = self.params.set(*param, *value)?;
                info!("{} changed from {} to {}", param.description(), old, value);
                self.events.push(LedgerEvent::ParameterModified {
                    param: *param,
                    old,
                    new: *value,
                });
            }
            O5Action::VoteNoConfidence { target } => {
                self.vetoed.insert(*target);
                info!("{} vetoed by O5", target);
                self.events.push(LedgerEvent::NoConfidence { target: *target });
            }
            O5Action::Dissolve => {
                self.dissolved = true;
                info!("Ledger dissolved; token ownership passed to {}", ctx.caller);
                self.events.push(LedgerEvent::Dissolved {
                    submitter: ctx.caller,
                    block_height: ctx.height,
                });
            }
            O5Action::Unrecognized => {
                debug!("O5 function {} has no effect", command.function_signature);
            }
        }
        Ok(action)
    }

    /// Return the caller's locked tokens after dissolution
    pub fn dissolve_withdrawal(&mut self, ctx: &CallContext) -> LedgerResult<Amount> {
        if !self.dissolved {
            return Err(precondition("ledger has not been dissolved"));
        }

        let mut holder = self.holder(&ctx.caller);
        let amount = holder.tokens_locked;
        if amount == 0 {
            return Err(LedgerError::InsufficientBalance { have: 0, need: 1 });
        }
        holder.tokens_locked = 0;

        self.token.transfer(self.custody, ctx.caller, amount)?;

        self.holders.insert(ctx.caller, holder);
        self.cumulative_token_locked = self.cumulative_token_locked.saturating_sub(amount);

        info!("{} withdrew {} after dissolution", ctx.caller, amount);
        self.events.push(LedgerEvent::DissolutionWithdrawal {
            holder: ctx.caller,
            amount,
        });
        Ok(amount)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::tests::{create_test_ledger, ctx, ALICE, BOB, SUPPLY};
    use crate::params::ProtocolParams;
    use lib_types::TokenId;
    use rand::rngs::OsRng;

    fn signer() -> (SigningKey, Address) {
        let key = SigningKey::generate(&mut OsRng);
        let address = Address::from_public_key(&key.verifying_key().to_bytes());
        (key, address)
    }

    #[test]
    fn test_amount_encoding() {
        assert_eq!(decode_amount(&encode_amount(12345)).unwrap(), 12345);
        assert_eq!(decode_amount(&encode_amount(u128::MAX)).unwrap(), u128::MAX);

        let mut too_big = [0u8; 32];
        too_big[15] = 1;
        assert!(matches!(decode_amount(&too_big), Err(LedgerError::PreconditionFailed(_))));
    }

    #[test]
    fn test_parse_actions() {
        assert_eq!(
            O5Action::parse("O5ModifyPoSaTReward", &encode_amount(7)).unwrap(),
            O5Action::Modify { param: ProtocolParam::PoSaTReward, value: 7 }
        );
        assert_eq!(O5Action::parse("O5DissolveDAO", &[0u8; 32]).unwrap(), O5Action::Dissolve);
        assert_eq!(O5Action::parse("O5Unknown", &[0u8; 32]).unwrap(), O5Action::Unrecognized);
        assert!(O5Action::parse("O5ModifyRingOneRequirement", &encode_amount(101)).is_err());
        assert!(O5Action::parse("O5VoteNoConfidence", &[0u8; 32]).is_err());
    }

    #[test]
    fn test_binding_hash_covers_every_field() {
        let custody = custody_for_test();
        let base = O5Command::modify(ProtocolParam::PoSaTReward, 7, 10, [1u8; 32]);
        let digest = base.binding_hash(&custody);

        let variants = [
            O5Command::modify(ProtocolParam::PoSaTReward, 8, 10, [1u8; 32]),
            O5Command::modify(ProtocolParam::PoSaTReward, 7, 11, [1u8; 32]),
            O5Command::modify(ProtocolParam::PoSaTReward, 7, 10, [2u8; 32]),
            O5Command::modify(ProtocolParam::VoCRequirement, 7, 10, [1u8; 32]),
        ];
        for variant in &variants {
            assert_ne!(variant.binding_hash(&custody), digest);
        }
        assert_ne!(base.binding_hash(&Address::new([9u8; 32])), digest);
    }

    fn custody_for_test() -> Address {
        crate::ledger::custody_address(&TokenId::from_symbol("TRUST"))
    }

    #[test]
    fn test_ed25519_recovery() {
        let (key, address) = signer();
        let digest = [7u8; 32];
        let signature = O5Signature::sign(&key, &digest);

        assert_eq!(Ed25519Recovery.recover(&digest, &signature), Some(address));
        assert_eq!(Ed25519Recovery.recover(&[8u8; 32], &signature), None);

        let truncated = O5Signature { signature: signature.signature[..10].to_vec(), ..signature };
        assert_eq!(Ed25519Recovery.recover(&digest, &truncated), None);
    }

    #[test]
    fn test_majority_amends_parameter() {
        let (key, address) = signer();
        let mut ledger = create_test_ledger(ProtocolParams::default());
        ledger.lock_tokens(&ctx(ALICE, 1), SUPPLY).unwrap();
        ledger.delegate_voting_rights(&ctx(ALICE, 1), address, SUPPLY).unwrap();

        let mut command = O5Command::modify(ProtocolParam::PoSaTReward, 9, 100, [3u8; 32]);
        command.sign(&key, &ledger.custody());

        let action = ledger.execute_o5(&ctx(address, 5), &command, &Ed25519Recovery).unwrap();
        assert_eq!(action, O5Action::Modify { param: ProtocolParam::PoSaTReward, value: 9 });
        assert_eq!(ledger.params().posat_reward_rate, 9);
        assert!(ledger.is_seed_used(&[3u8; 32]));

        assert!(matches!(
            ledger.execute_o5(&ctx(address, 6), &command, &Ed25519Recovery),
            Err(LedgerError::Replay(_))
        ));
    }

    #[test]
    fn test_expired_command_rejected() {
        let (key, _) = signer();
        let mut ledger = create_test_ledger(ProtocolParams::default());
        let mut command = O5Command::dissolve(10, [4u8; 32]);
        command.sign(&key, &ledger.custody());

        assert_eq!(
            ledger.execute_o5(&ctx(BOB, 11), &command, &Ed25519Recovery),
            Err(LedgerError::Expired { block_expiry: 10, current_height: 11 })
        );
        assert!(!ledger.is_seed_used(&[4u8; 32]));
    }

    #[test]
    fn test_too_many_signatures_rejected() {
        let mut ledger = create_test_ledger(ProtocolParams::default());
        let mut command = O5Command::dissolve(10, [5u8; 32]);
        let custody = ledger.custody();
        for _ in 0..6 {
            command.sign(&signer().0, &custody);
        }

        assert!(matches!(
            ledger.execute_o5(&ctx(BOB, 1), &command, &Ed25519Recovery),
            Err(LedgerError::PreconditionFailed(_))
        ));
    }

    #[test]
    fn test_invalid_value_leaves_nonce_unused() {
        let (key, address) = signer();
        let mut ledger = create_test_ledger(ProtocolParams::default());
        ledger.lock_tokens(&ctx(ALICE, 1), 10).unwrap();
        ledger.delegate_voting_rights(&ctx(ALICE, 1), address, 10).unwrap();

        let mut command = O5Command::modify(ProtocolParam::PoSaTRequirement, 0, 100, [6u8; 32]);
        command.sign(&key, &ledger.custody());

        assert!(matches!(
            ledger.execute_o5(&ctx(address, 2), &command, &Ed25519Recovery),
            Err(LedgerError::PreconditionFailed(_))
        ));
        assert!(!ledger.is_seed_used(&[6u8; 32]));
        assert_eq!(ledger.params().posat_block_requirement, 2_102_400);
    }

    #[test]
    fn test_withdrawal_requires_dissolution() {
        let mut ledger = create_test_ledger(ProtocolParams::default());
        ledger.lock_tokens(&ctx(ALICE, 1), 10).unwrap();
        assert!(matches!(
            ledger.dissolve_withdrawal(&ctx(ALICE, 2)),
            Err(LedgerError::PreconditionFailed(_))
        ));
    }
}
