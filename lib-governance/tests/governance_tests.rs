//! End-to-end tests for the governance ledger
//!
//! These run the ledger against the in-memory token ledger and a real
//! trust registry, with ed25519-signed O5 commands.

use anyhow::{anyhow, Result};
use ed25519_dalek::SigningKey;
use rand::rngs::{OsRng, StdRng};
use rand::{Rng, SeedableRng};

use lib_governance::{
    custody_address, Ed25519Recovery, GovernanceLedger, LedgerError, LedgerEvent, O5Action,
    O5Command, ProtocolParam, ProtocolParams, DEFAULT_INITIAL_SUPPLY,
};
use lib_tokens::{MemoryTokenLedger, TokenContract, TokenLedger, DEFAULT_DECIMALS};
use lib_trust::{Declaration, OracleFee, QueuedOracle, TrustConfig, TrustRegistry};
use lib_types::{Address, Amount, BlockHeight, CallContext, Ring, TokenId};

const TREASURY: Address = Address::new([0xEE; 32]);
const ORACLE: Address = Address::new([0x0C; 32]);
const REQUESTER: Address = Address::new([0x0D; 32]);
const ALICE: Address = Address::new([1u8; 32]);
const BOB: Address = Address::new([2u8; 32]);
const TARGET: Address = Address::new([3u8; 32]);
const VALIDITY: BlockHeight = 1_000;

fn ctx(caller: Address, height: BlockHeight) -> CallContext {
    CallContext::new(caller, height)
}

fn small_params() -> ProtocolParams {
    ProtocolParams {
        o10_requirement: 10,
        voc_requirement: 1_000,
        posat_reward_rate: 5,
        posat_block_requirement: 100,
        ring_one_requirement: 25,
    }
}

/// Ledger over a token owned by custody, with each funded address holding
/// its amount
fn create_ledger(params: ProtocolParams, funded: &[(Address, Amount)]) -> Result<GovernanceLedger<MemoryTokenLedger>> {
    let asset = TokenId::from_symbol("TRUST");
    let contract = TokenContract::new("Trust".to_string(), "TRUST".to_string(), DEFAULT_DECIMALS, custody_address(&asset));
    let mut token = MemoryTokenLedger::new(contract, TREASURY, DEFAULT_INITIAL_SUPPLY)?;
    for (who, amount) in funded {
        token.transfer(TREASURY, *who, *amount)?;
    }
    Ok(GovernanceLedger::new(token, params)?)
}

fn create_registry() -> Result<TrustRegistry<QueuedOracle>> {
    let config = TrustConfig { ring_two_validity_period: VALIDITY };
    Ok(TrustRegistry::new(config, QueuedOracle::new(ORACLE, OracleFee::default()))?)
}

/// Walk `target` through ring 3, ring 2 declaration and a successful challenge
fn grant_ring_two(registry: &mut TrustRegistry<QueuedOracle>, target: Address, height: BlockHeight) -> Result<()> {
    registry.declare_ring_three(
        &ctx(target, height),
        Declaration {
            name: "Target".to_string(),
            email: "target@example.org".to_string(),
            phone: "+1 555 0100".to_string(),
            info: String::new(),
        },
    )?;
    registry.declare_ring_two(&ctx(target, height), "https://target.example.org".to_string())?;

    let id = registry.init_challenge(&ctx(REQUESTER, height), target)?;
    let fee = registry.oracle_cost(1);
    registry.solve_challenge(&ctx(REQUESTER, height), id, fee, 1)?;

    let request = registry
        .oracle_mut()
        .next_request()
        .ok_or_else(|| anyhow!("no fetch queued"))?;
    let body = registry.challenge(&id)?.expected;
    let granted = registry.resolve_challenge(&ctx(ORACLE, height), request.challenge_id, Some(body.as_str()))?;
    assert!(granted);
    Ok(())
}

fn keypair() -> (SigningKey, Address) {
    let key = SigningKey::generate(&mut OsRng);
    let address = Address::from_public_key(&key.verifying_key().to_bytes());
    (key, address)
}

// ============================================================================
// Token lock and delegation
// ============================================================================

#[test]
fn test_lock_hundred_tokens() -> Result<()> {
    let mut ledger = create_ledger(ProtocolParams::default(), &[(ALICE, 1_000)])?;
    ledger.lock_tokens(&ctx(ALICE, 1), 100)?;

    let holder = ledger.holder(&ALICE);
    assert_eq!(holder.tokens_locked, 100);
    assert_eq!(holder.own_voting_rights(), 100);
    assert_eq!(holder.own_posat(), 100);
    assert_eq!(ledger.voting_rights(&ALICE), 100);
    assert_eq!(ledger.available_posat(&ALICE), 100);
    assert_eq!(ledger.cumulative_token_locked(), 100);
    assert_eq!(ledger.token().balance_of(&ALICE), 900);

    let events = ledger.drain_events();
    assert_eq!(
        events,
        vec![LedgerEvent::TokensLocked { holder: ALICE, amount: 100, block_height: 1 }]
    );
    Ok(())
}

#[test]
fn test_delegated_rights_cannot_be_passed_on() -> Result<()> {
    let mut ledger = create_ledger(ProtocolParams::default(), &[(ALICE, 1_000), (BOB, 1_000)])?;
    ledger.lock_tokens(&ctx(ALICE, 1), 100)?;
    ledger.lock_tokens(&ctx(BOB, 1), 10)?;
    ledger.delegate_voting_rights(&ctx(ALICE, 2), BOB, 60)?;

    assert_eq!(ledger.voting_rights(&ALICE), 40);
    assert_eq!(ledger.voting_rights(&BOB), 70);

    // Bob can pass on his own 10, never Alice's 60
    ledger.delegate_voting_rights(&ctx(BOB, 3), TARGET, 10)?;
    assert_eq!(
        ledger.delegate_voting_rights(&ctx(BOB, 3), TARGET, 1),
        Err(LedgerError::InsufficientBalance { have: 0, need: 1 })
    );
    assert_eq!(ledger.voting_rights(&BOB), 60);
    assert_eq!(ledger.voting_rights(&TARGET), 10);
    Ok(())
}

#[test]
fn test_invariants_hold_under_random_operations() -> Result<()> {
    let actors = [ALICE, BOB, TARGET];
    let funded: Vec<_> = actors.iter().map(|a| (*a, 10_000)).collect();
    let mut ledger = create_ledger(small_params(), &funded)?;
    let mut rng = StdRng::seed_from_u64(7);

    for height in 1..500u64 {
        let caller = actors[rng.gen_range(0..actors.len())];
        let other = actors[rng.gen_range(0..actors.len())];
        let amount: Amount = rng.gen_range(1..2_000);
        let c = ctx(caller, height);

        // Failures are expected; they must leave no trace
        let _ = match rng.gen_range(0..10) {
            0 | 1 => ledger.lock_tokens(&c, amount),
            2 => ledger.withdraw_tokens(&c, amount),
            3 => ledger.delegate_voting_rights(&c, other, amount),
            4 => ledger.withdraw_delegated_voting_rights(&c, other, amount),
            5 => ledger.delegate_posat(&c, other, amount),
            6 => ledger.withdraw_delegated_posat(&c, other, amount),
            7 => ledger.o10_authorize(&c),
            8 => ledger.o10_vote_confidence(&c, other),
            _ => ledger.o10_revoke_vote(&c, other),
        };

        let mut total = 0;
        for actor in &actors {
            let holder = ledger.holder(actor);
            assert!(holder.is_consistent(), "inconsistent holder at block {}", height);
            total += holder.tokens_locked;
        }
        assert_eq!(total, ledger.cumulative_token_locked());
        assert_eq!(ledger.token().balance_of(&ledger.custody()), total);
    }
    Ok(())
}

// ============================================================================
// O10 and rewards
// ============================================================================

#[test]
fn test_deauthorize_requires_revoked_votes() -> Result<()> {
    let mut ledger = create_ledger(small_params(), &[(ALICE, 5_000)])?;
    ledger.lock_tokens(&ctx(ALICE, 1), 5_000)?;
    ledger.o10_authorize(&ctx(ALICE, 2))?;
    ledger.o10_vote_confidence(&ctx(ALICE, 3), TARGET)?;

    assert!(matches!(
        ledger.o10_deauthorize(&ctx(ALICE, 4)),
        Err(LedgerError::PreconditionFailed(_))
    ));

    ledger.o10_revoke_vote(&ctx(ALICE, 5), TARGET)?;
    ledger.o10_deauthorize(&ctx(ALICE, 6))?;
    assert_eq!(ledger.locked_posat(&ALICE), 0);
    assert_eq!(ledger.voters(&TARGET), &[None]);
    Ok(())
}

#[test]
fn test_reward_for_ring_two_target() -> Result<()> {
    let mut ledger = create_ledger(small_params(), &[(ALICE, 5_000)])?;
    let mut registry = create_registry()?;
    grant_ring_two(&mut registry, TARGET, 10)?;

    ledger.lock_tokens(&ctx(ALICE, 1), 5_000)?;
    ledger.o10_authorize(&ctx(ALICE, 2))?;
    ledger.o10_vote_confidence(&ctx(ALICE, 20), TARGET)?;

    assert!(matches!(
        ledger.o10_get_reward(&ctx(ALICE, 119), TARGET, &registry),
        Err(LedgerError::PreconditionFailed(_))
    ));

    let minted = ledger.o10_get_reward(&ctx(ALICE, 120), TARGET, &registry)?;
    assert_eq!(minted, 50);
    assert_eq!(ledger.token().balance_of(&ALICE), 50);
    assert_eq!(ledger.vote(&ALICE, &TARGET).map(|v| v.checkpoint), Some(120));

    // Nothing once the grant has expired
    assert!(matches!(
        ledger.o10_get_reward(&ctx(ALICE, 10 + VALIDITY), TARGET, &registry),
        Err(LedgerError::PreconditionFailed(_))
    ));
    Ok(())
}

#[test]
fn test_ring_one_from_registry_and_endorsement() -> Result<()> {
    let mut ledger = create_ledger(small_params(), &[(ALICE, 5_000), (BOB, 15_000)])?;
    let mut registry = create_registry()?;
    grant_ring_two(&mut registry, TARGET, 1)?;

    ledger.lock_tokens(&ctx(ALICE, 1), 5_000)?;
    ledger.lock_tokens(&ctx(BOB, 1), 15_000)?;
    ledger.o10_authorize(&ctx(ALICE, 2))?;
    assert_eq!(ledger.current_ring(&TARGET, 2, &registry), Ring::Two);

    ledger.o10_vote_confidence(&ctx(ALICE, 3), TARGET)?;
    assert_eq!(ledger.current_ring(&TARGET, 3, &registry), Ring::One);

    // Expired grants read as ring 3 and drop ring 1 with them
    assert_eq!(ledger.current_ring(&TARGET, 1 + VALIDITY, &registry), Ring::Three);
    assert_eq!(ledger.current_ring(&ALICE, 3, &registry), Ring::Four);
    Ok(())
}

// ============================================================================
// O5 channel
// ============================================================================

#[test]
fn test_quorum_requires_strict_majority() -> Result<()> {
    let (alice_key, alice) = keypair();
    let (bob_key, bob) = keypair();
    let mut ledger = create_ledger(ProtocolParams::default(), &[(alice, 50), (bob, 50)])?;
    ledger.lock_tokens(&ctx(alice, 1), 50)?;
    ledger.lock_tokens(&ctx(bob, 1), 50)?;
    let custody = ledger.custody();

    // Exactly half
    let mut command = O5Command::modify(ProtocolParam::O10Requirement, 77, 100, [1u8; 32]);
    command.sign(&alice_key, &custody);
    assert_eq!(
        ledger.execute_o5(&ctx(alice, 2), &command, &Ed25519Recovery),
        Err(LedgerError::InsufficientQuorum { cumulative: 50, total_locked: 100 })
    );

    // The same signer twice still counts once
    command.sign(&alice_key, &custody);
    assert!(matches!(
        ledger.execute_o5(&ctx(alice, 2), &command, &Ed25519Recovery),
        Err(LedgerError::InsufficientQuorum { cumulative: 50, .. })
    ));
    assert!(!ledger.is_seed_used(&[1u8; 32]));

    command.sign(&bob_key, &custody);
    ledger.execute_o5(&ctx(alice, 3), &command, &Ed25519Recovery)?;
    assert_eq!(ledger.params().o10_requirement, 77);

    let events = ledger.drain_events();
    assert!(events.iter().any(|e| matches!(
        e,
        LedgerEvent::O5Authorized { cumulative_vote: 100, signers, .. } if signers.len() == 2
    )));
    assert!(events.contains(&LedgerEvent::ParameterModified {
        param: ProtocolParam::O10Requirement,
        old: ProtocolParams::default().o10_requirement,
        new: 77,
    }));
    Ok(())
}

#[test]
fn test_signature_for_other_command_is_ignored() -> Result<()> {
    let (key, signer) = keypair();
    let mut ledger = create_ledger(ProtocolParams::default(), &[(signer, 100)])?;
    ledger.lock_tokens(&ctx(signer, 1), 100)?;
    let custody = ledger.custody();

    let mut signed = O5Command::modify(ProtocolParam::PoSaTReward, 6, 100, [2u8; 32]);
    signed.sign(&key, &custody);

    let mut tampered = O5Command::modify(ProtocolParam::PoSaTReward, 60, 100, [2u8; 32]);
    tampered.signatures = signed.signatures.clone();

    assert!(matches!(
        ledger.execute_o5(&ctx(signer, 2), &tampered, &Ed25519Recovery),
        Err(LedgerError::InsufficientQuorum { cumulative: 0, .. })
    ));
    Ok(())
}

#[test]
fn test_unrecognized_command_consumes_nonce() -> Result<()> {
    let (key, signer) = keypair();
    let mut ledger = create_ledger(ProtocolParams::default(), &[(signer, 100)])?;
    ledger.lock_tokens(&ctx(signer, 1), 100)?;

    let mut command = O5Command::new("O5ModifySomethingElse", [0u8; 32], 100, [3u8; 32]);
    command.sign(&key, &ledger.custody());

    let params = *ledger.params();
    assert_eq!(ledger.execute_o5(&ctx(signer, 2), &command, &Ed25519Recovery)?, O5Action::Unrecognized);
    assert!(ledger.is_seed_used(&[3u8; 32]));
    assert_eq!(*ledger.params(), params);
    Ok(())
}

#[test]
fn test_veto_blocks_target() -> Result<()> {
    let (key, signer) = keypair();
    let mut ledger = create_ledger(small_params(), &[(signer, 10_000), (ALICE, 5_000)])?;
    let mut registry = create_registry()?;
    grant_ring_two(&mut registry, TARGET, 1)?;

    ledger.lock_tokens(&ctx(signer, 1), 10_000)?;
    ledger.lock_tokens(&ctx(ALICE, 1), 5_000)?;
    ledger.o10_authorize(&ctx(ALICE, 2))?;
    ledger.o10_vote_confidence(&ctx(ALICE, 2), TARGET)?;
    assert_eq!(ledger.current_ring(&TARGET, 2, &registry), Ring::One);

    let mut command = O5Command::vote_no_confidence(TARGET, 100, [4u8; 32]);
    command.sign(&key, &ledger.custody());
    ledger.execute_o5(&ctx(signer, 3), &command, &Ed25519Recovery)?;

    assert!(ledger.is_vetoed(&TARGET));
    assert_eq!(ledger.current_ring(&TARGET, 3, &registry), Ring::Four);
    assert!(matches!(
        ledger.o10_vote_confidence(&ctx(signer, 4), TARGET),
        Err(LedgerError::PreconditionFailed(_))
    ));
    assert!(matches!(
        ledger.o10_revoke_vote(&ctx(ALICE, 4), TARGET),
        Err(LedgerError::PreconditionFailed(_))
    ));
    assert!(matches!(
        ledger.o10_get_reward(&ctx(ALICE, 500), TARGET, &registry),
        Err(LedgerError::PreconditionFailed(_))
    ));
    Ok(())
}

#[test]
fn test_dissolution() -> Result<()> {
    let (key, signer) = keypair();
    let submitter = Address::new([0x5A; 32]);
    let mut ledger = create_ledger(ProtocolParams::default(), &[(signer, 600), (ALICE, 400)])?;
    ledger.lock_tokens(&ctx(signer, 1), 600)?;
    ledger.lock_tokens(&ctx(ALICE, 1), 400)?;

    let mut command = O5Command::dissolve(100, [5u8; 32]);
    command.sign(&key, &ledger.custody());
    ledger.execute_o5(&ctx(submitter, 2), &command, &Ed25519Recovery)?;

    assert!(ledger.is_dissolved());
    assert_eq!(ledger.token().owner(), submitter);

    assert_eq!(ledger.lock_tokens(&ctx(ALICE, 3), 1), Err(LedgerError::Terminal));
    assert_eq!(ledger.withdraw_tokens(&ctx(ALICE, 3), 1), Err(LedgerError::Terminal));
    assert_eq!(ledger.o10_authorize(&ctx(ALICE, 3)), Err(LedgerError::Terminal));
    assert_eq!(ledger.o10_deauthorize(&ctx(ALICE, 3)), Err(LedgerError::Terminal));
    assert_eq!(ledger.delegate_voting_rights(&ctx(ALICE, 3), BOB, 1), Err(LedgerError::Terminal));
    assert_eq!(
        ledger.withdraw_delegated_voting_rights(&ctx(ALICE, 3), BOB, 1),
        Err(LedgerError::Terminal)
    );
    assert_eq!(ledger.delegate_posat(&ctx(ALICE, 3), BOB, 1), Err(LedgerError::Terminal));
    assert_eq!(ledger.withdraw_delegated_posat(&ctx(ALICE, 3), BOB, 1), Err(LedgerError::Terminal));
    assert_eq!(ledger.o10_vote_confidence(&ctx(ALICE, 3), TARGET), Err(LedgerError::Terminal));
    assert_eq!(ledger.o10_revoke_vote(&ctx(ALICE, 3), TARGET), Err(LedgerError::Terminal));
    let registry = create_registry()?;
    assert_eq!(
        ledger.o10_get_reward(&ctx(ALICE, 3), TARGET, &registry),
        Err(LedgerError::Terminal)
    );
    let asset = ledger.token().asset();
    assert_eq!(ledger.on_tokens_received(asset, ALICE, 1, 3), Err(LedgerError::Terminal));
    let mut again = O5Command::dissolve(100, [6u8; 32]);
    again.sign(&key, &ledger.custody());
    assert_eq!(
        ledger.execute_o5(&ctx(submitter, 3), &again, &Ed25519Recovery),
        Err(LedgerError::Terminal)
    );

    assert_eq!(ledger.dissolve_withdrawal(&ctx(ALICE, 4))?, 400);
    assert_eq!(ledger.token().balance_of(&ALICE), 400);
    assert_eq!(
        ledger.dissolve_withdrawal(&ctx(ALICE, 5)),
        Err(LedgerError::InsufficientBalance { have: 0, need: 1 })
    );

    assert_eq!(ledger.dissolve_withdrawal(&ctx(signer, 5))?, 600);
    assert_eq!(ledger.token().balance_of(&ledger.custody()), 0);
    Ok(())
}
