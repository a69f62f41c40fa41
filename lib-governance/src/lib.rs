//! Staked Governance Ledger
//!
//! Token holders lock governance tokens to obtain voting rights and PoSaT
//! (proof of stake and trust) credits, delegate either exactly one hop,
//! vouch for addresses as O10s, and govern the ledger through the O5
//! multisig channel.
//!
//! # Key Principles
//!
//! 1. **Custody**: locked tokens sit in one derived custody account
//! 2. **One hop**: received rights can be used but never delegated on
//! 3. **Atomic**: every operation validates fully before mutating
//! 4. **Terminal dissolution**: after `O5DissolveDAO` only
//!    `dissolve_withdrawal` runs
//!
//! # Usage
//!
//! ```ignore
//! use lib_governance::{GovernanceLedger, ProtocolParams};
//!
//! let mut ledger = GovernanceLedger::new(token, ProtocolParams::default())?;
//! ledger.lock_tokens(&ctx, amount)?;
//! ledger.o10_authorize(&ctx)?;
//! let ring = ledger.current_ring(&target, ctx.height, &registry);
//! ```

pub mod config;
pub mod errors;
pub mod events;
pub mod holder;
pub mod ledger;
pub mod o5;
pub mod params;
pub mod posat;

pub use config::LedgerConfig;
pub use errors::{LedgerError, LedgerResult};
pub use events::LedgerEvent;
pub use holder::Holder;
pub use ledger::{custody_address, GovernanceLedger};
pub use o5::{
    decode_amount, encode_amount, Ed25519Recovery, O5Action, O5Command, O5Signature,
    SignatureRecovery, MAX_O5_SIGNATURES, O5_DISSOLVE, O5_VOTE_NO_CONFIDENCE,
};
pub use params::{ProtocolParam, ProtocolParams, DEFAULT_INITIAL_SUPPLY};
pub use posat::{derive_ring, O10Status, VoteOfConfidence};
