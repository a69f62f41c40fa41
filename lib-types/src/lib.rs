//! Trust ledger primitives.
//! Stable, protocol-neutral, behavior-free.
//!
//! Rule: No String identifiers in ledger state. Ever.

pub mod context;
pub mod primitives;
pub mod ring;

pub use context::CallContext;
pub use primitives::{Address, Amount, BlockHeight, ChallengeId, ParseIdError, Percent, TokenId};
pub use ring::Ring;
