//! Trust Registry
//!
//! Per-address identity rings backed by self-declaration and a
//! domain-ownership challenge.
//!
//! # Rings
//!
//! - Ring 4: default, nothing declared
//! - Ring 3: identity self-declared
//! - Ring 2: declared domain proven through the oracle, valid for
//!   [`TrustConfig::ring_two_validity_period`] blocks
//!
//! Ring 1 is not granted here; the governance ledger derives it from
//! staked endorsements on top of ring 2 (see [`IdentityAuthority`]).
//!
//! # Asynchronous resolution
//!
//! ```ignore
//! let id = registry.init_challenge(&ctx, target)?;
//! registry.solve_challenge(&ctx, id, fee, gas_price)?;   // returns immediately
//! // ... blocks later, the oracle calls back:
//! registry.resolve_challenge(&oracle_ctx, id, Some(&body))?;
//! ```

pub mod challenge;
pub mod config;
pub mod errors;
pub mod events;
pub mod oracle;
pub mod record;
pub mod registry;

pub use challenge::{Challenge, ChallengeArtifact, ChallengeState};
pub use config::{TrustConfig, DEFAULT_RING_TWO_VALIDITY_PERIOD};
pub use errors::{TrustError, TrustResult};
pub use events::TrustEvent;
pub use oracle::{DomainOracle, FetchRequest, FetchResponse, OracleFee, QueuedOracle};
pub use record::{Declaration, IdentityAuthority, IdentityRecord, IdentityStatus, RingTwoGrant};
pub use registry::TrustRegistry;
