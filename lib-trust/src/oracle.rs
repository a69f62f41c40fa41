//! Domain Oracle
//!
//! The registry never fetches anything itself. It hands a
//! [`FetchRequest`] to the oracle and returns; the oracle later delivers a
//! [`FetchResponse`] through `TrustRegistry::resolve_challenge`, signed by
//! its callback address. The two sides share nothing but the challenge id.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use lib_types::{Address, Amount, ChallengeId};

use crate::errors::{TrustError, TrustResult};

/// Gas reserved for the oracle callback when quoting
pub const DEFAULT_CALLBACK_GAS: Amount = 200_000;

/// A fetch the oracle should perform
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchRequest {
    pub challenge_id: ChallengeId,
    pub url: String,
}

/// What the oracle found. `body` is `None` when the fetch failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchResponse {
    pub challenge_id: ChallengeId,
    pub body: Option<String>,
}

/// Off-chain domain-fetch oracle
pub trait DomainOracle {
    /// Only this address may deliver fetch results
    fn callback_address(&self) -> Address;

    /// Cost of one fetch at `gas_price`
    fn quote(&self, gas_price: Amount) -> Amount;

    /// Queue a fetch. Must not block waiting for the result.
    fn request_fetch(&mut self, request: FetchRequest) -> TrustResult<()>;
}

/// Pricing of an oracle fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OracleFee {
    /// Gas charged for the callback
    pub callback_gas: Amount,
    /// Flat fee added on top
    pub flat_fee: Amount,
}

impl Default for OracleFee {
    fn default() -> Self {
        Self {
            callback_gas: DEFAULT_CALLBACK_GAS,
            flat_fee: 0,
        }
    }
}

impl OracleFee {
    pub fn quote(&self, gas_price: Amount) -> Amount {
        gas_price
            .saturating_mul(self.callback_gas)
            .saturating_add(self.flat_fee)
    }
}

/// Oracle that parks requests in a queue for someone else to serve
#[derive(Debug, Clone)]
pub struct QueuedOracle {
    callback: Address,
    fee: OracleFee,
    queue: VecDeque<FetchRequest>,
}

impl QueuedOracle {
    pub fn new(callback: Address, fee: OracleFee) -> Self {
        Self {
            callback,
            fee,
            queue: VecDeque::new(),
        }
    }

    /// Requests not yet taken
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Take the oldest request
    pub fn next_request(&mut self) -> Option<FetchRequest> {
        self.queue.pop_front()
    }
}

impl DomainOracle for QueuedOracle {
    fn callback_address(&self) -> Address {
        self.callback
    }

    fn quote(&self, gas_price: Amount) -> Amount {
        self.fee.quote(gas_price)
    }

    fn request_fetch(&mut self, request: FetchRequest) -> TrustResult<()> {
        if request.url.is_empty() {
            return Err(TrustError::Oracle("empty url".to_string()));
        }
        self.queue.push_back(request);
        Ok(())
    }
}
