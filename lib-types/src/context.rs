//! Host-supplied call context

use serde::{Deserialize, Serialize};

use crate::primitives::{Address, BlockHeight};

/// Who is calling and at which block height.
///
/// Every mutating ledger operation receives one of these. The height is
/// the only clock the ledger ever reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallContext {
    pub caller: Address,
    pub height: BlockHeight,
}

impl CallContext {
    pub const fn new(caller: Address, height: BlockHeight) -> Self {
        Self { caller, height }
    }
}
