//! Identity Records
//!
//! One record per address that ever declared anything. The ring is never
//! stored: it is derived from what the record holds and the current block.

use serde::{Deserialize, Serialize};

use lib_types::{Address, BlockHeight, Ring};

/// Self-declared identity details (ring 3)
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Declaration {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub info: String,
}

/// A granted ring 2 status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RingTwoGrant {
    /// Block at which the current run of uninterrupted grants started
    pub issued_at: BlockHeight,
    /// First block at which the grant no longer counts
    pub expires_at: BlockHeight,
}

impl RingTwoGrant {
    /// A grant is valid strictly before its expiry block
    pub fn is_valid_at(&self, now: BlockHeight) -> bool {
        now < self.expires_at
    }
}

/// Per-address registry state
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct IdentityRecord {
    /// Ring 3 declaration, if any
    pub declaration: Option<Declaration>,
    /// Domain declared for ring 2
    pub domain: Option<String>,
    /// Last successful ring 2 grant
    pub grant: Option<RingTwoGrant>,
    /// Bumped on every declaration; challenges issued under an older
    /// epoch can no longer grant ring 2
    pub epoch: u64,
}

impl IdentityRecord {
    /// Ring of this record at `now`
    pub fn ring_at(&self, now: BlockHeight) -> Ring {
        match (&self.declaration, &self.grant) {
            (Some(_), Some(grant)) if grant.is_valid_at(now) => Ring::Two,
            (Some(_), _) => Ring::Three,
            (None, _) => Ring::Four,
        }
    }

    /// Grant still valid at `now`
    pub fn valid_grant(&self, now: BlockHeight) -> Option<RingTwoGrant> {
        self.grant.filter(|grant| grant.is_valid_at(now))
    }

    /// Drop everything ring 2 related and start a new epoch
    pub(crate) fn reset_ring_two(&mut self) {
        self.grant = None;
        self.epoch = self.epoch.wrapping_add(1);
    }
}

/// Ring with issue and expiry blocks, as reported to readers.
///
/// Issue and expiry are zero unless the ring is 2.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityStatus {
    pub ring: Ring,
    pub issued_at: BlockHeight,
    pub expires_at: BlockHeight,
}

impl IdentityStatus {
    /// Status of an address nothing is known about
    pub const fn unknown() -> Self {
        Self {
            ring: Ring::Four,
            issued_at: 0,
            expires_at: 0,
        }
    }

    pub(crate) fn of(record: &IdentityRecord, now: BlockHeight) -> Self {
        match record.ring_at(now) {
            Ring::Two => {
                let grant = record.valid_grant(now);
                Self {
                    ring: Ring::Two,
                    issued_at: grant.map(|g| g.issued_at).unwrap_or(0),
                    expires_at: grant.map(|g| g.expires_at).unwrap_or(0),
                }
            }
            ring => Self {
                ring,
                issued_at: 0,
                expires_at: 0,
            },
        }
    }
}

/// Read access to identity status, consumed by the governance ledger
pub trait IdentityAuthority {
    /// Ring, issue and expiry of `address` at block `now`
    fn status(&self, address: &Address, now: BlockHeight) -> IdentityStatus;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn declared() -> IdentityRecord {
        IdentityRecord {
            declaration: Some(Declaration::default()),
            ..IdentityRecord::default()
        }
    }

    #[test]
    fn test_empty_record_is_ring_four() {
        assert_eq!(IdentityRecord::default().ring_at(10), Ring::Four);
    }

    #[test]
    fn test_grant_expires_at_expiry_block() {
        let mut record = declared();
        record.grant = Some(RingTwoGrant { issued_at: 10, expires_at: 110 });

        assert_eq!(record.ring_at(109), Ring::Two);
        assert_eq!(record.ring_at(110), Ring::Three);

        let status = IdentityStatus::of(&record, 110);
        assert_eq!(status, IdentityStatus { ring: Ring::Three, issued_at: 0, expires_at: 0 });
    }

    #[test]
    fn test_reset_bumps_epoch() {
        let mut record = declared();
        record.grant = Some(RingTwoGrant { issued_at: 1, expires_at: 100 });
        record.reset_ring_two();
        assert_eq!(record.grant, None);
        assert_eq!(record.epoch, 1);
    }
}
