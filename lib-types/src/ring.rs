//! Identity-assurance rings
//!
//! Ring 4 is the default for every address. Ring 3 is reached by
//! self-declaration, ring 2 by solving a domain challenge, and ring 1 is
//! derived by the governance ledger from staked endorsements.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Graduated assurance level. Lower numbers are stronger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Ring {
    /// Ledger-attested: ring 2 plus enough vote-of-confidence weight
    One,
    /// Domain ownership proven and not yet expired
    Two,
    /// Self-declared identity
    Three,
    /// Nothing known
    Four,
}

impl Ring {
    /// Numeric level (1..=4)
    pub const fn level(&self) -> u8 {
        match self {
            Ring::One => 1,
            Ring::Two => 2,
            Ring::Three => 3,
            Ring::Four => 4,
        }
    }

    /// Whether this ring is at least as strong as `other`
    pub const fn at_least(&self, other: Ring) -> bool {
        self.level() <= other.level()
    }
}

impl Default for Ring {
    fn default() -> Self {
        Ring::Four
    }
}

impl fmt::Display for Ring {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ring {}", self.level())
    }
}
