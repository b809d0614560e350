//! Account identity.
//!
//! Accounts are keyed by the numeric identity the chat transport assigns to
//! a user. The id is opaque to the ledger: it is never generated here, only
//! received with an inbound command.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// External identity of a ledger account.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(i64);

impl AccountId {
    #[must_use]
    pub const fn new(raw: i64) -> Self {
        Self(raw)
    }

    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }

    /// Big-endian key bytes. The sign bit is flipped so that byte order
    /// matches numeric order for negative ids as well.
    #[must_use]
    pub fn to_key(self) -> [u8; 8] {
        ((self.0 as u64) ^ (1 << 63)).to_be_bytes()
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for AccountId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse::<i64>().map(Self)
    }
}
