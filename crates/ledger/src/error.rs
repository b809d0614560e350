//! # Ledger Error Types
//!
//! ```text
//! LedgerError
//! ├── Validation(ValidationError)   ← malformed admin input, overflow
//! ├── NotFound { account }          ← unknown account
//! ├── PermissionDenied { .. }       ← caller lacks a capability
//! └── Store(String)                 ← LMDB / codec failure, retryable
//! ```
//!
//! Business rejections (chest still locked, balance below minimum, promo
//! code invalid or already used) are not errors. They are returned as
//! `Ok` outcomes so the transport can render them.

use rewardbot_common::{AccountId, AmountParseError, Capability};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("account {account} not found")]
    NotFound { account: AccountId },

    #[error("account {caller} is not granted {capability}")]
    PermissionDenied {
        caller: AccountId,
        capability: Capability,
    },

    /// Persistence failure. The enclosing write unit was aborted, so the
    /// caller may retry.
    #[error("store error: {0}")]
    Store(String),
}

impl LedgerError {
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, LedgerError::Store(_))
    }
}

impl From<lmdb::Error> for LedgerError {
    fn from(e: lmdb::Error) -> Self {
        LedgerError::Store(format!("lmdb: {e}"))
    }
}

impl From<bincode::Error> for LedgerError {
    fn from(e: bincode::Error) -> Self {
        LedgerError::Store(format!("codec: {e}"))
    }
}

impl From<std::io::Error> for LedgerError {
    fn from(e: std::io::Error) -> Self {
        LedgerError::Store(format!("io: {e}"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("promo code {code:?} must be at least {min_len} uppercase letters or digits")]
    InvalidPromoCode { code: String, min_len: usize },

    #[error("promo reward must be greater than zero")]
    ZeroReward,

    #[error("expected `<CODE> <amount>`, got {0:?}")]
    MalformedPromoRequest(String),

    #[error(transparent)]
    InvalidAmount(#[from] AmountParseError),

    #[error("balance overflow on account {0}")]
    BalanceOverflow(AccountId),
}

pub type LedgerResult<T> = Result<T, LedgerError>;
