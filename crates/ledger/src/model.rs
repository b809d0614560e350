//! Records persisted in the ledger buckets.
//!
//! | Bucket | Key | Value |
//! |--------|-----|-------|
//! | `accounts` | account id (8 bytes) | [`Account`] |
//! | `chests` | account id | [`ChestState`] |
//! | `promo_codes` | code (UTF-8) | [`PromoCode`] |
//! | `promo_redemptions` | account id + code | marker |
//! | `withdrawals` | request id (u64 BE) | [`WithdrawalRequest`] |
//! | `reminders` | account id | [`ChestReminder`] |
//! | `meta` | name | counters |

use rewardbot_common::{AccountId, Amount, Timestamp};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Account {
    pub id: AccountId,
    pub display_name: Option<String>,
    pub balance: Amount,
    /// Total paid out. Never decreases.
    pub withdrawn: Amount,
    /// Set once at creation.
    pub referrer: Option<AccountId>,
    /// Referrals that earned a bonus, capped by the reward schedule.
    pub referral_count: u32,
    pub created_at: Timestamp,
}

impl Account {
    #[must_use]
    pub fn new(
        id: AccountId,
        display_name: Option<String>,
        referrer: Option<AccountId>,
        created_at: Timestamp,
    ) -> Self {
        Self {
            id,
            display_name,
            balance: Amount::ZERO,
            withdrawn: Amount::ZERO,
            referrer,
            referral_count: 0,
            created_at,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChestState {
    pub account: AccountId,
    pub last_open: Timestamp,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct PromoCode {
    /// Uppercase, see [`crate::promo::normalize_code`].
    pub code: String,
    pub reward: Amount,
    pub active: bool,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum WithdrawalStatus {
    Pending,
    Settled,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct WithdrawalRequest {
    /// Sequential, starting at 1.
    pub id: u64,
    pub account: AccountId,
    /// Balance observed in the same write unit that recorded the request.
    pub amount: Amount,
    pub status: WithdrawalStatus,
    pub created_at: Timestamp,
}

/// Durable "chest is ready again" notification.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChestReminder {
    pub account: AccountId,
    pub fire_at: Timestamp,
}

/// Ledger-wide totals for reporting.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LedgerStats {
    pub accounts: u64,
    pub total_balance: Amount,
    pub total_withdrawn: Amount,
}
