//! # Chest Rewards
//!
//! A chest pays a fixed reward and then locks for a cooldown window.
//!
//! ```text
//!   Never ──open──▶ Locked ──(window ends)──▶ Claimable ──open──▶ Locked
//! ```
//!
//! Window arithmetic saturates. A timestamp before the window start (clock
//! moved backwards) keeps the chest locked.
//!
//! A successful open writes the chest row, the balance credit and the
//! [`ChestReminder`] in one write unit; the reminder worker picks the
//! reminder up once it is due.

use rewardbot_common::{AccountId, Amount, RewardConfig, Timestamp};
use tracing::{debug, info};

use crate::accounts::credit_in;
use crate::db::{LedgerDb, LedgerRead};
use crate::error::LedgerResult;
use crate::model::{ChestReminder, ChestState};

// ════════════════════════════════════════════════════════════════════════════
// COOLDOWN WINDOW
// ════════════════════════════════════════════════════════════════════════════

/// A cooldown that started at `started_at` and lasts `duration_secs`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CooldownWindow {
    pub started_at: Timestamp,
    pub duration_secs: u64,
}

impl CooldownWindow {
    #[must_use]
    pub fn new(started_at: Timestamp, duration_secs: u64) -> Self {
        Self { started_at, duration_secs }
    }

    /// Saturates to `u64::MAX`, in which case the window never ends.
    #[must_use]
    #[inline]
    pub fn expires_at(&self) -> Timestamp {
        self.started_at.saturating_add(self.duration_secs)
    }

    #[must_use]
    #[inline]
    pub fn is_active(&self, now: Timestamp) -> bool {
        if now < self.started_at {
            return true;
        }
        now < self.expires_at()
    }

    /// Seconds until the window ends, `0` once it has.
    ///
    /// While `now` is before the start the full duration is reported, so a
    /// locked chest never shows zero time left.
    #[must_use]
    #[inline]
    pub fn remaining_secs(&self, now: Timestamp) -> u64 {
        if now < self.started_at {
            return self.duration_secs.max(1);
        }
        self.expires_at().saturating_sub(now)
    }
}

// ════════════════════════════════════════════════════════════════════════════
// ENGINE
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChestOutcome {
    Granted {
        reward: Amount,
        balance: Amount,
        next_available: Timestamp,
    },
    Locked {
        remaining_secs: u64,
        next_available: Timestamp,
    },
}

#[derive(Clone, Debug)]
pub struct ChestEngine {
    db: LedgerDb,
    reward: Amount,
    cooldown_secs: u64,
}

impl ChestEngine {
    #[must_use]
    pub fn new(db: LedgerDb, reward: Amount, cooldown_secs: u64) -> Self {
        Self { db, reward, cooldown_secs }
    }

    #[must_use]
    pub fn from_config(db: LedgerDb, rewards: &RewardConfig) -> Self {
        Self::new(db, rewards.chest_reward, rewards.chest_cooldown_secs())
    }

    #[must_use]
    pub fn cooldown_secs(&self) -> u64 {
        self.cooldown_secs
    }

    /// The window for an existing chest row.
    #[must_use]
    pub fn window(&self, chest: &ChestState) -> CooldownWindow {
        CooldownWindow::new(chest.last_open, self.cooldown_secs)
    }

    pub fn state(&self, account: AccountId) -> LedgerResult<Option<ChestState>> {
        self.db.read(|v| v.chest(account))
    }

    /// Open the chest for `account` at `now`.
    ///
    /// The account must exist. A locked chest is reported without mutation.
    pub fn open(&self, account: AccountId, now: Timestamp) -> LedgerResult<ChestOutcome> {
        self.db.write(|txn| {
            if let Some(chest) = txn.chest(account)? {
                let window = self.window(&chest);
                if window.is_active(now) {
                    let remaining_secs = window.remaining_secs(now);
                    debug!("chest of {} locked for {}s", account, remaining_secs);
                    return Ok(ChestOutcome::Locked {
                        remaining_secs,
                        next_available: window.expires_at(),
                    });
                }
            }

            let credited = credit_in(txn, account, self.reward)?;
            txn.put_chest(&ChestState { account, last_open: now })?;

            let next_available = CooldownWindow::new(now, self.cooldown_secs).expires_at();
            txn.put_reminder(&ChestReminder { account, fire_at: next_available })?;

            info!("chest opened by {}: +{} (next at {})", account, self.reward, next_available);
            Ok(ChestOutcome::Granted {
                reward: self.reward,
                balance: credited.balance,
                next_available,
            })
        })
    }
}
