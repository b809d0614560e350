//! Referral crediting.
//!
//! A referrer earns a fixed bonus the first time each referred account is
//! created, up to a cap. The credit runs inside the same write unit as the
//! referee's creation (see [`crate::accounts::AccountStore::ensure_account`]),
//! so two signups under one referrer cannot both observe a count below the
//! cap and overshoot it.

use rewardbot_common::{AccountId, Amount, RewardConfig};
use tracing::{debug, info};

use crate::accounts::credit_in;
use crate::db::{LedgerRead, LedgerTxn};
use crate::error::LedgerResult;

/// What happened to the referrer when an account was registered.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReferralCredit {
    /// No referrer was given.
    NotReferred,
    /// The referrer was credited.
    Credited {
        referrer: AccountId,
        bonus: Amount,
        referral_count: u32,
    },
    /// The referrer already reached the cap; nothing was credited.
    CapReached { referrer: AccountId },
    /// The referrer id does not resolve. Registration still succeeded.
    ReferrerNotFound { referrer: AccountId },
    /// An account cannot refer itself.
    SelfReferral,
    /// The account already existed; referrals are credited only once.
    AlreadyRegistered,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReferralEngine {
    bonus: Amount,
    cap: u32,
}

impl ReferralEngine {
    #[must_use]
    pub fn new(bonus: Amount, cap: u32) -> Self {
        Self { bonus, cap }
    }

    #[must_use]
    pub fn from_config(rewards: &RewardConfig) -> Self {
        Self::new(rewards.ref_bonus, rewards.max_referrals)
    }

    #[must_use]
    pub fn bonus(&self) -> Amount {
        self.bonus
    }

    #[must_use]
    pub fn cap(&self) -> u32 {
        self.cap
    }

    /// Credit `referrer` for bringing in `referee`. Must be called from the
    /// write unit that creates `referee`.
    pub(crate) fn credit_referrer(
        &self,
        txn: &mut LedgerTxn<'_>,
        referrer: AccountId,
        referee: AccountId,
    ) -> LedgerResult<ReferralCredit> {
        let Some(current) = txn.account(referrer)? else {
            debug!("referrer {} of {} not found, skipping bonus", referrer, referee);
            return Ok(ReferralCredit::ReferrerNotFound { referrer });
        };

        if current.referral_count >= self.cap {
            debug!("referrer {} reached cap {}, no bonus for {}", referrer, self.cap, referee);
            return Ok(ReferralCredit::CapReached { referrer });
        }

        let mut updated = credit_in(txn, referrer, self.bonus)?;
        updated.referral_count += 1;
        txn.put_account(&updated)?;

        info!(
            "referral bonus {} credited to {} for {} ({}/{})",
            self.bonus, referrer, referee, updated.referral_count, self.cap
        );
        Ok(ReferralCredit::Credited {
            referrer,
            bonus: self.bonus,
            referral_count: updated.referral_count,
        })
    }
}
