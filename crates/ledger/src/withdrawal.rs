//! Withdrawal requests.
//!
//! | Mode | Request status | Balance | `withdrawn` |
//! |------|----------------|---------|-------------|
//! | FAKE | pending | unchanged | unchanged |
//! | REAL | settled | zeroed | += prior balance |
//!
//! The request amount is always the balance read inside the same write unit,
//! so two concurrent REAL requests cannot both settle the same funds. An
//! empty balance is always rejected, whatever the configured minimum.

use rewardbot_common::{AccountId, Amount, PayoutMode, RewardConfig, Timestamp};
use tracing::{debug, info};

use crate::db::{LedgerDb, LedgerRead};
use crate::error::{LedgerError, LedgerResult, ValidationError};
use crate::model::{WithdrawalRequest, WithdrawalStatus};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WithdrawalRejection {
    BelowMinimum { balance: Amount, minimum: Amount },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WithdrawalOutcome {
    /// Recorded as pending (FAKE mode).
    Accepted { request: WithdrawalRequest },
    /// Paid out (REAL mode).
    Settled {
        request: WithdrawalRequest,
        withdrawn_total: Amount,
    },
    Rejected(WithdrawalRejection),
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum WithdrawalFilter {
    #[default]
    All,
    Pending,
}

impl WithdrawalFilter {
    fn admits(self, request: &WithdrawalRequest) -> bool {
        match self {
            WithdrawalFilter::All => true,
            WithdrawalFilter::Pending => request.status == WithdrawalStatus::Pending,
        }
    }
}

#[derive(Clone, Debug)]
pub struct WithdrawalEngine {
    db: LedgerDb,
    minimum: Amount,
}

impl WithdrawalEngine {
    #[must_use]
    pub fn new(db: LedgerDb, minimum: Amount) -> Self {
        Self { db, minimum }
    }

    #[must_use]
    pub fn from_config(db: LedgerDb, rewards: &RewardConfig) -> Self {
        Self::new(db, rewards.min_withdraw)
    }

    pub fn request(&self, account: AccountId, mode: PayoutMode, now: Timestamp) -> LedgerResult<WithdrawalOutcome> {
        self.db.write(|txn| {
            let mut current = txn.account(account)?.ok_or(LedgerError::NotFound { account })?;
            let balance = current.balance;
            if balance.is_zero() || balance < self.minimum {
                debug!("withdrawal by {} rejected: {} < {}", account, balance, self.minimum);
                return Ok(WithdrawalOutcome::Rejected(WithdrawalRejection::BelowMinimum {
                    balance,
                    minimum: self.minimum,
                }));
            }

            let id = txn.next_withdrawal_id()?;
            let mut request = WithdrawalRequest {
                id,
                account,
                amount: balance,
                status: WithdrawalStatus::Pending,
                created_at: now,
            };

            match mode {
                PayoutMode::Fake => {
                    txn.put_withdrawal(&request)?;
                    info!("withdrawal #{} by {} recorded as pending: {}", id, account, balance);
                    Ok(WithdrawalOutcome::Accepted { request })
                }
                PayoutMode::Real => {
                    current.withdrawn = current
                        .withdrawn
                        .checked_add(balance)
                        .ok_or(ValidationError::BalanceOverflow(account))?;
                    current.balance = Amount::ZERO;
                    txn.put_account(&current)?;

                    request.status = WithdrawalStatus::Settled;
                    txn.put_withdrawal(&request)?;
                    info!("withdrawal #{} by {} settled: {}", id, account, balance);
                    Ok(WithdrawalOutcome::Settled {
                        request,
                        withdrawn_total: current.withdrawn,
                    })
                }
            }
        })
    }

    /// Requests in id order.
    pub fn list(&self, filter: WithdrawalFilter) -> LedgerResult<Vec<WithdrawalRequest>> {
        self.db.read(|v| {
            Ok(v.withdrawals()?
                .into_iter()
                .filter(|r| filter.admits(r))
                .collect())
        })
    }
}
