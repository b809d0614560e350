//! Account lifecycle and balance primitives.

use rewardbot_common::{AccountId, Amount, Timestamp};
use tracing::info;

use crate::db::{LedgerDb, LedgerRead, LedgerTxn};
use crate::error::{LedgerError, LedgerResult, ValidationError};
use crate::model::{Account, LedgerStats};
use crate::referral::{ReferralCredit, ReferralEngine};

/// Result of [`AccountStore::ensure_account`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Registration {
    pub account: Account,
    /// `true` if this call created the account.
    pub created: bool,
    pub referral: ReferralCredit,
}

/// Add `amount` to an existing account inside a write unit and persist it.
pub(crate) fn credit_in(txn: &mut LedgerTxn<'_>, id: AccountId, amount: Amount) -> LedgerResult<Account> {
    let mut account = txn.account(id)?.ok_or(LedgerError::NotFound { account: id })?;
    account.balance = account
        .balance
        .checked_add(amount)
        .ok_or(ValidationError::BalanceOverflow(id))?;
    txn.put_account(&account)?;
    Ok(account)
}

#[derive(Clone, Debug)]
pub struct AccountStore {
    db: LedgerDb,
    referrals: ReferralEngine,
}

impl AccountStore {
    #[must_use]
    pub fn new(db: LedgerDb, referrals: ReferralEngine) -> Self {
        Self { db, referrals }
    }

    #[must_use]
    pub fn referrals(&self) -> &ReferralEngine {
        &self.referrals
    }

    /// Create the account if absent, crediting its referrer on creation.
    ///
    /// The existence check, the insert and the referrer credit form one
    /// write unit. An existing account is returned untouched.
    pub fn ensure_account(
        &self,
        id: AccountId,
        display_name: Option<&str>,
        referrer: Option<AccountId>,
        now: Timestamp,
    ) -> LedgerResult<Registration> {
        self.db.write(|txn| {
            if let Some(existing) = txn.account(id)? {
                return Ok(Registration {
                    account: existing,
                    created: false,
                    referral: ReferralCredit::AlreadyRegistered,
                });
            }

            let self_referral = referrer == Some(id);
            let referrer = referrer.filter(|r| *r != id);
            let account = Account::new(id, display_name.map(str::to_owned), referrer, now);
            txn.put_account(&account)?;

            let referral = match referrer {
                Some(r) => self.referrals.credit_referrer(txn, r, id)?,
                None if self_referral => ReferralCredit::SelfReferral,
                None => ReferralCredit::NotReferred,
            };

            info!("account {} registered (referrer: {:?})", id, account.referrer);
            Ok(Registration {
                account,
                created: true,
                referral,
            })
        })
    }

    pub fn get(&self, id: AccountId) -> LedgerResult<Account> {
        self.find(id)?.ok_or(LedgerError::NotFound { account: id })
    }

    pub fn find(&self, id: AccountId) -> LedgerResult<Option<Account>> {
        self.db.read(|v| v.account(id))
    }

    /// Atomic credit of an existing account.
    pub fn credit(&self, id: AccountId, amount: Amount) -> LedgerResult<Account> {
        self.db.write(|txn| credit_in(txn, id, amount))
    }

    /// Totals over a single snapshot. Used for reporting only.
    pub fn aggregate_stats(&self) -> LedgerResult<LedgerStats> {
        self.db.read(|v| {
            let mut stats = LedgerStats::default();
            for account in v.accounts()? {
                stats.accounts += 1;
                stats.total_balance = stats.total_balance.saturating_add(account.balance);
                stats.total_withdrawn = stats.total_withdrawn.saturating_add(account.withdrawn);
            }
            Ok(stats)
        })
    }

    pub fn account_ids(&self) -> LedgerResult<Vec<AccountId>> {
        self.db.read(|v| Ok(v.accounts()?.into_iter().map(|a| a.id).collect()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn store(dir: &std::path::Path) -> AccountStore {
        let db = LedgerDb::open(dir).unwrap();
        AccountStore::new(db, ReferralEngine::new(Amount::from_units(15), 19))
    }

    #[test]
    fn test_ensure_account_creates_once() {
        let dir = tempdir().unwrap();
        let store = store(dir.path());
        let id = AccountId::new(100);

        let first = store.ensure_account(id, Some("misha"), None, 10).unwrap();
        assert!(first.created);
        assert_eq!(first.referral, ReferralCredit::NotReferred);
        assert_eq!(first.account.balance, Amount::ZERO);
        assert_eq!(first.account.referral_count, 0);

        let second = store.ensure_account(id, Some("renamed"), None, 20).unwrap();
        assert!(!second.created);
        assert_eq!(second.referral, ReferralCredit::AlreadyRegistered);
        assert_eq!(second.account, first.account);
    }

    #[test]
    fn test_referrer_credited_on_creation() {
        let dir = tempdir().unwrap();
        let store = store(dir.path());
        let referrer = AccountId::new(50);
        store.ensure_account(referrer, None, None, 0).unwrap();

        let reg = store.ensure_account(AccountId::new(100), None, Some(referrer), 1).unwrap();
        assert_eq!(
            reg.referral,
            ReferralCredit::Credited { referrer, bonus: Amount::from_units(15), referral_count: 1 }
        );
        assert_eq!(reg.account.balance, Amount::ZERO);
        assert_eq!(reg.account.referrer, Some(referrer));

        let r = store.get(referrer).unwrap();
        assert_eq!(r.balance, Amount::from_units(15));
        assert_eq!(r.referral_count, 1);

        // a second /start for the same account credits nothing
        store.ensure_account(AccountId::new(100), None, Some(referrer), 2).unwrap();
        assert_eq!(store.get(referrer).unwrap().referral_count, 1);
    }

    #[test]
    fn test_unknown_and_self_referrer() {
        let dir = tempdir().unwrap();
        let store = store(dir.path());

        let reg = store.ensure_account(AccountId::new(1), None, Some(AccountId::new(999)), 0).unwrap();
        assert!(reg.created);
        assert_eq!(reg.referral, ReferralCredit::ReferrerNotFound { referrer: AccountId::new(999) });

        let reg = store.ensure_account(AccountId::new(2), None, Some(AccountId::new(2)), 0).unwrap();
        assert_eq!(reg.referral, ReferralCredit::SelfReferral);
        assert_eq!(reg.account.referrer, None);
        assert_eq!(store.get(AccountId::new(2)).unwrap().balance, Amount::ZERO);
    }

    #[test]
    fn test_referral_cap() {
        let dir = tempdir().unwrap();
        let store = store(dir.path());
        let referrer = AccountId::new(50);
        store.ensure_account(referrer, None, None, 0).unwrap();

        for i in 0..19 {
            let reg = store.ensure_account(AccountId::new(1_000 + i), None, Some(referrer), 0).unwrap();
            assert!(matches!(reg.referral, ReferralCredit::Credited { .. }));
        }
        let twentieth = store.ensure_account(AccountId::new(2_000), None, Some(referrer), 0).unwrap();
        assert_eq!(twentieth.referral, ReferralCredit::CapReached { referrer });

        let r = store.get(referrer).unwrap();
        assert_eq!(r.referral_count, 19);
        assert_eq!(r.balance, Amount::from_units(15 * 19));
    }

    #[test]
    fn test_get_unknown_is_not_found() {
        let dir = tempdir().unwrap();
        let store = store(dir.path());
        assert!(matches!(
            store.get(AccountId::new(4)),
            Err(LedgerError::NotFound { account }) if account == AccountId::new(4)
        ));
        assert!(matches!(
            store.credit(AccountId::new(4), Amount::from_units(1)),
            Err(LedgerError::NotFound { .. })
        ));
    }

    #[test]
    fn test_aggregate_stats() {
        let dir = tempdir().unwrap();
        let store = store(dir.path());
        assert_eq!(store.aggregate_stats().unwrap(), LedgerStats::default());

        store.ensure_account(AccountId::new(1), None, None, 0).unwrap();
        store.ensure_account(AccountId::new(2), None, None, 0).unwrap();
        store.credit(AccountId::new(1), Amount::from_minor(1050)).unwrap();
        store.credit(AccountId::new(2), Amount::from_units(5)).unwrap();

        let stats = store.aggregate_stats().unwrap();
        assert_eq!(stats.accounts, 2);
        assert_eq!(stats.total_balance, Amount::from_minor(1550));
        assert_eq!(stats.total_withdrawn, Amount::ZERO);
        assert_eq!(store.account_ids().unwrap(), vec![AccountId::new(1), AccountId::new(2)]);
    }

    #[test]
    fn test_credit_overflow_is_rejected() {
        let dir = tempdir().unwrap();
        let store = store(dir.path());
        let id = AccountId::new(1);
        store.ensure_account(id, None, None, 0).unwrap();
        store.credit(id, Amount::from_minor(u64::MAX)).unwrap();

        let err = store.credit(id, Amount::from_minor(1)).unwrap_err();
        assert!(matches!(err, LedgerError::Validation(ValidationError::BalanceOverflow(_))));
        assert_eq!(store.get(id).unwrap().balance, Amount::from_minor(u64::MAX));
    }
}
