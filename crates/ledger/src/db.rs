//! LMDB-backed ledger store.
//!
//! One LMDB environment holds a named database per bucket (see
//! [`crate::model`]). Values are bincode-serialized serde structs.
//!
//! ## Write units
//!
//! Every read-modify-write runs inside [`LedgerDb::write`]: the closure gets
//! a [`LedgerTxn`] over a single LMDB write transaction, which is committed
//! when the closure returns `Ok` and aborted otherwise. LMDB admits one writer
//! per environment, so write units are serialized across threads and tasks
//! and a failed unit leaves no partial effect.
//!
//! Reporting scans use [`LedgerDb::read`], a read-only snapshot.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use lmdb::{
    Cursor,
    Database,
    DatabaseFlags,
    Environment,
    RoTransaction,
    RwTransaction,
    Transaction as LmdbTxn,
    WriteFlags,
};
use rewardbot_common::AccountId;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::LedgerResult;
use crate::model::{Account, ChestReminder, ChestState, PromoCode, WithdrawalRequest};

// ════════════════════════════════════════════════════════════════════════════
// BUCKET CONSTANTS
// ════════════════════════════════════════════════════════════════════════════

pub const BUCKET_ACCOUNTS: &str = "accounts";
pub const BUCKET_CHESTS: &str = "chests";
pub const BUCKET_PROMO_CODES: &str = "promo_codes";
pub const BUCKET_PROMO_REDEMPTIONS: &str = "promo_redemptions";
pub const BUCKET_WITHDRAWALS: &str = "withdrawals";
pub const BUCKET_REMINDERS: &str = "reminders";
pub const BUCKET_META: &str = "meta";

/// Meta key holding the last issued withdrawal request id (u64 BE).
const META_WITHDRAWAL_SEQ: &[u8] = b"withdrawal_seq";

const MAX_DBS: u32 = 8;
const MAP_SIZE: usize = 1_000_000_000;

/// Named database handles. `Database` is a plain handle, cheap to copy.
#[doc(hidden)]
#[derive(Clone, Copy, Debug)]
pub struct Buckets {
    accounts: Database,
    chests: Database,
    promo_codes: Database,
    promo_redemptions: Database,
    withdrawals: Database,
    reminders: Database,
    meta: Database,
}

#[derive(Clone)]
pub struct LedgerDb {
    env: Arc<Environment>,
    env_path: PathBuf,
    buckets: Buckets,
}

impl std::fmt::Debug for LedgerDb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LedgerDb").field("env_path", &self.env_path).finish()
    }
}

impl LedgerDb {
    /// Open (or create) the LMDB environment at `path` and its buckets.
    pub fn open(path: impl AsRef<Path>) -> LedgerResult<Self> {
        let p = path.as_ref();
        std::fs::create_dir_all(p)?;

        let env = Environment::new()
            .set_max_dbs(MAX_DBS)
            .set_map_size(MAP_SIZE)
            .open(p)?;

        let buckets = Buckets {
            accounts: env.create_db(Some(BUCKET_ACCOUNTS), DatabaseFlags::empty())?,
            chests: env.create_db(Some(BUCKET_CHESTS), DatabaseFlags::empty())?,
            promo_codes: env.create_db(Some(BUCKET_PROMO_CODES), DatabaseFlags::empty())?,
            promo_redemptions: env.create_db(Some(BUCKET_PROMO_REDEMPTIONS), DatabaseFlags::empty())?,
            withdrawals: env.create_db(Some(BUCKET_WITHDRAWALS), DatabaseFlags::empty())?,
            reminders: env.create_db(Some(BUCKET_REMINDERS), DatabaseFlags::empty())?,
            meta: env.create_db(Some(BUCKET_META), DatabaseFlags::empty())?,
        };

        Ok(Self {
            env: Arc::new(env),
            env_path: p.to_path_buf(),
            buckets,
        })
    }

    /// Run `f` inside one write transaction. Commits on `Ok`, aborts on `Err`.
    pub fn write<T, F>(&self, f: F) -> LedgerResult<T>
    where
        F: FnOnce(&mut LedgerTxn<'_>) -> LedgerResult<T>,
    {
        let txn = self.env.begin_rw_txn()?;
        let mut unit = LedgerTxn {
            txn,
            buckets: self.buckets,
        };
        match f(&mut unit) {
            Ok(value) => {
                unit.txn.commit()?;
                Ok(value)
            }
            Err(e) => {
                unit.txn.abort();
                Err(e)
            }
        }
    }

    /// Run `f` against a read-only snapshot.
    pub fn read<T, F>(&self, f: F) -> LedgerResult<T>
    where
        F: FnOnce(&LedgerView<'_>) -> LedgerResult<T>,
    {
        let txn = self.env.begin_ro_txn()?;
        let view = LedgerView {
            txn,
            buckets: self.buckets,
        };
        f(&view)
    }
}

// ════════════════════════════════════════════════════════════════════════════
// KEYS AND CODEC
// ════════════════════════════════════════════════════════════════════════════

fn redemption_key(account: AccountId, code: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(8 + code.len());
    key.extend_from_slice(&account.to_key());
    key.extend_from_slice(code.as_bytes());
    key
}

fn fetch<T: LmdbTxn, V: DeserializeOwned>(txn: &T, db: Database, key: &[u8]) -> LedgerResult<Option<V>> {
    match txn.get(db, &key) {
        Ok(bytes) => Ok(Some(bincode::deserialize(bytes)?)),
        Err(lmdb::Error::NotFound) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

fn contains<T: LmdbTxn>(txn: &T, db: Database, key: &[u8]) -> LedgerResult<bool> {
    match txn.get(db, &key) {
        Ok(_) => Ok(true),
        Err(lmdb::Error::NotFound) => Ok(false),
        Err(e) => Err(e.into()),
    }
}

fn scan<T: LmdbTxn, V: DeserializeOwned>(txn: &T, db: Database) -> LedgerResult<Vec<V>> {
    let mut cursor = txn.open_ro_cursor(db)?;
    let mut out = Vec::new();
    for (_key, value) in cursor.iter() {
        out.push(bincode::deserialize(value)?);
    }
    Ok(out)
}

// ════════════════════════════════════════════════════════════════════════════
// READ ACCESS (shared by write units and snapshots)
// ════════════════════════════════════════════════════════════════════════════

/// Typed reads available both inside a write unit and on a snapshot.
pub trait LedgerRead {
    type Txn: LmdbTxn;

    #[doc(hidden)]
    fn raw(&self) -> &Self::Txn;

    #[doc(hidden)]
    fn buckets(&self) -> Buckets;

    fn account(&self, id: AccountId) -> LedgerResult<Option<Account>> {
        fetch(self.raw(), self.buckets().accounts, &id.to_key())
    }

    fn accounts(&self) -> LedgerResult<Vec<Account>> {
        scan(self.raw(), self.buckets().accounts)
    }

    fn chest(&self, id: AccountId) -> LedgerResult<Option<ChestState>> {
        fetch(self.raw(), self.buckets().chests, &id.to_key())
    }

    fn chests(&self) -> LedgerResult<Vec<ChestState>> {
        scan(self.raw(), self.buckets().chests)
    }

    fn promo_code(&self, code: &str) -> LedgerResult<Option<PromoCode>> {
        fetch(self.raw(), self.buckets().promo_codes, code.as_bytes())
    }

    fn promo_codes(&self) -> LedgerResult<Vec<PromoCode>> {
        scan(self.raw(), self.buckets().promo_codes)
    }

    fn has_redeemed(&self, account: AccountId, code: &str) -> LedgerResult<bool> {
        contains(self.raw(), self.buckets().promo_redemptions, &redemption_key(account, code))
    }

    /// All requests in id order.
    fn withdrawals(&self) -> LedgerResult<Vec<WithdrawalRequest>> {
        scan(self.raw(), self.buckets().withdrawals)
    }

    fn reminder(&self, id: AccountId) -> LedgerResult<Option<ChestReminder>> {
        fetch(self.raw(), self.buckets().reminders, &id.to_key())
    }

    fn reminders(&self) -> LedgerResult<Vec<ChestReminder>> {
        scan(self.raw(), self.buckets().reminders)
    }
}

/// A write unit. Obtained from [`LedgerDb::write`].
pub struct LedgerTxn<'env> {
    txn: RwTransaction<'env>,
    buckets: Buckets,
}

impl<'env> LedgerRead for LedgerTxn<'env> {
    type Txn = RwTransaction<'env>;

    fn raw(&self) -> &Self::Txn {
        &self.txn
    }

    fn buckets(&self) -> Buckets {
        self.buckets
    }
}

impl<'env> LedgerTxn<'env> {
    fn put<V: Serialize>(&mut self, db: Database, key: &[u8], value: &V) -> LedgerResult<()> {
        let blob = bincode::serialize(value)?;
        self.txn.put(db, &key, &blob, WriteFlags::empty())?;
        Ok(())
    }

    pub fn put_account(&mut self, account: &Account) -> LedgerResult<()> {
        self.put(self.buckets.accounts, &account.id.to_key(), account)
    }

    pub fn put_chest(&mut self, chest: &ChestState) -> LedgerResult<()> {
        self.put(self.buckets.chests, &chest.account.to_key(), chest)
    }

    pub fn put_promo_code(&mut self, promo: &PromoCode) -> LedgerResult<()> {
        self.put(self.buckets.promo_codes, promo.code.as_bytes(), promo)
    }

    pub fn put_redemption(&mut self, account: AccountId, code: &str) -> LedgerResult<()> {
        let key = redemption_key(account, code);
        let marker: [u8; 1] = [0x01];
        self.txn.put(self.buckets.promo_redemptions, &key, &marker, WriteFlags::empty())?;
        Ok(())
    }

    /// Reserve the next withdrawal request id. Ids start at 1 and are only
    /// consumed if the enclosing unit commits.
    pub fn next_withdrawal_id(&mut self) -> LedgerResult<u64> {
        let last = match self.txn.get(self.buckets.meta, &META_WITHDRAWAL_SEQ) {
            Ok(bytes) => {
                let arr: [u8; 8] = bytes
                    .try_into()
                    .map_err(|_| crate::error::LedgerError::Store("corrupt withdrawal sequence".into()))?;
                u64::from_be_bytes(arr)
            }
            Err(lmdb::Error::NotFound) => 0,
            Err(e) => return Err(e.into()),
        };
        let next = last.saturating_add(1);
        self.txn.put(
            self.buckets.meta,
            &META_WITHDRAWAL_SEQ,
            &next.to_be_bytes(),
            WriteFlags::empty(),
        )?;
        Ok(next)
    }

    pub fn put_withdrawal(&mut self, request: &WithdrawalRequest) -> LedgerResult<()> {
        self.put(self.buckets.withdrawals, &request.id.to_be_bytes(), request)
    }

    pub fn put_reminder(&mut self, reminder: &ChestReminder) -> LedgerResult<()> {
        self.put(self.buckets.reminders, &reminder.account.to_key(), reminder)
    }

    /// Overwrite a reminder row with bytes that do not decode.
    #[cfg(test)]
    pub(crate) fn corrupt_reminder(&mut self, id: AccountId) -> LedgerResult<()> {
        self.txn.put(self.buckets.reminders, &id.to_key(), &[0xffu8], WriteFlags::empty())?;
        Ok(())
    }

    /// Returns `true` if a reminder was removed.
    pub fn delete_reminder(&mut self, id: AccountId) -> LedgerResult<bool> {
        match self.txn.del(self.buckets.reminders, &id.to_key(), None) {
            Ok(()) => Ok(true),
            Err(lmdb::Error::NotFound) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

/// A read-only snapshot. Obtained from [`LedgerDb::read`].
pub struct LedgerView<'env> {
    txn: RoTransaction<'env>,
    buckets: Buckets,
}

impl<'env> LedgerRead for LedgerView<'env> {
    type Txn = RoTransaction<'env>;

    fn raw(&self) -> &Self::Txn {
        &self.txn
    }

    fn buckets(&self) -> Buckets {
        self.buckets
    }
}
