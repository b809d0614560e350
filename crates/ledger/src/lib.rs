//! # rewardbot Ledger
//!
//! Transactional core of the reward bot: accounts, capped referral bonuses,
//! a cooldown-gated chest, single-use promo codes and withdrawal requests,
//! stored in LMDB.
//!
//! ## Modules
//! - `db`: LMDB environment, buckets and write units
//! - `model`: persisted records
//! - `accounts`: account creation and balance credits
//! - `referral`: referral bonus with a per-referrer cap
//! - `chest`: cooldown window and chest grants
//! - `promo`: promo code creation and redemption
//! - `withdrawal`: withdrawal requests under FAKE / REAL payout
//! - `admin`: role table, payout mode, stats, broadcast
//! - `transport`: outbound delivery trait and mock
//! - `reminder`: durable chest-ready reminders and their worker
//! - `service`: `Inbound` command to `Outcome` dispatch
//!
//! ## Atomicity
//!
//! Each balance-affecting operation is one LMDB write transaction. LMDB has a
//! single writer per environment, so concurrent callers are serialized and an
//! aborted operation leaves nothing behind.

pub mod accounts;
pub mod admin;
pub mod chest;
pub mod db;
pub mod error;
pub mod model;
pub mod promo;
pub mod referral;
pub mod reminder;
pub mod service;
pub mod transport;
pub mod withdrawal;

pub use accounts::{AccountStore, Registration};
pub use admin::{AdminControl, BroadcastReport, RoleTable};
pub use chest::{ChestEngine, ChestOutcome, CooldownWindow};
pub use db::{LedgerDb, LedgerRead};
pub use error::{LedgerError, LedgerResult, ValidationError};
pub use model::{Account, ChestReminder, ChestState, LedgerStats, PromoCode, WithdrawalRequest, WithdrawalStatus};
pub use promo::{normalize_code, parse_create_request, CreatePromoRequest, PromoEngine, PromoOutcome, PromoRejection};
pub use referral::{ReferralCredit, ReferralEngine};
pub use reminder::ReminderWorker;
pub use service::{Command, Inbound, LedgerService, Outcome};
pub use transport::{MockTransport, Outbound, Transport, TransportError};
pub use withdrawal::{WithdrawalEngine, WithdrawalFilter, WithdrawalOutcome, WithdrawalRejection};
