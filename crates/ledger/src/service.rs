//! # Command Dispatch
//!
//! [`LedgerService`] is the single entry point a chat front end talks to.
//! It turns an [`Inbound`] command into an [`Outcome`] and leaves rendering
//! to the caller.
//!
//! ```text
//!   front end ──Inbound──▶ LedgerService ──▶ engines ──▶ LedgerDb (LMDB)
//!        ▲                      │
//!        └──────Outcome─────────┘      ReminderWorker ──Outbound──▶ Transport
//! ```
//!
//! User commands auto-register the caller (without a referrer) so a command
//! arriving before `Start` still has an account to act on. Admin commands
//! never create accounts.

use std::path::Path;
use std::sync::Arc;

use rewardbot_common::{AccountId, Amount, Clock, LedgerConfig, PayoutMode};
use tokio::sync::Notify;
use tracing::debug;

use crate::accounts::{AccountStore, Registration};
use crate::admin::{AdminControl, BroadcastReport, RoleTable};
use crate::chest::{ChestEngine, ChestOutcome};
use crate::db::LedgerDb;
use crate::error::LedgerResult;
use crate::model::{Account, LedgerStats, PromoCode};
use crate::promo::{PromoEngine, PromoOutcome};
use crate::referral::ReferralEngine;
use crate::reminder::ReminderWorker;
use crate::transport::Transport;
use crate::withdrawal::{WithdrawalEngine, WithdrawalOutcome};

// ════════════════════════════════════════════════════════════════════════════
// COMMANDS AND OUTCOMES
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    Start { referrer: Option<AccountId> },
    GetProfile,
    GetReferralLink,
    OpenChest,
    RedeemPromo(String),
    RequestWithdrawal,
    // admin
    GetStats,
    SetPayoutMode(PayoutMode),
    TogglePayoutMode,
    CreatePromoCode(String),
    Broadcast(String),
}

impl Command {
    #[must_use]
    pub fn is_admin(&self) -> bool {
        matches!(
            self,
            Command::GetStats
                | Command::SetPayoutMode(_)
                | Command::TogglePayoutMode
                | Command::CreatePromoCode(_)
                | Command::Broadcast(_)
        )
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Inbound {
    pub account: AccountId,
    pub display_name: Option<String>,
    pub command: Command,
}

impl Inbound {
    #[must_use]
    pub fn new(account: AccountId, command: Command) -> Self {
        Self {
            account,
            display_name: None,
            command,
        }
    }

    #[must_use]
    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    Started(Registration),
    Profile(Account),
    ReferralLink {
        link: String,
        bonus: Amount,
        referral_count: u32,
        cap: u32,
    },
    Chest(ChestOutcome),
    Promo(PromoOutcome),
    Withdrawal(WithdrawalOutcome),
    Stats(LedgerStats),
    PayoutMode(PayoutMode),
    PromoCreated(PromoCode),
    Broadcast(BroadcastReport),
}

// ════════════════════════════════════════════════════════════════════════════
// SERVICE
// ════════════════════════════════════════════════════════════════════════════

pub struct LedgerService {
    db: LedgerDb,
    accounts: AccountStore,
    chest: ChestEngine,
    promos: PromoEngine,
    withdrawals: WithdrawalEngine,
    admin: AdminControl,
    transport: Arc<dyn Transport>,
    clock: Arc<dyn Clock>,
    bot_username: String,
    reminder_poll_secs: u64,
}

impl LedgerService {
    /// Open the store under `config.data_dir` and wire every engine.
    pub fn open(config: &LedgerConfig, transport: Arc<dyn Transport>, clock: Arc<dyn Clock>) -> LedgerResult<Self> {
        let db = LedgerDb::open(Path::new(&config.data_dir))?;
        Ok(Self::new(db, config, transport, clock))
    }

    pub fn new(db: LedgerDb, config: &LedgerConfig, transport: Arc<dyn Transport>, clock: Arc<dyn Clock>) -> Self {
        let rewards = &config.rewards;
        let accounts = AccountStore::new(db.clone(), ReferralEngine::from_config(rewards));
        let promos = PromoEngine::new(db.clone());
        let admin = AdminControl::new(
            RoleTable::from_entries(&config.admins),
            config.default_payout_mode,
            accounts.clone(),
            promos.clone(),
            Arc::clone(&transport),
            config.broadcast_concurrency,
        );
        Self {
            chest: ChestEngine::from_config(db.clone(), rewards),
            withdrawals: WithdrawalEngine::from_config(db.clone(), rewards),
            db,
            accounts,
            promos,
            admin,
            transport,
            clock,
            bot_username: config.bot_username.clone(),
            reminder_poll_secs: config.reminder_poll_secs,
        }
    }

    pub async fn handle(&self, inbound: Inbound) -> LedgerResult<Outcome> {
        let Inbound { account, display_name, command } = inbound;
        let now = self.clock.now();
        debug!("{} -> {:?}", account, command);

        if !command.is_admin() && !matches!(command, Command::Start { .. }) {
            self.accounts.ensure_account(account, display_name.as_deref(), None, now)?;
        }

        let outcome = match command {
            Command::Start { referrer } => {
                Outcome::Started(self.accounts.ensure_account(account, display_name.as_deref(), referrer, now)?)
            }
            Command::GetProfile => Outcome::Profile(self.accounts.get(account)?),
            Command::GetReferralLink => {
                let current = self.accounts.get(account)?;
                let referrals = self.accounts.referrals();
                Outcome::ReferralLink {
                    link: self.referral_link(account),
                    bonus: referrals.bonus(),
                    referral_count: current.referral_count,
                    cap: referrals.cap(),
                }
            }
            Command::OpenChest => Outcome::Chest(self.chest.open(account, now)?),
            Command::RedeemPromo(code) => Outcome::Promo(self.promos.redeem(account, &code)?),
            Command::RequestWithdrawal => {
                let mode = self.admin.payout_mode();
                Outcome::Withdrawal(self.withdrawals.request(account, mode, now)?)
            }
            Command::GetStats => Outcome::Stats(self.admin.stats(account)?),
            Command::SetPayoutMode(mode) => Outcome::PayoutMode(self.admin.set_payout_mode(account, mode)?),
            Command::TogglePayoutMode => Outcome::PayoutMode(self.admin.toggle_payout_mode(account)?),
            Command::CreatePromoCode(text) => Outcome::PromoCreated(self.admin.create_promo(account, &text)?),
            Command::Broadcast(text) => Outcome::Broadcast(self.admin.broadcast(account, &text).await?),
        };
        Ok(outcome)
    }

    /// `https://t.me/<bot>?start=<id>`
    #[must_use]
    pub fn referral_link(&self, account: AccountId) -> String {
        format!("https://t.me/{}?start={}", self.bot_username, account)
    }

    /// A reminder worker over this service's store, transport and clock.
    #[must_use]
    pub fn reminder_worker(&self, shutdown: Arc<Notify>) -> ReminderWorker {
        ReminderWorker::new(
            self.db.clone(),
            Arc::clone(&self.transport),
            Arc::clone(&self.clock),
            self.chest.cooldown_secs(),
            self.reminder_poll_secs,
            shutdown,
        )
    }

    #[must_use]
    pub fn db(&self) -> &LedgerDb {
        &self.db
    }

    #[must_use]
    pub fn accounts(&self) -> &AccountStore {
        &self.accounts
    }

    #[must_use]
    pub fn chest(&self) -> &ChestEngine {
        &self.chest
    }

    #[must_use]
    pub fn promos(&self) -> &PromoEngine {
        &self.promos
    }

    #[must_use]
    pub fn withdrawals(&self) -> &WithdrawalEngine {
        &self.withdrawals
    }

    #[must_use]
    pub fn admin(&self) -> &AdminControl {
        &self.admin
    }
}
