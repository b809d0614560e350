//! # Admin Control
//!
//! Every operation here checks the caller against the [`RoleTable`] first
//! and fails with [`LedgerError::PermissionDenied`] when the capability is
//! missing.
//!
//! | Operation | Capability |
//! |-----------|------------|
//! | [`AdminControl::stats`] | `view_stats` |
//! | [`AdminControl::set_payout_mode`], [`AdminControl::toggle_payout_mode`] | `set_payout_mode` |
//! | [`AdminControl::create_promo`] | `manage_promos` |
//! | [`AdminControl::broadcast`] | `broadcast` |
//!
//! The payout mode lives in memory and starts from the configured default on
//! every process start.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use parking_lot::RwLock;
use rewardbot_common::{AccountId, AdminEntry, Capability, PayoutMode};
use tracing::{info, warn};

use crate::accounts::AccountStore;
use crate::error::{LedgerError, LedgerResult};
use crate::model::{LedgerStats, PromoCode};
use crate::promo::{parse_create_request, PromoEngine};
use crate::transport::{Outbound, Transport};

// ════════════════════════════════════════════════════════════════════════════
// ROLE TABLE
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Debug, Default)]
pub struct RoleTable {
    grants: HashMap<AccountId, HashSet<Capability>>,
}

impl RoleTable {
    /// Entries for the same id are merged.
    #[must_use]
    pub fn from_entries(entries: &[AdminEntry]) -> Self {
        let mut grants: HashMap<AccountId, HashSet<Capability>> = HashMap::new();
        for entry in entries {
            grants
                .entry(entry.id)
                .or_default()
                .extend(entry.effective_capabilities());
        }
        Self { grants }
    }

    #[must_use]
    pub fn allows(&self, caller: AccountId, capability: Capability) -> bool {
        self.grants
            .get(&caller)
            .is_some_and(|caps| caps.contains(&capability))
    }
}

// ════════════════════════════════════════════════════════════════════════════
// BROADCAST REPORT
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    pub attempted: usize,
    pub delivered: usize,
    /// Recipients whose delivery failed, in ascending id order.
    pub failed: Vec<AccountId>,
}

// ════════════════════════════════════════════════════════════════════════════
// ADMIN CONTROL
// ════════════════════════════════════════════════════════════════════════════

pub struct AdminControl {
    roles: RoleTable,
    mode: RwLock<PayoutMode>,
    accounts: AccountStore,
    promos: PromoEngine,
    transport: Arc<dyn Transport>,
    broadcast_concurrency: usize,
}

impl AdminControl {
    pub fn new(
        roles: RoleTable,
        initial_mode: PayoutMode,
        accounts: AccountStore,
        promos: PromoEngine,
        transport: Arc<dyn Transport>,
        broadcast_concurrency: usize,
    ) -> Self {
        Self {
            roles,
            mode: RwLock::new(initial_mode),
            accounts,
            promos,
            transport,
            broadcast_concurrency: broadcast_concurrency.max(1),
        }
    }

    pub fn authorize(&self, caller: AccountId, capability: Capability) -> LedgerResult<()> {
        if self.roles.allows(caller, capability) {
            Ok(())
        } else {
            warn!("account {} denied {}", caller, capability);
            Err(LedgerError::PermissionDenied { caller, capability })
        }
    }

    /// Current payout mode. Not gated: withdrawals read it on every request.
    #[must_use]
    pub fn payout_mode(&self) -> PayoutMode {
        *self.mode.read()
    }

    pub fn set_payout_mode(&self, caller: AccountId, mode: PayoutMode) -> LedgerResult<PayoutMode> {
        self.authorize(caller, Capability::SetPayoutMode)?;
        *self.mode.write() = mode;
        info!("payout mode set to {} by {}", mode, caller);
        Ok(mode)
    }

    pub fn toggle_payout_mode(&self, caller: AccountId) -> LedgerResult<PayoutMode> {
        self.authorize(caller, Capability::SetPayoutMode)?;
        let mut guard = self.mode.write();
        *guard = guard.toggled();
        info!("payout mode toggled to {} by {}", *guard, caller);
        Ok(*guard)
    }

    pub fn stats(&self, caller: AccountId) -> LedgerResult<LedgerStats> {
        self.authorize(caller, Capability::ViewStats)?;
        self.accounts.aggregate_stats()
    }

    /// Create a code from the admin text `<CODE> <amount>`.
    pub fn create_promo(&self, caller: AccountId, text: &str) -> LedgerResult<PromoCode> {
        self.authorize(caller, Capability::ManagePromos)?;
        let request = parse_create_request(text)?;
        self.promos.create_from_request(&request)
    }

    /// Deliver `text` to every account, at most `broadcast_concurrency` at a
    /// time. Per-recipient failures are logged and reported, never fatal.
    pub async fn broadcast(&self, caller: AccountId, text: &str) -> LedgerResult<BroadcastReport> {
        self.authorize(caller, Capability::Broadcast)?;
        let recipients = self.accounts.account_ids()?;
        let message = Outbound::Text(text.to_owned());

        let results: Vec<(AccountId, bool)> = stream::iter(recipients.iter().copied())
            .map(|to| {
                let transport = Arc::clone(&self.transport);
                let message = &message;
                async move {
                    match transport.deliver(to, message).await {
                        Ok(()) => (to, true),
                        Err(e) => {
                            warn!("broadcast to {} failed: {}", to, e);
                            (to, false)
                        }
                    }
                }
            })
            .buffer_unordered(self.broadcast_concurrency)
            .collect()
            .await;

        let mut report = BroadcastReport {
            attempted: recipients.len(),
            ..BroadcastReport::default()
        };
        for (to, ok) in results {
            if ok {
                report.delivered += 1;
            } else {
                report.failed.push(to);
            }
        }
        report.failed.sort_unstable();

        info!(
            "broadcast by {}: {}/{} delivered",
            caller, report.delivered, report.attempted
        );
        Ok(report)
    }
}

impl std::fmt::Debug for AdminControl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminControl")
            .field("roles", &self.roles)
            .field("mode", &self.payout_mode())
            .field("broadcast_concurrency", &self.broadcast_concurrency)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::LedgerDb;
    use crate::error::ValidationError;
    use crate::referral::ReferralEngine;
    use crate::transport::MockTransport;
    use rewardbot_common::Amount;
    use tempfile::tempdir;

    const ADMIN: AccountId = AccountId::new(7_726_017_677);
    const VIEWER: AccountId = AccountId::new(42);
    const USER: AccountId = AccountId::new(1);

    fn setup(dir: &std::path::Path) -> (AccountStore, Arc<MockTransport>, AdminControl) {
        let db = LedgerDb::open(dir).unwrap();
        let accounts = AccountStore::new(db.clone(), ReferralEngine::new(Amount::from_units(15), 19));
        let transport = Arc::new(MockTransport::new());
        let roles = RoleTable::from_entries(&[
            AdminEntry::full(ADMIN),
            AdminEntry { id: VIEWER, capabilities: vec![Capability::ViewStats] },
        ]);
        let admin = AdminControl::new(
            roles,
            PayoutMode::Fake,
            accounts.clone(),
            PromoEngine::new(db),
            transport.clone(),
            2,
        );
        (accounts, transport, admin)
    }

    #[test]
    fn test_role_table() {
        let roles = RoleTable::from_entries(&[
            AdminEntry { id: VIEWER, capabilities: vec![Capability::ViewStats] },
            AdminEntry { id: VIEWER, capabilities: vec![Capability::Broadcast] },
        ]);
        assert!(roles.allows(VIEWER, Capability::ViewStats));
        assert!(roles.allows(VIEWER, Capability::Broadcast));
        assert!(!roles.allows(VIEWER, Capability::ManagePromos));
        assert!(!roles.allows(USER, Capability::ViewStats));
    }

    #[test]
    fn test_payout_mode_changes() {
        let dir = tempdir().unwrap();
        let (_accounts, _transport, admin) = setup(dir.path());

        assert_eq!(admin.payout_mode(), PayoutMode::Fake);
        assert_eq!(admin.toggle_payout_mode(ADMIN).unwrap(), PayoutMode::Real);
        assert_eq!(admin.payout_mode(), PayoutMode::Real);
        assert_eq!(admin.set_payout_mode(ADMIN, PayoutMode::Fake).unwrap(), PayoutMode::Fake);

        let err = admin.toggle_payout_mode(VIEWER).unwrap_err();
        assert!(matches!(
            err,
            LedgerError::PermissionDenied { caller, capability: Capability::SetPayoutMode } if caller == VIEWER
        ));
        assert_eq!(admin.payout_mode(), PayoutMode::Fake);
    }

    #[test]
    fn test_stats_and_promo_permissions() {
        let dir = tempdir().unwrap();
        let (accounts, _transport, admin) = setup(dir.path());
        accounts.ensure_account(USER, None, None, 0).unwrap();

        assert_eq!(admin.stats(VIEWER).unwrap().accounts, 1);
        assert!(matches!(admin.stats(USER), Err(LedgerError::PermissionDenied { .. })));

        assert!(matches!(
            admin.create_promo(VIEWER, "PROMO10 10"),
            Err(LedgerError::PermissionDenied { capability: Capability::ManagePromos, .. })
        ));
        let created = admin.create_promo(ADMIN, "PROMO10 10").unwrap();
        assert_eq!(created.reward, Amount::from_units(10));

        assert!(matches!(
            admin.create_promo(ADMIN, "PROMO10 0"),
            Err(LedgerError::Validation(ValidationError::ZeroReward))
        ));
        assert!(matches!(
            admin.create_promo(ADMIN, "just text"),
            Err(LedgerError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_broadcast_reports_failures() {
        let dir = tempdir().unwrap();
        let (accounts, transport, admin) = setup(dir.path());
        for id in 1..=5 {
            accounts.ensure_account(AccountId::new(id), None, None, 0).unwrap();
        }
        transport.fail_for(AccountId::new(2));
        transport.fail_for(AccountId::new(4));

        let report = admin.broadcast(ADMIN, "hello").await.unwrap();
        assert_eq!(report.attempted, 5);
        assert_eq!(report.delivered, 3);
        assert_eq!(report.failed, vec![AccountId::new(2), AccountId::new(4)]);
        assert_eq!(transport.delivered().len(), 3);
        assert!(transport
            .delivered()
            .iter()
            .all(|(_, m)| *m == Outbound::Text("hello".into())));

        assert!(matches!(
            admin.broadcast(VIEWER, "nope").await,
            Err(LedgerError::PermissionDenied { capability: Capability::Broadcast, .. })
        ));
        assert_eq!(transport.delivered().len(), 3);
    }
}
