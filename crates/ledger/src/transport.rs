//! # Outbound Transport
//!
//! The ledger never talks to a chat network itself. Unsolicited messages
//! (chest reminders, broadcasts) are handed to a [`Transport`]; replies to
//! commands are returned as [`crate::service::Outcome`] values and rendered
//! by the caller.
//!
//! ## Contract
//!
//! - Implementations must not retry internally.
//! - Implementations must not panic.
//! - An unreachable recipient is reported as [`TransportError::Unreachable`].

use std::collections::HashSet;

use async_trait::async_trait;
use parking_lot::Mutex;
use rewardbot_common::AccountId;
use thiserror::Error;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outbound {
    /// The recipient's chest can be opened again.
    ChestReady,
    /// Free text, used by broadcast.
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("recipient {0} is unreachable")]
    Unreachable(AccountId),

    #[error("delivery failed: {0}")]
    Failed(String),
}

#[async_trait]
pub trait Transport: Send + Sync {
    async fn deliver(&self, to: AccountId, message: &Outbound) -> Result<(), TransportError>;
}

// ════════════════════════════════════════════════════════════════════════════
// MOCK TRANSPORT
// ════════════════════════════════════════════════════════════════════════════

/// Records every delivery in order. Recipients marked with
/// [`MockTransport::fail_for`] get [`TransportError::Unreachable`] and are
/// not recorded.
#[derive(Debug, Default)]
pub struct MockTransport {
    delivered: Mutex<Vec<(AccountId, Outbound)>>,
    unreachable: Mutex<HashSet<AccountId>>,
}

impl MockTransport {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_for(&self, id: AccountId) {
        self.unreachable.lock().insert(id);
    }

    /// Snapshot of successful deliveries.
    #[must_use]
    pub fn delivered(&self) -> Vec<(AccountId, Outbound)> {
        self.delivered.lock().clone()
    }

    pub fn delivered_to(&self, id: AccountId) -> Vec<Outbound> {
        self.delivered
            .lock()
            .iter()
            .filter(|(to, _)| *to == id)
            .map(|(_, m)| m.clone())
            .collect()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn deliver(&self, to: AccountId, message: &Outbound) -> Result<(), TransportError> {
        if self.unreachable.lock().contains(&to) {
            return Err(TransportError::Unreachable(to));
        }
        self.delivered.lock().push((to, message.clone()));
        Ok(())
    }
}

const _: () = {
    fn assert_send_sync<T: Send + Sync>() {}
    fn check() {
        assert_send_sync::<MockTransport>();
    }
    let _ = check;
};
