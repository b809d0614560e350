//! Chest-ready reminders.
//!
//! Reminders are rows in the `reminders` bucket, written together with the
//! chest grant. [`ReminderWorker`] polls for rows whose `fire_at` has passed,
//! delivers [`Outbound::ChestReady`] and then deletes the row, unless the row
//! was replaced by a newer grant in the meantime. Delivery is best effort: a
//! failed delivery is logged and the row is still cleared. A row that cannot
//! be cleared is logged and left for the next run.
//!
//! On startup [`ReminderWorker::recovery_sweep`] recreates rows for chests
//! whose window is still running and that have no row, so a lost or pruned
//! row does not drop the notification.

use std::sync::Arc;

use rewardbot_common::{AccountId, Clock};
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::{sleep, Duration};
use tracing::{debug, info, warn};

use crate::chest::CooldownWindow;
use crate::db::{LedgerDb, LedgerRead};
use crate::error::LedgerResult;
use crate::model::ChestReminder;
use crate::transport::{Outbound, Transport};

pub struct ReminderWorker {
    db: LedgerDb,
    transport: Arc<dyn Transport>,
    clock: Arc<dyn Clock>,
    cooldown_secs: u64,
    pub interval_secs: u64,
    shutdown: Arc<Notify>,
}

impl ReminderWorker {
    pub fn new(
        db: LedgerDb,
        transport: Arc<dyn Transport>,
        clock: Arc<dyn Clock>,
        cooldown_secs: u64,
        interval_secs: u64,
        shutdown: Arc<Notify>,
    ) -> Self {
        Self {
            db,
            transport,
            clock,
            cooldown_secs,
            interval_secs,
            shutdown,
        }
    }

    pub fn start(self: Arc<Self>) -> JoinHandle<()> {
        tokio::spawn(async move {
            match self.recovery_sweep() {
                Ok(n) if n > 0 => info!("reminder recovery restored {} reminders", n),
                Ok(_) => {}
                Err(e) => warn!("reminder recovery failed: {}", e),
            }
            info!("reminder worker started: polling every {}s", self.interval_secs);
            loop {
                tokio::select! {
                    _ = self.shutdown.notified() => {
                        info!("reminder worker shutting down");
                        break;
                    }
                    _ = sleep(Duration::from_secs(self.interval_secs)) => {
                        if let Err(e) = self.deliver_due().await {
                            warn!("reminder run failed: {}", e);
                        }
                    }
                }
            }
        })
    }

    /// Deliver every reminder due at the clock's current time. Returns the
    /// number of successful deliveries.
    pub async fn deliver_due(&self) -> LedgerResult<usize> {
        let now = self.clock.now();
        let due: Vec<ChestReminder> = self
            .db
            .read(|v| v.reminders())?
            .into_iter()
            .filter(|r| r.fire_at <= now)
            .collect();

        let mut delivered = 0;
        for reminder in due {
            match self.transport.deliver(reminder.account, &Outbound::ChestReady).await {
                Ok(()) => delivered += 1,
                Err(e) => warn!("chest reminder for {} not delivered: {}", reminder.account, e),
            }
            if let Err(e) = self.clear(reminder.account, reminder.fire_at) {
                warn!("chest reminder for {} not cleared: {}", reminder.account, e);
            }
        }
        if delivered > 0 {
            debug!("delivered {} chest reminders", delivered);
        }
        Ok(delivered)
    }

    /// Remove the reminder for `account` only if it still fires at `fire_at`.
    fn clear(&self, account: AccountId, fire_at: u64) -> LedgerResult<bool> {
        self.db.write(|txn| match txn.reminder(account)? {
            Some(current) if current.fire_at == fire_at => txn.delete_reminder(account),
            _ => Ok(false),
        })
    }

    /// Recreate reminders for running chest windows that have none. Returns
    /// the number of rows written.
    pub fn recovery_sweep(&self) -> LedgerResult<usize> {
        let now = self.clock.now();
        self.db.write(|txn| {
            let mut restored = 0;
            for chest in txn.chests()? {
                let window = CooldownWindow::new(chest.last_open, self.cooldown_secs);
                if window.expires_at() <= now || txn.reminder(chest.account)?.is_some() {
                    continue;
                }
                txn.put_reminder(&ChestReminder {
                    account: chest.account,
                    fire_at: window.expires_at(),
                })?;
                restored += 1;
            }
            Ok(restored)
        })
    }
}
