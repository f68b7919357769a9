//! Auto-lock timer.
//!
//! At most one timer exists at any instant. Unlock schedules it, an
//! explicit reset or a duration change reschedules it, and lock (of any
//! kind) cancels it.

use crate::service::{LockReason, VaultService};
use crate::topics::{VAULT_LOCKED, VAULT_UNLOCKED};
use parking_lot::Mutex;
use shared_bus::{Messenger, SubscriptionHandle};
use shared_types::TimeSource;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::debug;

/// Owns the single-shot auto-lock timer.
pub struct AutoLockController {
    vault: Arc<VaultService>,
    time: Arc<dyn TimeSource>,
    timer: Mutex<Option<JoinHandle<()>>>,
    subscriptions: Mutex<Vec<SubscriptionHandle>>,
}

impl AutoLockController {
    pub fn new(vault: Arc<VaultService>, time: Arc<dyn TimeSource>) -> Arc<Self> {
        Arc::new(Self {
            vault,
            time,
            timer: Mutex::new(None),
            subscriptions: Mutex::new(Vec::new()),
        })
    }

    /// Wire the controller onto the bus: schedule on unlock, cancel on
    /// lock.
    pub fn start(self: &Arc<Self>, messenger: &Messenger) {
        let on_unlock = {
            let controller = Arc::clone(self);
            messenger.subscribe(&VAULT_UNLOCKED, move |_| {
                controller.schedule();
                Ok(())
            })
        };
        let on_lock = {
            let controller = Arc::clone(self);
            messenger.subscribe(&VAULT_LOCKED, move |_reason| {
                controller.cancel();
                Ok(())
            })
        };
        let mut subscriptions = self.subscriptions.lock();
        subscriptions.push(on_unlock);
        subscriptions.push(on_lock);
    }

    /// Restart the countdown. Called by the UI on user activity; a no-op
    /// while locked.
    pub fn reset(self: &Arc<Self>) {
        if self.vault.is_unlocked() {
            self.schedule();
        }
    }

    /// Apply a new duration (the vault clamps it) and restart the
    /// countdown if a session is open.
    pub async fn set_duration(
        self: &Arc<Self>,
        ms: u64,
    ) -> shared_types::WalletResult<u64> {
        let effective = self.vault.set_auto_lock_duration(ms).await?;
        self.reset();
        Ok(effective)
    }

    /// Cancel the timer and unsubscribe. Part of runtime teardown.
    pub fn destroy(&self) {
        self.cancel();
        for subscription in self.subscriptions.lock().drain(..) {
            subscription.unsubscribe();
        }
    }

    fn schedule(self: &Arc<Self>) {
        let duration_ms = self.vault.auto_lock_duration_ms();
        let vault = Arc::clone(&self.vault);
        let fires_at = self.time.now() + duration_ms;

        let handle = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(duration_ms)).await;
            debug!("auto-lock timer fired");
            vault.lock(LockReason::Timeout);
        });

        // Replacing the handle aborts the previous countdown: one timer,
        // ever.
        if let Some(previous) = self.timer.lock().replace(handle) {
            previous.abort();
        }
        self.vault.note_next_auto_lock(Some(fires_at));
    }

    fn cancel(&self) {
        if let Some(handle) = self.timer.lock().take() {
            handle.abort();
        }
        self.vault.note_next_auto_lock(None);
    }
}
