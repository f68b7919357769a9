//! The permission controller.

use crate::topics::PERMISSIONS_CHANGED;
use shared_bus::Messenger;
use shared_types::{
    Capability, ChainRef, PermissionRecord, TimeSource, WalletResult,
};
use std::sync::Arc;
use tracing::{debug, info};
use wd_02_storage::PermissionsStore;

/// Grants and checks per-origin capabilities.
pub struct PermissionController {
    store: Arc<dyn PermissionsStore>,
    messenger: Messenger,
    time: Arc<dyn TimeSource>,
}

impl PermissionController {
    pub fn new(
        store: Arc<dyn PermissionsStore>,
        messenger: Messenger,
        time: Arc<dyn TimeSource>,
    ) -> Self {
        Self {
            store,
            messenger,
            time,
        }
    }

    /// Extend the grant set for `(origin, namespace, chain)`. Monotonic:
    /// existing capabilities are never removed here.
    pub async fn grant(
        &self,
        origin: &str,
        namespace: &str,
        chain: &ChainRef,
        capabilities: &[Capability],
    ) -> WalletResult<PermissionRecord> {
        let mut record = self
            .store
            .get(origin, namespace)
            .await?
            .unwrap_or_else(|| PermissionRecord::empty(origin, namespace, self.time.now()));

        let set = record.grants.entry(chain.clone()).or_default();
        for capability in capabilities {
            set.insert(*capability);
        }
        record.updated_at = self.time.now();

        self.store.put(record.clone()).await?;
        debug!(origin, %chain, ?capabilities, "granted");
        self.publish().await?;
        Ok(record)
    }

    /// Remove one `(origin, namespace)` record.
    pub async fn revoke(&self, origin: &str, namespace: &str) -> WalletResult<()> {
        self.store.delete(origin, namespace).await?;
        info!(origin, namespace, "permissions revoked");
        self.publish().await
    }

    /// Remove every record for an origin. Returns how many were dropped.
    pub async fn revoke_origin(&self, origin: &str) -> WalletResult<usize> {
        let removed = self.store.clear_origin(origin).await?;
        if removed > 0 {
            info!(origin, removed, "origin permissions cleared");
            self.publish().await?;
        }
        Ok(removed)
    }

    /// The record for `(origin, namespace)`, if any.
    pub async fn get(
        &self,
        origin: &str,
        namespace: &str,
    ) -> WalletResult<Option<PermissionRecord>> {
        self.store.get(origin, namespace).await
    }

    /// Every grant record.
    pub async fn get_all(&self) -> WalletResult<Vec<PermissionRecord>> {
        self.store.get_all().await
    }

    /// Whether the origin holds `capability` on `chain`.
    pub async fn has_capability(
        &self,
        origin: &str,
        namespace: &str,
        chain: &ChainRef,
        capability: Capability,
    ) -> WalletResult<bool> {
        Ok(self
            .store
            .get(origin, namespace)
            .await?
            .is_some_and(|record| record.has_capability(chain, capability)))
    }

    /// Whether the origin holds any grant on `chain`.
    pub async fn is_connected(
        &self,
        origin: &str,
        namespace: &str,
        chain: &ChainRef,
    ) -> WalletResult<bool> {
        Ok(self
            .store
            .get(origin, namespace)
            .await?
            .is_some_and(|record| record.is_connected(chain)))
    }

    /// The subset of `available` accounts the origin may see on `chain`:
    /// all of them with the `accounts` capability, none without.
    pub async fn permitted_accounts(
        &self,
        origin: &str,
        namespace: &str,
        chain: &ChainRef,
        available: &[String],
    ) -> WalletResult<Vec<String>> {
        if self
            .has_capability(origin, namespace, chain, Capability::Accounts)
            .await?
        {
            Ok(available.to_vec())
        } else {
            Ok(Vec::new())
        }
    }

    async fn publish(&self) -> WalletResult<()> {
        let all = self.store.get_all().await?;
        self.messenger.publish(&PERMISSIONS_CHANGED, all);
        Ok(())
    }
}
