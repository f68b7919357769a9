//! In-memory adapters.
//!
//! Back tests and single-process runs. Rows are held as raw JSON and
//! decoded on every read; a row that no longer matches its schema is
//! dropped and logged, mirroring how a real backend must treat corrupt
//! persisted data.

use crate::ports::*;
use crate::records::{
    ChainRegistryEntity, NetworkPreferences, NetworkRpcPreferences, SettingsRecord,
    VaultMetaSnapshot,
};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use shared_types::{
    AccountId, AccountRecord, ApprovalTask, ChainRef, KeyringMeta, PermissionRecord,
    TransactionRecord, TransactionStatus, WalletError, WalletResult,
};
use std::collections::BTreeMap;
use tokio::sync::RwLock;
use tracing::warn;
use uuid::Uuid;

/// A keyed table of raw JSON rows with decode-on-read.
#[derive(Default)]
struct JsonTable {
    name: &'static str,
    rows: RwLock<BTreeMap<String, serde_json::Value>>,
}

impl JsonTable {
    fn new(name: &'static str) -> Self {
        Self {
            name,
            rows: RwLock::new(BTreeMap::new()),
        }
    }

    fn decode<T: DeserializeOwned>(&self, key: &str, row: serde_json::Value) -> Option<T> {
        match serde_json::from_value(row) {
            Ok(value) => Some(value),
            Err(error) => {
                warn!(store = self.name, key, %error, "dropping invalid row");
                None
            }
        }
    }

    fn encode<T: Serialize>(&self, value: &T) -> WalletResult<serde_json::Value> {
        serde_json::to_value(value)
            .map_err(|e| WalletError::internal(format!("{}: encode failed: {e}", self.name)))
    }

    async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let row = self.rows.read().await.get(key).cloned()?;
        self.decode(key, row)
    }

    async fn get_all<T: DeserializeOwned>(&self) -> Vec<T> {
        let rows = self.rows.read().await.clone();
        rows.into_iter()
            .filter_map(|(key, row)| self.decode(&key, row))
            .collect()
    }

    async fn put<T: Serialize>(&self, key: String, value: &T) -> WalletResult<()> {
        let row = self.encode(value)?;
        self.rows.write().await.insert(key, row);
        Ok(())
    }

    async fn delete(&self, key: &str) -> bool {
        self.rows.write().await.remove(key).is_some()
    }

    async fn clear(&self) {
        self.rows.write().await.clear();
    }
}

fn permission_key(origin: &str, namespace: &str) -> String {
    // '\n' cannot appear in an origin or a namespace.
    format!("{origin}\n{namespace}")
}

// =============================================================================
// SINGLE-ROW STORES
// =============================================================================

/// In-memory vault-meta store.
#[derive(Default)]
pub struct InMemoryVaultMetaStore {
    row: RwLock<Option<serde_json::Value>>,
}

impl InMemoryVaultMetaStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl VaultMetaStore for InMemoryVaultMetaStore {
    async fn load(&self) -> WalletResult<Option<VaultMetaSnapshot>> {
        let row = self.row.read().await.clone();
        Ok(row.and_then(|value| match serde_json::from_value(value) {
            Ok(snapshot) => Some(snapshot),
            Err(error) => {
                warn!(store = "vault-meta", %error, "dropping invalid row");
                None
            }
        }))
    }

    async fn save(&self, snapshot: VaultMetaSnapshot) -> WalletResult<()> {
        let row = serde_json::to_value(&snapshot)
            .map_err(|e| WalletError::internal(format!("vault-meta: encode failed: {e}")))?;
        *self.row.write().await = Some(row);
        Ok(())
    }

    async fn clear(&self) -> WalletResult<()> {
        *self.row.write().await = None;
        Ok(())
    }
}

/// In-memory network-preferences store.
#[derive(Default)]
pub struct InMemoryNetworkPreferencesStore {
    row: RwLock<Option<serde_json::Value>>,
}

impl InMemoryNetworkPreferencesStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl NetworkPreferencesStore for InMemoryNetworkPreferencesStore {
    async fn load(&self) -> WalletResult<Option<NetworkPreferences>> {
        let row = self.row.read().await.clone();
        Ok(row.and_then(|value| match serde_json::from_value(value) {
            Ok(preferences) => Some(preferences),
            Err(error) => {
                warn!(store = "network-preferences", %error, "dropping invalid row");
                None
            }
        }))
    }

    async fn save(&self, preferences: NetworkPreferences) -> WalletResult<()> {
        let row = serde_json::to_value(&preferences).map_err(|e| {
            WalletError::internal(format!("network-preferences: encode failed: {e}"))
        })?;
        *self.row.write().await = Some(row);
        Ok(())
    }
}

// =============================================================================
// KEYED STORES
// =============================================================================

/// In-memory settings store.
pub struct InMemorySettingsStore {
    table: JsonTable,
}

impl Default for InMemorySettingsStore {
    fn default() -> Self {
        Self {
            table: JsonTable::new("settings"),
        }
    }
}

impl InMemorySettingsStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SettingsStore for InMemorySettingsStore {
    async fn get(&self, key: &str) -> WalletResult<Option<SettingsRecord>> {
        Ok(self.table.get(key).await)
    }

    async fn put(&self, record: SettingsRecord) -> WalletResult<()> {
        self.table.put(record.key.clone(), &record).await
    }

    async fn delete(&self, key: &str) -> WalletResult<()> {
        self.table.delete(key).await;
        Ok(())
    }

    async fn get_all(&self) -> WalletResult<Vec<SettingsRecord>> {
        Ok(self.table.get_all().await)
    }
}

/// In-memory chain-registry store.
pub struct InMemoryChainRegistryStore {
    table: JsonTable,
}

impl Default for InMemoryChainRegistryStore {
    fn default() -> Self {
        Self {
            table: JsonTable::new("chain-registry"),
        }
    }
}

impl InMemoryChainRegistryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ChainRegistryStore for InMemoryChainRegistryStore {
    async fn get(&self, chain_ref: &ChainRef) -> WalletResult<Option<ChainRegistryEntity>> {
        Ok(self.table.get(&chain_ref.to_string()).await)
    }

    async fn get_all(&self) -> WalletResult<Vec<ChainRegistryEntity>> {
        Ok(self.table.get_all().await)
    }

    async fn put(&self, entity: ChainRegistryEntity) -> WalletResult<()> {
        self.table.put(entity.chain_ref.to_string(), &entity).await
    }

    async fn put_many(&self, entities: Vec<ChainRegistryEntity>) -> WalletResult<()> {
        for entity in entities {
            self.put(entity).await?;
        }
        Ok(())
    }

    async fn delete(&self, chain_ref: &ChainRef) -> WalletResult<()> {
        self.table.delete(&chain_ref.to_string()).await;
        Ok(())
    }

    async fn clear(&self) -> WalletResult<()> {
        self.table.clear().await;
        Ok(())
    }
}

/// In-memory accounts store.
pub struct InMemoryAccountsStore {
    table: JsonTable,
}

impl Default for InMemoryAccountsStore {
    fn default() -> Self {
        Self {
            table: JsonTable::new("accounts"),
        }
    }
}

impl InMemoryAccountsStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AccountsStore for InMemoryAccountsStore {
    async fn get(&self, account_id: &AccountId) -> WalletResult<Option<AccountRecord>> {
        Ok(self.table.get(&account_id.to_string()).await)
    }

    async fn get_all(&self) -> WalletResult<Vec<AccountRecord>> {
        Ok(self.table.get_all().await)
    }

    async fn put(&self, record: AccountRecord) -> WalletResult<()> {
        self.table.put(record.account_id.to_string(), &record).await
    }

    async fn delete(&self, account_id: &AccountId) -> WalletResult<()> {
        self.table.delete(&account_id.to_string()).await;
        Ok(())
    }

    async fn delete_by_keyring(&self, keyring_id: Uuid) -> WalletResult<usize> {
        let all: Vec<AccountRecord> = self.table.get_all().await;
        let mut removed = 0;
        for record in all {
            if record.keyring_id == keyring_id {
                self.table.delete(&record.account_id.to_string()).await;
                removed += 1;
            }
        }
        Ok(removed)
    }
}

/// In-memory keyring-meta store.
pub struct InMemoryKeyringMetaStore {
    table: JsonTable,
}

impl Default for InMemoryKeyringMetaStore {
    fn default() -> Self {
        Self {
            table: JsonTable::new("keyring-metas"),
        }
    }
}

impl InMemoryKeyringMetaStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyringMetaStore for InMemoryKeyringMetaStore {
    async fn get(&self, id: Uuid) -> WalletResult<Option<KeyringMeta>> {
        Ok(self.table.get(&id.to_string()).await)
    }

    async fn get_all(&self) -> WalletResult<Vec<KeyringMeta>> {
        Ok(self.table.get_all().await)
    }

    async fn put(&self, meta: KeyringMeta) -> WalletResult<()> {
        self.table.put(meta.id.to_string(), &meta).await
    }

    async fn delete(&self, id: Uuid) -> WalletResult<()> {
        self.table.delete(&id.to_string()).await;
        Ok(())
    }
}

/// In-memory permissions store.
pub struct InMemoryPermissionsStore {
    table: JsonTable,
}

impl Default for InMemoryPermissionsStore {
    fn default() -> Self {
        Self {
            table: JsonTable::new("permissions"),
        }
    }
}

impl InMemoryPermissionsStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PermissionsStore for InMemoryPermissionsStore {
    async fn get(&self, origin: &str, namespace: &str) -> WalletResult<Option<PermissionRecord>> {
        Ok(self.table.get(&permission_key(origin, namespace)).await)
    }

    async fn get_all(&self) -> WalletResult<Vec<PermissionRecord>> {
        Ok(self.table.get_all().await)
    }

    async fn put(&self, record: PermissionRecord) -> WalletResult<()> {
        self.table
            .put(permission_key(&record.origin, &record.namespace), &record)
            .await
    }

    async fn delete(&self, origin: &str, namespace: &str) -> WalletResult<()> {
        self.table.delete(&permission_key(origin, namespace)).await;
        Ok(())
    }

    async fn clear_origin(&self, origin: &str) -> WalletResult<usize> {
        let all: Vec<PermissionRecord> = self.table.get_all().await;
        let mut removed = 0;
        for record in all {
            if record.origin == origin {
                self.table
                    .delete(&permission_key(&record.origin, &record.namespace))
                    .await;
                removed += 1;
            }
        }
        Ok(removed)
    }
}

/// In-memory approvals mirror.
pub struct InMemoryApprovalsStore {
    table: JsonTable,
}

impl Default for InMemoryApprovalsStore {
    fn default() -> Self {
        Self {
            table: JsonTable::new("approvals"),
        }
    }
}

impl InMemoryApprovalsStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ApprovalsStore for InMemoryApprovalsStore {
    async fn get(&self, id: Uuid) -> WalletResult<Option<ApprovalTask>> {
        Ok(self.table.get(&id.to_string()).await)
    }

    async fn get_all(&self) -> WalletResult<Vec<ApprovalTask>> {
        Ok(self.table.get_all().await)
    }

    async fn put(&self, task: ApprovalTask) -> WalletResult<()> {
        self.table.put(task.id.to_string(), &task).await
    }

    async fn delete(&self, id: Uuid) -> WalletResult<()> {
        self.table.delete(&id.to_string()).await;
        Ok(())
    }

    async fn clear(&self) -> WalletResult<()> {
        self.table.clear().await;
        Ok(())
    }
}

/// In-memory RPC-preferences store.
pub struct InMemoryRpcPreferencesStore {
    table: JsonTable,
}

impl Default for InMemoryRpcPreferencesStore {
    fn default() -> Self {
        Self {
            table: JsonTable::new("network-rpc-preferences"),
        }
    }
}

impl InMemoryRpcPreferencesStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RpcPreferencesStore for InMemoryRpcPreferencesStore {
    async fn get(&self, chain_ref: &ChainRef) -> WalletResult<Option<NetworkRpcPreferences>> {
        Ok(self.table.get(&chain_ref.to_string()).await)
    }

    async fn get_all(&self) -> WalletResult<Vec<NetworkRpcPreferences>> {
        Ok(self.table.get_all().await)
    }

    async fn put(&self, preferences: NetworkRpcPreferences) -> WalletResult<()> {
        self.table
            .put(preferences.chain_ref.to_string(), &preferences)
            .await
    }

    async fn delete(&self, chain_ref: &ChainRef) -> WalletResult<()> {
        self.table.delete(&chain_ref.to_string()).await;
        Ok(())
    }
}

// =============================================================================
// TRANSACTIONS (CAS)
// =============================================================================

/// In-memory transactions store.
///
/// `update_if_status` holds the table's write lock across the
/// read-compare-write so the CAS is genuinely atomic.
pub struct InMemoryTransactionsStore {
    rows: RwLock<BTreeMap<String, serde_json::Value>>,
}

impl Default for InMemoryTransactionsStore {
    fn default() -> Self {
        Self {
            rows: RwLock::new(BTreeMap::new()),
        }
    }
}

impl InMemoryTransactionsStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn decode(key: &str, row: serde_json::Value) -> Option<TransactionRecord> {
        match serde_json::from_value(row) {
            Ok(record) => Some(record),
            Err(error) => {
                warn!(store = "transactions", key, %error, "dropping invalid row");
                None
            }
        }
    }

    fn encode(record: &TransactionRecord) -> WalletResult<serde_json::Value> {
        serde_json::to_value(record)
            .map_err(|e| WalletError::internal(format!("transactions: encode failed: {e}")))
    }
}

#[async_trait]
impl TransactionsStore for InMemoryTransactionsStore {
    async fn get(&self, id: Uuid) -> WalletResult<Option<TransactionRecord>> {
        let key = id.to_string();
        let row = self.rows.read().await.get(&key).cloned();
        Ok(row.and_then(|r| Self::decode(&key, r)))
    }

    async fn get_all(&self) -> WalletResult<Vec<TransactionRecord>> {
        let rows = self.rows.read().await.clone();
        Ok(rows
            .into_iter()
            .filter_map(|(key, row)| Self::decode(&key, row))
            .collect())
    }

    async fn list_by_status(
        &self,
        status: TransactionStatus,
    ) -> WalletResult<Vec<TransactionRecord>> {
        Ok(self
            .get_all()
            .await?
            .into_iter()
            .filter(|record| record.status == status)
            .collect())
    }

    async fn put(&self, record: TransactionRecord) -> WalletResult<()> {
        let row = Self::encode(&record)?;
        self.rows.write().await.insert(record.id.to_string(), row);
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> WalletResult<()> {
        self.rows.write().await.remove(&id.to_string());
        Ok(())
    }

    async fn find_by_chain_ref_and_hash(
        &self,
        chain_ref: &ChainRef,
        hash: &str,
    ) -> WalletResult<Option<TransactionRecord>> {
        Ok(self.get_all().await?.into_iter().find(|record| {
            record.chain_ref == *chain_ref && record.hash.as_deref() == Some(hash)
        }))
    }

    async fn update_if_status(
        &self,
        id: Uuid,
        expected: TransactionStatus,
        next: TransactionRecord,
    ) -> WalletResult<Option<TransactionRecord>> {
        let key = id.to_string();
        let mut rows = self.rows.write().await;
        let current = match rows.get(&key).cloned().and_then(|r| Self::decode(&key, r)) {
            Some(record) => record,
            None => return Ok(None),
        };
        if current.status != expected {
            return Ok(None);
        }
        let row = Self::encode(&next)?;
        rows.insert(key, row);
        Ok(Some(next))
    }
}
