//! Outbound storage ports.
//!
//! Every operation is asynchronous; implementations bridge to whatever
//! medium the host provides. All listing operations return records in a
//! stable order (sorted by primary key) so snapshots are deterministic.

use crate::records::{
    ChainRegistryEntity, NetworkPreferences, NetworkRpcPreferences, SettingsRecord,
    VaultMetaSnapshot,
};
use async_trait::async_trait;
use shared_types::{
    AccountId, AccountRecord, ApprovalTask, ChainRef, KeyringMeta, PermissionRecord,
    TransactionRecord, TransactionStatus, WalletResult,
};
use uuid::Uuid;

/// The single vault-meta row.
#[async_trait]
pub trait VaultMetaStore: Send + Sync {
    async fn load(&self) -> WalletResult<Option<VaultMetaSnapshot>>;
    async fn save(&self, snapshot: VaultMetaSnapshot) -> WalletResult<()>;
    async fn clear(&self) -> WalletResult<()>;
}

/// User settings, keyed by setting name.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    async fn get(&self, key: &str) -> WalletResult<Option<SettingsRecord>>;
    async fn put(&self, record: SettingsRecord) -> WalletResult<()>;
    async fn delete(&self, key: &str) -> WalletResult<()>;
    async fn get_all(&self) -> WalletResult<Vec<SettingsRecord>>;
}

/// The single network-preferences row (active chain).
#[async_trait]
pub trait NetworkPreferencesStore: Send + Sync {
    async fn load(&self) -> WalletResult<Option<NetworkPreferences>>;
    async fn save(&self, preferences: NetworkPreferences) -> WalletResult<()>;
}

/// Chain registry rows, keyed by chain reference.
#[async_trait]
pub trait ChainRegistryStore: Send + Sync {
    async fn get(&self, chain_ref: &ChainRef) -> WalletResult<Option<ChainRegistryEntity>>;
    async fn get_all(&self) -> WalletResult<Vec<ChainRegistryEntity>>;
    async fn put(&self, entity: ChainRegistryEntity) -> WalletResult<()>;
    async fn put_many(&self, entities: Vec<ChainRegistryEntity>) -> WalletResult<()>;
    async fn delete(&self, chain_ref: &ChainRef) -> WalletResult<()>;
    async fn clear(&self) -> WalletResult<()>;
}

/// Account rows, keyed by account id.
#[async_trait]
pub trait AccountsStore: Send + Sync {
    async fn get(&self, account_id: &AccountId) -> WalletResult<Option<AccountRecord>>;
    async fn get_all(&self) -> WalletResult<Vec<AccountRecord>>;
    async fn put(&self, record: AccountRecord) -> WalletResult<()>;
    async fn delete(&self, account_id: &AccountId) -> WalletResult<()>;
    /// Remove every account derived from or imported into a keyring.
    async fn delete_by_keyring(&self, keyring_id: Uuid) -> WalletResult<usize>;
}

/// Keyring metadata rows, keyed by keyring id.
#[async_trait]
pub trait KeyringMetaStore: Send + Sync {
    async fn get(&self, id: Uuid) -> WalletResult<Option<KeyringMeta>>;
    async fn get_all(&self) -> WalletResult<Vec<KeyringMeta>>;
    async fn put(&self, meta: KeyringMeta) -> WalletResult<()>;
    async fn delete(&self, id: Uuid) -> WalletResult<()>;
}

/// Permission rows, keyed by `(origin, namespace)`.
#[async_trait]
pub trait PermissionsStore: Send + Sync {
    async fn get(&self, origin: &str, namespace: &str) -> WalletResult<Option<PermissionRecord>>;
    async fn get_all(&self) -> WalletResult<Vec<PermissionRecord>>;
    async fn put(&self, record: PermissionRecord) -> WalletResult<()>;
    async fn delete(&self, origin: &str, namespace: &str) -> WalletResult<()>;
    /// Remove every record for an origin, across namespaces.
    async fn clear_origin(&self, origin: &str) -> WalletResult<usize>;
}

/// Approval task mirror, keyed by task id.
///
/// Resolvers live only in memory; this store lets the UI recover the
/// pending list across a popup reload.
#[async_trait]
pub trait ApprovalsStore: Send + Sync {
    async fn get(&self, id: Uuid) -> WalletResult<Option<ApprovalTask>>;
    async fn get_all(&self) -> WalletResult<Vec<ApprovalTask>>;
    async fn put(&self, task: ApprovalTask) -> WalletResult<()>;
    async fn delete(&self, id: Uuid) -> WalletResult<()>;
    async fn clear(&self) -> WalletResult<()>;
}

/// Transaction rows, keyed by transaction id.
#[async_trait]
pub trait TransactionsStore: Send + Sync {
    async fn get(&self, id: Uuid) -> WalletResult<Option<TransactionRecord>>;
    async fn get_all(&self) -> WalletResult<Vec<TransactionRecord>>;
    async fn list_by_status(&self, status: TransactionStatus)
        -> WalletResult<Vec<TransactionRecord>>;
    async fn put(&self, record: TransactionRecord) -> WalletResult<()>;
    async fn delete(&self, id: Uuid) -> WalletResult<()>;

    /// Look up a broadcast transaction by its on-chain identity.
    async fn find_by_chain_ref_and_hash(
        &self,
        chain_ref: &ChainRef,
        hash: &str,
    ) -> WalletResult<Option<TransactionRecord>>;

    /// Compare-and-swap on status: write `next` only if the persisted
    /// status still equals `expected`. Returns the stored record on
    /// success, `None` when another writer won the race.
    async fn update_if_status(
        &self,
        id: Uuid,
        expected: TransactionStatus,
        next: TransactionRecord,
    ) -> WalletResult<Option<TransactionRecord>>;
}

/// Per-chain RPC routing preferences, keyed by chain reference.
#[async_trait]
pub trait RpcPreferencesStore: Send + Sync {
    async fn get(&self, chain_ref: &ChainRef) -> WalletResult<Option<NetworkRpcPreferences>>;
    async fn get_all(&self) -> WalletResult<Vec<NetworkRpcPreferences>>;
    async fn put(&self, preferences: NetworkRpcPreferences) -> WalletResult<()>;
    async fn delete(&self, chain_ref: &ChainRef) -> WalletResult<()>;
}
