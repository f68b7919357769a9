//! The storage port bundle the runtime is built over.

use std::sync::Arc;
use wd_02_storage::{
    AccountsStore, ApprovalsStore, ChainRegistryStore, InMemoryAccountsStore,
    InMemoryApprovalsStore, InMemoryChainRegistryStore, InMemoryKeyringMetaStore,
    InMemoryNetworkPreferencesStore, InMemoryPermissionsStore, InMemoryRpcPreferencesStore,
    InMemorySettingsStore, InMemoryTransactionsStore, InMemoryVaultMetaStore, KeyringMetaStore,
    NetworkPreferencesStore, PermissionsStore, RpcPreferencesStore, SettingsStore,
    TransactionsStore, VaultMetaStore,
};

/// Every persistence port the core consumes. Hosts plug real backends
/// in; tests and single-process runs use the in-memory set.
#[derive(Clone)]
pub struct StorageAdapters {
    pub vault_meta: Arc<dyn VaultMetaStore>,
    pub settings: Arc<dyn SettingsStore>,
    pub network_preferences: Arc<dyn NetworkPreferencesStore>,
    pub chain_registry: Arc<dyn ChainRegistryStore>,
    pub accounts: Arc<dyn AccountsStore>,
    pub keyring_metas: Arc<dyn KeyringMetaStore>,
    pub permissions: Arc<dyn PermissionsStore>,
    pub approvals: Arc<dyn ApprovalsStore>,
    pub transactions: Arc<dyn TransactionsStore>,
    pub rpc_preferences: Arc<dyn RpcPreferencesStore>,
}

impl StorageAdapters {
    /// A full in-memory set.
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            vault_meta: Arc::new(InMemoryVaultMetaStore::new()),
            settings: Arc::new(InMemorySettingsStore::new()),
            network_preferences: Arc::new(InMemoryNetworkPreferencesStore::new()),
            chain_registry: Arc::new(InMemoryChainRegistryStore::new()),
            accounts: Arc::new(InMemoryAccountsStore::new()),
            keyring_metas: Arc::new(InMemoryKeyringMetaStore::new()),
            permissions: Arc::new(InMemoryPermissionsStore::new()),
            approvals: Arc::new(InMemoryApprovalsStore::new()),
            transactions: Arc::new(InMemoryTransactionsStore::new()),
            rpc_preferences: Arc::new(InMemoryRpcPreferencesStore::new()),
        }
    }
}
