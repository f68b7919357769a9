//! # Storage Subsystem
//!
//! Abstract record stores for everything the core persists. Only the port
//! traits are public contract; the in-memory adapters back tests and
//! single-process runs, and real backends (extension storage, indexed
//! stores) live outside the core.
//!
//! ## Validation on Read
//!
//! Adapters hold raw JSON rows and decode on read. A row that fails schema
//! validation is dropped and logged, never revived and never a panic. This
//! keeps one corrupt record from poisoning a whole listing.
//!
//! ## Write Serialization
//!
//! Settings and network-preferences writes are read-modify-write cycles;
//! [`SerialQueue`] runs them one at a time so the last write wins within
//! the queue instead of interleaving.

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod memory;
pub mod ports;
pub mod records;
pub mod serial;

pub use memory::{
    InMemoryAccountsStore, InMemoryApprovalsStore, InMemoryChainRegistryStore,
    InMemoryKeyringMetaStore, InMemoryNetworkPreferencesStore, InMemoryPermissionsStore,
    InMemoryRpcPreferencesStore, InMemorySettingsStore, InMemoryTransactionsStore,
    InMemoryVaultMetaStore,
};
pub use ports::{
    AccountsStore, ApprovalsStore, ChainRegistryStore, KeyringMetaStore,
    NetworkPreferencesStore, PermissionsStore, RpcPreferencesStore, SettingsStore,
    TransactionsStore, VaultMetaStore,
};
pub use records::{
    ChainRegistryEntity, NetworkPreferences, NetworkRpcPreferences, RoutingStrategy, RpcEndpoint,
    SettingsRecord, VaultMetaPayload, VaultMetaSnapshot,
};
pub use serial::SerialQueue;
