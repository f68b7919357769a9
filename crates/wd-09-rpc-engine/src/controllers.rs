//! The controller bundle handlers dispatch against.
//!
//! Explicitly assembled by the runtime; there are no statics. Handlers
//! receive this by `Arc`, so a handler future can outlive the borrow of
//! the engine that spawned it.

use std::sync::Arc;
use wd_01_chain_registry::ChainRegistry;
use wd_03_vault::{AutoLockController, VaultService};
use wd_04_keyring::KeyringService;
use wd_05_permissions::PermissionController;
use wd_06_network::NetworkController;
use wd_07_approvals::{ApprovalController, AttentionService};
use wd_08_transactions::TransactionController;

/// Every controller a method handler may touch.
pub struct Controllers {
    pub vault: Arc<VaultService>,
    pub autolock: Arc<AutoLockController>,
    pub keyring: Arc<KeyringService>,
    pub registry: Arc<ChainRegistry>,
    pub network: Arc<NetworkController>,
    pub permissions: Arc<PermissionController>,
    pub approvals: Arc<ApprovalController>,
    pub attention: Arc<AttentionService>,
    pub transactions: Arc<TransactionController>,
}
