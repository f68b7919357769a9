//! Aggregated runtime configuration.

use wd_03_vault::VaultConfig;
use wd_06_network::NetworkConfig;
use wd_07_approvals::{ApprovalConfig, AttentionConfig};
use wd_08_transactions::TransactionConfig;

/// One config value per subsystem, all defaulted for production.
#[derive(Debug, Clone, Default)]
pub struct RuntimeConfig {
    pub vault: VaultConfig,
    pub network: NetworkConfig,
    pub approvals: ApprovalConfig,
    pub attention: AttentionConfig,
    pub transactions: TransactionConfig,
}
