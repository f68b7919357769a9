//! The denormalized UI snapshot.
//!
//! Re-derived from every controller whenever any of them publishes, and
//! emitted on `ui:snapshotChanged`. Serialize-validated: the snapshot is
//! exactly what crosses the wire to the interface.

use serde::{Deserialize, Serialize};
use shared_bus::Topic;
use shared_types::{
    ApprovalTask, AttentionRequest, ChainMetadata, ChainRef, KeyringMeta, PermissionRecord,
    TransactionRecord, WalletResult,
};
use std::sync::Arc;
use uuid::Uuid;
use wd_01_chain_registry::format_address;
use wd_03_vault::SessionState;
use wd_09_rpc_engine::Controllers;

/// The full snapshot changed.
pub const UI_SNAPSHOT_CHANGED: Topic<UiSnapshot> = Topic::state("ui:snapshotChanged", |a, b| {
    a == b
});

/// One account as the UI shows it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountView {
    pub account_id: String,
    /// Canonical (lowercase) address.
    pub address: String,
    /// EIP-55 display form.
    pub display: String,
    pub namespace: String,
    pub keyring_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub derivation_index: Option<u32>,
}

/// Networks section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworksView {
    pub active: ChainRef,
    pub known: Vec<ChainMetadata>,
}

/// Accounts section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountsView {
    pub list: Vec<AccountView>,
    /// First live address, if any.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub active: Option<String>,
}

/// Vault section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VaultView {
    pub initialized: bool,
}

/// A keyring the user still needs to back up.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupWarning {
    pub keyring_id: Uuid,
    pub alias: String,
}

/// Everything the interface renders from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UiSnapshot {
    pub networks: NetworksView,
    pub accounts: AccountsView,
    pub keyrings: Vec<KeyringMeta>,
    pub session: SessionState,
    pub pending_approvals: Vec<ApprovalTask>,
    pub attention: Vec<AttentionRequest>,
    pub permissions: Vec<PermissionRecord>,
    pub transactions: Vec<TransactionRecord>,
    pub vault: VaultView,
    pub warnings: Vec<BackupWarning>,
}

/// Gather the snapshot from every controller.
pub async fn build_snapshot(controllers: &Arc<Controllers>) -> WalletResult<UiSnapshot> {
    let session = controllers.vault.session_state();
    let active_chain = controllers.network.active_chain();
    let known = controllers.network.known_chains().await?;

    let live_addresses = controllers.keyring.addresses();
    let records = controllers.keyring.list_accounts().await?;
    let keyrings = controllers.keyring.list_metas().await?;

    let mut list = Vec::with_capacity(records.len());
    for record in &records {
        let display = format_address(&active_chain, &record.address)
            .unwrap_or_else(|_| record.address.clone());
        list.push(AccountView {
            account_id: record.account_id.to_string(),
            address: record.address.clone(),
            display,
            namespace: record.namespace.clone(),
            keyring_id: record.keyring_id,
            derivation_index: record.derivation_index,
        });
    }

    let warnings = keyrings
        .iter()
        .filter(|meta| meta.kind == shared_types::KeyringKind::Hd && !meta.backed_up)
        .map(|meta| BackupWarning {
            keyring_id: meta.id,
            alias: meta.alias.clone(),
        })
        .collect();

    Ok(UiSnapshot {
        networks: NetworksView {
            active: active_chain,
            known,
        },
        accounts: AccountsView {
            active: live_addresses.first().cloned(),
            list,
        },
        keyrings,
        session,
        pending_approvals: controllers.approvals.pending(),
        attention: controllers.attention.list(),
        permissions: controllers.permissions.get_all().await?,
        transactions: controllers.transactions.list().await?,
        vault: VaultView {
            initialized: controllers.vault.is_initialized(),
        },
        warnings,
    })
}
