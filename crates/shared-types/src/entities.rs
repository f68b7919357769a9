//! # Shared Records
//!
//! Records that cross subsystem boundaries: transaction lifecycle state,
//! approval tasks, attention requests, permission grants, chain metadata,
//! and keyring/account bookkeeping.
//!
//! Everything here is serde-tagged and validated on read at the storage
//! layer; an invalid persisted row is dropped and logged, never revived.

use crate::capability::Capability;
use crate::chain::{AccountId, ChainRef};
use crate::errors::WalletError;
use crate::time::Timestamp;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use uuid::Uuid;

// =============================================================================
// CLUSTER A: TRANSACTION LIFECYCLE
// =============================================================================

/// Lifecycle status of a wallet-originated transaction.
///
/// Only the transitions enumerated by the transaction controller are
/// permitted; every write is CAS-guarded on the previous status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    /// Created, awaiting user approval.
    Pending,
    /// Approved by the user with final fields.
    Approved,
    /// Signed by the keyring.
    Signed,
    /// Accepted by an RPC node; `hash` is set.
    Broadcast,
    /// Receipt decoded as success.
    Confirmed,
    /// Rejected, errored, or receipt decoded as failure.
    Failed,
    /// Superseded by a same-nonce transaction.
    Replaced,
}

impl TransactionStatus {
    /// Whether this status is terminal.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Confirmed | Self::Failed | Self::Replaced)
    }
}

/// A caller-supplied EVM call, hex-string fields as they appear on the
/// wire. Unset fields are resolved while building the draft preview.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionCall {
    /// Sender address.
    pub from: String,
    /// Recipient address; absent for contract creation.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub to: Option<String>,
    /// Value in wei, 0x-hex.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub value: Option<String>,
    /// Call data, 0x-hex.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub data: Option<String>,
    /// Gas limit, 0x-hex.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub gas: Option<String>,
    /// Sender nonce, 0x-hex.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub nonce: Option<String>,
    /// Legacy gas price, 0x-hex.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub gas_price: Option<String>,
    /// EIP-1559 fee cap, 0x-hex.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub max_fee_per_gas: Option<String>,
    /// EIP-1559 priority fee, 0x-hex.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub max_priority_fee_per_gas: Option<String>,
}

/// The persisted record carrying a transaction through its lifecycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRecord {
    /// Unique id, assigned at draft time.
    pub id: Uuid,
    /// Chain family.
    pub namespace: String,
    /// Target chain.
    pub chain_ref: ChainRef,
    /// Requesting origin (a web origin or the UI).
    pub origin: String,
    /// The owning account.
    pub from_account_id: AccountId,
    /// The resolved call as approved (or being approved).
    pub request: TransactionCall,
    /// Current lifecycle status.
    pub status: TransactionStatus,
    /// Transaction hash; set from broadcast onward.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub hash: Option<String>,
    /// Receipt as returned by the node, once present.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub receipt: Option<serde_json::Value>,
    /// Structured failure, for `failed`/`replaced`.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub error: Option<WalletError>,
    /// True when the user declined the approval.
    #[serde(default)]
    pub user_rejected: bool,
    /// Non-fatal anomalies found while building the draft.
    #[serde(default)]
    pub warnings: Vec<String>,
    /// Fields that could not be resolved.
    #[serde(default)]
    pub issues: Vec<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

// =============================================================================
// CLUSTER B: APPROVALS & ATTENTION
// =============================================================================

/// What the user is being asked to approve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ApprovalKind {
    RequestAccounts,
    RequestPermissions,
    SignMessage,
    SignTypedData,
    SendTransaction,
    AddChain,
    SwitchChain,
}

/// A task sitting in the approval queue, surfaced to the UI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalTask {
    pub id: Uuid,
    pub kind: ApprovalKind,
    /// Requesting origin key.
    pub origin: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub namespace: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub chain_ref: Option<ChainRef>,
    /// Kind-specific payload shown to the user.
    pub payload: serde_json::Value,
    pub created_at: Timestamp,
    pub expires_at: Timestamp,
}

/// Why the UI should come to the foreground.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AttentionReason {
    /// A locked session blocked a request.
    UnlockRequired,
    /// An approval task is waiting.
    ApprovalPending,
}

/// A deduplicated "surface the UI" hint.
///
/// Dedup key: `(reason, origin, method, chainRef, namespace)`. A request
/// matching a queued entry that has not yet expired is dropped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttentionRequest {
    pub reason: AttentionReason,
    pub origin: String,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub chain_ref: Option<ChainRef>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub namespace: Option<String>,
    pub requested_at: Timestamp,
    pub expires_at: Timestamp,
}

impl AttentionRequest {
    /// The tuple identifying duplicates.
    #[must_use]
    pub fn dedup_key(&self) -> (AttentionReason, &str, &str, Option<&ChainRef>, Option<&str>) {
        (
            self.reason,
            &self.origin,
            &self.method,
            self.chain_ref.as_ref(),
            self.namespace.as_deref(),
        )
    }
}

// =============================================================================
// CLUSTER C: PERMISSIONS
// =============================================================================

/// Grants held by one `(origin, namespace)` pair.
///
/// Capabilities only ever extend until the record is explicitly cleared.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionRecord {
    pub origin: String,
    pub namespace: String,
    /// Per-chain capability sets.
    pub grants: BTreeMap<ChainRef, BTreeSet<Capability>>,
    pub updated_at: Timestamp,
}

impl PermissionRecord {
    /// An empty record for a scope.
    #[must_use]
    pub fn empty(origin: impl Into<String>, namespace: impl Into<String>, now: Timestamp) -> Self {
        Self {
            origin: origin.into(),
            namespace: namespace.into(),
            grants: BTreeMap::new(),
            updated_at: now,
        }
    }

    /// Whether the record grants `capability` on `chain`.
    #[must_use]
    pub fn has_capability(&self, chain: &ChainRef, capability: Capability) -> bool {
        self.grants
            .get(chain)
            .is_some_and(|caps| caps.contains(&capability))
    }

    /// Whether the record grants anything at all on `chain`.
    #[must_use]
    pub fn is_connected(&self, chain: &ChainRef) -> bool {
        self.grants.get(chain).is_some_and(|caps| !caps.is_empty())
    }
}

// =============================================================================
// CLUSTER D: CHAIN METADATA
// =============================================================================

/// Native currency descriptor for a chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NativeCurrency {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
}

/// Normalized chain metadata as held in the registry.
///
/// Produced from EIP-3085-like input by the chain registry: decimal
/// reference, deduplicated http(s) endpoint URLs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainMetadata {
    pub chain_ref: ChainRef,
    pub name: String,
    pub native_currency: NativeCurrency,
    pub rpc_urls: Vec<String>,
    #[serde(default)]
    pub block_explorer_urls: Vec<String>,
}

// =============================================================================
// CLUSTER E: VAULT
// =============================================================================

/// The only algorithm tag this core writes.
pub const VAULT_ALGORITHM: &str = "pbkdf2-sha256";

/// The persisted vault ciphertext envelope.
///
/// `cipher` is AES-256-GCM over the encoded keyring payload, keyed by
/// PBKDF2-SHA-256 of the password with `salt` and `iterations`. Binary
/// fields are hex-encoded for the JSON row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VaultCiphertext {
    pub version: u16,
    pub algorithm: String,
    pub salt: String,
    pub iterations: u32,
    pub iv: String,
    pub cipher: String,
    pub created_at: Timestamp,
}

// =============================================================================
// CLUSTER F: KEYRINGS & ACCOUNTS
// =============================================================================

/// The two keyring families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum KeyringKind {
    /// Mnemonic-backed, sequentially derived.
    Hd,
    /// A single imported secret.
    PrivateKey,
}

/// Keyring metadata persisted outside the vault.
///
/// Survives lock; holds nothing secret.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyringMeta {
    pub id: Uuid,
    pub kind: KeyringKind,
    pub namespace: String,
    pub alias: String,
    pub created_at: Timestamp,
    /// Whether the user confirmed writing down the mnemonic.
    #[serde(default)]
    pub backed_up: bool,
}

/// A derived or imported account, persisted outside the vault.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountRecord {
    pub account_id: AccountId,
    /// Canonical address (redundant with the id, kept for indexing).
    pub address: String,
    pub namespace: String,
    pub keyring_id: Uuid,
    /// Derivation index for HD accounts, `None` for imports.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub derivation_index: Option<u32>,
    pub created_at: Timestamp,
}
