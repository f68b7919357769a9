//! Persisted record shapes owned by the storage layer.
//!
//! Records shared with other subsystems (transactions, permissions, chain
//! metadata, vault ciphertext) live in `shared-types`; this module holds
//! the store-specific envelopes around them.

use serde::{Deserialize, Serialize};
use shared_types::{ChainMetadata, ChainRef, Timestamp, VaultCiphertext, PROTOCOL_VERSION};

/// The single vault-meta row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VaultMetaSnapshot {
    pub version: u16,
    pub updated_at: Timestamp,
    pub payload: VaultMetaPayload,
}

/// Vault-meta payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VaultMetaPayload {
    /// `None` until the vault is initialized.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub ciphertext: Option<VaultCiphertext>,
    pub auto_lock_duration_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub initialized_at: Option<Timestamp>,
}

impl VaultMetaSnapshot {
    /// A snapshot for a vault that has never been initialized.
    #[must_use]
    pub fn uninitialized(auto_lock_duration_ms: u64, now: Timestamp) -> Self {
        Self {
            version: PROTOCOL_VERSION,
            updated_at: now,
            payload: VaultMetaPayload {
                ciphertext: None,
                auto_lock_duration_ms,
                initialized_at: None,
            },
        }
    }
}

/// One user-settings row, keyed by `key`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsRecord {
    pub key: String,
    pub value: serde_json::Value,
    pub updated_at: Timestamp,
}

/// The single network-preferences row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkPreferences {
    pub version: u16,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub active_chain: Option<ChainRef>,
    pub updated_at: Timestamp,
}

/// A chain-registry row: normalized metadata plus bookkeeping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainRegistryEntity {
    pub chain_ref: ChainRef,
    pub namespace: String,
    pub metadata: ChainMetadata,
    pub schema_version: u16,
    pub updated_at: Timestamp,
}

/// How the endpoint pool advances through its endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum RoutingStrategy {
    /// Advance on every failure.
    #[default]
    RoundRobin,
    /// Advance only after a consecutive-failure threshold.
    Sticky,
    /// Strict order; always prefer the healthiest earliest endpoint.
    Failover,
}

/// One RPC endpoint in a chain's pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcEndpoint {
    pub url: String,
    #[serde(default = "default_weight")]
    pub weight: u32,
    /// Optional bearer/auth token, stored verbatim.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub auth: Option<String>,
}

fn default_weight() -> u32 {
    1
}

/// Per-chain RPC routing preferences.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkRpcPreferences {
    pub chain_ref: ChainRef,
    pub endpoints: Vec<RpcEndpoint>,
    #[serde(default)]
    pub strategy: RoutingStrategy,
    pub updated_at: Timestamp,
}
