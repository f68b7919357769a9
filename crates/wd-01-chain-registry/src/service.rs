//! Registry service over the chain-registry storage port.

use crate::catalog::known_chains;
use crate::metadata::{normalize_chain_metadata, Eip3085ChainInput};
use crate::REGISTRY_SCHEMA_VERSION;
use shared_types::{ChainMetadata, ChainRef, ErrorReason, TimeSource, WalletError, WalletResult};
use std::sync::Arc;
use tracing::{debug, info};
use wd_02_storage::{ChainRegistryEntity, ChainRegistryStore};

/// Chain registry: catalog seeding, lookup, and dapp-supplied additions.
pub struct ChainRegistry {
    store: Arc<dyn ChainRegistryStore>,
    time: Arc<dyn TimeSource>,
}

impl ChainRegistry {
    pub fn new(store: Arc<dyn ChainRegistryStore>, time: Arc<dyn TimeSource>) -> Self {
        Self { store, time }
    }

    /// Seed the built-in catalog. Existing rows win over seeds.
    pub async fn ensure_seeded(&self) -> WalletResult<()> {
        let mut seeded = 0usize;
        for metadata in known_chains() {
            if self.store.get(&metadata.chain_ref).await?.is_none() {
                self.store.put(self.entity(metadata)).await?;
                seeded += 1;
            }
        }
        if seeded > 0 {
            info!(seeded, "seeded chain catalog");
        }
        Ok(())
    }

    /// Metadata for one chain.
    pub async fn get(&self, chain_ref: &ChainRef) -> WalletResult<Option<ChainMetadata>> {
        Ok(self.store.get(chain_ref).await?.map(|e| e.metadata))
    }

    /// Metadata for one chain, or `unknown-chain`.
    pub async fn require(&self, chain_ref: &ChainRef) -> WalletResult<ChainMetadata> {
        self.get(chain_ref).await?.ok_or_else(|| {
            WalletError::new(
                ErrorReason::UnknownChain,
                format!("chain {chain_ref} is not registered"),
            )
        })
    }

    /// All registered chains, in canonical order.
    pub async fn get_all(&self) -> WalletResult<Vec<ChainMetadata>> {
        Ok(self
            .store
            .get_all()
            .await?
            .into_iter()
            .map(|e| e.metadata)
            .collect())
    }

    /// Whether a chain is registered.
    pub async fn contains(&self, chain_ref: &ChainRef) -> WalletResult<bool> {
        Ok(self.store.get(chain_ref).await?.is_some())
    }

    /// Validate, normalize, and register dapp-supplied metadata.
    ///
    /// Re-adding a known chain overwrites its metadata; the chain
    /// reference is derived from the input, never caller-chosen.
    pub async fn add_chain(&self, input: &Eip3085ChainInput) -> WalletResult<ChainMetadata> {
        let metadata = normalize_chain_metadata(input)?;
        debug!(chain = %metadata.chain_ref, "registering chain");
        self.store.put(self.entity(metadata.clone())).await?;
        Ok(metadata)
    }

    /// Remove a chain from the registry.
    pub async fn remove(&self, chain_ref: &ChainRef) -> WalletResult<()> {
        self.store.delete(chain_ref).await
    }

    fn entity(&self, metadata: ChainMetadata) -> ChainRegistryEntity {
        ChainRegistryEntity {
            chain_ref: metadata.chain_ref.clone(),
            namespace: metadata.chain_ref.namespace().to_string(),
            schema_version: REGISTRY_SCHEMA_VERSION,
            updated_at: self.time.now(),
            metadata,
        }
    }
}
