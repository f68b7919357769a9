//! The network controller.

use crate::pool::{EndpointPool, OutcomeEffect};
use crate::ports::{ClientFactory, Eip155Client};
use crate::topics::{CHAIN_CHANGED, NETWORKS_CHANGED, RPC_RECOVERED};
use parking_lot::Mutex;
use shared_bus::Messenger;
use shared_types::{
    ChainMetadata, ChainRef, ErrorReason, TimeSource, WalletError, WalletResult,
    PROTOCOL_VERSION,
};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};
use wd_01_chain_registry::{ChainRegistry, Eip3085ChainInput};
use wd_02_storage::{
    NetworkPreferences, NetworkPreferencesStore, NetworkRpcPreferences, RoutingStrategy,
    RpcEndpoint, RpcPreferencesStore, SerialQueue,
};

/// Network tuning.
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    /// Chain used when no preference is persisted.
    pub default_chain: ChainRef,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            default_chain: ChainRef::eip155(1),
        }
    }
}

/// Active chain plus per-chain endpoint routing.
pub struct NetworkController {
    registry: Arc<ChainRegistry>,
    prefs: Arc<dyn NetworkPreferencesStore>,
    rpc_prefs: Arc<dyn RpcPreferencesStore>,
    factory: Arc<dyn ClientFactory>,
    messenger: Messenger,
    time: Arc<dyn TimeSource>,
    serial: SerialQueue,
    active: Mutex<ChainRef>,
    pools: tokio::sync::Mutex<HashMap<ChainRef, EndpointPool>>,
}

impl NetworkController {
    pub fn new(
        registry: Arc<ChainRegistry>,
        prefs: Arc<dyn NetworkPreferencesStore>,
        rpc_prefs: Arc<dyn RpcPreferencesStore>,
        factory: Arc<dyn ClientFactory>,
        messenger: Messenger,
        time: Arc<dyn TimeSource>,
        config: NetworkConfig,
    ) -> Self {
        Self {
            registry,
            prefs,
            rpc_prefs,
            factory,
            messenger,
            time,
            serial: SerialQueue::new(),
            active: Mutex::new(config.default_chain),
            pools: tokio::sync::Mutex::new(HashMap::new()),
        }
    }

    /// Load the persisted active chain and publish initial snapshots.
    pub async fn initialize(&self) -> WalletResult<()> {
        if let Some(preferences) = self.prefs.load().await? {
            if let Some(chain) = preferences.active_chain {
                if self.registry.contains(&chain).await? {
                    *self.active.lock() = chain;
                } else {
                    warn!(%chain, "persisted active chain is unregistered; keeping default");
                }
            }
        }
        self.publish_chain();
        self.publish_networks().await?;
        Ok(())
    }

    /// The chain requests resolve against by default.
    #[must_use]
    pub fn active_chain(&self) -> ChainRef {
        self.active.lock().clone()
    }

    /// Switch the active chain. The chain must be registered.
    pub async fn switch_active(&self, chain: &ChainRef) -> WalletResult<()> {
        if !self.registry.contains(chain).await? {
            return Err(WalletError::new(
                ErrorReason::UnknownChain,
                format!("cannot switch to unregistered chain {chain}"),
            ));
        }
        *self.active.lock() = chain.clone();
        self.persist_active(chain.clone()).await?;
        info!(%chain, "active chain switched");
        self.publish_chain();
        Ok(())
    }

    /// Every registered chain.
    pub async fn known_chains(&self) -> WalletResult<Vec<ChainMetadata>> {
        self.registry.get_all().await
    }

    /// Register dapp-supplied metadata and refresh the known-chains
    /// snapshot.
    pub async fn add_chain(&self, input: &Eip3085ChainInput) -> WalletResult<ChainMetadata> {
        let metadata = self.registry.add_chain(input).await?;
        // Metadata may carry new endpoints; rebuild the pool lazily.
        self.pools.lock().await.remove(&metadata.chain_ref);
        self.publish_networks().await?;
        Ok(metadata)
    }

    /// A client bound to the chain's currently-preferred endpoint.
    pub async fn client_for(&self, chain: &ChainRef) -> WalletResult<Arc<dyn Eip155Client>> {
        let mut pools = self.pools.lock().await;
        let pool = self.pool_entry(&mut pools, chain).await?;
        let endpoint = pool
            .active_endpoint(self.time.now())
            .cloned()
            .ok_or_else(|| {
                WalletError::new(
                    ErrorReason::UnknownChain,
                    format!("no RPC endpoints for {chain}"),
                )
            })?;
        Ok(self.factory.client_for(chain, &endpoint))
    }

    /// Fold an RPC call outcome into the chain's pool.
    pub async fn report_rpc_outcome(
        &self,
        chain: &ChainRef,
        success: bool,
        error: Option<String>,
    ) -> WalletResult<()> {
        let mut pools = self.pools.lock().await;
        let pool = self.pool_entry(&mut pools, chain).await?;
        match pool.record_outcome(self.time.now(), success, error) {
            OutcomeEffect::Recovered => {
                info!(%chain, "rpc endpoint recovered");
                self.messenger.publish(&RPC_RECOVERED, chain.clone());
            }
            OutcomeEffect::Rotated(index) => {
                debug!(%chain, index, "rpc endpoint rotated");
            }
            OutcomeEffect::Unchanged => {}
        }
        Ok(())
    }

    /// Replace a chain's endpoint routing preferences.
    pub async fn set_rpc_preferences(
        &self,
        preferences: NetworkRpcPreferences,
    ) -> WalletResult<()> {
        let chain = preferences.chain_ref.clone();
        self.rpc_prefs.put(preferences).await?;
        self.pools.lock().await.remove(&chain);
        Ok(())
    }

    async fn pool_entry<'a>(
        &self,
        pools: &'a mut HashMap<ChainRef, EndpointPool>,
        chain: &ChainRef,
    ) -> WalletResult<&'a mut EndpointPool> {
        if !pools.contains_key(chain) {
            let pool = self.build_pool(chain).await?;
            pools.insert(chain.clone(), pool);
        }
        Ok(pools
            .get_mut(chain)
            .unwrap_or_else(|| unreachable!("inserted above")))
    }

    /// Explicit preferences win; otherwise the registry metadata's URL
    /// list seeds a round-robin pool.
    async fn build_pool(&self, chain: &ChainRef) -> WalletResult<EndpointPool> {
        if let Some(preferences) = self.rpc_prefs.get(chain).await? {
            return Ok(EndpointPool::new(preferences.endpoints, preferences.strategy));
        }
        let metadata = self.registry.require(chain).await?;
        let endpoints = metadata
            .rpc_urls
            .into_iter()
            .map(|url| RpcEndpoint {
                url,
                weight: 1,
                auth: None,
            })
            .collect();
        Ok(EndpointPool::new(endpoints, RoutingStrategy::RoundRobin))
    }

    async fn persist_active(&self, chain: ChainRef) -> WalletResult<()> {
        let now = self.time.now();
        self.serial
            .run(async {
                self.prefs
                    .save(NetworkPreferences {
                        version: PROTOCOL_VERSION,
                        active_chain: Some(chain),
                        updated_at: now,
                    })
                    .await
            })
            .await
    }

    fn publish_chain(&self) {
        self.messenger.publish(&CHAIN_CHANGED, self.active_chain());
    }

    async fn publish_networks(&self) -> WalletResult<()> {
        let chains = self.registry.get_all().await?;
        self.messenger.publish(&NETWORKS_CHANGED, chains);
        Ok(())
    }
}
