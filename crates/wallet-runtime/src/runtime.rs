//! The runtime value.

use crate::config::RuntimeConfig;
use crate::stores::StorageAdapters;
use shared_bus::Messenger;
use shared_types::{TimeSource, WalletResult};
use std::sync::Arc;
use tracing::info;
use wd_01_chain_registry::ChainRegistry;
use wd_03_vault::{AutoLockController, LockReason, VaultService};
use wd_04_keyring::KeyringService;
use wd_05_permissions::PermissionController;
use wd_06_network::{ClientFactory, NetworkController};
use wd_07_approvals::{ApprovalController, AttentionService};
use wd_08_transactions::TransactionController;
use wd_09_rpc_engine::{Controllers, RpcEngine};
use wd_10_bridge::{ProviderBridge, UiBridge};

/// The whole core as one owned value.
pub struct Runtime {
    messenger: Messenger,
    controllers: Arc<Controllers>,
    engine: Arc<RpcEngine>,
    provider: Arc<ProviderBridge>,
    ui: Arc<UiBridge>,
}

impl Runtime {
    /// Construct and wire every subsystem: load persisted vault and
    /// network state, seed the chain catalog, and connect every bus
    /// subscription. Nothing background runs yet; call
    /// [`start`](Self::start) next.
    pub async fn initialize(
        stores: StorageAdapters,
        client_factory: Arc<dyn ClientFactory>,
        time: Arc<dyn TimeSource>,
        config: RuntimeConfig,
    ) -> WalletResult<Self> {
        let messenger = Messenger::new();

        let vault = Arc::new(VaultService::new(
            Arc::clone(&stores.vault_meta),
            messenger.clone(),
            Arc::clone(&time),
            config.vault,
        ));
        let autolock = AutoLockController::new(Arc::clone(&vault), Arc::clone(&time));
        let keyring = KeyringService::new(
            Arc::clone(&vault),
            Arc::clone(&stores.accounts),
            Arc::clone(&stores.keyring_metas),
            messenger.clone(),
            Arc::clone(&time),
        );

        let registry = Arc::new(ChainRegistry::new(
            Arc::clone(&stores.chain_registry),
            Arc::clone(&time),
        ));
        let network = Arc::new(NetworkController::new(
            Arc::clone(&registry),
            Arc::clone(&stores.network_preferences),
            Arc::clone(&stores.rpc_preferences),
            client_factory,
            messenger.clone(),
            Arc::clone(&time),
            config.network,
        ));
        let permissions = Arc::new(PermissionController::new(
            Arc::clone(&stores.permissions),
            messenger.clone(),
            Arc::clone(&time),
        ));
        let approvals = ApprovalController::new(
            Arc::clone(&stores.approvals),
            messenger.clone(),
            Arc::clone(&time),
            config.approvals,
        );
        let attention = Arc::new(AttentionService::new(
            messenger.clone(),
            Arc::clone(&time),
            config.attention,
        ));
        let transactions = TransactionController::new(
            Arc::clone(&stores.transactions),
            Arc::clone(&keyring),
            Arc::clone(&permissions),
            Arc::clone(&network),
            Arc::clone(&approvals),
            messenger.clone(),
            Arc::clone(&time),
            config.transactions,
        );

        let controllers = Arc::new(Controllers {
            vault: Arc::clone(&vault),
            autolock: Arc::clone(&autolock),
            keyring: Arc::clone(&keyring),
            registry: Arc::clone(&registry),
            network: Arc::clone(&network),
            permissions,
            approvals,
            attention,
            transactions,
        });
        let engine = Arc::new(RpcEngine::new(Arc::clone(&controllers)));
        let provider = ProviderBridge::new(
            Arc::clone(&engine),
            Arc::clone(&controllers),
            messenger.clone(),
        );
        let ui = UiBridge::new(
            Arc::clone(&controllers),
            messenger.clone(),
            Arc::clone(&stores.settings),
            Arc::clone(&time),
        );

        // Load persisted state and wire subscriptions, leaves first.
        registry.ensure_seeded().await?;
        vault.initialize().await?;
        network.initialize().await?;
        autolock.start(&messenger);
        keyring.start();
        provider.start();
        ui.start();

        info!("runtime initialized");
        Ok(Self {
            messenger,
            controllers,
            engine,
            provider,
            ui,
        })
    }

    /// Cold-start resume: receipt tracking for broadcast rows, failure
    /// for stale pending rows.
    pub async fn start(&self) -> WalletResult<()> {
        self.controllers.transactions.resume().await?;
        info!("runtime started");
        Ok(())
    }

    /// Tear everything down: unsubscribe handlers, stop timers and
    /// trackers, expire pending approvals, and lock the vault.
    pub async fn destroy(&self) {
        self.ui.destroy();
        self.provider.destroy();
        self.controllers.approvals.destroy().await;
        self.controllers.transactions.destroy();
        self.controllers.autolock.destroy();
        self.controllers.keyring.destroy();
        self.controllers.vault.lock(LockReason::Teardown);
        info!("runtime destroyed");
    }

    /// The process-wide bus.
    #[must_use]
    pub fn messenger(&self) -> &Messenger {
        &self.messenger
    }

    /// The controller bundle.
    #[must_use]
    pub fn controllers(&self) -> &Arc<Controllers> {
        &self.controllers
    }

    /// The RPC engine.
    #[must_use]
    pub fn engine(&self) -> &Arc<RpcEngine> {
        &self.engine
    }

    /// The provider bridge.
    #[must_use]
    pub fn provider(&self) -> &Arc<ProviderBridge> {
        &self.provider
    }

    /// The UI bridge.
    #[must_use]
    pub fn ui(&self) -> &Arc<UiBridge> {
        &self.ui
    }
}
