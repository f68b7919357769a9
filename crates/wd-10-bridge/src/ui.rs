//! UI bridge: named methods for the trusted interface plus snapshot
//! maintenance.

use crate::snapshot::{build_snapshot, UI_SNAPSHOT_CHANGED};
use parking_lot::Mutex;
use serde::Deserialize;
use serde_json::{json, Value};
use shared_bus::{Messenger, SubscriptionHandle};
use shared_types::{
    ApprovalKind, Capability, ChainRef, ErrorReason, TransactionCall, TimeSource, WalletError,
    WalletResult,
};
use std::sync::Arc;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use uuid::Uuid;
use wd_01_chain_registry::{format_address, Eip3085ChainInput};
use wd_02_storage::{SerialQueue, SettingsRecord, SettingsStore};
use wd_03_vault::LockReason;
use wd_04_keyring::domain::eip712::TypedData;
use wd_07_approvals::ApprovalExecutor;
use wd_09_rpc_engine::Controllers;

fn parse<T: serde::de::DeserializeOwned>(params: &Value) -> WalletResult<T> {
    serde_json::from_value(params.clone())
        .map_err(|e| WalletError::invalid_params(format!("invalid params: {e}")))
}

/// The trusted interface's entry point.
pub struct UiBridge {
    controllers: Arc<Controllers>,
    messenger: Messenger,
    settings: Arc<dyn SettingsStore>,
    serial: SerialQueue,
    time: Arc<dyn TimeSource>,
    refresh: Arc<Notify>,
    worker: Mutex<Option<JoinHandle<()>>>,
    subscriptions: Mutex<Vec<SubscriptionHandle>>,
}

impl UiBridge {
    pub fn new(
        controllers: Arc<Controllers>,
        messenger: Messenger,
        settings: Arc<dyn SettingsStore>,
        time: Arc<dyn TimeSource>,
    ) -> Arc<Self> {
        Arc::new(Self {
            controllers,
            messenger,
            settings,
            serial: SerialQueue::new(),
            time,
            refresh: Arc::new(Notify::new()),
            worker: Mutex::new(None),
            subscriptions: Mutex::new(Vec::new()),
        })
    }

    /// Subscribe to every controller topic and start the snapshot
    /// worker: each publication marks the snapshot dirty; the worker
    /// rebuilds and re-emits `ui:snapshotChanged`.
    pub fn start(self: &Arc<Self>) {
        {
            let mut subscriptions = self.subscriptions.lock();
            macro_rules! watch {
                ($topic:expr) => {
                    subscriptions.push({
                        let refresh = Arc::clone(&self.refresh);
                        self.messenger.subscribe($topic, move |_| {
                            refresh.notify_one();
                            Ok(())
                        })
                    });
                };
            }
            watch!(&wd_03_vault::topics::SESSION_CHANGED);
            watch!(&wd_04_keyring::topics::ACCOUNTS_CHANGED);
            watch!(&wd_05_permissions::topics::PERMISSIONS_CHANGED);
            watch!(&wd_06_network::topics::CHAIN_CHANGED);
            watch!(&wd_06_network::topics::NETWORKS_CHANGED);
            watch!(&wd_07_approvals::topics::APPROVALS_CHANGED);
            watch!(&wd_07_approvals::topics::ATTENTION_CHANGED);
            watch!(&wd_08_transactions::topics::TRANSACTION_UPDATED);
        }

        let bridge = Arc::clone(self);
        let worker = tokio::spawn(async move {
            loop {
                bridge.refresh.notified().await;
                match build_snapshot(&bridge.controllers).await {
                    Ok(snapshot) => {
                        bridge.messenger.publish(&UI_SNAPSHOT_CHANGED, snapshot);
                    }
                    Err(error) => warn!(%error, "snapshot rebuild failed"),
                }
            }
        });
        *self.worker.lock() = Some(worker);
        self.refresh.notify_one();
    }

    /// Stop the worker and unsubscribe. Part of runtime teardown.
    pub fn destroy(&self) {
        if let Some(worker) = self.worker.lock().take() {
            worker.abort();
        }
        for subscription in self.subscriptions.lock().drain(..) {
            subscription.unsubscribe();
        }
    }

    /// Dispatch one named UI method.
    pub async fn handle(&self, method: &str, params: Value) -> WalletResult<Value> {
        debug!(method, "ui request");
        match method {
            // ── vault ────────────────────────────────────────────────
            "ui.vault.init" => {
                #[derive(Deserialize)]
                struct Params {
                    password: String,
                }
                let p: Params = parse(&params)?;
                self.controllers.vault.init(&p.password).await?;
                Ok(Value::Null)
            }
            "ui.vault.unlock" => {
                #[derive(Deserialize)]
                struct Params {
                    password: String,
                }
                let p: Params = parse(&params)?;
                self.controllers.vault.unlock(&p.password).await?;
                Ok(json!(self.controllers.vault.session_state()))
            }
            "ui.vault.lock" => {
                self.controllers.vault.lock(LockReason::User);
                Ok(Value::Null)
            }
            "ui.vault.verifyPassword" => {
                #[derive(Deserialize)]
                struct Params {
                    password: String,
                }
                let p: Params = parse(&params)?;
                Ok(json!(self.controllers.vault.verify_password(&p.password).await?))
            }

            // ── session ──────────────────────────────────────────────
            "ui.session.resetAutoLock" => {
                self.controllers.autolock.reset();
                Ok(Value::Null)
            }
            "ui.session.setAutoLockDuration" => {
                #[derive(Deserialize)]
                #[serde(rename_all = "camelCase")]
                struct Params {
                    duration_ms: u64,
                }
                let p: Params = parse(&params)?;
                let effective = self.controllers.autolock.set_duration(p.duration_ms).await?;
                Ok(json!({ "durationMs": effective }))
            }

            // ── keyring ──────────────────────────────────────────────
            "ui.keyring.generateMnemonic" => {
                #[derive(Deserialize)]
                #[serde(rename_all = "camelCase")]
                struct Params {
                    #[serde(default = "default_word_count")]
                    word_count: usize,
                }
                fn default_word_count() -> usize {
                    12
                }
                let p: Params = parse(&params)?;
                let mnemonic = shared_crypto_generate(p.word_count)?;
                Ok(json!({ "mnemonic": &*mnemonic }))
            }
            "ui.keyring.importMnemonic" => {
                #[derive(Deserialize)]
                struct Params {
                    mnemonic: String,
                    #[serde(default = "default_alias")]
                    alias: String,
                }
                fn default_alias() -> String {
                    "Primary".into()
                }
                let p: Params = parse(&params)?;
                let keyring_id = self
                    .controllers
                    .keyring
                    .create_hd("eip155", p.mnemonic.trim(), &p.alias)
                    .await?;
                let account = self.controllers.keyring.derive_next_account(keyring_id).await?;
                Ok(json!({ "keyringId": keyring_id, "account": account }))
            }
            "ui.keyring.importPrivateKey" => {
                #[derive(Deserialize)]
                #[serde(rename_all = "camelCase")]
                struct Params {
                    private_key: String,
                    #[serde(default = "default_import_alias")]
                    alias: String,
                }
                fn default_import_alias() -> String {
                    "Imported".into()
                }
                let p: Params = parse(&params)?;
                let body = p
                    .private_key
                    .strip_prefix("0x")
                    .unwrap_or(&p.private_key);
                let bytes = hex::decode(body).map_err(|_| {
                    WalletError::new(ErrorReason::InvalidPrivateKey, "private key is not hex")
                })?;
                let account = self
                    .controllers
                    .keyring
                    .import_private_key("eip155", &bytes, &p.alias)
                    .await?;
                Ok(json!({ "account": account }))
            }
            "ui.keyring.deriveAccount" => {
                #[derive(Deserialize)]
                #[serde(rename_all = "camelCase")]
                struct Params {
                    keyring_id: Uuid,
                }
                let p: Params = parse(&params)?;
                let account = self
                    .controllers
                    .keyring
                    .derive_next_account(p.keyring_id)
                    .await?;
                Ok(json!({ "account": account }))
            }
            "ui.keyring.exportMnemonic" => {
                #[derive(Deserialize)]
                #[serde(rename_all = "camelCase")]
                struct Params {
                    keyring_id: Uuid,
                    password: String,
                }
                let p: Params = parse(&params)?;
                let mnemonic = self
                    .controllers
                    .keyring
                    .export_mnemonic(p.keyring_id, &p.password)
                    .await?;
                Ok(json!({ "mnemonic": &*mnemonic }))
            }
            "ui.keyring.exportPrivateKey" => {
                #[derive(Deserialize)]
                struct Params {
                    address: String,
                    password: String,
                }
                let p: Params = parse(&params)?;
                let key = self
                    .controllers
                    .keyring
                    .export_private_key(&p.address, &p.password)
                    .await?;
                Ok(json!({ "privateKey": &*key }))
            }
            "ui.keyring.markBackedUp" => {
                #[derive(Deserialize)]
                #[serde(rename_all = "camelCase")]
                struct Params {
                    keyring_id: Uuid,
                }
                let p: Params = parse(&params)?;
                self.controllers.keyring.mark_backed_up(p.keyring_id).await?;
                Ok(Value::Null)
            }

            // ── accounts ─────────────────────────────────────────────
            "ui.accounts.list" => {
                let accounts = self.controllers.keyring.list_accounts().await?;
                let keyrings = self.controllers.keyring.list_metas().await?;
                Ok(json!({ "accounts": accounts, "keyrings": keyrings }))
            }
            "ui.accounts.delete" => {
                #[derive(Deserialize)]
                struct Params {
                    address: String,
                }
                let p: Params = parse(&params)?;
                self.controllers.keyring.delete_account(&p.address).await?;
                Ok(Value::Null)
            }

            // ── approvals ────────────────────────────────────────────
            "ui.approvals.resolve" => {
                #[derive(Deserialize)]
                struct Params {
                    id: Uuid,
                    #[serde(default)]
                    decision: Value,
                }
                let p: Params = parse(&params)?;
                let resolved = self.resolve_approval(p.id, p.decision).await?;
                Ok(json!(resolved))
            }
            "ui.approvals.reject" => {
                #[derive(Deserialize)]
                struct Params {
                    id: Uuid,
                }
                let p: Params = parse(&params)?;
                let rejected = self
                    .controllers
                    .approvals
                    .reject(p.id, WalletError::approval_rejected())
                    .await?;
                Ok(json!(rejected))
            }

            // ── networks ─────────────────────────────────────────────
            "ui.networks.switchActive" => {
                #[derive(Deserialize)]
                #[serde(rename_all = "camelCase")]
                struct Params {
                    chain_ref: ChainRef,
                }
                let p: Params = parse(&params)?;
                self.controllers.network.switch_active(&p.chain_ref).await?;
                Ok(Value::Null)
            }
            "ui.networks.addChain" => {
                #[derive(Deserialize)]
                struct Params {
                    input: Eip3085ChainInput,
                }
                let p: Params = parse(&params)?;
                let metadata = self.controllers.network.add_chain(&p.input).await?;
                Ok(json!(metadata))
            }
            "ui.networks.list" => {
                Ok(json!({
                    "active": self.controllers.network.active_chain(),
                    "known": self.controllers.network.known_chains().await?,
                }))
            }

            // ── permissions ──────────────────────────────────────────
            "ui.permissions.list" => Ok(json!(self.controllers.permissions.get_all().await?)),
            "ui.permissions.revoke" => {
                #[derive(Deserialize)]
                struct Params {
                    origin: String,
                    #[serde(default)]
                    namespace: Option<String>,
                }
                let p: Params = parse(&params)?;
                match p.namespace {
                    Some(namespace) => {
                        self.controllers
                            .permissions
                            .revoke(&p.origin, &namespace)
                            .await?;
                    }
                    None => {
                        self.controllers.permissions.revoke_origin(&p.origin).await?;
                    }
                }
                Ok(Value::Null)
            }

            // ── transactions ─────────────────────────────────────────
            "ui.transactions.list" => Ok(json!(self.controllers.transactions.list().await?)),

            // ── settings ─────────────────────────────────────────────
            "ui.settings.get" => {
                #[derive(Deserialize)]
                struct Params {
                    key: String,
                }
                let p: Params = parse(&params)?;
                let record = self.settings.get(&p.key).await?;
                Ok(json!(record.map(|r| r.value)))
            }
            "ui.settings.set" => {
                #[derive(Deserialize)]
                struct Params {
                    key: String,
                    value: Value,
                }
                let p: Params = parse(&params)?;
                let now = self.time.now();
                self.serial
                    .run(self.settings.put(SettingsRecord {
                        key: p.key,
                        value: p.value,
                        updated_at: now,
                    }))
                    .await?;
                Ok(Value::Null)
            }

            // ── snapshot ─────────────────────────────────────────────
            "ui.snapshot.get" => Ok(json!(build_snapshot(&self.controllers).await?)),

            other => Err(WalletError::method_not_found(other)),
        }
    }

    /// Build the kind-specific executor and finalize the task through
    /// the approval controller, so side-effects land atomically with the
    /// decision.
    async fn resolve_approval(&self, id: Uuid, decision: Value) -> WalletResult<bool> {
        let Some(task) = self.controllers.approvals.get(id) else {
            return Ok(false);
        };

        let controllers = Arc::clone(&self.controllers);
        let executor: ApprovalExecutor = match task.kind {
            ApprovalKind::RequestAccounts => {
                let origin = task.origin.clone();
                let chain = required_chain(&task.chain_ref)?;
                Box::pin(async move {
                    let namespace = chain.namespace().to_string();
                    controllers
                        .permissions
                        .grant(
                            &origin,
                            &namespace,
                            &chain,
                            &[Capability::Basic, Capability::Accounts],
                        )
                        .await?;
                    let addresses = controllers.keyring.addresses();
                    let formatted: WalletResult<Vec<String>> = addresses
                        .iter()
                        .map(|address| format_address(&chain, address))
                        .collect();
                    Ok(json!(formatted?))
                })
            }
            ApprovalKind::RequestPermissions => {
                let origin = task.origin.clone();
                let chain = required_chain(&task.chain_ref)?;
                let capabilities: Vec<Capability> =
                    parse(&task.payload["capabilities"])?;
                Box::pin(async move {
                    let namespace = chain.namespace().to_string();
                    let record = controllers
                        .permissions
                        .grant(&origin, &namespace, &chain, &capabilities)
                        .await?;
                    let grants: Vec<Value> = record
                        .grants
                        .iter()
                        .map(|(chain, capabilities)| {
                            json!({ "chainRef": chain, "capabilities": capabilities })
                        })
                        .collect();
                    Ok(json!(grants))
                })
            }
            ApprovalKind::SignMessage => {
                let address: String = parse(&task.payload["address"])?;
                let message_hex: String = parse(&task.payload["message"])?;
                let message = message_hex
                    .strip_prefix("0x")
                    .and_then(|body| hex::decode(body).ok())
                    .ok_or_else(|| WalletError::invalid_params("message must be 0x-hex"))?;
                Box::pin(async move {
                    let signature = controllers.keyring.sign_message(&address, &message)?;
                    Ok(json!(signature))
                })
            }
            ApprovalKind::SignTypedData => {
                let address: String = parse(&task.payload["address"])?;
                let typed: TypedData = parse(&task.payload["typedData"])?;
                Box::pin(async move {
                    let signature = controllers.keyring.sign_typed_data(&address, &typed)?;
                    Ok(json!(signature))
                })
            }
            ApprovalKind::SendTransaction => {
                let tx_id: Uuid = parse(&task.payload["transactionId"])?;
                let final_call: Option<TransactionCall> = match decision.get("finalCall") {
                    Some(Value::Null) | None => None,
                    Some(edited) => Some(parse(edited)?),
                };
                Box::pin(async move {
                    controllers.transactions.commit_approval(tx_id, final_call).await
                })
            }
            ApprovalKind::AddChain => {
                let input: Eip3085ChainInput = parse(&task.payload["input"])?;
                Box::pin(async move {
                    let metadata = controllers.network.add_chain(&input).await?;
                    controllers.network.switch_active(&metadata.chain_ref).await?;
                    Ok(Value::Null)
                })
            }
            ApprovalKind::SwitchChain => {
                let chain: ChainRef = parse(&task.payload["chainRef"])?;
                Box::pin(async move {
                    controllers.network.switch_active(&chain).await?;
                    Ok(Value::Null)
                })
            }
        };

        self.controllers.approvals.resolve(id, executor).await
    }
}

fn required_chain(chain: &Option<ChainRef>) -> WalletResult<ChainRef> {
    chain
        .clone()
        .ok_or_else(|| WalletError::internal("approval task has no chain scope"))
}

fn shared_crypto_generate(word_count: usize) -> WalletResult<zeroize::Zeroizing<String>> {
    shared_crypto::generate_mnemonic(word_count).map_err(|e| {
        WalletError::new(ErrorReason::InvalidMnemonic, e.to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use shared_types::{ApprovalKind, RequestContext, SystemTimeSource};
    use wd_01_chain_registry::ChainRegistry;
    use wd_02_storage::{
        InMemoryAccountsStore, InMemoryApprovalsStore, InMemoryChainRegistryStore,
        InMemoryKeyringMetaStore, InMemoryNetworkPreferencesStore, InMemoryPermissionsStore,
        InMemoryRpcPreferencesStore, InMemorySettingsStore, InMemoryTransactionsStore,
        InMemoryVaultMetaStore,
    };
    use wd_03_vault::{AutoLockController, VaultConfig, VaultService};
    use wd_04_keyring::KeyringService;
    use wd_05_permissions::PermissionController;
    use wd_06_network::test_support::MockClientFactory;
    use wd_06_network::{NetworkConfig, NetworkController};
    use wd_07_approvals::{
        ApprovalConfig, ApprovalController, AttentionConfig, AttentionService,
    };
    use wd_08_transactions::{TransactionConfig, TransactionController};

    const DEV_MNEMONIC: &str =
        "test test test test test test test test test test test junk";
    const FIRST: &str = "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266";

    async fn bridge() -> (Arc<UiBridge>, Arc<Controllers>) {
        let messenger = Messenger::new();
        let time: Arc<dyn TimeSource> = Arc::new(SystemTimeSource);

        let vault = Arc::new(VaultService::new(
            Arc::new(InMemoryVaultMetaStore::new()),
            messenger.clone(),
            Arc::clone(&time),
            VaultConfig {
                pbkdf2_iterations: 1_000,
            },
        ));
        let autolock = AutoLockController::new(Arc::clone(&vault), Arc::clone(&time));
        autolock.start(&messenger);
        let keyring = KeyringService::new(
            Arc::clone(&vault),
            Arc::new(InMemoryAccountsStore::new()),
            Arc::new(InMemoryKeyringMetaStore::new()),
            messenger.clone(),
            Arc::clone(&time),
        );
        keyring.start();

        let registry = Arc::new(ChainRegistry::new(
            Arc::new(InMemoryChainRegistryStore::new()),
            Arc::clone(&time),
        ));
        registry.ensure_seeded().await.unwrap();
        let network = Arc::new(NetworkController::new(
            Arc::clone(&registry),
            Arc::new(InMemoryNetworkPreferencesStore::new()),
            Arc::new(InMemoryRpcPreferencesStore::new()),
            Arc::new(MockClientFactory::default()),
            messenger.clone(),
            Arc::clone(&time),
            NetworkConfig::default(),
        ));
        network.initialize().await.unwrap();

        let permissions = Arc::new(PermissionController::new(
            Arc::new(InMemoryPermissionsStore::new()),
            messenger.clone(),
            Arc::clone(&time),
        ));
        let approvals = ApprovalController::new(
            Arc::new(InMemoryApprovalsStore::new()),
            messenger.clone(),
            Arc::clone(&time),
            ApprovalConfig::default(),
        );
        let attention = Arc::new(AttentionService::new(
            messenger.clone(),
            Arc::clone(&time),
            AttentionConfig::default(),
        ));
        let transactions = TransactionController::new(
            Arc::new(InMemoryTransactionsStore::new()),
            Arc::clone(&keyring),
            Arc::clone(&permissions),
            Arc::clone(&network),
            Arc::clone(&approvals),
            messenger.clone(),
            Arc::clone(&time),
            TransactionConfig::default(),
        );

        let controllers = Arc::new(Controllers {
            vault,
            autolock,
            keyring,
            registry,
            network,
            permissions,
            approvals,
            attention,
            transactions,
        });
        let bridge = UiBridge::new(
            Arc::clone(&controllers),
            messenger,
            Arc::new(InMemorySettingsStore::new()),
            time,
        );
        (bridge, controllers)
    }

    async fn onboard(bridge: &Arc<UiBridge>) {
        bridge
            .handle("ui.vault.init", json!({ "password": "hunter2" }))
            .await
            .unwrap();
        bridge
            .handle("ui.vault.unlock", json!({ "password": "hunter2" }))
            .await
            .unwrap();
        bridge
            .handle(
                "ui.keyring.importMnemonic",
                json!({ "mnemonic": DEV_MNEMONIC, "alias": "Primary" }),
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_unknown_method_rejected() {
        let (bridge, _controllers) = bridge().await;
        let err = bridge.handle("ui.fake.method", json!({})).await.unwrap_err();
        assert_eq!(err.reason, ErrorReason::MethodNotFound);
    }

    #[tokio::test]
    async fn test_generate_mnemonic_word_counts() {
        let (bridge, _controllers) = bridge().await;
        let generated = bridge
            .handle("ui.keyring.generateMnemonic", json!({ "wordCount": 24 }))
            .await
            .unwrap();
        let phrase = generated["mnemonic"].as_str().unwrap();
        assert_eq!(phrase.split_whitespace().count(), 24);
    }

    #[tokio::test]
    async fn test_settings_roundtrip() {
        let (bridge, _controllers) = bridge().await;
        bridge
            .handle(
                "ui.settings.set",
                json!({ "key": "currency", "value": { "code": "EUR" } }),
            )
            .await
            .unwrap();
        let value = bridge
            .handle("ui.settings.get", json!({ "key": "currency" }))
            .await
            .unwrap();
        assert_eq!(value["code"], "EUR");

        let missing = bridge
            .handle("ui.settings.get", json!({ "key": "absent" }))
            .await
            .unwrap();
        assert!(missing.is_null());
    }

    #[tokio::test]
    async fn test_snapshot_reflects_onboarding() {
        let (bridge, _controllers) = bridge().await;
        let before = bridge.handle("ui.snapshot.get", json!({})).await.unwrap();
        assert_eq!(before["vault"]["initialized"], false);
        assert_eq!(before["session"]["isUnlocked"], false);

        onboard(&bridge).await;
        let after = bridge.handle("ui.snapshot.get", json!({})).await.unwrap();
        assert_eq!(after["vault"]["initialized"], true);
        assert_eq!(after["session"]["isUnlocked"], true);
        assert_eq!(after["accounts"]["list"][0]["address"], FIRST);
        // Fresh HD keyrings carry a backup warning until confirmed.
        assert_eq!(after["warnings"][0]["alias"], "Primary");

        let metas = bridge.handle("ui.accounts.list", json!({})).await.unwrap();
        let keyring_id = metas["keyrings"][0]["id"].clone();
        bridge
            .handle("ui.keyring.markBackedUp", json!({ "keyringId": keyring_id }))
            .await
            .unwrap();
        let cleared = bridge.handle("ui.snapshot.get", json!({})).await.unwrap();
        assert!(cleared["warnings"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_resolve_sign_message_approval() {
        let (bridge, controllers) = bridge().await;
        onboard(&bridge).await;

        // A handler-enqueued sign-message task.
        let approvals = Arc::clone(&controllers.approvals);
        let waiter = {
            let approvals = Arc::clone(&approvals);
            tokio::spawn(async move {
                approvals
                    .request_approval(
                        ApprovalKind::SignMessage,
                        "https://dapp.example",
                        Some("eip155".into()),
                        Some(shared_types::ChainRef::eip155(1)),
                        json!({ "address": FIRST, "message": "0x686920776172646e" }),
                        RequestContext::new("p1", "s1"),
                    )
                    .await
            })
        };
        for _ in 0..200 {
            tokio::task::yield_now().await;
            if !approvals.pending().is_empty() {
                break;
            }
        }
        let task = approvals.pending().remove(0);

        let resolved = bridge
            .handle("ui.approvals.resolve", json!({ "id": task.id }))
            .await
            .unwrap();
        assert_eq!(resolved, json!(true));

        let signature = waiter.await.unwrap().unwrap();
        let signature = signature.as_str().unwrap();
        assert_eq!(signature.len(), 2 + 65 * 2);
        assert!(signature.starts_with("0x"));
    }

    #[tokio::test]
    async fn test_reject_approval_is_idempotent() {
        let (bridge, controllers) = bridge().await;
        onboard(&bridge).await;

        let approvals = Arc::clone(&controllers.approvals);
        let waiter = {
            let approvals = Arc::clone(&approvals);
            tokio::spawn(async move {
                approvals
                    .request_approval(
                        ApprovalKind::SignMessage,
                        "https://dapp.example",
                        None,
                        None,
                        json!({ "address": FIRST, "message": "0x00" }),
                        RequestContext::new("p1", "s1"),
                    )
                    .await
            })
        };
        for _ in 0..200 {
            tokio::task::yield_now().await;
            if !approvals.pending().is_empty() {
                break;
            }
        }
        let id = approvals.pending()[0].id;

        let first = bridge
            .handle("ui.approvals.reject", json!({ "id": id }))
            .await
            .unwrap();
        let second = bridge
            .handle("ui.approvals.reject", json!({ "id": id }))
            .await
            .unwrap();
        assert_eq!(first, json!(true));
        assert_eq!(second, json!(false));
        assert_eq!(
            waiter.await.unwrap().unwrap_err().reason,
            ErrorReason::ApprovalRejected
        );
    }

    #[tokio::test]
    async fn test_networks_switch_and_list() {
        let (bridge, controllers) = bridge().await;
        bridge
            .handle("ui.networks.switchActive", json!({ "chainRef": "eip155:8453" }))
            .await
            .unwrap();
        assert_eq!(
            controllers.network.active_chain(),
            shared_types::ChainRef::eip155(8453)
        );

        let networks = bridge.handle("ui.networks.list", json!({})).await.unwrap();
        assert_eq!(networks["active"], "eip155:8453");
        assert!(!networks["known"].as_array().unwrap().is_empty());
    }
}
