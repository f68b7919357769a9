//! The transaction controller.

use crate::assembly::PreparedTransaction;
use crate::draft::build_draft;
use crate::machine;
use crate::topics::TRANSACTION_UPDATED;
use crate::tracker::{ReceiptTracker, TrackerConfig};
use serde_json::{json, Value};
use shared_bus::Messenger;
use shared_types::{
    AccountId, ApprovalKind, Capability, ChainRef, ErrorReason, Origin, RequestContext,
    TimeSource, TransactionCall, TransactionRecord, TransactionStatus, WalletError, WalletResult,
};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;
use wd_01_chain_registry::canonicalize_address;
use wd_02_storage::TransactionsStore;
use wd_04_keyring::KeyringService;
use wd_05_permissions::PermissionController;
use wd_06_network::NetworkController;
use wd_07_approvals::ApprovalController;

/// Transaction subsystem tuning.
#[derive(Debug, Clone, Copy, Default)]
pub struct TransactionConfig {
    pub tracker: TrackerConfig,
}

/// Drives the draft -> approval -> sign -> broadcast -> terminal flow.
pub struct TransactionController {
    store: Arc<dyn TransactionsStore>,
    keyring: Arc<KeyringService>,
    permissions: Arc<PermissionController>,
    network: Arc<NetworkController>,
    approvals: Arc<ApprovalController>,
    tracker: Arc<ReceiptTracker>,
    messenger: Messenger,
    time: Arc<dyn TimeSource>,
}

impl TransactionController {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        store: Arc<dyn TransactionsStore>,
        keyring: Arc<KeyringService>,
        permissions: Arc<PermissionController>,
        network: Arc<NetworkController>,
        approvals: Arc<ApprovalController>,
        messenger: Messenger,
        time: Arc<dyn TimeSource>,
        config: TransactionConfig,
    ) -> Arc<Self> {
        let tracker = ReceiptTracker::new(
            Arc::clone(&store),
            Arc::clone(&network),
            messenger.clone(),
            Arc::clone(&time),
            config.tracker,
        );
        Arc::new(Self {
            store,
            keyring,
            permissions,
            network,
            approvals,
            tracker,
            messenger,
            time,
        })
    }

    /// The `eth_sendTransaction` flow: authorize, draft, await approval,
    /// sign, broadcast, start tracking. Returns the transaction hash.
    pub async fn request_transaction_approval(
        &self,
        origin: &Origin,
        chain: ChainRef,
        call: TransactionCall,
        context: RequestContext,
    ) -> WalletResult<String> {
        let namespace = chain.namespace().to_string();
        let chain_id = chain.eip155_chain_id().ok_or_else(|| {
            WalletError::new(
                ErrorReason::NotCompatible,
                format!("cannot send transactions on namespace {namespace:?}"),
            )
        })?;

        // 1. Authorization. Ownership failures surface as
        //    lacks-capability: authorization is the user-visible reason.
        let canonical_from = canonicalize_address(&chain, &call.from)?;
        if !self.keyring.owns(&namespace, &canonical_from) {
            return Err(WalletError::new(
                ErrorReason::LacksCapability,
                format!("the active keyring does not authorize {canonical_from}"),
            ));
        }
        if !origin.is_trusted()
            && !self
                .permissions
                .has_capability(origin.as_key(), &namespace, &chain, Capability::SendTransaction)
                .await?
        {
            return Err(WalletError::new(
                ErrorReason::LacksCapability,
                format!("{origin} lacks send-transaction on {chain}"),
            ));
        }

        // 2. Draft preview.
        let client = self.network.client_for(&chain).await?;
        let draft = build_draft(&client, &canonical_from, call).await;

        // 3. Persist the pending record.
        let now = self.time.now();
        let record = TransactionRecord {
            id: Uuid::new_v4(),
            namespace: namespace.clone(),
            chain_ref: chain.clone(),
            origin: origin.as_key().to_string(),
            from_account_id: AccountId::new(chain.clone(), canonical_from.clone()),
            request: draft.call,
            status: TransactionStatus::Pending,
            hash: None,
            receipt: None,
            error: None,
            user_rejected: false,
            warnings: draft.warnings,
            issues: draft.issues,
            created_at: now,
            updated_at: now,
        };
        let id = record.id;
        self.store.put(record.clone()).await?;
        self.messenger.publish(&TRANSACTION_UPDATED, record.clone());
        info!(tx = %id, origin = %origin, %chain, "transaction drafted");

        // 4. Rendezvous with the user.
        let approval = self
            .approvals
            .request_approval(
                ApprovalKind::SendTransaction,
                origin.as_key(),
                Some(namespace),
                Some(chain.clone()),
                json!({ "transactionId": id, "preview": record }),
                context,
            )
            .await;
        if let Err(error) = approval {
            let user_rejected = error.reason == ErrorReason::ApprovalRejected;
            self.transition(id, TransactionStatus::Pending, |record| {
                record.status = TransactionStatus::Failed;
                record.user_rejected = user_rejected;
                record.error = Some(error.clone());
            })
            .await?;
            return Err(error);
        }

        // 5. Sign. The approval executor moved the record to `approved`
        //    with the user's final fields.
        let approved = self.store.get(id).await?.ok_or_else(|| {
            WalletError::internal(format!("transaction {id} vanished after approval"))
        })?;
        let prepared = match PreparedTransaction::from_call(&approved.request, chain_id) {
            Ok(prepared) => prepared,
            Err(error) => {
                self.fail_from(id, TransactionStatus::Approved, &error).await;
                return Err(error);
            }
        };
        let signature = match self.keyring.sign_digest(&canonical_from, &prepared.sighash()) {
            Ok(signature) => signature,
            Err(error) => {
                self.fail_from(id, TransactionStatus::Approved, &error).await;
                return Err(error);
            }
        };
        self.transition(id, TransactionStatus::Approved, |record| {
            record.status = TransactionStatus::Signed;
        })
        .await?
        .ok_or_else(|| {
            WalletError::new(
                ErrorReason::ResolutionFailed,
                format!("transaction {id} left approved state concurrently"),
            )
        })?;

        // 6. Broadcast.
        let raw = prepared.raw_signed(&signature);
        let raw_hex = format!("0x{}", hex::encode(&raw));
        let hash = match client.send_raw_transaction(&raw_hex).await {
            Ok(hash) => {
                let _ = self.network.report_rpc_outcome(&chain, true, None).await;
                hash.to_lowercase()
            }
            Err(error) => {
                let _ = self
                    .network
                    .report_rpc_outcome(&chain, false, Some(error.to_string()))
                    .await;
                self.fail_from(id, TransactionStatus::Signed, &error).await;
                return Err(error);
            }
        };

        // The (chainRef, hash) pair must identify at most one record.
        if let Some(existing) = self.store.find_by_chain_ref_and_hash(&chain, &hash).await? {
            if existing.id != id {
                let error = WalletError::new(
                    ErrorReason::ResolutionFailed,
                    format!("hash {hash} already belongs to transaction {}", existing.id),
                );
                self.fail_from(id, TransactionStatus::Signed, &error).await;
                return Err(error);
            }
        }

        let broadcast = self
            .transition(id, TransactionStatus::Signed, |record| {
                record.status = TransactionStatus::Broadcast;
                record.hash = Some(hash.clone());
            })
            .await?
            .ok_or_else(|| {
                WalletError::new(
                    ErrorReason::ResolutionFailed,
                    format!("transaction {id} left signed state concurrently"),
                )
            })?;
        info!(tx = %id, hash, "transaction broadcast");

        // 7. Track the receipt in the background.
        self.tracker.track(broadcast);
        Ok(hash)
    }

    /// The approval executor: commit the user's decision, moving
    /// `pending -> approved` with the (possibly edited) final fields.
    pub async fn commit_approval(
        &self,
        id: Uuid,
        final_call: Option<TransactionCall>,
    ) -> WalletResult<Value> {
        let current = self
            .store
            .get(id)
            .await?
            .ok_or_else(|| WalletError::internal(format!("no transaction {id}")))?;

        let approved = self
            .transition(id, TransactionStatus::Pending, |record| {
                record.status = TransactionStatus::Approved;
                if let Some(mut edited) = final_call.clone() {
                    // The sender was authorized; edits cannot move it.
                    edited.from = current.request.from.clone();
                    record.request = edited;
                }
            })
            .await?
            .ok_or_else(|| {
                WalletError::new(
                    ErrorReason::ResolutionFailed,
                    format!("transaction {id} is no longer pending"),
                )
            })?;
        Ok(json!(approved))
    }

    /// One record.
    pub async fn get(&self, id: Uuid) -> WalletResult<Option<TransactionRecord>> {
        self.store.get(id).await
    }

    /// Every record, canonical order.
    pub async fn list(&self) -> WalletResult<Vec<TransactionRecord>> {
        self.store.get_all().await
    }

    /// Cold-start resume: restart tracking for `broadcast` rows and fail
    /// `pending` rows that outlived the session that drafted them.
    pub async fn resume(&self) -> WalletResult<()> {
        let stale = self
            .store
            .list_by_status(TransactionStatus::Pending)
            .await?;
        for record in stale {
            let id = record.id;
            self.transition(id, TransactionStatus::Pending, |record| {
                record.status = TransactionStatus::Failed;
                record.error = Some(
                    WalletError::new(
                        ErrorReason::ResolutionFailed,
                        "transaction outlived the session that requested it",
                    )
                    .with_data(json!({ "cause": "session_restart" })),
                );
            })
            .await?;
            debug!(tx = %id, "stale pending transaction failed on restart");
        }
        self.tracker.resume().await?;
        Ok(())
    }

    /// Stop every tracker task. Part of runtime teardown.
    pub fn destroy(&self) {
        self.tracker.stop_all();
    }

    async fn fail_from(&self, id: Uuid, from: TransactionStatus, error: &WalletError) {
        let result = self
            .transition(id, from, |record| {
                record.status = TransactionStatus::Failed;
                record.error = Some(error.clone());
            })
            .await;
        if let Err(transition_error) = result {
            warn!(tx = %id, %transition_error, "failure transition did not persist");
        }
    }

    /// CAS-guarded transition. `None` means the persisted status moved
    /// on, a benign race the other writer won.
    async fn transition<F>(
        &self,
        id: Uuid,
        from: TransactionStatus,
        mutate: F,
    ) -> WalletResult<Option<TransactionRecord>>
    where
        F: FnOnce(&mut TransactionRecord),
    {
        let Some(current) = self.store.get(id).await? else {
            return Ok(None);
        };
        if current.status != from {
            return Ok(None);
        }
        let mut next = current;
        mutate(&mut next);
        if !machine::can_transition(from, next.status) {
            return Err(WalletError::internal(format!(
                "illegal transition {:?} -> {:?}",
                from, next.status
            )));
        }
        next.updated_at = self.time.now();

        let stored = self.store.update_if_status(id, from, next).await?;
        if let Some(record) = &stored {
            self.messenger.publish(&TRANSACTION_UPDATED, record.clone());
        }
        Ok(stored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::SystemTimeSource;
    use wd_01_chain_registry::ChainRegistry;
    use wd_02_storage::{
        InMemoryAccountsStore, InMemoryApprovalsStore, InMemoryChainRegistryStore,
        InMemoryKeyringMetaStore, InMemoryNetworkPreferencesStore, InMemoryPermissionsStore,
        InMemoryRpcPreferencesStore, InMemoryTransactionsStore, InMemoryVaultMetaStore,
    };
    use wd_03_vault::{VaultConfig, VaultService};
    use wd_06_network::test_support::{MockClientFactory, MockEip155Client};
    use wd_06_network::{NetworkConfig, NetworkController};
    use wd_07_approvals::ApprovalConfig;

    const DEV_MNEMONIC: &str =
        "test test test test test test test test test test test junk";
    const FIRST: &str = "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266";

    struct Harness {
        controller: Arc<TransactionController>,
        approvals: Arc<ApprovalController>,
        permissions: Arc<PermissionController>,
        store: Arc<InMemoryTransactionsStore>,
        client: Arc<MockEip155Client>,
    }

    async fn harness() -> Harness {
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
        let keyring = KeyringService::new(
            Arc::clone(&vault),
            Arc::new(InMemoryAccountsStore::new()),
            Arc::new(InMemoryKeyringMetaStore::new()),
            messenger.clone(),
            Arc::clone(&time),
        );
        keyring.start();
        vault.init("hunter2").await.unwrap();
        vault.unlock("hunter2").await.unwrap();
        let keyring_id = keyring.create_hd("eip155", DEV_MNEMONIC, "primary").await.unwrap();
        keyring.derive_next_account(keyring_id).await.unwrap();

        let registry = Arc::new(ChainRegistry::new(
            Arc::new(InMemoryChainRegistryStore::new()),
            Arc::clone(&time),
        ));
        registry.ensure_seeded().await.unwrap();

        let client = MockEip155Client::new();
        let network = Arc::new(NetworkController::new(
            registry,
            Arc::new(InMemoryNetworkPreferencesStore::new()),
            Arc::new(InMemoryRpcPreferencesStore::new()),
            Arc::new(MockClientFactory::new(Arc::clone(&client))),
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
        let store = Arc::new(InMemoryTransactionsStore::new());

        let controller = TransactionController::new(
            Arc::clone(&store) as Arc<dyn TransactionsStore>,
            keyring,
            Arc::clone(&permissions),
            network,
            Arc::clone(&approvals),
            messenger,
            time,
            TransactionConfig {
                tracker: TrackerConfig {
                    initial_delay_ms: 10,
                    max_delay_ms: 40,
                    max_attempts: 5,
                },
            },
        );

        Harness {
            controller,
            approvals,
            permissions,
            store,
            client,
        }
    }

    fn send_call() -> TransactionCall {
        serde_json::from_value(json!({
            "from": FIRST,
            "to": "0x70997970c51812dc3a010c7d01b50e0d17dc79c8",
            "value": "0xde0b6b3a7640000"
        }))
        .unwrap()
    }

    async fn grant_send(harness: &Harness, origin: &str) {
        harness
            .permissions
            .grant(
                origin,
                "eip155",
                &ChainRef::eip155(1),
                &[Capability::Basic, Capability::Accounts, Capability::SendTransaction],
            )
            .await
            .unwrap();
    }

    /// Drives the approval like the UI would.
    fn auto_approve(harness: &Harness) -> tokio::task::JoinHandle<()> {
        let approvals = Arc::clone(&harness.approvals);
        let controller = Arc::clone(&harness.controller);
        tokio::spawn(async move {
            for _ in 0..200 {
                tokio::task::yield_now().await;
                if let Some(task) = approvals.pending().first().cloned() {
                    let tx_id: Uuid = serde_json::from_value(
                        task.payload["transactionId"].clone(),
                    )
                    .unwrap();
                    let controller = Arc::clone(&controller);
                    approvals
                        .resolve(
                            task.id,
                            Box::pin(async move { controller.commit_approval(tx_id, None).await }),
                        )
                        .await
                        .unwrap();
                    return;
                }
            }
            panic!("no approval appeared");
        })
    }

    #[tokio::test]
    async fn test_happy_path_reaches_confirmed() {
        let harness = harness().await;
        let origin = Origin::Web("https://dapp.example".into());
        grant_send(&harness, origin.as_key()).await;
        harness.client.responses.lock().receipts.push_back(None);

        let approver = auto_approve(&harness);
        let hash = harness
            .controller
            .request_transaction_approval(
                &origin,
                ChainRef::eip155(1),
                send_call(),
                RequestContext::new("p1", "s1"),
            )
            .await
            .unwrap();
        approver.await.unwrap();

        assert_eq!(hash.len(), 66);
        assert!(hash.starts_with("0x"));
        assert_eq!(hash, hash.to_lowercase());

        // Feed a successful receipt and wait for the tracker.
        harness
            .client
            .responses
            .lock()
            .receipts
            .push_back(Some(json!({
                "transactionHash": hash,
                "status": "0x1",
                "blockNumber": "0x10"
            })));
        for _ in 0..100 {
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
            let record = harness.store.get_all().await.unwrap().remove(0);
            if record.status == TransactionStatus::Confirmed {
                assert_eq!(record.hash.as_deref(), Some(hash.as_str()));
                assert!(record.receipt.is_some());
                return;
            }
        }
        panic!("transaction never confirmed");
    }

    #[tokio::test]
    async fn test_rejection_marks_user_rejected() {
        let harness = harness().await;
        let origin = Origin::Web("https://dapp.example".into());
        grant_send(&harness, origin.as_key()).await;

        let approvals = Arc::clone(&harness.approvals);
        let rejecter = tokio::spawn(async move {
            for _ in 0..200 {
                tokio::task::yield_now().await;
                if let Some(task) = approvals.pending().first().cloned() {
                    approvals
                        .reject(task.id, WalletError::approval_rejected())
                        .await
                        .unwrap();
                    return;
                }
            }
            panic!("no approval appeared");
        });

        let err = harness
            .controller
            .request_transaction_approval(
                &origin,
                ChainRef::eip155(1),
                send_call(),
                RequestContext::new("p1", "s1"),
            )
            .await
            .unwrap_err();
        rejecter.await.unwrap();
        assert_eq!(err.reason, ErrorReason::ApprovalRejected);

        let record = harness.store.get_all().await.unwrap().remove(0);
        assert_eq!(record.status, TransactionStatus::Failed);
        assert!(record.user_rejected);
    }

    #[tokio::test]
    async fn test_unowned_sender_rejects_lacks_capability() {
        let harness = harness().await;
        let origin = Origin::Web("https://dapp.example".into());
        grant_send(&harness, origin.as_key()).await;

        let mut call = send_call();
        call.from = "0x000000000000000000000000000000000000dead".into();
        let err = harness
            .controller
            .request_transaction_approval(
                &origin,
                ChainRef::eip155(1),
                call,
                RequestContext::new("p1", "s1"),
            )
            .await
            .unwrap_err();
        assert_eq!(err.reason, ErrorReason::LacksCapability);
    }

    #[tokio::test]
    async fn test_origin_without_grant_rejects() {
        let harness = harness().await;
        let origin = Origin::Web("https://dapp.example".into());

        let err = harness
            .controller
            .request_transaction_approval(
                &origin,
                ChainRef::eip155(1),
                send_call(),
                RequestContext::new("p1", "s1"),
            )
            .await
            .unwrap_err();
        assert_eq!(err.reason, ErrorReason::LacksCapability);
    }

    #[tokio::test]
    async fn test_replacement_detection() {
        let harness = harness().await;
        let origin = Origin::Web("https://dapp.example".into());
        grant_send(&harness, origin.as_key()).await;
        {
            let mut responses = harness.client.responses.lock();
            responses.pending_nonce = "0x3".into();
            responses.latest_nonce = "0x5".into();
        }

        let approver = auto_approve(&harness);
        harness
            .controller
            .request_transaction_approval(
                &origin,
                ChainRef::eip155(1),
                send_call(),
                RequestContext::new("p1", "s1"),
            )
            .await
            .unwrap();
        approver.await.unwrap();

        for _ in 0..100 {
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
            let record = harness.store.get_all().await.unwrap().remove(0);
            if record.status == TransactionStatus::Replaced {
                assert_eq!(record.error.unwrap().reason, ErrorReason::Replaced);
                return;
            }
        }
        panic!("replacement never detected");
    }

    #[tokio::test]
    async fn test_resume_fails_stale_pending() {
        let harness = harness().await;
        let now = 1u64;
        let record = TransactionRecord {
            id: Uuid::new_v4(),
            namespace: "eip155".into(),
            chain_ref: ChainRef::eip155(1),
            origin: "https://dapp.example".into(),
            from_account_id: AccountId::new(ChainRef::eip155(1), FIRST),
            request: send_call(),
            status: TransactionStatus::Pending,
            hash: None,
            receipt: None,
            error: None,
            user_rejected: false,
            warnings: vec![],
            issues: vec![],
            created_at: now,
            updated_at: now,
        };
        harness.store.put(record.clone()).await.unwrap();

        harness.controller.resume().await.unwrap();
        let reloaded = harness.store.get(record.id).await.unwrap().unwrap();
        assert_eq!(reloaded.status, TransactionStatus::Failed);
        assert_eq!(
            reloaded.error.unwrap().data.unwrap()["cause"],
            "session_restart"
        );
    }
}
