//! Receipt tracker.
//!
//! One independent polling task per in-flight transaction, strictly
//! sequential within a transaction: 3s initial delay doubling to a 30s
//! cap, 20 attempts, then `receipt-timeout`. Between polls it checks for
//! replacement by nonce advance.

use crate::assembly::parse_quantity;
use crate::machine;
use crate::topics::TRANSACTION_UPDATED;
use parking_lot::Mutex;
use primitive_types::U256;
use serde_json::Value;
use shared_bus::Messenger;
use shared_types::{
    ErrorReason, TimeSource, TransactionRecord, TransactionStatus, WalletError, WalletResult,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;
use wd_02_storage::TransactionsStore;
use wd_06_network::NetworkController;

/// Tracker tuning.
#[derive(Debug, Clone, Copy)]
pub struct TrackerConfig {
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub max_attempts: u32,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            initial_delay_ms: 3_000,
            max_delay_ms: 30_000,
            max_attempts: 20,
        }
    }
}

/// What a receipt decoded to.
enum ReceiptVerdict {
    Success,
    Failure,
}

/// Polls broadcast transactions to a terminal state.
pub struct ReceiptTracker {
    store: Arc<dyn TransactionsStore>,
    network: Arc<NetworkController>,
    messenger: Messenger,
    time: Arc<dyn TimeSource>,
    config: TrackerConfig,
    tasks: Mutex<HashMap<Uuid, JoinHandle<()>>>,
}

impl ReceiptTracker {
    pub fn new(
        store: Arc<dyn TransactionsStore>,
        network: Arc<NetworkController>,
        messenger: Messenger,
        time: Arc<dyn TimeSource>,
        config: TrackerConfig,
    ) -> Arc<Self> {
        Arc::new(Self {
            store,
            network,
            messenger,
            time,
            config,
            tasks: Mutex::new(HashMap::new()),
        })
    }

    /// Start tracking one broadcast transaction. Idempotent per id.
    pub fn track(self: &Arc<Self>, record: TransactionRecord) {
        let id = record.id;
        let mut tasks = self.tasks.lock();
        if tasks.contains_key(&id) {
            return;
        }
        let tracker = Arc::clone(self);
        let handle = tokio::spawn(async move {
            tracker.run(record).await;
        });
        tasks.insert(id, handle);
        debug!(tx = %id, "receipt tracking started");
    }

    /// Restart tracking for every persisted `broadcast` row. Cold-start
    /// path.
    pub async fn resume(self: &Arc<Self>) -> WalletResult<usize> {
        let in_flight = self
            .store
            .list_by_status(TransactionStatus::Broadcast)
            .await?;
        let count = in_flight.len();
        for record in in_flight {
            self.track(record);
        }
        if count > 0 {
            info!(count, "resumed receipt tracking");
        }
        Ok(count)
    }

    /// Abort every polling task. Part of runtime teardown.
    pub fn stop_all(&self) {
        for (_, handle) in self.tasks.lock().drain() {
            handle.abort();
        }
    }

    async fn run(self: Arc<Self>, record: TransactionRecord) {
        let id = record.id;
        let Some(hash) = record.hash.clone() else {
            error!(tx = %id, "broadcast record without hash; not tracking");
            return;
        };
        let chain = record.chain_ref.clone();
        let from = record.request.from.clone();
        let original_nonce = record.request.nonce.as_deref().and_then(parse_quantity);

        let mut delay = self.config.initial_delay_ms;
        for attempt in 1..=self.config.max_attempts {
            tokio::time::sleep(Duration::from_millis(delay)).await;
            delay = (delay * 2).min(self.config.max_delay_ms);

            let client = match self.network.client_for(&chain).await {
                Ok(client) => client,
                Err(error) => {
                    warn!(tx = %id, %error, attempt, "no client for receipt poll");
                    continue;
                }
            };

            match client.get_transaction_receipt(&hash).await {
                Ok(Some(receipt)) => {
                    let _ = self.network.report_rpc_outcome(&chain, true, None).await;
                    let returned_hash = receipt.get("transactionHash").and_then(Value::as_str);
                    if returned_hash != Some(hash.as_str()) {
                        // The node answered for a different transaction.
                        // Keep the record broadcast and keep polling.
                        error!(tx = %id, ?returned_hash, "receipt hash mismatch");
                        continue;
                    }
                    match decode_receipt(&receipt) {
                        ReceiptVerdict::Success => {
                            self.finalize(id, TransactionStatus::Confirmed, Some(receipt), None)
                                .await;
                        }
                        ReceiptVerdict::Failure => {
                            self.finalize(
                                id,
                                TransactionStatus::Failed,
                                Some(receipt),
                                Some(WalletError::new(
                                    ErrorReason::ResolutionFailed,
                                    "transaction reverted on chain",
                                )),
                            )
                            .await;
                        }
                    }
                    return;
                }
                Ok(None) => {
                    let _ = self.network.report_rpc_outcome(&chain, true, None).await;
                    if let Some(original) = original_nonce {
                        if self.nonce_advanced(&client, &from, original).await {
                            self.finalize(
                                id,
                                TransactionStatus::Replaced,
                                None,
                                Some(WalletError::new(
                                    ErrorReason::Replaced,
                                    "a different transaction consumed the nonce",
                                )),
                            )
                            .await;
                            return;
                        }
                    }
                }
                Err(error) => {
                    warn!(tx = %id, %error, attempt, "receipt poll failed");
                    let _ = self
                        .network
                        .report_rpc_outcome(&chain, false, Some(error.to_string()))
                        .await;
                }
            }
        }

        self.finalize(
            id,
            TransactionStatus::Failed,
            None,
            Some(WalletError::new(
                ErrorReason::ReceiptTimeout,
                "no receipt within the polling budget",
            )),
        )
        .await;
    }

    /// On-chain nonce strictly past the original means some transaction
    /// with our nonce was mined; without a receipt for our hash, ours was
    /// replaced.
    async fn nonce_advanced(
        &self,
        client: &Arc<dyn wd_06_network::Eip155Client>,
        from: &str,
        original: U256,
    ) -> bool {
        match client.get_transaction_count(from, "latest").await {
            Ok(latest_hex) => parse_quantity(&latest_hex)
                .map(|latest| latest > original)
                .unwrap_or(false),
            Err(error) => {
                debug!(%error, "replacement check failed");
                false
            }
        }
    }

    async fn finalize(
        &self,
        id: Uuid,
        status: TransactionStatus,
        receipt: Option<Value>,
        error: Option<WalletError>,
    ) {
        debug_assert!(machine::can_transition(TransactionStatus::Broadcast, status));
        let current = match self.store.get(id).await {
            Ok(Some(record)) => record,
            Ok(None) => return,
            Err(store_error) => {
                error!(tx = %id, %store_error, "tracker could not load record");
                return;
            }
        };
        let mut next = current;
        next.status = status;
        next.receipt = receipt;
        next.error = error;
        next.updated_at = self.time.now();

        match self
            .store
            .update_if_status(id, TransactionStatus::Broadcast, next)
            .await
        {
            Ok(Some(stored)) => {
                info!(tx = %id, ?status, "transaction finalized");
                self.messenger.publish(&TRANSACTION_UPDATED, stored);
            }
            Ok(None) => {
                // Another writer won; nothing to do.
                debug!(tx = %id, "finalize lost the status race");
            }
            Err(store_error) => {
                error!(tx = %id, %store_error, "tracker finalize failed");
            }
        }
        self.tasks.lock().remove(&id);
    }
}

fn decode_receipt(receipt: &Value) -> ReceiptVerdict {
    // Prefer the explicit status field; fall back to block-number
    // presence only when status is absent. Anything else is failure.
    match receipt.get("status").and_then(Value::as_str) {
        Some("0x1") => ReceiptVerdict::Success,
        Some(_) => ReceiptVerdict::Failure,
        None => match receipt.get("blockNumber") {
            Some(Value::String(s)) if !s.is_empty() => ReceiptVerdict::Success,
            _ => ReceiptVerdict::Failure,
        },
    }
}
