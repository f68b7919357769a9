//! Programmable mock client for unit and integration tests.
//!
//! Shared across crates, so it lives in the tree rather than behind
//! `cfg(test)`.

use crate::ports::{ClientFactory, Eip155Client};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};
use shared_crypto::keccak256;
use shared_types::{ChainRef, WalletError, WalletResult};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use wd_02_storage::RpcEndpoint;

/// Scripted responses for one mock client.
#[derive(Debug)]
pub struct MockResponses {
    /// `eth_getTransactionCount(addr, "pending")`.
    pub pending_nonce: String,
    /// `eth_getTransactionCount(addr, "latest")`.
    pub latest_nonce: String,
    pub balance: String,
    pub gas_price: String,
    pub max_priority_fee: String,
    pub estimate_gas: String,
    /// `None` makes `eth_feeHistory` fail, exercising legacy fallback.
    pub fee_history: Option<Value>,
    /// Popped per receipt poll; empty queue means "no receipt yet".
    pub receipts: VecDeque<Option<Value>>,
    /// Responses for generic passthrough `request()` calls, by method.
    pub generic: HashMap<String, Value>,
    /// When set, the next call fails once with this error.
    pub fail_next: Option<WalletError>,
}

impl Default for MockResponses {
    fn default() -> Self {
        Self {
            pending_nonce: "0x0".into(),
            latest_nonce: "0x0".into(),
            balance: "0xde0b6b3a7640000".into(), // 1 ether
            gas_price: "0x3b9aca00".into(),      // 1 gwei
            max_priority_fee: "0x3b9aca00".into(),
            estimate_gas: "0x5208".into(), // 21000
            fee_history: Some(json!({
                "oldestBlock": "0x1",
                "baseFeePerGas": ["0x3b9aca00", "0x3b9aca00"],
                "reward": [["0x3b9aca00"]]
            })),
            receipts: VecDeque::new(),
            generic: HashMap::new(),
            fail_next: None,
        }
    }
}

/// In-memory [`Eip155Client`] with a call log.
#[derive(Default, Debug)]
pub struct MockEip155Client {
    pub responses: Mutex<MockResponses>,
    pub calls: Mutex<Vec<(String, Value)>>,
}

impl MockEip155Client {
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Methods called so far, in order.
    #[must_use]
    pub fn called_methods(&self) -> Vec<String> {
        self.calls.lock().iter().map(|(m, _)| m.clone()).collect()
    }

    fn record(&self, method: &str, params: Value) -> WalletResult<()> {
        self.calls.lock().push((method.to_string(), params));
        if let Some(error) = self.responses.lock().fail_next.take() {
            return Err(error);
        }
        Ok(())
    }
}

#[async_trait]
impl Eip155Client for MockEip155Client {
    async fn estimate_gas(&self, call: &Value) -> WalletResult<String> {
        self.record("eth_estimateGas", call.clone())?;
        Ok(self.responses.lock().estimate_gas.clone())
    }

    async fn get_balance(&self, address: &str, tag: &str) -> WalletResult<String> {
        self.record("eth_getBalance", json!([address, tag]))?;
        Ok(self.responses.lock().balance.clone())
    }

    async fn get_transaction_count(&self, address: &str, tag: &str) -> WalletResult<String> {
        self.record("eth_getTransactionCount", json!([address, tag]))?;
        let responses = self.responses.lock();
        Ok(if tag == "latest" {
            responses.latest_nonce.clone()
        } else {
            responses.pending_nonce.clone()
        })
    }

    async fn get_gas_price(&self) -> WalletResult<String> {
        self.record("eth_gasPrice", json!([]))?;
        Ok(self.responses.lock().gas_price.clone())
    }

    async fn get_max_priority_fee_per_gas(&self) -> WalletResult<String> {
        self.record("eth_maxPriorityFeePerGas", json!([]))?;
        Ok(self.responses.lock().max_priority_fee.clone())
    }

    async fn get_fee_history(
        &self,
        block_count: u64,
        newest_block: &str,
        reward_percentiles: &[f64],
    ) -> WalletResult<Value> {
        self.record(
            "eth_feeHistory",
            json!([block_count, newest_block, reward_percentiles]),
        )?;
        self.responses
            .lock()
            .fee_history
            .clone()
            .ok_or_else(|| WalletError::internal("fee history unavailable"))
    }

    async fn get_block_by_number(&self, tag: &str, full_transactions: bool) -> WalletResult<Value> {
        self.record("eth_getBlockByNumber", json!([tag, full_transactions]))?;
        Ok(json!({ "number": "0x1", "baseFeePerGas": "0x3b9aca00" }))
    }

    async fn get_transaction_receipt(&self, hash: &str) -> WalletResult<Option<Value>> {
        self.record("eth_getTransactionReceipt", json!([hash]))?;
        Ok(self.responses.lock().receipts.pop_front().flatten())
    }

    async fn send_raw_transaction(&self, raw_hex: &str) -> WalletResult<String> {
        self.record("eth_sendRawTransaction", json!([raw_hex]))?;
        let raw = hex::decode(raw_hex.trim_start_matches("0x"))
            .map_err(|_| WalletError::invalid_params("raw transaction is not hex"))?;
        Ok(format!("0x{}", hex::encode(keccak256(&raw))))
    }

    async fn request(&self, method: &str, params: Value) -> WalletResult<Value> {
        self.record(method, params)?;
        self.responses
            .lock()
            .generic
            .get(method)
            .cloned()
            .ok_or_else(|| WalletError::method_not_found(method))
    }
}

/// Factory handing out one shared mock client for every chain.
#[derive(Default)]
pub struct MockClientFactory {
    client: Arc<MockEip155Client>,
    pub endpoints_seen: Mutex<Vec<(ChainRef, String)>>,
}

impl MockClientFactory {
    #[must_use]
    pub fn new(client: Arc<MockEip155Client>) -> Self {
        Self {
            client,
            endpoints_seen: Mutex::new(Vec::new()),
        }
    }

    /// The shared mock.
    #[must_use]
    pub fn client(&self) -> Arc<MockEip155Client> {
        Arc::clone(&self.client)
    }
}

impl ClientFactory for MockClientFactory {
    fn client_for(&self, chain: &ChainRef, endpoint: &RpcEndpoint) -> Arc<dyn Eip155Client> {
        self.endpoints_seen
            .lock()
            .push((chain.clone(), endpoint.url.clone()));
        Arc::clone(&self.client) as Arc<dyn Eip155Client>
    }
}
