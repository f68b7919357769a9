//! Outbound ports: the eip155 namespace RPC client.
//!
//! The core never speaks HTTP; the host supplies a [`ClientFactory`] and
//! the controller binds clients to whichever endpoint a chain's pool
//! currently prefers. Quantities are 0x-hex strings exactly as they
//! appear on the wire.

use async_trait::async_trait;
use serde_json::Value;
use shared_types::{ChainRef, WalletResult};
use std::sync::Arc;
use wd_02_storage::RpcEndpoint;

/// JSON-RPC surface of one eip155 chain endpoint.
#[async_trait]
pub trait Eip155Client: Send + Sync + std::fmt::Debug {
    async fn estimate_gas(&self, call: &Value) -> WalletResult<String>;
    async fn get_balance(&self, address: &str, tag: &str) -> WalletResult<String>;
    async fn get_transaction_count(&self, address: &str, tag: &str) -> WalletResult<String>;
    async fn get_gas_price(&self) -> WalletResult<String>;
    async fn get_max_priority_fee_per_gas(&self) -> WalletResult<String>;
    async fn get_fee_history(
        &self,
        block_count: u64,
        newest_block: &str,
        reward_percentiles: &[f64],
    ) -> WalletResult<Value>;
    async fn get_block_by_number(&self, tag: &str, full_transactions: bool) -> WalletResult<Value>;
    async fn get_transaction_receipt(&self, hash: &str) -> WalletResult<Option<Value>>;
    async fn send_raw_transaction(&self, raw_hex: &str) -> WalletResult<String>;

    /// Generic passthrough for allowlisted read methods.
    async fn request(&self, method: &str, params: Value) -> WalletResult<Value>;
}

/// Builds clients bound to a concrete endpoint.
pub trait ClientFactory: Send + Sync {
    fn client_for(&self, chain: &ChainRef, endpoint: &RpcEndpoint) -> Arc<dyn Eip155Client>;
}
