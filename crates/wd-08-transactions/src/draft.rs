//! Draft preview building.
//!
//! Resolves the fields the caller left unset (nonce, gas, fees) through
//! the chain's RPC client and annotates the draft with warnings (odd but
//! usable) and issues (could not be resolved).

use crate::assembly::parse_quantity;
use primitive_types::U256;
use serde_json::json;
use shared_types::TransactionCall;
use std::sync::Arc;
use tracing::debug;
use wd_06_network::Eip155Client;

/// A resolved draft plus its annotations.
#[derive(Debug, Clone)]
pub struct DraftOutcome {
    pub call: TransactionCall,
    pub warnings: Vec<String>,
    pub issues: Vec<String>,
}

/// Fill in nonce, gas, and fees; check the balance. Never fails: any
/// field that cannot be resolved becomes an issue on the preview so the
/// user sees exactly what is wrong.
pub async fn build_draft(
    client: &Arc<dyn Eip155Client>,
    canonical_from: &str,
    mut call: TransactionCall,
) -> DraftOutcome {
    let mut warnings = Vec::new();
    let mut issues = Vec::new();

    call.from = canonical_from.to_string();
    if call.value.is_none() {
        call.value = Some("0x0".to_string());
    }

    // Nonce: pending tag so queued transactions chain correctly.
    if call.nonce.is_none() {
        match client.get_transaction_count(canonical_from, "pending").await {
            Ok(nonce) => call.nonce = Some(nonce),
            Err(error) => {
                debug!(%error, "nonce resolution failed");
                issues.push(format!("nonce could not be resolved: {error}"));
            }
        }
    }

    // Gas limit.
    if call.gas.is_none() {
        let estimate_call = json!({
            "from": call.from,
            "to": call.to,
            "value": call.value,
            "data": call.data,
        });
        match client.estimate_gas(&estimate_call).await {
            Ok(gas) => call.gas = Some(gas),
            Err(error) => {
                debug!(%error, "gas estimation failed");
                issues.push(format!("gas could not be estimated: {error}"));
            }
        }
    }

    // Fees: prefer an EIP-1559 suggestion, fall back to legacy gas price.
    if call.max_fee_per_gas.is_none() && call.gas_price.is_none() {
        match suggest_1559_fees(client).await {
            Some((max_fee, priority_fee)) => {
                call.max_fee_per_gas = Some(max_fee);
                call.max_priority_fee_per_gas = Some(priority_fee);
            }
            None => match client.get_gas_price().await {
                Ok(gas_price) => {
                    call.gas_price = Some(gas_price);
                    warnings.push("fee suggestion fell back to legacy gas price".to_string());
                }
                Err(error) => {
                    issues.push(format!("fee could not be resolved: {error}"));
                }
            },
        }
    }

    // Balance sanity: value alone exceeding the balance is worth a
    // warning before the user approves.
    if let Some(value) = call.value.as_deref().and_then(parse_quantity) {
        match client.get_balance(canonical_from, "latest").await {
            Ok(balance_hex) => {
                if let Some(balance) = parse_quantity(&balance_hex) {
                    if value > balance {
                        warnings.push("value exceeds the account balance".to_string());
                    }
                }
            }
            Err(error) => {
                warnings.push(format!("balance could not be checked: {error}"));
            }
        }
    }

    DraftOutcome {
        call,
        warnings,
        issues,
    }
}

/// `eth_feeHistory`-based suggestion: median tip over recent blocks plus
/// double the latest base fee as headroom.
async fn suggest_1559_fees(client: &Arc<dyn Eip155Client>) -> Option<(String, String)> {
    let history = client.get_fee_history(5, "latest", &[50.0]).await.ok()?;

    let base_fee = history
        .get("baseFeePerGas")?
        .as_array()?
        .last()?
        .as_str()
        .and_then(parse_quantity)?;

    let mut rewards: Vec<U256> = history
        .get("reward")?
        .as_array()?
        .iter()
        .filter_map(|block| block.as_array()?.first()?.as_str().and_then(parse_quantity))
        .collect();
    rewards.sort_unstable();
    let tip = rewards
        .get(rewards.len() / 2)
        .copied()
        .filter(|tip| !tip.is_zero())
        .unwrap_or_else(|| U256::from(1_000_000_000u64)); // 1 gwei floor

    let max_fee = base_fee
        .checked_mul(U256::from(2u64))?
        .checked_add(tip)?;
    Some((format!("0x{max_fee:x}"), format!("0x{tip:x}")))
}
