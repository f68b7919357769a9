//! EIP-3085 metadata validation and normalization.

use serde::{Deserialize, Serialize};
use shared_types::{ChainMetadata, ChainRef, ErrorReason, NativeCurrency, WalletError};

/// The wire shape a dapp supplies to `wallet_addEthereumChain`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Eip3085ChainInput {
    /// 0x-prefixed hex chain id.
    pub chain_id: String,
    pub chain_name: String,
    pub native_currency: NativeCurrency,
    pub rpc_urls: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub block_explorer_urls: Option<Vec<String>>,
}

/// Validate and normalize dapp-supplied chain metadata.
///
/// Normalization: `chainRef = eip155:<decimal(chainId)>`, URLs
/// deduplicated in order, http/https only.
///
/// # Errors
///
/// `invalid-params` for a malformed chain id, an empty name, an empty RPC
/// URL list, or a non-http(s) URL.
pub fn normalize_chain_metadata(input: &Eip3085ChainInput) -> Result<ChainMetadata, WalletError> {
    let chain_id = parse_hex_chain_id(&input.chain_id)?;
    let chain_ref = ChainRef::eip155(chain_id);

    if input.chain_name.trim().is_empty() {
        return Err(WalletError::invalid_params("chainName must not be empty"));
    }
    if input.rpc_urls.is_empty() {
        return Err(WalletError::invalid_params("rpcUrls must not be empty"));
    }

    let rpc_urls = normalize_urls(&input.rpc_urls)?;
    let block_explorer_urls = match &input.block_explorer_urls {
        Some(urls) => normalize_urls(urls)?,
        None => Vec::new(),
    };

    Ok(ChainMetadata {
        chain_ref,
        name: input.chain_name.trim().to_string(),
        native_currency: input.native_currency.clone(),
        rpc_urls,
        block_explorer_urls,
    })
}

fn parse_hex_chain_id(raw: &str) -> Result<u64, WalletError> {
    let body = raw
        .strip_prefix("0x")
        .or_else(|| raw.strip_prefix("0X"))
        .filter(|body| !body.is_empty())
        .ok_or_else(|| {
            WalletError::invalid_params(format!("chainId must be 0x-prefixed hex, got {raw:?}"))
        })?;
    u64::from_str_radix(body, 16).map_err(|_| {
        WalletError::new(
            ErrorReason::InvalidParams,
            format!("chainId is not valid hex: {raw:?}"),
        )
    })
}

fn normalize_urls(urls: &[String]) -> Result<Vec<String>, WalletError> {
    let mut seen = Vec::new();
    for url in urls {
        let trimmed = url.trim();
        if !(trimmed.starts_with("https://") || trimmed.starts_with("http://")) {
            return Err(WalletError::invalid_params(format!(
                "unsupported URL scheme: {trimmed:?}"
            )));
        }
        if !seen.iter().any(|existing: &String| existing == trimmed) {
            seen.push(trimmed.to_string());
        }
    }
    Ok(seen)
}
