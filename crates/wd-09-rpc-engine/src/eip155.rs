//! The eip155 method table.

use crate::methods::{handler, HandlerContext, LockedPolicy, MethodDef, NamespaceTable,
    PermissionCheck};
use crate::CLIENT_VERSION;
use serde::Deserialize;
use serde_json::{json, Value};
use shared_types::{ApprovalKind, Capability, ChainRef, ErrorReason, TransactionCall, WalletError,
    WalletResult};
use std::collections::{HashMap, HashSet};
use wd_01_chain_registry::{format_address, normalize_chain_metadata, Eip3085ChainInput};
use wd_04_keyring::domain::eip712::TypedData;

/// Build the eip155 namespace registry.
#[must_use]
pub fn table() -> NamespaceTable {
    let mut methods: HashMap<&'static str, MethodDef> = HashMap::new();

    methods.insert(
        "eth_chainId",
        MethodDef {
            capability: None,
            permission_check: PermissionCheck::None,
            locked_policy: LockedPolicy::Allow,
            handler: handler(eth_chain_id),
        },
    );
    methods.insert(
        "web3_clientVersion",
        MethodDef {
            capability: None,
            permission_check: PermissionCheck::None,
            locked_policy: LockedPolicy::Allow,
            handler: handler(web3_client_version),
        },
    );
    methods.insert(
        "eth_accounts",
        MethodDef {
            capability: Some(Capability::Accounts),
            permission_check: PermissionCheck::None,
            locked_policy: LockedPolicy::Respond(json!([])),
            handler: handler(eth_accounts),
        },
    );
    methods.insert(
        "eth_requestAccounts",
        MethodDef {
            capability: Some(Capability::Accounts),
            permission_check: PermissionCheck::None,
            locked_policy: LockedPolicy::Reject,
            handler: handler(eth_request_accounts),
        },
    );
    methods.insert(
        "wallet_getPermissions",
        MethodDef {
            capability: Some(Capability::Basic),
            permission_check: PermissionCheck::None,
            locked_policy: LockedPolicy::Respond(json!([])),
            handler: handler(wallet_get_permissions),
        },
    );
    methods.insert(
        "wallet_requestPermissions",
        MethodDef {
            capability: Some(Capability::Basic),
            permission_check: PermissionCheck::None,
            locked_policy: LockedPolicy::Reject,
            handler: handler(wallet_request_permissions),
        },
    );
    methods.insert(
        "wallet_revokePermissions",
        MethodDef {
            capability: None,
            permission_check: PermissionCheck::None,
            locked_policy: LockedPolicy::Allow,
            handler: handler(wallet_revoke_permissions),
        },
    );
    methods.insert(
        "personal_sign",
        MethodDef {
            capability: Some(Capability::Sign),
            permission_check: PermissionCheck::Scope,
            locked_policy: LockedPolicy::Reject,
            handler: handler(personal_sign),
        },
    );
    methods.insert(
        "eth_signTypedData_v4",
        MethodDef {
            capability: Some(Capability::Sign),
            permission_check: PermissionCheck::Scope,
            locked_policy: LockedPolicy::Reject,
            handler: handler(eth_sign_typed_data_v4),
        },
    );
    methods.insert(
        "eth_sendTransaction",
        MethodDef {
            capability: Some(Capability::SendTransaction),
            permission_check: PermissionCheck::Scope,
            locked_policy: LockedPolicy::Reject,
            handler: handler(eth_send_transaction),
        },
    );
    methods.insert(
        "wallet_switchEthereumChain",
        MethodDef {
            capability: Some(Capability::Basic),
            permission_check: PermissionCheck::Connected,
            locked_policy: LockedPolicy::Reject,
            handler: handler(wallet_switch_ethereum_chain),
        },
    );
    methods.insert(
        "wallet_addEthereumChain",
        MethodDef {
            capability: None,
            permission_check: PermissionCheck::None,
            locked_policy: LockedPolicy::Reject,
            handler: handler(wallet_add_ethereum_chain),
        },
    );

    let passthrough: HashSet<&'static str> = [
        "eth_blockNumber",
        "eth_getBalance",
        "eth_getTransactionCount",
        "eth_gasPrice",
        "eth_getCode",
        "eth_call",
        "eth_getLogs",
        "eth_getBlockByNumber",
        "eth_getBlockByHash",
        "eth_getTransactionByHash",
        "eth_getTransactionByBlockNumberAndIndex",
        "eth_getTransactionByBlockHashAndIndex",
        "eth_getTransactionReceipt",
        "eth_feeHistory",
        "net_version",
    ]
    .into();

    // Chain-level reads stay available while locked; account-centric
    // reads do not.
    let locked_passthrough: HashSet<&'static str> = [
        "eth_blockNumber",
        "eth_gasPrice",
        "eth_feeHistory",
        "eth_getBlockByNumber",
        "eth_getBlockByHash",
        "net_version",
    ]
    .into();

    NamespaceTable {
        methods,
        passthrough,
        locked_passthrough,
    }
}

fn parse_params<T: serde::de::DeserializeOwned>(params: &Value) -> WalletResult<T> {
    serde_json::from_value(params.clone())
        .map_err(|e| WalletError::invalid_params(format!("invalid params: {e}")))
}

fn formatted_addresses(chain: &ChainRef, addresses: &[String]) -> WalletResult<Vec<String>> {
    addresses
        .iter()
        .map(|address| format_address(chain, address))
        .collect()
}

// =============================================================================
// CHAIN INFO
// =============================================================================

async fn eth_chain_id(ctx: HandlerContext) -> WalletResult<Value> {
    let hex = ctx
        .invocation
        .chain_ref
        .eip155_hex_chain_id()
        .ok_or_else(|| {
            WalletError::new(ErrorReason::NotCompatible, "active chain is not eip155")
        })?;
    Ok(json!(hex))
}

async fn web3_client_version(_ctx: HandlerContext) -> WalletResult<Value> {
    Ok(json!(CLIENT_VERSION))
}

// =============================================================================
// ACCOUNTS & PERMISSIONS
// =============================================================================

async fn eth_accounts(ctx: HandlerContext) -> WalletResult<Value> {
    let chain = &ctx.invocation.chain_ref;
    let all = ctx.controllers.keyring.addresses();
    let visible = if ctx.origin.is_trusted() {
        all
    } else {
        ctx.controllers
            .permissions
            .permitted_accounts(ctx.origin.as_key(), &ctx.invocation.namespace, chain, &all)
            .await?
    };
    Ok(json!(formatted_addresses(chain, &visible)?))
}

async fn eth_request_accounts(ctx: HandlerContext) -> WalletResult<Value> {
    let chain = ctx.invocation.chain_ref.clone();
    let all = ctx.controllers.keyring.addresses();
    let formatted = formatted_addresses(&chain, &all)?;

    if ctx.origin.is_trusted() {
        return Ok(json!(formatted));
    }

    let permitted = ctx
        .controllers
        .permissions
        .permitted_accounts(ctx.origin.as_key(), &ctx.invocation.namespace, &chain, &all)
        .await?;
    if !permitted.is_empty() {
        return Ok(json!(formatted_addresses(&chain, &permitted)?));
    }

    // No prior grant: rendezvous with the user. The UI's executor
    // grants `basic` + `accounts` and returns the account list.
    ctx.controllers
        .approvals
        .request_approval(
            ApprovalKind::RequestAccounts,
            ctx.origin.as_key(),
            Some(ctx.invocation.namespace.clone()),
            Some(chain),
            json!({ "addresses": formatted }),
            ctx.context,
        )
        .await
}

async fn wallet_get_permissions(ctx: HandlerContext) -> WalletResult<Value> {
    let record = ctx
        .controllers
        .permissions
        .get(ctx.origin.as_key(), &ctx.invocation.namespace)
        .await?;
    let grants: Vec<Value> = record
        .map(|record| {
            record
                .grants
                .iter()
                .map(|(chain, capabilities)| {
                    json!({
                        "chainRef": chain,
                        "capabilities": capabilities,
                    })
                })
                .collect()
        })
        .unwrap_or_default();
    Ok(json!(grants))
}

async fn wallet_request_permissions(ctx: HandlerContext) -> WalletResult<Value> {
    let requests: Vec<HashMap<String, Value>> = parse_params(&ctx.params)?;
    let requested = requests
        .first()
        .ok_or_else(|| WalletError::invalid_params("expected a permission request object"))?;

    let mut capabilities = Vec::new();
    for key in requested.keys() {
        match key.as_str() {
            // The EIP-2255 spelling.
            "eth_accounts" => {
                capabilities.push(Capability::Basic);
                capabilities.push(Capability::Accounts);
            }
            "basic" => capabilities.push(Capability::Basic),
            "accounts" => capabilities.push(Capability::Accounts),
            "sign" => capabilities.push(Capability::Sign),
            "send-transaction" => capabilities.push(Capability::SendTransaction),
            other => {
                return Err(WalletError::invalid_params(format!(
                    "unknown permission {other:?}"
                )))
            }
        }
    }
    capabilities.sort();
    capabilities.dedup();
    if capabilities.is_empty() {
        return Err(WalletError::invalid_params("no permissions requested"));
    }

    ctx.controllers
        .approvals
        .request_approval(
            ApprovalKind::RequestPermissions,
            ctx.origin.as_key(),
            Some(ctx.invocation.namespace.clone()),
            Some(ctx.invocation.chain_ref.clone()),
            json!({ "capabilities": capabilities }),
            ctx.context,
        )
        .await
}

async fn wallet_revoke_permissions(ctx: HandlerContext) -> WalletResult<Value> {
    ctx.controllers
        .permissions
        .revoke(ctx.origin.as_key(), &ctx.invocation.namespace)
        .await?;
    Ok(Value::Null)
}

// =============================================================================
// SIGNING
// =============================================================================

#[derive(Deserialize)]
struct PersonalSignParams(String, String);

async fn personal_sign(ctx: HandlerContext) -> WalletResult<Value> {
    // Wire order: [data, address].
    let PersonalSignParams(data, address) = parse_params(&ctx.params)?;
    let message = data
        .strip_prefix("0x")
        .and_then(|body| hex::decode(body).ok())
        .ok_or_else(|| WalletError::invalid_params("message must be 0x-hex"))?;

    let canonical =
        wd_01_chain_registry::canonicalize_address(&ctx.invocation.chain_ref, &address)?;
    if !ctx
        .controllers
        .keyring
        .owns(&ctx.invocation.namespace, &canonical)
    {
        return Err(WalletError::new(
            ErrorReason::AccountNotFound,
            format!("no account {canonical}"),
        ));
    }

    ctx.controllers
        .approvals
        .request_approval(
            ApprovalKind::SignMessage,
            ctx.origin.as_key(),
            Some(ctx.invocation.namespace.clone()),
            Some(ctx.invocation.chain_ref.clone()),
            json!({
                "address": canonical,
                "message": data,
                "preview": String::from_utf8(message).ok(),
            }),
            ctx.context,
        )
        .await
}

#[derive(Deserialize)]
struct TypedDataParams(String, Value);

async fn eth_sign_typed_data_v4(ctx: HandlerContext) -> WalletResult<Value> {
    // Wire order: [address, typedData]; typedData may be an object or a
    // JSON string.
    let TypedDataParams(address, raw) = parse_params(&ctx.params)?;
    let typed: Value = match raw {
        Value::String(encoded) => serde_json::from_str(&encoded)
            .map_err(|e| WalletError::invalid_params(format!("typed data is not JSON: {e}")))?,
        other => other,
    };
    // Reject malformed typed data before bothering the user.
    let _: TypedData = parse_params(&typed)?;

    let canonical =
        wd_01_chain_registry::canonicalize_address(&ctx.invocation.chain_ref, &address)?;
    if !ctx
        .controllers
        .keyring
        .owns(&ctx.invocation.namespace, &canonical)
    {
        return Err(WalletError::new(
            ErrorReason::AccountNotFound,
            format!("no account {canonical}"),
        ));
    }

    ctx.controllers
        .approvals
        .request_approval(
            ApprovalKind::SignTypedData,
            ctx.origin.as_key(),
            Some(ctx.invocation.namespace.clone()),
            Some(ctx.invocation.chain_ref.clone()),
            json!({ "address": canonical, "typedData": typed }),
            ctx.context,
        )
        .await
}

// =============================================================================
// TRANSACTIONS
// =============================================================================

async fn eth_send_transaction(ctx: HandlerContext) -> WalletResult<Value> {
    // Single-element param list.
    let (call,): (TransactionCall,) = parse_params(&ctx.params)?;
    let hash = ctx
        .controllers
        .transactions
        .request_transaction_approval(
            &ctx.origin,
            ctx.invocation.chain_ref.clone(),
            call,
            ctx.context,
        )
        .await?;
    Ok(json!(hash))
}

// =============================================================================
// CHAIN MANAGEMENT
// =============================================================================

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SwitchChainRequest {
    chain_id: String,
}

async fn wallet_switch_ethereum_chain(ctx: HandlerContext) -> WalletResult<Value> {
    let (request,): (SwitchChainRequest,) = parse_params(&ctx.params)?;
    let body = request
        .chain_id
        .strip_prefix("0x")
        .or_else(|| request.chain_id.strip_prefix("0X"))
        .ok_or_else(|| WalletError::invalid_params("chainId must be 0x-hex"))?;
    let chain_id = u64::from_str_radix(body, 16)
        .map_err(|_| WalletError::invalid_params("chainId is not valid hex"))?;
    let target = ChainRef::eip155(chain_id);

    if !ctx.controllers.registry.contains(&target).await? {
        return Err(WalletError::new(
            ErrorReason::UnknownChain,
            format!("chain {target} is not registered"),
        ));
    }
    if target == ctx.controllers.network.active_chain() {
        return Ok(Value::Null);
    }

    ctx.controllers
        .approvals
        .request_approval(
            ApprovalKind::SwitchChain,
            ctx.origin.as_key(),
            Some(ctx.invocation.namespace.clone()),
            Some(target.clone()),
            json!({ "chainRef": target, "chainId": request.chain_id }),
            ctx.context,
        )
        .await
}

async fn wallet_add_ethereum_chain(ctx: HandlerContext) -> WalletResult<Value> {
    let (input,): (Eip3085ChainInput,) = parse_params(&ctx.params)?;
    // Validate at the gate; the approval carries the normalized preview.
    let preview = normalize_chain_metadata(&input)?;

    ctx.controllers
        .approvals
        .request_approval(
            ApprovalKind::AddChain,
            ctx.origin.as_key(),
            Some(ctx.invocation.namespace.clone()),
            Some(preview.chain_ref.clone()),
            json!({ "input": input, "preview": preview }),
            ctx.context,
        )
        .await
}
