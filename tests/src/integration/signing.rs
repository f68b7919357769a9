//! Signing and chain-management flows through the full stack.

use crate::support::{approve_next, harness, onboard, CapturingSink, FIRST, FIRST_CHECKSUMMED};
use serde_json::json;
use shared_types::{Capability, ChainRef};
use wd_10_bridge::{EnvelopeBody, JsonRpcRequest};

async fn connected_session(harness: &crate::support::Harness) {
    harness
        .runtime
        .provider()
        .connect_session(
            "s1",
            "p1",
            "https://dapp.example",
            "h1",
            CapturingSink::new(),
        )
        .await
        .unwrap();
    harness
        .runtime
        .controllers()
        .permissions
        .grant(
            "https://dapp.example",
            "eip155",
            &ChainRef::eip155(1),
            &[
                Capability::Basic,
                Capability::Accounts,
                Capability::Sign,
                Capability::SendTransaction,
            ],
        )
        .await
        .unwrap();
}

fn result_of(envelope: wd_10_bridge::Envelope) -> serde_json::Value {
    match envelope.body {
        EnvelopeBody::Response { response } => {
            assert!(response.error.is_none(), "error: {:?}", response.error);
            response.result.unwrap()
        }
        other => panic!("wrong body: {other:?}"),
    }
}

#[tokio::test]
async fn test_personal_sign_end_to_end() {
    let harness = harness().await;
    onboard(&harness).await;
    connected_session(&harness).await;

    let approver = approve_next(&harness);
    let response = harness
        .runtime
        .provider()
        .handle_request(
            "s1",
            JsonRpcRequest {
                id: json!(1),
                method: "personal_sign".into(),
                // "hello" as hex, then the signer.
                params: json!(["0x68656c6c6f", FIRST_CHECKSUMMED]),
            },
        )
        .await
        .unwrap();
    approver.await.unwrap();

    let signature = result_of(response);
    let signature = signature.as_str().unwrap();
    assert_eq!(signature.len(), 2 + 65 * 2);

    // The signature recovers to the requested account.
    let raw = hex::decode(&signature[2..]).unwrap();
    let digest = {
        // EIP-191 envelope over "hello".
        let mut data = b"\x19Ethereum Signed Message:\n5".to_vec();
        data.extend_from_slice(b"hello");
        shared_crypto::keccak256(&data)
    };
    let recovered = shared_crypto::recover_address(
        &digest,
        &shared_crypto::RecoverableSignature {
            r: raw[..32].try_into().unwrap(),
            s: raw[32..64].try_into().unwrap(),
            v: raw[64] - 27,
        },
    )
    .unwrap();
    assert_eq!(format!("0x{}", hex::encode(recovered)), FIRST);
    harness.runtime.destroy().await;
}

#[tokio::test]
async fn test_sign_typed_data_end_to_end() {
    let harness = harness().await;
    onboard(&harness).await;
    connected_session(&harness).await;

    let typed_data = json!({
        "types": {
            "EIP712Domain": [
                { "name": "name", "type": "string" },
                { "name": "chainId", "type": "uint256" }
            ],
            "Order": [
                { "name": "maker", "type": "address" },
                { "name": "amount", "type": "uint256" }
            ]
        },
        "primaryType": "Order",
        "domain": { "name": "Warden Test", "chainId": 1 },
        "message": { "maker": FIRST, "amount": "0xde0b6b3a7640000" }
    });

    let approver = approve_next(&harness);
    let response = harness
        .runtime
        .provider()
        .handle_request(
            "s1",
            JsonRpcRequest {
                id: json!(1),
                method: "eth_signTypedData_v4".into(),
                params: json!([FIRST_CHECKSUMMED, typed_data]),
            },
        )
        .await
        .unwrap();
    approver.await.unwrap();

    let signature = result_of(response);
    assert_eq!(signature.as_str().unwrap().len(), 2 + 65 * 2);
    harness.runtime.destroy().await;
}

#[tokio::test]
async fn test_sign_rejected_maps_to_4001() {
    let harness = harness().await;
    onboard(&harness).await;
    connected_session(&harness).await;

    let approvals = std::sync::Arc::clone(&harness.runtime.controllers().approvals);
    let rejecter = tokio::spawn(async move {
        for _ in 0..500 {
            tokio::task::yield_now().await;
            if let Some(task) = approvals.pending().first().cloned() {
                approvals
                    .reject(task.id, shared_types::WalletError::approval_rejected())
                    .await
                    .unwrap();
                return;
            }
        }
        panic!("no approval appeared");
    });

    let response = harness
        .runtime
        .provider()
        .handle_request(
            "s1",
            JsonRpcRequest {
                id: json!(9),
                method: "personal_sign".into(),
                params: json!(["0x68656c6c6f", FIRST_CHECKSUMMED]),
            },
        )
        .await
        .unwrap();
    rejecter.await.unwrap();

    match response.body {
        EnvelopeBody::Response { response } => {
            assert_eq!(response.error.unwrap()["code"], 4001);
        }
        other => panic!("wrong body: {other:?}"),
    }
    harness.runtime.destroy().await;
}

#[tokio::test]
async fn test_add_chain_then_switch_flow() {
    let harness = harness().await;
    onboard(&harness).await;
    connected_session(&harness).await;

    // Adding an unknown chain goes through an approval whose executor
    // registers and activates it.
    let approver = approve_next(&harness);
    let response = harness
        .runtime
        .provider()
        .handle_request(
            "s1",
            JsonRpcRequest {
                id: json!(1),
                method: "wallet_addEthereumChain".into(),
                params: json!([{
                    "chainId": "0x539",
                    "chainName": "Localhost",
                    "nativeCurrency": { "name": "Ether", "symbol": "ETH", "decimals": 18 },
                    "rpcUrls": ["http://127.0.0.1:8545"]
                }]),
            },
        )
        .await
        .unwrap();
    approver.await.unwrap();
    result_of(response);

    let controllers = harness.runtime.controllers();
    assert_eq!(controllers.network.active_chain(), ChainRef::eip155(1337));

    // Switch requests check connectedness against the active chain.
    controllers
        .permissions
        .grant(
            "https://dapp.example",
            "eip155",
            &ChainRef::eip155(1337),
            &[Capability::Basic],
        )
        .await
        .unwrap();

    // Switching back to a known chain also rides an approval.
    let approver = approve_next(&harness);
    let response = harness
        .runtime
        .provider()
        .handle_request(
            "s1",
            JsonRpcRequest {
                id: json!(2),
                method: "wallet_switchEthereumChain".into(),
                params: json!([{ "chainId": "0x1" }]),
            },
        )
        .await
        .unwrap();
    approver.await.unwrap();
    result_of(response);
    assert_eq!(controllers.network.active_chain(), ChainRef::eip155(1));

    // Unknown chains reject with the chain-switch error code.
    let response = harness
        .runtime
        .provider()
        .handle_request(
            "s1",
            JsonRpcRequest {
                id: json!(3),
                method: "wallet_switchEthereumChain".into(),
                params: json!([{ "chainId": "0xdeadbeef" }]),
            },
        )
        .await
        .unwrap();
    match response.body {
        EnvelopeBody::Response { response } => {
            assert_eq!(response.error.unwrap()["code"], 4902);
        }
        other => panic!("wrong body: {other:?}"),
    }
    harness.runtime.destroy().await;
}
