//! Scenarios 1-5: onboarding, derivation, connection, and the
//! transaction lifecycle.

use crate::support::{
    approve_next, harness, onboard, CapturingSink, DEV_MNEMONIC, FIRST, FIRST_CHECKSUMMED, SECOND,
};
use serde_json::json;
use shared_types::TransactionStatus;
use std::time::Duration;
use wd_10_bridge::{EnvelopeBody, JsonRpcRequest};

#[tokio::test]
async fn test_init_unlock_and_wrong_password() {
    let harness = harness().await;
    let ui = harness.runtime.ui();

    ui.handle("ui.vault.init", json!({ "password": "hunter2" }))
        .await
        .unwrap();

    let err = ui
        .handle("ui.vault.unlock", json!({ "password": "hunter3" }))
        .await
        .unwrap_err();
    assert_eq!(err.reason, shared_types::ErrorReason::InvalidPassword);

    let session = ui
        .handle("ui.vault.unlock", json!({ "password": "hunter2" }))
        .await
        .unwrap();
    assert_eq!(session["isUnlocked"], true);
    harness.runtime.destroy().await;
}

#[tokio::test(start_paused = true)]
async fn test_auto_lock_elapses() {
    let harness = harness().await;
    onboard(&harness).await;
    let vault = &harness.runtime.controllers().vault;
    assert!(vault.is_unlocked());

    // Clamp floor is one minute; ask for the minimum and let it fire.
    harness
        .runtime
        .ui()
        .handle("ui.session.setAutoLockDuration", json!({ "durationMs": 1_000 }))
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_millis(60_001)).await;
    tokio::task::yield_now().await;
    assert!(!vault.is_unlocked());
    // Keyrings wiped with the session.
    assert!(harness.runtime.controllers().keyring.addresses().is_empty());
    harness.runtime.destroy().await;
}

#[tokio::test]
async fn test_hd_derivation_is_deterministic() {
    let harness = harness().await;
    onboard(&harness).await;

    let accounts = harness.runtime.controllers().keyring.addresses();
    assert_eq!(accounts, vec![FIRST.to_string()]);

    let metas = harness.runtime.controllers().keyring.list_metas().await.unwrap();
    let second = harness
        .runtime
        .ui()
        .handle(
            "ui.keyring.deriveAccount",
            json!({ "keyringId": metas[0].id }),
        )
        .await
        .unwrap();
    assert_eq!(second["account"]["address"], SECOND);
    assert_eq!(second["account"]["derivationIndex"], 1);

    // The same mnemonic in a fresh harness yields the same addresses.
    let other = harness_again().await;
    assert_eq!(
        other.runtime.controllers().keyring.addresses(),
        vec![FIRST.to_string()]
    );
    harness.runtime.destroy().await;
    other.runtime.destroy().await;
}

async fn harness_again() -> crate::support::Harness {
    let harness = harness().await;
    onboard(&harness).await;
    harness
}

#[tokio::test]
async fn test_request_accounts_grants_and_persists() {
    let harness = harness().await;
    onboard(&harness).await;

    let sink = CapturingSink::new();
    let provider = harness.runtime.provider();
    provider
        .connect_session("s1", "p1", "https://dapp.example", "h1", sink.clone())
        .await
        .unwrap();

    let approver = approve_next(&harness);
    let response = provider
        .handle_request(
            "s1",
            JsonRpcRequest {
                id: json!(1),
                method: "eth_requestAccounts".into(),
                params: json!([]),
            },
        )
        .await
        .unwrap();
    approver.await.unwrap();

    match response.body {
        EnvelopeBody::Response { response } => {
            assert_eq!(response.result.unwrap(), json!([FIRST_CHECKSUMMED]));
        }
        other => panic!("wrong body: {other:?}"),
    }

    // The grant is recorded for the scope.
    let permitted = harness
        .runtime
        .controllers()
        .permissions
        .permitted_accounts(
            "https://dapp.example",
            "eip155",
            &shared_types::ChainRef::eip155(1),
            &[FIRST.to_string()],
        )
        .await
        .unwrap();
    assert_eq!(permitted, vec![FIRST.to_string()]);
    harness.runtime.destroy().await;
}

#[tokio::test]
async fn test_send_transaction_happy_path() {
    let harness = harness().await;
    onboard(&harness).await;

    let provider = harness.runtime.provider();
    provider
        .connect_session(
            "s1",
            "p1",
            "https://dapp.example",
            "h1",
            CapturingSink::new(),
        )
        .await
        .unwrap();

    // Connect + authorize sending.
    let approver = approve_next(&harness);
    provider
        .handle_request(
            "s1",
            JsonRpcRequest {
                id: json!(1),
                method: "eth_requestAccounts".into(),
                params: json!([]),
            },
        )
        .await
        .unwrap();
    approver.await.unwrap();
    harness
        .runtime
        .controllers()
        .permissions
        .grant(
            "https://dapp.example",
            "eip155",
            &shared_types::ChainRef::eip155(1),
            &[shared_types::Capability::SendTransaction],
        )
        .await
        .unwrap();

    let approver = approve_next(&harness);
    let response = provider
        .handle_request(
            "s1",
            JsonRpcRequest {
                id: json!(2),
                method: "eth_sendTransaction".into(),
                params: json!([{
                    "from": FIRST,
                    "to": SECOND,
                    "value": "0xde0b6b3a7640000"
                }]),
            },
        )
        .await
        .unwrap();
    approver.await.unwrap();

    let hash = match response.body {
        EnvelopeBody::Response { response } => {
            let hash = response.result.unwrap().as_str().unwrap().to_string();
            assert_eq!(hash.len(), 66);
            assert!(hash.starts_with("0x"));
            assert_eq!(hash, hash.to_lowercase());
            hash
        }
        other => panic!("wrong body: {other:?}"),
    };

    // Node reports a mined, successful receipt.
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

    for _ in 0..200 {
        tokio::time::sleep(Duration::from_millis(10)).await;
        let records = harness.runtime.controllers().transactions.list().await.unwrap();
        if records[0].status == TransactionStatus::Confirmed {
            assert_eq!(records[0].hash.as_deref(), Some(hash.as_str()));
            harness.runtime.destroy().await;
            return;
        }
    }
    panic!("transaction never confirmed");
}

#[tokio::test]
async fn test_replacement_detected_by_nonce_advance() {
    let harness = harness().await;
    onboard(&harness).await;
    {
        let mut responses = harness.client.responses.lock();
        responses.pending_nonce = "0x3".into();
        responses.latest_nonce = "0x5".into();
    }
    harness
        .runtime
        .controllers()
        .permissions
        .grant(
            "https://dapp.example",
            "eip155",
            &shared_types::ChainRef::eip155(1),
            &[
                shared_types::Capability::Basic,
                shared_types::Capability::Accounts,
                shared_types::Capability::SendTransaction,
            ],
        )
        .await
        .unwrap();

    let provider = harness.runtime.provider();
    provider
        .connect_session(
            "s1",
            "p1",
            "https://dapp.example",
            "h1",
            CapturingSink::new(),
        )
        .await
        .unwrap();

    let approver = approve_next(&harness);
    provider
        .handle_request(
            "s1",
            JsonRpcRequest {
                id: json!(1),
                method: "eth_sendTransaction".into(),
                params: json!([{ "from": FIRST, "to": SECOND, "value": "0x1" }]),
            },
        )
        .await
        .unwrap();
    approver.await.unwrap();

    for _ in 0..200 {
        tokio::time::sleep(Duration::from_millis(10)).await;
        let records = harness.runtime.controllers().transactions.list().await.unwrap();
        if records[0].status == TransactionStatus::Replaced {
            assert_eq!(
                records[0].error.as_ref().unwrap().reason,
                shared_types::ErrorReason::Replaced
            );
            harness.runtime.destroy().await;
            return;
        }
    }
    panic!("replacement never detected");
}

#[tokio::test]
async fn test_mnemonic_export_requires_password() {
    let harness = harness().await;
    onboard(&harness).await;
    let metas = harness.runtime.controllers().keyring.list_metas().await.unwrap();

    let err = harness
        .runtime
        .ui()
        .handle(
            "ui.keyring.exportMnemonic",
            json!({ "keyringId": metas[0].id, "password": "wrong" }),
        )
        .await
        .unwrap_err();
    assert_eq!(err.reason, shared_types::ErrorReason::InvalidPassword);

    let exported = harness
        .runtime
        .ui()
        .handle(
            "ui.keyring.exportMnemonic",
            json!({ "keyringId": metas[0].id, "password": "hunter2" }),
        )
        .await
        .unwrap();
    assert_eq!(exported["mnemonic"], DEV_MNEMONIC);
    harness.runtime.destroy().await;
}
