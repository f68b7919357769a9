//! Scenario 6 and the provider session surface: handshake, event
//! fan-out, and session-loss expiry.

use crate::support::{approve_next, harness, onboard, CapturingSink, FIRST_CHECKSUMMED};
use serde_json::json;
use shared_types::ChainRef;
use wd_10_bridge::{EnvelopeBody, JsonRpcRequest, PROVIDER_CHANNEL};

#[tokio::test]
async fn test_handshake_ack_shape() {
    let harness = harness().await;
    onboard(&harness).await;

    let sink = CapturingSink::new();
    harness
        .runtime
        .provider()
        .connect_session("s1", "p1", "https://dapp.example", "h42", sink.clone())
        .await
        .unwrap();

    {
        let envelopes = sink.envelopes.lock();
        assert_eq!(envelopes.len(), 1);
        assert_eq!(envelopes[0].channel, PROVIDER_CHANNEL);
        assert_eq!(envelopes[0].session_id, "s1");
        match &envelopes[0].body {
            EnvelopeBody::HandshakeAck { payload } => {
                assert_eq!(payload.handshake_id, "h42");
                assert_eq!(payload.chain_id, "0x1");
                assert_eq!(payload.caip2, "eip155:1");
                assert!(payload.is_unlocked);
                // No grant yet: no visible accounts.
                assert!(payload.accounts.is_empty());
                assert_eq!(payload.meta.active_namespace, "eip155");
                assert!(payload
                    .meta
                    .supported_chains
                    .contains(&"eip155:1".to_string()));
            }
            other => panic!("wrong body: {other:?}"),
        }
    }
    harness.runtime.destroy().await;

    // Teardown told the page it was disconnected.
    assert!(sink.envelopes.lock().iter().any(|envelope| {
        matches!(
            &envelope.body,
            EnvelopeBody::Event { event } if json!(event)["name"] == "disconnect"
        )
    }));
}

#[tokio::test]
async fn test_chain_switch_fans_out() {
    let harness = harness().await;
    onboard(&harness).await;

    let sink = CapturingSink::new();
    harness
        .runtime
        .provider()
        .connect_session("s1", "p1", "https://dapp.example", "h1", sink.clone())
        .await
        .unwrap();

    harness
        .runtime
        .ui()
        .handle("ui.networks.switchActive", json!({ "chainRef": "eip155:137" }))
        .await
        .unwrap();

    let saw_chain_changed = sink.envelopes.lock().iter().any(|envelope| {
        matches!(
            &envelope.body,
            EnvelopeBody::Event { event } if json!(event)["name"] == "chainChanged"
                && json!(event)["data"] == "0x89"
        )
    });
    assert!(saw_chain_changed, "chainChanged(0x89) was not delivered");
    harness.runtime.destroy().await;
}

#[tokio::test]
async fn test_session_loss_expires_pending_approvals() {
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

    // Two requests suspend on approvals from the same session.
    let mut waiters = Vec::new();
    for id in 0..2 {
        let provider = harness.runtime.provider().clone();
        waiters.push(tokio::spawn(async move {
            provider
                .handle_request(
                    "s1",
                    JsonRpcRequest {
                        id: json!(id),
                        method: "eth_requestAccounts".into(),
                        params: json!([]),
                    },
                )
                .await
                .unwrap()
        }));
    }
    for _ in 0..500 {
        tokio::task::yield_now().await;
        if harness.runtime.controllers().approvals.pending().len() == 2 {
            break;
        }
    }
    assert_eq!(harness.runtime.controllers().approvals.pending().len(), 2);

    // The transport disappears.
    let expired = provider.session_closed("s1").await.unwrap();
    assert_eq!(expired, 2);
    assert!(harness.runtime.controllers().approvals.pending().is_empty());

    // Both callers see a session-lost expiry on the wire.
    for waiter in waiters {
        let envelope = waiter.await.unwrap();
        match envelope.body {
            EnvelopeBody::Response { response } => {
                let error = response.error.unwrap();
                assert_eq!(error["data"]["reason"], "approval-expired");
                assert_eq!(error["data"]["details"]["expiry"], "session_lost");
            }
            other => panic!("wrong body: {other:?}"),
        }
    }
    harness.runtime.destroy().await;
}

#[tokio::test]
async fn test_accounts_changed_after_grant() {
    let harness = harness().await;
    onboard(&harness).await;

    let sink = CapturingSink::new();
    harness
        .runtime
        .provider()
        .connect_session("s1", "p1", "https://dapp.example", "h1", sink.clone())
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
            &[shared_types::Capability::Basic, shared_types::Capability::Accounts],
        )
        .await
        .unwrap();

    // Fan-out happens on a spawned task.
    for _ in 0..200 {
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let delivered = sink.envelopes.lock().iter().any(|envelope| {
            matches!(
                &envelope.body,
                EnvelopeBody::Event { event } if json!(event)["name"] == "accountsChanged"
                    && json!(event)["data"] == json!([FIRST_CHECKSUMMED])
            )
        });
        if delivered {
            harness.runtime.destroy().await;
            return;
        }
    }
    panic!("accountsChanged was not delivered");
}

#[tokio::test]
async fn test_wire_envelope_round_trip() {
    let harness = harness().await;
    onboard(&harness).await;

    let sink = CapturingSink::new();
    let provider = harness.runtime.provider();

    // Handshake arrives as a wire envelope; the ack lands on the sink.
    let handshake: wd_10_bridge::Envelope = serde_json::from_value(json!({
        "channel": PROVIDER_CHANNEL,
        "sessionId": "s9",
        "type": "handshake",
        "handshakeId": "h9",
        "origin": "https://spoofed.example"
    }))
    .unwrap();
    let none = provider
        .handle_envelope(handshake, "https://dapp.example", "p9", sink.clone())
        .await
        .unwrap();
    assert!(none.is_none());
    assert_eq!(provider.session_count(), 1);
    assert!(matches!(
        sink.envelopes.lock()[0].body,
        EnvelopeBody::HandshakeAck { .. }
    ));

    // A request envelope returns a response envelope.
    let request: wd_10_bridge::Envelope = serde_json::from_value(json!({
        "channel": PROVIDER_CHANNEL,
        "sessionId": "s9",
        "type": "request",
        "request": { "id": 1, "method": "eth_chainId", "params": [] }
    }))
    .unwrap();
    let response = provider
        .handle_envelope(request, "https://dapp.example", "p9", sink.clone())
        .await
        .unwrap()
        .unwrap();
    match response.body {
        EnvelopeBody::Response { response } => {
            assert_eq!(response.result.unwrap(), json!("0x1"));
        }
        other => panic!("wrong body: {other:?}"),
    }

    // Wrong channel is refused outright.
    let off_channel: wd_10_bridge::Envelope = serde_json::from_value(json!({
        "channel": "someone-else",
        "sessionId": "s9",
        "type": "request",
        "request": { "id": 2, "method": "eth_chainId", "params": [] }
    }))
    .unwrap();
    assert!(provider
        .handle_envelope(off_channel, "https://dapp.example", "p9", sink.clone())
        .await
        .is_err());
    harness.runtime.destroy().await;
}

#[tokio::test]
async fn test_request_permissions_then_revoke() {
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

    let approver = approve_next(&harness);
    let response = provider
        .handle_request(
            "s1",
            JsonRpcRequest {
                id: json!(1),
                method: "wallet_requestPermissions".into(),
                params: json!([{ "eth_accounts": {} }]),
            },
        )
        .await
        .unwrap();
    approver.await.unwrap();

    match response.body {
        EnvelopeBody::Response { response } => {
            let grants = response.result.unwrap();
            assert_eq!(grants[0]["chainRef"], "eip155:1");
            assert!(grants[0]["capabilities"]
                .as_array()
                .unwrap()
                .contains(&json!("accounts")));
        }
        other => panic!("wrong body: {other:?}"),
    }

    // wallet_getPermissions sees the grant.
    let listed = provider
        .handle_request(
            "s1",
            JsonRpcRequest {
                id: json!(2),
                method: "wallet_getPermissions".into(),
                params: json!([]),
            },
        )
        .await
        .unwrap();
    match listed.body {
        EnvelopeBody::Response { response } => {
            assert!(!response.result.unwrap().as_array().unwrap().is_empty());
        }
        other => panic!("wrong body: {other:?}"),
    }

    // Revocation clears the scope.
    provider
        .handle_request(
            "s1",
            JsonRpcRequest {
                id: json!(3),
                method: "wallet_revokePermissions".into(),
                params: json!([{ "eth_accounts": {} }]),
            },
        )
        .await
        .unwrap();
    assert!(!harness
        .runtime
        .controllers()
        .permissions
        .is_connected("https://dapp.example", "eip155", &ChainRef::eip155(1))
        .await
        .unwrap());
    harness.runtime.destroy().await;
}

#[tokio::test]
async fn test_locked_requests_dedupe_attention() {
    let harness = harness().await;
    onboard(&harness).await;
    harness
        .runtime
        .ui()
        .handle("ui.vault.lock", json!({}))
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

    // The same blocked request twice yields one attention entry.
    for id in 0..2 {
        let response = provider
            .handle_request(
                "s1",
                JsonRpcRequest {
                    id: json!(id),
                    method: "eth_requestAccounts".into(),
                    params: json!([]),
                },
            )
            .await
            .unwrap();
        match response.body {
            EnvelopeBody::Response { response } => {
                assert_eq!(response.error.unwrap()["data"]["reason"], "session-locked");
            }
            other => panic!("wrong body: {other:?}"),
        }
    }
    let attention = harness.runtime.controllers().attention.list();
    assert_eq!(attention.len(), 1);
    assert_eq!(attention[0].method, "eth_requestAccounts");
    harness.runtime.destroy().await;
}
