//! Provider wire protocol.
//!
//! Every message between the in-page provider and the core rides one
//! envelope shape on a fixed channel name.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use shared_types::WalletError;

/// The fixed channel constant both ends filter on.
pub const PROVIDER_CHANNEL: &str = "warden:provider";

/// Wire protocol version announced in `handshake_ack`.
pub const PROVIDER_PROTOCOL_VERSION: u16 = 1;

/// A JSON-RPC request as carried by a `request` envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub id: Value,
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

/// A JSON-RPC response as carried by a `response` envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    pub id: Value,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub error: Option<Value>,
}

impl JsonRpcResponse {
    #[must_use]
    pub fn result(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".into(),
            id,
            result: Some(result),
            error: None,
        }
    }

    #[must_use]
    pub fn error(id: Value, error: &WalletError) -> Self {
        Self {
            jsonrpc: "2.0".into(),
            id,
            result: None,
            error: Some(error.to_rpc_error()),
        }
    }
}

/// `handshake_ack` payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HandshakeAck {
    pub protocol_version: u16,
    pub handshake_id: String,
    /// Active chain id, 0x-hex.
    pub chain_id: String,
    /// Active chain as a CAIP-2 reference.
    pub caip2: String,
    pub accounts: Vec<String>,
    pub is_unlocked: bool,
    pub meta: HandshakeMeta,
}

/// Chain routing details attached to the ack.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HandshakeMeta {
    pub active_chain: String,
    pub active_namespace: String,
    pub supported_chains: Vec<String>,
}

/// `connect` event payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectInfo {
    pub chain_id: String,
    pub accounts: Vec<String>,
    pub is_unlocked: bool,
}

/// Events pushed to a web session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "name", content = "data", rename_all = "camelCase")]
pub enum ProviderEvent {
    /// New active chain id, 0x-hex.
    ChainChanged(String),
    /// The addresses this origin may currently see.
    AccountsChanged(Vec<String>),
    Connect(ConnectInfo),
    Disconnect(Option<Value>),
}

/// Envelope body, discriminated by `type`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EnvelopeBody {
    Handshake {
        #[serde(rename = "handshakeId")]
        handshake_id: String,
        origin: String,
    },
    HandshakeAck {
        payload: HandshakeAck,
    },
    Request {
        request: JsonRpcRequest,
    },
    Response {
        response: JsonRpcResponse,
    },
    Event {
        event: ProviderEvent,
    },
}

/// One provider message.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    pub channel: String,
    pub session_id: String,
    #[serde(flatten)]
    pub body: EnvelopeBody,
}

impl Envelope {
    #[must_use]
    pub fn new(session_id: impl Into<String>, body: EnvelopeBody) -> Self {
        Self {
            channel: PROVIDER_CHANNEL.to_string(),
            session_id: session_id.into(),
            body,
        }
    }
}
