//! # Domain Error
//!
//! A single error type crosses every subsystem boundary: a machine-readable
//! reason, a human-readable message, optional structured data, and an
//! optional cause chain. At the transport boundary the error is serialized
//! into a JSON-RPC error object, preserving code and data.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Convenience alias used throughout the workspace.
pub type WalletResult<T> = Result<T, WalletError>;

/// Machine-readable failure reasons, grouped by subsystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorReason {
    // Vault
    VaultNotInitialized,
    VaultAlreadyInitialized,
    VaultLocked,
    InvalidPassword,
    CorruptCiphertext,

    // Keyring
    KeyringNotInitialized,
    InvalidMnemonic,
    InvalidPrivateKey,
    AccountNotFound,
    DuplicateAccount,
    SecretUnavailable,
    IndexOutOfRange,
    InvalidAddress,

    // Permission
    LacksCapability,
    NotConnected,

    // Chain
    NotCompatible,
    UnknownChain,

    // RPC
    InvalidRequest,
    InvalidParams,
    MethodNotFound,
    Internal,
    SessionLocked,
    ApprovalRejected,

    // Approval
    ApprovalExpired,

    // Transaction
    ResolutionFailed,
    Replaced,
    ReceiptTimeout,
}

impl ErrorReason {
    /// The kebab-case wire name of this reason.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::VaultNotInitialized => "not-initialized",
            Self::VaultAlreadyInitialized => "already-initialized",
            Self::VaultLocked => "locked",
            Self::InvalidPassword => "invalid-password",
            Self::CorruptCiphertext => "corrupt-ciphertext",
            Self::KeyringNotInitialized => "keyring-not-initialized",
            Self::InvalidMnemonic => "invalid-mnemonic",
            Self::InvalidPrivateKey => "invalid-private-key",
            Self::AccountNotFound => "account-not-found",
            Self::DuplicateAccount => "duplicate-account",
            Self::SecretUnavailable => "secret-unavailable",
            Self::IndexOutOfRange => "index-out-of-range",
            Self::InvalidAddress => "invalid-address",
            Self::LacksCapability => "lacks-capability",
            Self::NotConnected => "not-connected",
            Self::NotCompatible => "not-compatible",
            Self::UnknownChain => "unknown-chain",
            Self::InvalidRequest => "invalid-request",
            Self::InvalidParams => "invalid-params",
            Self::MethodNotFound => "method-not-found",
            Self::Internal => "internal",
            Self::SessionLocked => "session-locked",
            Self::ApprovalRejected => "approval-rejected",
            Self::ApprovalExpired => "approval-expired",
            Self::ResolutionFailed => "resolution-failed",
            Self::Replaced => "replaced",
            Self::ReceiptTimeout => "receipt-timeout",
        }
    }
}

/// Why an approval left the pending queue without a user decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpiryReason {
    /// The per-task TTL elapsed.
    Timeout,
    /// The originating session disappeared.
    SessionLost,
    /// The executor failed while finalizing.
    InternalError,
}

/// The wallet core's single domain error.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[error("{message}")]
pub struct WalletError {
    /// Machine-readable reason.
    pub reason: ErrorReason,
    /// Human-readable description.
    pub message: String,
    /// Structured context, carried through to JSON-RPC `data`.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub data: Option<serde_json::Value>,
    /// The error that caused this one, if any.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub cause: Option<Box<WalletError>>,
}

impl WalletError {
    /// Build an error from a reason and message.
    pub fn new(reason: ErrorReason, message: impl Into<String>) -> Self {
        Self {
            reason,
            message: message.into(),
            data: None,
            cause: None,
        }
    }

    /// Attach structured data.
    #[must_use]
    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }

    /// Attach a causing error.
    #[must_use]
    pub fn with_cause(mut self, cause: WalletError) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }

    /// The vault session is locked.
    #[must_use]
    pub fn locked() -> Self {
        Self::new(ErrorReason::VaultLocked, "vault is locked")
    }

    /// The candidate password failed to open the vault.
    #[must_use]
    pub fn invalid_password() -> Self {
        Self::new(ErrorReason::InvalidPassword, "invalid password")
    }

    /// A JSON-RPC method is not registered and not passthrough-listed.
    pub fn method_not_found(method: &str) -> Self {
        Self::new(
            ErrorReason::MethodNotFound,
            format!("method not found: {method}"),
        )
    }

    /// Request parameters failed schema validation.
    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self::new(ErrorReason::InvalidParams, message)
    }

    /// Something that should not fail did.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorReason::Internal, message)
    }

    /// The user declined the request.
    #[must_use]
    pub fn approval_rejected() -> Self {
        Self::new(ErrorReason::ApprovalRejected, "user rejected the request")
    }

    /// The approval left the queue without a decision.
    #[must_use]
    pub fn approval_expired(reason: ExpiryReason) -> Self {
        Self::new(ErrorReason::ApprovalExpired, "approval expired").with_data(
            serde_json::json!({ "expiry": reason }),
        )
    }

    /// The JSON-RPC error code this reason maps to.
    ///
    /// `4001` is the EIP-1193 user-rejection code; `4100` covers
    /// authorization failures; `4902` is the unrecognized-chain code used by
    /// chain-switch flows. Everything else falls into the standard
    /// `-326xx` families.
    #[must_use]
    pub fn rpc_error_code(&self) -> i64 {
        match self.reason {
            ErrorReason::ApprovalRejected => 4001,
            ErrorReason::SessionLocked
            | ErrorReason::LacksCapability
            | ErrorReason::NotConnected => 4100,
            ErrorReason::UnknownChain => 4902,
            ErrorReason::MethodNotFound => -32601,
            ErrorReason::InvalidParams => -32602,
            ErrorReason::InvalidRequest => -32600,
            _ => -32603,
        }
    }

    /// Serialize into a JSON-RPC error object.
    #[must_use]
    pub fn to_rpc_error(&self) -> serde_json::Value {
        let mut data = serde_json::Map::new();
        data.insert(
            "reason".to_string(),
            serde_json::Value::String(self.reason.as_str().to_string()),
        );
        if let Some(extra) = &self.data {
            data.insert("details".to_string(), extra.clone());
        }
        if let Some(cause) = &self.cause {
            data.insert("cause".to_string(), serde_json::json!(cause.message));
        }
        serde_json::json!({
            "code": self.rpc_error_code(),
            "message": self.message,
            "data": serde_json::Value::Object(data),
        })
    }
}
