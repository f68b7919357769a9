//! # Request Context
//!
//! Identifies who is calling (origin), over which session (request
//! context), and against which chain scope (invocation). The RPC engine
//! attaches an [`Invocation`] to every request before any guard runs.

use crate::chain::ChainRef;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The caller of a request.
///
/// The trusted UI bypasses the locked- and permission-guards; web origins
/// never do.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Origin {
    /// The wallet's own user interface.
    Ui,
    /// An untrusted web origin, e.g. `https://dapp.example`.
    Web(String),
}

impl Origin {
    /// Whether this caller acts as the user.
    #[must_use]
    pub fn is_trusted(&self) -> bool {
        matches!(self, Self::Ui)
    }

    /// The origin string used as a permission key.
    #[must_use]
    pub fn as_key(&self) -> &str {
        match self {
            Self::Ui => "ui://internal",
            Self::Web(origin) => origin,
        }
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_key())
    }
}

/// Identifies the transport session a request arrived on.
///
/// Approvals are bound to this context: when the session disappears, every
/// approval it spawned expires as `session_lost`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestContext {
    /// The browser port the session rides on.
    pub port_id: String,
    /// The per-page session id.
    pub session_id: String,
}

impl RequestContext {
    pub fn new(port_id: impl Into<String>, session_id: impl Into<String>) -> Self {
        Self {
            port_id: port_id.into(),
            session_id: session_id.into(),
        }
    }
}

/// The resolved scope of a request as it traverses the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Invocation {
    /// Who is calling.
    pub origin: Origin,
    /// The JSON-RPC method name.
    pub method: String,
    /// The chain family the request targets.
    pub namespace: String,
    /// The specific chain the request targets.
    pub chain_ref: ChainRef,
}
