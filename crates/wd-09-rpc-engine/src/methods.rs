//! Method definitions and the per-namespace registry shape.

use crate::controllers::Controllers;
use futures::future::BoxFuture;
use serde_json::Value;
use shared_types::{Capability, Invocation, Origin, RequestContext, WalletResult};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// What the permission-guard requires of the calling origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionCheck {
    /// No requirement.
    None,
    /// Any grant on `(namespace, chainRef)`.
    Connected,
    /// The method's specific capability on `(namespace, chainRef)`.
    Scope,
}

/// What the locked-guard does with the method while the session is
/// locked and the origin is untrusted.
#[derive(Debug, Clone)]
pub enum LockedPolicy {
    /// Reject `session-locked` and enqueue an unlock-required attention
    /// request.
    Reject,
    /// Run the handler anyway.
    Allow,
    /// Short-circuit with this literal response.
    Respond(Value),
}

/// Everything the engine passes a handler.
pub struct HandlerContext {
    pub origin: Origin,
    pub invocation: Invocation,
    pub params: Value,
    pub context: RequestContext,
    pub controllers: Arc<Controllers>,
}

/// Boxed async handler.
pub type HandlerFn =
    Arc<dyn Fn(HandlerContext) -> BoxFuture<'static, WalletResult<Value>> + Send + Sync>;

/// One registered method.
pub struct MethodDef {
    /// Capability the `Scope` check enforces.
    pub capability: Option<Capability>,
    pub permission_check: PermissionCheck,
    pub locked_policy: LockedPolicy,
    pub handler: HandlerFn,
}

/// One namespace's registry: local methods plus passthrough allowlists.
pub struct NamespaceTable {
    pub methods: HashMap<&'static str, MethodDef>,
    /// Read-only methods forwarded to the node when not handled locally.
    pub passthrough: HashSet<&'static str>,
    /// Subset of `passthrough` still served while the session is locked.
    pub locked_passthrough: HashSet<&'static str>,
}

/// Wrap an `async fn(HandlerContext) -> WalletResult<Value>` into a
/// [`HandlerFn`].
pub fn handler<F, Fut>(f: F) -> HandlerFn
where
    F: Fn(HandlerContext) -> Fut + Send + Sync + 'static,
    Fut: std::future::Future<Output = WalletResult<Value>> + Send + 'static,
{
    Arc::new(move |ctx| Box::pin(f(ctx)))
}
