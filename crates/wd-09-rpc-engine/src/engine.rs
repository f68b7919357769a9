//! The middleware chain.

use crate::controllers::Controllers;
use crate::eip155;
use crate::methods::{HandlerContext, LockedPolicy, MethodDef, NamespaceTable, PermissionCheck};
use serde_json::Value;
use shared_types::{
    AttentionReason, Capability, ErrorReason, Invocation, Origin, RequestContext, WalletError,
    WalletResult,
};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, instrument};

/// The request pipeline: one registry per namespace, one controller
/// bundle for every handler.
pub struct RpcEngine {
    controllers: Arc<Controllers>,
    tables: HashMap<&'static str, NamespaceTable>,
}

impl RpcEngine {
    #[must_use]
    pub fn new(controllers: Arc<Controllers>) -> Self {
        let mut tables = HashMap::new();
        tables.insert("eip155", eip155::table());
        Self {
            controllers,
            tables,
        }
    }

    /// Run one request through the chain. Errors are domain errors; the
    /// transport serializes them into JSON-RPC error objects.
    #[instrument(skip(self, params), fields(origin = %origin, method))]
    pub async fn handle(
        &self,
        origin: Origin,
        context: RequestContext,
        method: &str,
        params: Value,
    ) -> WalletResult<Value> {
        // 1. resolve-invocation: scope unset values to the active chain.
        let chain = self.controllers.network.active_chain();
        let invocation = Invocation {
            origin: origin.clone(),
            method: method.to_string(),
            namespace: chain.namespace().to_string(),
            chain_ref: chain,
        };
        let table = self
            .tables
            .get(invocation.namespace.as_str())
            .ok_or_else(|| {
                WalletError::new(
                    ErrorReason::NotCompatible,
                    format!("no method table for namespace {:?}", invocation.namespace),
                )
            })?;
        let def = table.methods.get(method);

        // 2. locked-guard.
        let trusted = origin.is_trusted();
        if !self.controllers.vault.is_unlocked() && !trusted {
            match def {
                None => {
                    if !table.passthrough.contains(method) {
                        return Err(WalletError::method_not_found(method));
                    }
                    if !table.locked_passthrough.contains(method) {
                        return Err(self.deny_locked(&invocation));
                    }
                    // Locked-allowed read: straight to passthrough.
                    return self.passthrough(&invocation, params).await;
                }
                Some(def) if def.capability.is_some() => match &def.locked_policy {
                    LockedPolicy::Allow => {}
                    LockedPolicy::Respond(literal) => return Ok(literal.clone()),
                    LockedPolicy::Reject => return Err(self.deny_locked(&invocation)),
                },
                // Public method: allowed through.
                Some(_) => {}
            }
        }

        // 3. permission-guard.
        if let Some(def) = def {
            if !trusted {
                self.check_permission(def, &invocation).await?;
            }

            // 4. dispatch.
            debug!(method, "dispatching");
            let ctx = HandlerContext {
                origin,
                invocation,
                params,
                context,
                controllers: Arc::clone(&self.controllers),
            };
            return (def.handler)(ctx).await;
        }

        // 5. passthrough.
        if table.passthrough.contains(method) {
            return self.passthrough(&invocation, params).await;
        }
        Err(WalletError::method_not_found(method))
    }

    async fn check_permission(
        &self,
        def: &MethodDef,
        invocation: &Invocation,
    ) -> WalletResult<()> {
        let origin = invocation.origin.as_key();
        match def.permission_check {
            PermissionCheck::None => Ok(()),
            PermissionCheck::Connected => {
                let connected = self
                    .controllers
                    .permissions
                    .is_connected(origin, &invocation.namespace, &invocation.chain_ref)
                    .await?;
                if connected {
                    Ok(())
                } else {
                    Err(WalletError::new(
                        ErrorReason::NotConnected,
                        format!("{origin} is not connected on {}", invocation.chain_ref),
                    ))
                }
            }
            PermissionCheck::Scope => {
                let capability = def.capability.unwrap_or(Capability::Basic);
                let allowed = self
                    .controllers
                    .permissions
                    .has_capability(
                        origin,
                        &invocation.namespace,
                        &invocation.chain_ref,
                        capability,
                    )
                    .await?;
                if allowed {
                    Ok(())
                } else {
                    Err(WalletError::new(
                        ErrorReason::LacksCapability,
                        format!(
                            "{origin} lacks {} on {}",
                            capability.as_str(),
                            invocation.chain_ref
                        ),
                    ))
                }
            }
        }
    }

    async fn passthrough(&self, invocation: &Invocation, params: Value) -> WalletResult<Value> {
        let chain = &invocation.chain_ref;
        let client = self.controllers.network.client_for(chain).await?;
        match client.request(&invocation.method, params).await {
            Ok(value) => {
                let _ = self
                    .controllers
                    .network
                    .report_rpc_outcome(chain, true, None)
                    .await;
                Ok(value)
            }
            Err(error) => {
                let _ = self
                    .controllers
                    .network
                    .report_rpc_outcome(chain, false, Some(error.to_string()))
                    .await;
                Err(error)
            }
        }
    }

    fn deny_locked(&self, invocation: &Invocation) -> WalletError {
        self.controllers.attention.request(
            AttentionReason::UnlockRequired,
            invocation.origin.as_key(),
            &invocation.method,
            Some(invocation.chain_ref.clone()),
            Some(invocation.namespace.clone()),
        );
        WalletError::new(
            ErrorReason::SessionLocked,
            format!("{} requires an unlocked session", invocation.method),
        )
    }
}
