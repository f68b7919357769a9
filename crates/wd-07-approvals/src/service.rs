//! The approval controller.

use crate::topics::{
    ApprovalFinished, ApprovalRequested, APPROVALS_CHANGED, APPROVAL_FINISHED, APPROVAL_REQUESTED,
};
use crate::DEFAULT_APPROVAL_TTL_MS;
use futures::future::BoxFuture;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use shared_bus::Messenger;
use shared_types::{
    ApprovalKind, ApprovalTask, ChainRef, ExpiryReason, RequestContext, TimeSource, WalletError,
    WalletResult,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;
use wd_02_storage::ApprovalsStore;

/// How a task left the queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ApprovalOutcome {
    Approved { value: Value },
    Rejected { error: WalletError },
    Expired { reason: ExpiryReason },
}

/// The side-effect run atomically with an approval.
pub type ApprovalExecutor = BoxFuture<'static, WalletResult<Value>>;

/// Approval tuning.
#[derive(Debug, Clone, Copy)]
pub struct ApprovalConfig {
    pub ttl_ms: u64,
}

impl Default for ApprovalConfig {
    fn default() -> Self {
        Self {
            ttl_ms: DEFAULT_APPROVAL_TTL_MS,
        }
    }
}

struct PendingEntry {
    task: ApprovalTask,
    context: RequestContext,
    resolver: oneshot::Sender<WalletResult<Value>>,
    ttl_timer: JoinHandle<()>,
}

/// The request-scoped rendezvous between RPC handlers and the UI.
pub struct ApprovalController {
    store: Arc<dyn ApprovalsStore>,
    messenger: Messenger,
    time: Arc<dyn TimeSource>,
    config: ApprovalConfig,
    pending: Mutex<Vec<PendingEntry>>,
}

impl ApprovalController {
    pub fn new(
        store: Arc<dyn ApprovalsStore>,
        messenger: Messenger,
        time: Arc<dyn TimeSource>,
        config: ApprovalConfig,
    ) -> Arc<Self> {
        Arc::new(Self {
            store,
            messenger,
            time,
            config,
            pending: Mutex::new(Vec::new()),
        })
    }

    /// Enqueue a task and suspend until the UI (or an expiry) finalizes
    /// it. The returned value is whatever the approval's executor
    /// produced.
    pub async fn request_approval(
        self: &Arc<Self>,
        kind: ApprovalKind,
        origin: &str,
        namespace: Option<String>,
        chain_ref: Option<ChainRef>,
        payload: Value,
        context: RequestContext,
    ) -> WalletResult<Value> {
        let now = self.time.now();
        let task = ApprovalTask {
            id: Uuid::new_v4(),
            kind,
            origin: origin.to_string(),
            namespace,
            chain_ref,
            payload,
            created_at: now,
            expires_at: now + self.config.ttl_ms,
        };
        let id = task.id;

        let (sender, receiver) = oneshot::channel();
        let ttl_timer = {
            let controller = Arc::clone(self);
            let ttl = Duration::from_millis(self.config.ttl_ms);
            tokio::spawn(async move {
                tokio::time::sleep(ttl).await;
                if let Err(error) = controller.expire(id, ExpiryReason::Timeout).await {
                    warn!(task = %id, %error, "ttl expiry failed");
                }
            })
        };

        self.pending.lock().push(PendingEntry {
            task: task.clone(),
            context: context.clone(),
            resolver: sender,
            ttl_timer,
        });
        self.store.put(task.clone()).await?;
        self.publish_pending();
        self.messenger
            .publish(&APPROVAL_REQUESTED, ApprovalRequested { task, context });
        info!(task = %id, ?kind, origin, "approval requested");

        receiver.await.unwrap_or_else(|_| {
            // Controller torn down with the task still pending.
            Err(WalletError::approval_expired(ExpiryReason::InternalError))
        })
    }

    /// Approve a task: run `executor`, publish the outcome, resolve the
    /// caller. Returns `false` when the id is no longer pending.
    ///
    /// An erring executor finalizes the task as
    /// `expired(internal_error)`, so the caller never sees a half-applied
    /// approval.
    pub async fn resolve(&self, id: Uuid, executor: ApprovalExecutor) -> WalletResult<bool> {
        let entry = match self.take(id) {
            Some(entry) => entry,
            None => return Ok(false),
        };

        let outcome = match executor.await {
            Ok(value) => {
                debug!(task = %id, "approval resolved");
                let _ = entry.resolver.send(Ok(value.clone()));
                ApprovalOutcome::Approved { value }
            }
            Err(error) => {
                warn!(task = %id, %error, "approval executor failed");
                let wrapped =
                    WalletError::approval_expired(ExpiryReason::InternalError).with_cause(error);
                let _ = entry.resolver.send(Err(wrapped));
                ApprovalOutcome::Expired {
                    reason: ExpiryReason::InternalError,
                }
            }
        };
        self.finish(id, outcome).await?;
        Ok(true)
    }

    /// Reject a task with an error (typically `approval-rejected`).
    /// Returns `false` when the id is no longer pending.
    pub async fn reject(&self, id: Uuid, error: WalletError) -> WalletResult<bool> {
        let entry = match self.take(id) {
            Some(entry) => entry,
            None => return Ok(false),
        };
        debug!(task = %id, "approval rejected");
        let _ = entry.resolver.send(Err(error.clone()));
        self.finish(id, ApprovalOutcome::Rejected { error }).await?;
        Ok(true)
    }

    /// Expire one task. TTL timers land here.
    pub async fn expire(&self, id: Uuid, reason: ExpiryReason) -> WalletResult<bool> {
        let entry = match self.take(id) {
            Some(entry) => entry,
            None => return Ok(false),
        };
        info!(task = %id, ?reason, "approval expired");
        let _ = entry
            .resolver
            .send(Err(WalletError::approval_expired(reason)));
        self.finish(id, ApprovalOutcome::Expired { reason }).await?;
        Ok(true)
    }

    /// Expire every task bound to a lost session. Executors do not run.
    /// Returns how many tasks were finalized.
    pub async fn expire_by_request_context(
        &self,
        context: &RequestContext,
    ) -> WalletResult<usize> {
        let ids: Vec<Uuid> = self
            .pending
            .lock()
            .iter()
            .filter(|entry| entry.context == *context)
            .map(|entry| entry.task.id)
            .collect();

        let mut finalized = 0;
        for id in &ids {
            if self.expire(*id, ExpiryReason::SessionLost).await? {
                finalized += 1;
            }
        }
        if finalized > 0 {
            info!(port = %context.port_id, finalized, "session approvals expired");
        }
        Ok(finalized)
    }

    /// The pending list, insertion-ordered.
    #[must_use]
    pub fn pending(&self) -> Vec<ApprovalTask> {
        self.pending
            .lock()
            .iter()
            .map(|entry| entry.task.clone())
            .collect()
    }

    /// One pending task by id.
    #[must_use]
    pub fn get(&self, id: Uuid) -> Option<ApprovalTask> {
        self.pending
            .lock()
            .iter()
            .find(|entry| entry.task.id == id)
            .map(|entry| entry.task.clone())
    }

    /// Expire everything and stop all timers. Part of runtime teardown.
    pub async fn destroy(&self) {
        let ids: Vec<Uuid> = self
            .pending
            .lock()
            .iter()
            .map(|entry| entry.task.id)
            .collect();
        for id in ids {
            if let Err(error) = self.expire(id, ExpiryReason::InternalError).await {
                warn!(task = %id, %error, "teardown expiry failed");
            }
        }
    }

    /// Remove an entry, stopping its TTL timer. `None` when not pending.
    fn take(&self, id: Uuid) -> Option<PendingEntry> {
        let mut pending = self.pending.lock();
        let position = pending.iter().position(|entry| entry.task.id == id)?;
        let entry = pending.remove(position);
        entry.ttl_timer.abort();
        Some(entry)
    }

    async fn finish(&self, id: Uuid, outcome: ApprovalOutcome) -> WalletResult<()> {
        self.store.delete(id).await?;
        self.publish_pending();
        self.messenger
            .publish(&APPROVAL_FINISHED, ApprovalFinished { id, outcome });
        Ok(())
    }

    fn publish_pending(&self) {
        self.messenger.publish(&APPROVALS_CHANGED, self.pending());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::{ErrorReason, SystemTimeSource};
    use wd_02_storage::InMemoryApprovalsStore;

    fn controller() -> Arc<ApprovalController> {
        ApprovalController::new(
            Arc::new(InMemoryApprovalsStore::new()),
            Messenger::new(),
            Arc::new(SystemTimeSource),
            ApprovalConfig::default(),
        )
    }

    fn context(port: &str) -> RequestContext {
        RequestContext::new(port, "session-1")
    }

    async fn spawn_request(
        controller: &Arc<ApprovalController>,
        port: &str,
    ) -> tokio::task::JoinHandle<WalletResult<Value>> {
        let controller = Arc::clone(controller);
        let context = context(port);
        let handle = tokio::spawn(async move {
            controller
                .request_approval(
                    ApprovalKind::RequestAccounts,
                    "https://dapp.example",
                    Some("eip155".into()),
                    Some(ChainRef::eip155(1)),
                    serde_json::json!({}),
                    context,
                )
                .await
        });
        // Let the request enqueue.
        tokio::task::yield_now().await;
        handle
    }

    #[tokio::test]
    async fn test_resolve_runs_executor_and_delivers_value() {
        let controller = controller();
        let handle = spawn_request(&controller, "p1").await;
        let id = controller.pending()[0].id;

        let resolved = controller
            .resolve(id, Box::pin(async { Ok(serde_json::json!(["0xf3"])) }))
            .await
            .unwrap();
        assert!(resolved);
        assert_eq!(handle.await.unwrap().unwrap(), serde_json::json!(["0xf3"]));
        assert!(controller.pending().is_empty());
    }

    #[tokio::test]
    async fn test_reject_delivers_error() {
        let controller = controller();
        let handle = spawn_request(&controller, "p1").await;
        let id = controller.pending()[0].id;

        controller
            .reject(id, WalletError::approval_rejected())
            .await
            .unwrap();
        let err = handle.await.unwrap().unwrap_err();
        assert_eq!(err.reason, ErrorReason::ApprovalRejected);
    }

    #[tokio::test]
    async fn test_finalizing_twice_is_a_noop() {
        let controller = controller();
        let handle = spawn_request(&controller, "p1").await;
        let id = controller.pending()[0].id;

        assert!(controller
            .resolve(id, Box::pin(async { Ok(Value::Null) }))
            .await
            .unwrap());
        assert!(!controller
            .resolve(id, Box::pin(async { Ok(Value::Null) }))
            .await
            .unwrap());
        assert!(!controller
            .reject(id, WalletError::approval_rejected())
            .await
            .unwrap());
        handle.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_failing_executor_expires_the_task() {
        let controller = controller();
        let handle = spawn_request(&controller, "p1").await;
        let id = controller.pending()[0].id;

        let resolved = controller
            .resolve(id, Box::pin(async { Err(WalletError::internal("boom")) }))
            .await
            .unwrap();
        assert!(resolved);
        let err = handle.await.unwrap().unwrap_err();
        assert_eq!(err.reason, ErrorReason::ApprovalExpired);
        assert_eq!(err.cause.unwrap().message, "boom");
    }

    #[tokio::test(start_paused = true)]
    async fn test_ttl_expires_pending_tasks() {
        let controller = controller();
        let handle = spawn_request(&controller, "p1").await;

        tokio::time::sleep(Duration::from_millis(DEFAULT_APPROVAL_TTL_MS + 1)).await;
        tokio::task::yield_now().await;

        let err = handle.await.unwrap().unwrap_err();
        assert_eq!(err.reason, ErrorReason::ApprovalExpired);
        assert_eq!(err.data.unwrap()["expiry"], "timeout");
        assert!(controller.pending().is_empty());
    }

    #[tokio::test]
    async fn test_session_lost_expires_matching_tasks_only() {
        let controller = controller();
        let doomed_a = spawn_request(&controller, "p1").await;
        let doomed_b = spawn_request(&controller, "p1").await;
        let survivor = spawn_request(&controller, "p2").await;
        assert_eq!(controller.pending().len(), 3);

        let finalized = controller
            .expire_by_request_context(&context("p1"))
            .await
            .unwrap();
        assert_eq!(finalized, 2);

        for handle in [doomed_a, doomed_b] {
            let err = handle.await.unwrap().unwrap_err();
            assert_eq!(err.data.unwrap()["expiry"], "session_lost");
        }
        assert_eq!(controller.pending().len(), 1);

        let id = controller.pending()[0].id;
        controller
            .resolve(id, Box::pin(async { Ok(Value::Null) }))
            .await
            .unwrap();
        survivor.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_pending_preserves_insertion_order() {
        let controller = controller();
        let _a = spawn_request(&controller, "p1").await;
        let _b = spawn_request(&controller, "p2").await;
        let _c = spawn_request(&controller, "p3").await;

        let pending = controller.pending();
        let created: Vec<_> = pending.iter().map(|t| t.created_at).collect();
        let mut sorted = created.clone();
        sorted.sort_unstable();
        assert_eq!(created, sorted);
        assert_eq!(pending.len(), 3);
        controller.destroy().await;
    }
}
