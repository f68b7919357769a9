//! Approval and attention bus topics.

use crate::service::ApprovalOutcome;
use serde::{Deserialize, Serialize};
use shared_bus::Topic;
use shared_types::{ApprovalTask, AttentionRequest, RequestContext};
use uuid::Uuid;

/// A task entered the queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalRequested {
    pub task: ApprovalTask,
    pub context: RequestContext,
}

/// A task left the queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalFinished {
    pub id: Uuid,
    pub outcome: ApprovalOutcome,
}

pub const APPROVAL_REQUESTED: Topic<ApprovalRequested> = Topic::event("approval:requested");

pub const APPROVAL_FINISHED: Topic<ApprovalFinished> = Topic::event("approval:finished");

/// The pending list, in insertion order.
pub const APPROVALS_CHANGED: Topic<Vec<ApprovalTask>> =
    Topic::state("approvals:changed", |a, b| {
        a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.id == y.id)
    });

/// The attention queue changed.
pub const ATTENTION_CHANGED: Topic<Vec<AttentionRequest>> =
    Topic::state("attention:changed", |a, b| a == b);
