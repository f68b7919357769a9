//! Transaction bus topics.

use shared_bus::Topic;
use shared_types::TransactionRecord;

/// A transaction record changed state.
pub const TRANSACTION_UPDATED: Topic<TransactionRecord> = Topic::event("transaction:updated");
