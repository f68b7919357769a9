//! The permitted transition table.

use shared_types::TransactionStatus;

/// Whether `from -> to` is a legal lifecycle transition.
#[must_use]
pub fn can_transition(from: TransactionStatus, to: TransactionStatus) -> bool {
    use TransactionStatus::*;
    matches!(
        (from, to),
        (Pending, Approved)
            | (Pending, Failed)
            | (Approved, Signed)
            | (Approved, Failed)
            | (Signed, Broadcast)
            | (Signed, Failed)
            | (Broadcast, Confirmed)
            | (Broadcast, Failed)
            | (Broadcast, Replaced)
    )
}
