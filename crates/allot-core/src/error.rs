use thiserror::Error;

use crate::{CommitmentId, RequestId, UnitId};

/// Errors reported by the allocation core
///
/// All of them are recoverable; callers decide whether to retry, surface or
/// log them.
#[derive(Clone, PartialEq, Eq, Debug, Error)]
pub enum AllocError {
    /// The policy found no combination of units satisfying the request
    #[error("no matching unit for {0}")]
    NoMatchingUnit(RequestId),

    /// A selected unit was not free when committing
    #[error("{0} is already occupied")]
    AlreadyOccupied(UnitId),

    /// Release refused because the target time is too close
    #[error("release of {commitment} refused: {lead_days} day(s) lead, {required_days} required")]
    ReleaseTooLate {
        /// Commitment whose release was refused
        commitment: CommitmentId,
        /// Whole days left until the target time
        lead_days: i64,
        /// Configured minimum lead
        required_days: i64,
    },

    /// The external finalize hook failed; the allocation was rolled back
    #[error("finalizing {request} failed: {reason}")]
    FinalizeFailed {
        /// Rejected request
        request: RequestId,
        /// Reason reported by the finalizer
        reason: String,
    },

    /// No unit with this id exists
    #[error("unknown {0}")]
    UnknownUnit(UnitId),

    /// No pending request with this id exists
    #[error("unknown {0}")]
    UnknownRequest(RequestId),

    /// No commitment with this id exists
    #[error("unknown {0}")]
    UnknownCommitment(CommitmentId),

    /// The commitment is still active and cannot be forgotten
    #[error("{0} is still active")]
    CommitmentActive(CommitmentId),

    /// The request queue is empty
    #[error("no pending requests")]
    QueueEmpty,

    /// The unit is disabled and refuses the operation
    #[error("{0} is disabled")]
    UnitDisabled(UnitId),

    /// The unit carries more than its capacity and refuses the operation
    #[error("{0} is overloaded")]
    UnitOverloaded(UnitId),

    /// The topology listed the same unit id twice
    #[error("{0} listed more than once")]
    DuplicateUnit(UnitId),
}
