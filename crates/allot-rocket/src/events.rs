use allot_core::{AllocError, CommitmentId, RequestId, UnitId};
use uuid::Uuid;

/// Notifications sent by the coordinator to its subscribers
#[derive(Clone, PartialEq, Debug)]
pub enum AllocationEvent {
    Submitted {
        request: RequestId,
        requester: Uuid,
    },
    Committed {
        request: RequestId,
        commitment: CommitmentId,
        units: Vec<UnitId>,
    },
    Requeued {
        request: RequestId,
    },
    Rejected {
        request: RequestId,
        reason: AllocError,
    },
    Abandoned {
        request: RequestId,
    },
    Released {
        commitment: CommitmentId,
        units: Vec<UnitId>,
    },
    UnitDisabled {
        unit: UnitId,
    },
    UnitEnabled {
        unit: UnitId,
    },
    Repositioned {
        unit: UnitId,
        locality: i64,
    },
    Overloaded {
        unit: UnitId,
        load: u32,
    },
    OverloadCleared {
        unit: UnitId,
        load: u32,
    },
}
