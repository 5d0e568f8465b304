//! Implementation of the shared front desk
use std::sync::Arc;

use allot_core::{AllocError, AllocationRequest, CommitmentId, RequestId, UnitId, UnitStatus};
use chrono::{DateTime, Utc};
use crossbeam::channel::Receiver;
use parking_lot::Mutex;
use uuid::Uuid;

use crate::coordinator::{Coordinator, PassReport};
use crate::events::AllocationEvent;
use crate::facade::{AdminFacade, Finalizer, QueryFacade};
use crate::ledger::Commitment;
use crate::release::ReleaseOutcome;
use crate::unit::ResourceUnit;

/// Handle to a [`Coordinator`] that several collaborators can hold at once
///
/// Entrance and exit gates of a parking lot, for example, each keep a clone.
/// Every call takes the lock for its whole duration, so the coordinator still
/// sees one operation at a time.
pub struct Desk<F> {
    coordinator: Arc<Mutex<Coordinator<F>>>,
}

impl<F> Clone for Desk<F> {
    fn clone(&self) -> Self {
        Self {
            coordinator: self.coordinator.clone(),
        }
    }
}

impl<F: Finalizer> Desk<F> {
    /// Create a new [`Desk`] owning `coordinator`
    pub fn new(coordinator: Coordinator<F>) -> Self {
        Self {
            coordinator: Arc::new(Mutex::new(coordinator)),
        }
    }

    /// Run `f` with exclusive access to the coordinator
    pub fn with<R>(&self, f: impl FnOnce(&mut Coordinator<F>) -> R) -> R {
        f(&mut self.coordinator.lock())
    }

    pub fn submit(&self, request: AllocationRequest) -> RequestId {
        self.coordinator.lock().submit(request)
    }

    pub fn process_next(&self) -> Result<Commitment, AllocError> {
        self.coordinator.lock().process_next()
    }

    pub fn process_pass(&self) -> PassReport {
        self.coordinator.lock().process_pass()
    }

    pub fn allocate_now(&self, request: AllocationRequest) -> Result<Commitment, AllocError> {
        self.coordinator.lock().allocate_now(request)
    }

    pub fn abandon(&self, id: RequestId) -> Result<AllocationRequest, AllocError> {
        self.coordinator.lock().abandon(id)
    }

    pub fn release(
        &self,
        id: CommitmentId,
        now: DateTime<Utc>,
    ) -> Result<ReleaseOutcome, AllocError> {
        self.coordinator.lock().release(id, now)
    }

    pub fn reposition(&self, id: UnitId, locality: i64) -> Result<(), AllocError> {
        self.coordinator.lock().reposition(id, locality)
    }

    pub fn add_load(&self, id: UnitId, amount: u32) -> Result<bool, AllocError> {
        self.coordinator.lock().add_load(id, amount)
    }

    pub fn remove_load(&self, id: UnitId, amount: u32) -> Result<bool, AllocError> {
        self.coordinator.lock().remove_load(id, amount)
    }

    pub fn active_commitment(&self, unit: UnitId) -> Option<Commitment> {
        self.coordinator.lock().active_commitment(unit).cloned()
    }

    pub fn unit(&self, id: UnitId) -> Result<ResourceUnit, AllocError> {
        self.coordinator.lock().unit(id).cloned()
    }

    pub fn subscribe(&self) -> Receiver<AllocationEvent> {
        self.coordinator.lock().subscribe()
    }
}

impl<F: Finalizer> QueryFacade for Desk<F> {
    fn list_units(&self) -> Vec<ResourceUnit> {
        self.coordinator.lock().list_units()
    }

    fn list_commitments(&self, requester: Uuid) -> Vec<Commitment> {
        self.coordinator.lock().list_commitments(requester)
    }

    fn unit_status(&self, id: UnitId) -> Result<UnitStatus, AllocError> {
        self.coordinator.lock().unit_status(id)
    }

    fn commitment(&self, id: CommitmentId) -> Result<Commitment, AllocError> {
        self.coordinator.lock().commitment(id)
    }
}

impl<F: Finalizer> AdminFacade for Desk<F> {
    fn disable_unit(&mut self, id: UnitId) -> Result<(), AllocError> {
        self.coordinator.lock().disable_unit(id)
    }

    fn enable_unit(&mut self, id: UnitId) -> Result<(), AllocError> {
        self.coordinator.lock().enable_unit(id)
    }
}
