//! Implementation of the coordinator

use allot_core::{
    AllocError, AllocationRequest, CommitmentId, Config, PassMode, RequestId, TopologyProvider,
    UnitId, UnitStatus,
};
use chrono::{DateTime, Utc};
use crossbeam::channel::{unbounded, Receiver, Sender};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::events::AllocationEvent;
use crate::facade::{AdminFacade, Finalizer, QueryFacade};
use crate::ledger::{Commitment, Ledger};
use crate::policy::AllocationPolicy;
use crate::pool::UnitPool;
use crate::queue::{QueuedRequest, RequestQueue};
use crate::release::{ReleaseOutcome, ReleaseProtocol};
use crate::unit::ResourceUnit;

/// Outcome of a single [`Coordinator::process_pass()`]
#[derive(Clone, Debug, Default)]
pub struct PassReport {
    /// Commitments made during the pass, in processing order
    pub committed: Vec<Commitment>,
    /// Requests that could not be satisfied and went back to the tail
    pub requeued: Vec<RequestId>,
    /// Requests that were dropped, e.g. because finalizing failed
    pub rejected: Vec<(RequestId, AllocError)>,
}

impl PassReport {
    /// Whether the pass changed anything besides the queue order
    pub fn made_progress(&self) -> bool {
        !self.committed.is_empty() || !self.rejected.is_empty()
    }
}

/// Coordinator orchestrating queue, policy, pool and release protocol
///
/// The coordinator is the only writer of the unit pool. All operations run to
/// completion before the next one starts, so selection and commit of two
/// requests never interleave.
pub struct Coordinator<F> {
    config: Config,
    policy: AllocationPolicy,

    /// Owned pool of units
    pool: UnitPool,
    /// Pending requests
    queue: RequestQueue,
    /// Commitments, active and released
    ledger: Ledger,
    release: ReleaseProtocol,

    /// Hook run after every tentative commit
    finalizer: F,

    next_request: u64,

    /// Channels of everybody interested in allocation events
    subscribers: Vec<Sender<AllocationEvent>>,
}

impl<F: Finalizer> Coordinator<F> {
    /// Create the [`Coordinator`] for the units supplied by `topology`
    pub fn new<T: TopologyProvider + ?Sized>(
        config: Config,
        topology: &T,
        policy: AllocationPolicy,
        finalizer: F,
    ) -> Result<Self, AllocError> {
        let pool = UnitPool::new(topology)?;
        info!(units = pool.len(), ?policy, pass_mode = ?config.pass_mode, "coordinator ready");
        Ok(Self {
            config,
            policy,
            pool,
            queue: RequestQueue::new(),
            ledger: Ledger::new(),
            release: ReleaseProtocol::from_config(&config),
            finalizer,
            next_request: 1,
            subscribers: Vec::new(),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn policy(&self) -> AllocationPolicy {
        self.policy
    }

    pub fn pool(&self) -> &UnitPool {
        &self.pool
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn finalizer(&self) -> &F {
        &self.finalizer
    }

    pub fn finalizer_mut(&mut self) -> &mut F {
        &mut self.finalizer
    }

    /// Get a channel receiving all events from now on
    pub fn subscribe(&mut self) -> Receiver<AllocationEvent> {
        let (sender, receiver) = unbounded();
        self.subscribers.push(sender);
        receiver
    }

    fn emit(&mut self, event: AllocationEvent) {
        // Forget subscribers that went away
        self.subscribers
            .retain(|sender| sender.send(event.clone()).is_ok());
    }

    /// Append a request to the queue
    pub fn submit(&mut self, request: AllocationRequest) -> RequestId {
        let id = RequestId(self.next_request);
        self.next_request += 1;

        debug!(
            request = %id,
            requester = %request.requester,
            requirement = ?request.requirement,
            "request queued"
        );
        self.emit(AllocationEvent::Submitted {
            request: id,
            requester: request.requester,
        });
        self.queue.enqueue(QueuedRequest { id, request });
        id
    }

    /// Pending requests in queue order
    pub fn pending(&self) -> Vec<QueuedRequest> {
        self.queue.iter().cloned().collect()
    }

    pub fn is_pending(&self, id: RequestId) -> bool {
        self.queue.contains(id)
    }

    pub fn num_pending(&self) -> usize {
        self.queue.len()
    }

    /// Remove a pending request without serving it
    pub fn abandon(&mut self, id: RequestId) -> Result<AllocationRequest, AllocError> {
        let queued = self.queue.remove(id)?;
        debug!(request = %id, "request abandoned");
        self.emit(AllocationEvent::Abandoned { request: id });
        Ok(queued.request)
    }

    /// Serve the request at the head of the queue
    ///
    /// On success the units are occupied, the finalizer has run and the new
    /// commitment is returned. If no units match, the request goes back to the
    /// tail and [`AllocError::NoMatchingUnit`] is returned. If the finalizer
    /// fails, the units are freed again and the request is dropped.
    pub fn process_next(&mut self) -> Result<Commitment, AllocError> {
        let queued = self.queue.dequeue()?;
        self.allocate(queued)
    }

    /// Serve `request` right away, bypassing the requests already queued
    ///
    /// Used where the caller waits at the gate, e.g. a vehicle at the entrance.
    /// A request that cannot be satisfied is abandoned rather than left queued.
    pub fn allocate_now(&mut self, request: AllocationRequest) -> Result<Commitment, AllocError> {
        let id = self.submit(request);
        let queued = self.queue.remove(id)?;
        let result = self.allocate(queued);
        if result.is_err() && self.queue.contains(id) {
            self.abandon(id)?;
        }
        result
    }

    /// Run one processing pass over the queue
    ///
    /// Every request pending when the pass starts is attempted at most once,
    /// so an unsatisfiable request is re-queued at most once per pass and the
    /// pass always terminates. With [`PassMode::StopAtFirstFailure`] the pass
    /// ends at the first unsatisfiable request.
    pub fn process_pass(&mut self) -> PassReport {
        let mut report = PassReport::default();

        for _ in 0..self.queue.len() {
            let Ok(queued) = self.queue.dequeue() else {
                break;
            };
            let id = queued.id;
            match self.allocate(queued) {
                Ok(commitment) => report.committed.push(commitment),
                Err(AllocError::NoMatchingUnit(_) | AllocError::AlreadyOccupied(_)) => {
                    report.requeued.push(id);
                    if self.config.pass_mode == PassMode::StopAtFirstFailure {
                        break;
                    }
                }
                Err(err) => report.rejected.push((id, err)),
            }
        }

        if !report.made_progress() && !self.queue.is_empty() {
            debug!(pending = self.queue.len(), "pass made no progress");
        }
        report
    }

    fn allocate(&mut self, queued: QueuedRequest) -> Result<Commitment, AllocError> {
        let id = queued.id;

        // Disabled, overloaded and occupied units never reach the policy
        let candidates = self.pool.selectable();
        let Some(units) = self.policy.select(&candidates, &queued.request) else {
            debug!(request = %id, "no matching unit, re-queuing");
            self.queue.requeue(queued);
            self.emit(AllocationEvent::Requeued { request: id });
            return Err(AllocError::NoMatchingUnit(id));
        };

        if let Err(err) = self.pool.occupy(&units) {
            warn!(request = %id, %err, "policy selected a unit that is not free");
            self.queue.requeue(queued);
            self.emit(AllocationEvent::Requeued { request: id });
            return Err(err);
        }

        let commitment = Commitment::new(
            self.ledger.next_id(),
            id,
            queued.request.requester,
            units.clone(),
            queued.request.target_time,
            queued.request.cost,
        );
        if let Err(err) = self.ledger.record(commitment.clone()) {
            warn!(request = %id, %err, "unit still bound to an active commitment");
            self.pool.vacate(&units)?;
            self.queue.requeue(queued);
            self.emit(AllocationEvent::Requeued { request: id });
            return Err(err);
        }

        if let Err(reason) = self.finalizer.finalize(&commitment) {
            // Compensate: the commitment never took effect
            self.ledger.discard(commitment.id());
            self.pool.vacate(&units)?;
            let err = AllocError::FinalizeFailed {
                request: id,
                reason: reason.0,
            };
            warn!(request = %id, %err, "finalizing failed, allocation rolled back");
            self.emit(AllocationEvent::Rejected {
                request: id,
                reason: err.clone(),
            });
            return Err(err);
        }

        info!(request = %id, commitment = %commitment.id(), ?units, "request committed");
        self.emit(AllocationEvent::Committed {
            request: id,
            commitment: commitment.id(),
            units,
        });
        Ok(commitment)
    }

    /// Release a commitment at `now`, subject to the release window
    pub fn release(
        &mut self,
        id: CommitmentId,
        now: DateTime<Utc>,
    ) -> Result<ReleaseOutcome, AllocError> {
        let outcome = self
            .release
            .release(&mut self.pool, &mut self.ledger, id, now)?;
        if outcome == ReleaseOutcome::Released {
            let units = self.ledger.get(id)?.units().to_vec();
            self.emit(AllocationEvent::Released {
                commitment: id,
                units,
            });
        }
        Ok(outcome)
    }

    /// Drop a released commitment from the ledger
    ///
    /// Active commitments are refused with [`AllocError::CommitmentActive`].
    pub fn forget(&mut self, id: CommitmentId) -> Result<Commitment, AllocError> {
        let commitment = self.ledger.forget(id)?;
        debug!(commitment = %id, "released commitment forgotten");
        Ok(commitment)
    }

    /// The active commitment bound to `unit`, if any
    pub fn active_commitment(&self, unit: UnitId) -> Option<&Commitment> {
        self.ledger.active_for_unit(unit)
    }

    /// Move a unit, e.g. an elevator car travelling to a floor
    ///
    /// Disabled and overloaded units refuse; nothing changes in that case.
    pub fn reposition(&mut self, id: UnitId, locality: i64) -> Result<(), AllocError> {
        let unit = self.pool.get_mut(id)?;
        if unit.is_disabled() {
            warn!(unit = %id, locality, "disabled unit refuses to move");
            return Err(AllocError::UnitDisabled(id));
        }
        if unit.is_overloaded() {
            warn!(unit = %id, locality, "overloaded unit refuses to move");
            return Err(AllocError::UnitOverloaded(id));
        }
        unit.set_locality(locality);
        debug!(unit = %id, locality, "unit repositioned");
        self.emit(AllocationEvent::Repositioned { unit: id, locality });
        Ok(())
    }

    /// Add load to a unit; returns whether it is overloaded now
    pub fn add_load(&mut self, id: UnitId, amount: u32) -> Result<bool, AllocError> {
        let unit = self.pool.get_mut(id)?;
        let overloaded = unit.add_load(amount);
        let load = unit.load();
        if overloaded {
            warn!(unit = %id, load, capacity = ?unit.capacity(), "unit overloaded");
            self.emit(AllocationEvent::Overloaded { unit: id, load });
        }
        Ok(overloaded)
    }

    /// Remove load from a unit (a passenger leaving the car)
    ///
    /// Clears the overload flag once the load is back at or below capacity.
    /// Returns whether the unit is still overloaded.
    pub fn remove_load(&mut self, id: UnitId, amount: u32) -> Result<bool, AllocError> {
        let unit = self.pool.get_mut(id)?;
        let cleared = unit.remove_load(amount);
        let load = unit.load();
        let overloaded = unit.is_overloaded();
        if cleared {
            info!(unit = %id, load, "overload cleared");
            self.emit(AllocationEvent::OverloadCleared { unit: id, load });
        }
        Ok(overloaded)
    }

    pub fn unit(&self, id: UnitId) -> Result<&ResourceUnit, AllocError> {
        self.pool.get(id)
    }
}

impl<F: Finalizer> QueryFacade for Coordinator<F> {
    fn list_units(&self) -> Vec<ResourceUnit> {
        self.pool.units().to_vec()
    }

    fn list_commitments(&self, requester: Uuid) -> Vec<Commitment> {
        self.ledger
            .for_requester(requester)
            .into_iter()
            .cloned()
            .collect()
    }

    fn unit_status(&self, id: UnitId) -> Result<UnitStatus, AllocError> {
        Ok(self.pool.get(id)?.status())
    }

    fn commitment(&self, id: CommitmentId) -> Result<Commitment, AllocError> {
        self.ledger.get(id).cloned()
    }
}

impl<F: Finalizer> AdminFacade for Coordinator<F> {
    fn disable_unit(&mut self, id: UnitId) -> Result<(), AllocError> {
        self.pool.get_mut(id)?.set_disabled(true);
        info!(unit = %id, "unit disabled");
        self.emit(AllocationEvent::UnitDisabled { unit: id });
        Ok(())
    }

    fn enable_unit(&mut self, id: UnitId) -> Result<(), AllocError> {
        self.pool.get_mut(id)?.set_disabled(false);
        info!(unit = %id, "unit enabled");
        self.emit(AllocationEvent::UnitEnabled { unit: id });
        Ok(())
    }
}
