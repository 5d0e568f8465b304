//! Commitments and the ledger keeping track of them

use std::collections::HashMap;

use allot_core::{AllocError, CommitmentId, RequestId, UnitId};
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Status of a [`Commitment`]
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize)]
pub enum CommitmentStatus {
    Active,
    Released,
}

/// Binding between a requester and one or more units
#[derive(Clone, PartialEq, Eq, Debug, Serialize)]
pub struct Commitment {
    id: CommitmentId,
    request: RequestId,
    requester: Uuid,
    units: Vec<UnitId>,
    allocated_at: DateTime<Utc>,
    target_time: Option<DateTime<Utc>>,
    cost: Option<u64>,
    status: CommitmentStatus,
    released_at: Option<DateTime<Utc>>,
}

impl Commitment {
    pub(crate) fn new(
        id: CommitmentId,
        request: RequestId,
        requester: Uuid,
        units: Vec<UnitId>,
        target_time: Option<DateTime<Utc>>,
        cost: Option<u64>,
    ) -> Self {
        Self {
            id,
            request,
            requester,
            units,
            allocated_at: Utc::now(),
            target_time,
            cost,
            status: CommitmentStatus::Active,
            released_at: None,
        }
    }

    pub fn id(&self) -> CommitmentId {
        self.id
    }

    /// The request this commitment satisfied
    pub fn request(&self) -> RequestId {
        self.request
    }

    pub fn requester(&self) -> Uuid {
        self.requester
    }

    pub fn units(&self) -> &[UnitId] {
        &self.units
    }

    pub fn allocated_at(&self) -> DateTime<Utc> {
        self.allocated_at
    }

    pub fn target_time(&self) -> Option<DateTime<Utc>> {
        self.target_time
    }

    pub fn cost(&self) -> Option<u64> {
        self.cost
    }

    pub fn status(&self) -> CommitmentStatus {
        self.status
    }

    pub fn is_active(&self) -> bool {
        self.status == CommitmentStatus::Active
    }

    pub fn released_at(&self) -> Option<DateTime<Utc>> {
        self.released_at
    }

    pub(crate) fn mark_released(&mut self, at: DateTime<Utc>) {
        self.status = CommitmentStatus::Released;
        self.released_at = Some(at);
    }
}

/// All commitments made, plus the unit → active commitment index
///
/// Released commitments stay on the books until [`Coordinator::forget()`]
/// drops them.
///
/// [`Coordinator::forget()`]: crate::Coordinator::forget
#[derive(Clone, Debug, Default)]
pub struct Ledger {
    commitments: HashMap<CommitmentId, Commitment>,
    /// Commitment ids per requester, in allocation order
    by_requester: HashMap<Uuid, Vec<CommitmentId>>,
    /// The single active commitment bound to each occupied unit
    active_by_unit: HashMap<UnitId, CommitmentId>,
    next_id: u64,
}

impl Ledger {
    /// Create a new empty [`Ledger`].
    pub fn new() -> Self {
        Self {
            next_id: 1,
            ..Self::default()
        }
    }

    pub(crate) fn next_id(&mut self) -> CommitmentId {
        let id = CommitmentId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Record an active commitment.
    ///
    /// Fails without recording anything if one of its units is already bound
    /// to another active commitment.
    pub(crate) fn record(&mut self, commitment: Commitment) -> Result<(), AllocError> {
        if let Some(unit) = commitment
            .units()
            .iter()
            .find(|unit| self.active_by_unit.contains_key(*unit))
        {
            return Err(AllocError::AlreadyOccupied(*unit));
        }
        for unit in commitment.units() {
            self.active_by_unit.insert(*unit, commitment.id());
        }
        self.by_requester
            .entry(commitment.requester())
            .or_default()
            .push(commitment.id());
        self.commitments.insert(commitment.id(), commitment);
        Ok(())
    }

    /// Remove a commitment that never became effective (finalize rollback)
    pub(crate) fn discard(&mut self, id: CommitmentId) {
        if let Some(commitment) = self.commitments.remove(&id) {
            for unit in commitment.units() {
                self.active_by_unit.remove(unit);
            }
            if let Some(ids) = self.by_requester.get_mut(&commitment.requester()) {
                ids.retain(|other| *other != id);
            }
        }
    }

    /// Mark a commitment released and unbind its units
    pub(crate) fn release(
        &mut self,
        id: CommitmentId,
        at: DateTime<Utc>,
    ) -> Result<&Commitment, AllocError> {
        let commitment = self
            .commitments
            .get_mut(&id)
            .ok_or(AllocError::UnknownCommitment(id))?;
        commitment.mark_released(at);
        for unit in commitment.units() {
            self.active_by_unit.remove(unit);
        }
        Ok(commitment)
    }

    /// Drop a released commitment from the books
    ///
    /// Released commitments are otherwise kept forever, so long-running users
    /// with many short-lived requesters (elevator rides) prune them here.
    pub(crate) fn forget(&mut self, id: CommitmentId) -> Result<Commitment, AllocError> {
        match self.commitments.get(&id) {
            None => return Err(AllocError::UnknownCommitment(id)),
            Some(commitment) if commitment.is_active() => {
                return Err(AllocError::CommitmentActive(id))
            }
            Some(_) => {}
        }
        let commitment = self
            .commitments
            .remove(&id)
            .ok_or(AllocError::UnknownCommitment(id))?;
        if let Some(ids) = self.by_requester.get_mut(&commitment.requester()) {
            ids.retain(|other| *other != id);
            if ids.is_empty() {
                self.by_requester.remove(&commitment.requester());
            }
        }
        Ok(commitment)
    }

    /// Number of commitments on the books, active and released
    pub fn len(&self) -> usize {
        self.commitments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commitments.is_empty()
    }

    pub fn get(&self, id: CommitmentId) -> Result<&Commitment, AllocError> {
        self.commitments
            .get(&id)
            .ok_or(AllocError::UnknownCommitment(id))
    }

    /// Commitments of a requester, in allocation order
    pub fn for_requester(&self, requester: Uuid) -> Vec<&Commitment> {
        self.by_requester
            .get(&requester)
            .into_iter()
            .flatten()
            .filter_map(|id| self.commitments.get(id))
            .collect()
    }

    /// The active commitment bound to `unit`, if any
    pub fn active_for_unit(&self, unit: UnitId) -> Option<&Commitment> {
        self.active_by_unit
            .get(&unit)
            .and_then(|id| self.commitments.get(id))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Commitment> {
        self.commitments.values()
    }

    pub fn num_active(&self) -> usize {
        self.commitments.values().filter(|c| c.is_active()).count()
    }
}
