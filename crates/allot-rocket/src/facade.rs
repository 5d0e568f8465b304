//! Interfaces between the coordinator and the code surrounding it

use allot_core::{AllocError, CommitmentId, UnitId, UnitStatus};
use thiserror::Error;
use uuid::Uuid;

use crate::ledger::Commitment;
use crate::unit::ResourceUnit;

/// Failure reported by a [`Finalizer`]
#[derive(Clone, PartialEq, Eq, Debug, Error)]
#[error("{0}")]
pub struct FinalizeError(pub String);

impl FinalizeError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self(reason.into())
    }
}

/// Hook run synchronously after units have been tentatively committed
///
/// Examples are "move the car and open the door" or "charge the payment". If
/// the hook fails, the coordinator frees the units again and rejects the
/// request.
pub trait Finalizer {
    /// Finalize `commitment`
    fn finalize(&mut self, commitment: &Commitment) -> Result<(), FinalizeError>;
}

impl<F> Finalizer for F
where
    F: FnMut(&Commitment) -> Result<(), FinalizeError>,
{
    fn finalize(&mut self, commitment: &Commitment) -> Result<(), FinalizeError> {
        self(commitment)
    }
}

/// Finalizer that accepts every commitment
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopFinalizer;

impl Finalizer for NoopFinalizer {
    fn finalize(&mut self, _commitment: &Commitment) -> Result<(), FinalizeError> {
        Ok(())
    }
}

/// Read-only views for presentation layers
pub trait QueryFacade {
    /// All units in id order
    fn list_units(&self) -> Vec<ResourceUnit>;

    /// All commitments of `requester`, active and released, in allocation order
    fn list_commitments(&self, requester: Uuid) -> Vec<Commitment>;

    /// Reported status of a unit
    fn unit_status(&self, id: UnitId) -> Result<UnitStatus, AllocError>;

    /// A single commitment
    fn commitment(&self, id: CommitmentId) -> Result<Commitment, AllocError>;
}

/// Out-of-band maintenance triggers
pub trait AdminFacade {
    /// Take a unit out of service
    ///
    /// Commitments already bound to the unit stay in place, but the unit is no
    /// longer selected and refuses to be repositioned.
    fn disable_unit(&mut self, id: UnitId) -> Result<(), AllocError>;

    /// Put a unit back into service
    fn enable_unit(&mut self, id: UnitId) -> Result<(), AllocError>;
}
