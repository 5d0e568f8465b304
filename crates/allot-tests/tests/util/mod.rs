use std::collections::HashMap;

use allot_core::{AllocationRequest, Requirement, UnitId, UnitKind, UnitSpec};
use allot_rocket::{Coordinator, Finalizer};
use chrono::{DateTime, TimeZone, Utc};
use uuid::Uuid;

/// A request for `count` units of `kind` by a fresh requester
#[allow(unused)]
pub fn request(kind: UnitKind, count: u32) -> AllocationRequest {
    AllocationRequest::new(Uuid::new_v4(), Requirement::count(kind, count))
}

/// A unit of `kind` at `locality`
#[allow(unused)]
pub fn unit_at(id: u32, kind: UnitKind, locality: i64) -> UnitSpec {
    UnitSpec::new(id, kind).with_locality(locality)
}

/// Noon on the given day
#[allow(unused)]
pub fn day(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, 12, 0, 0).unwrap()
}

/// Checks that the pool and the ledger agree with each other.
///
/// Every unit of an active commitment must be occupied, at most one active
/// commitment may reference a unit and every occupied unit must belong to an
/// active commitment.
#[allow(unused)]
pub fn assert_consistent<F: Finalizer>(coordinator: &Coordinator<F>) {
    let mut owners: HashMap<UnitId, u64> = HashMap::new();
    for commitment in coordinator.ledger().iter().filter(|c| c.is_active()) {
        for unit in commitment.units() {
            if let Some(other) = owners.insert(*unit, commitment.id().0) {
                panic!(
                    "{unit} must not be referenced by two active commitments \
                     ({other} and {})",
                    commitment.id().0
                );
            }
            let unit = coordinator.unit(*unit).unwrap();
            assert!(
                unit.is_occupied(),
                "{} belongs to an active commitment, so it must be occupied.",
                unit.id()
            );
        }
    }

    for unit in coordinator.pool().units() {
        if unit.is_occupied() {
            assert!(
                owners.contains_key(&unit.id()),
                "{} is occupied, so it must belong to an active commitment.",
                unit.id()
            );
            assert_eq!(
                coordinator.active_commitment(unit.id()).map(|c| c.id().0),
                owners.get(&unit.id()).copied(),
                "The ledger must report the active commitment of {}.",
                unit.id()
            );
        }
    }
}
