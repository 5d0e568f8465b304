//! A single allocatable unit

use allot_core::{UnitId, UnitKind, UnitSpec, UnitStatus};
use serde::Serialize;

/// A single allocatable thing: an elevator car, a parking spot, a seat
///
/// Only the coordinator and the release protocol change a unit; everybody else
/// sees it through shared references.
#[derive(Clone, PartialEq, Eq, Debug, Serialize)]
pub struct ResourceUnit {
    id: UnitId,
    kind: UnitKind,
    occupied: bool,
    disabled: bool,
    locality: Option<i64>,
    capacity: Option<u32>,
    load: u32,
    overloaded: bool,
}

impl ResourceUnit {
    /// Create a new free [`ResourceUnit`] from its static description
    pub fn new(spec: UnitSpec) -> Self {
        Self {
            id: spec.id,
            kind: spec.kind,
            occupied: false,
            disabled: false,
            locality: spec.locality,
            capacity: spec.capacity,
            load: 0,
            overloaded: false,
        }
    }

    #[inline]
    pub fn id(&self) -> UnitId {
        self.id
    }

    #[inline]
    pub fn kind(&self) -> &UnitKind {
        &self.kind
    }

    /// Reported status; a disabled unit reports [`UnitStatus::Disabled`] even
    /// while it is still bound to a commitment
    pub fn status(&self) -> UnitStatus {
        if self.disabled {
            UnitStatus::Disabled
        } else if self.occupied {
            UnitStatus::Occupied
        } else {
            UnitStatus::Free
        }
    }

    #[inline]
    pub fn is_occupied(&self) -> bool {
        self.occupied
    }

    #[inline]
    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    #[inline]
    pub fn is_overloaded(&self) -> bool {
        self.overloaded
    }

    /// Whether a policy may pick this unit
    #[inline]
    pub fn is_selectable(&self) -> bool {
        !self.occupied && !self.disabled && !self.overloaded
    }

    #[inline]
    pub fn locality(&self) -> Option<i64> {
        self.locality
    }

    #[inline]
    pub fn capacity(&self) -> Option<u32> {
        self.capacity
    }

    #[inline]
    pub fn load(&self) -> u32 {
        self.load
    }

    /// Distance between the unit and a locality hint
    ///
    /// Units without a locality are infinitely far away.
    pub fn distance_to(&self, hint: Option<i64>) -> u64 {
        match (self.locality, hint) {
            (_, None) => 0,
            (Some(at), Some(hint)) => at.abs_diff(hint),
            (None, Some(_)) => u64::MAX,
        }
    }

    pub(crate) fn set_occupied(&mut self, occupied: bool) {
        self.occupied = occupied;
    }

    pub(crate) fn set_disabled(&mut self, disabled: bool) {
        self.disabled = disabled;
    }

    pub(crate) fn set_locality(&mut self, locality: i64) {
        self.locality = Some(locality);
    }

    /// Add `amount` to the load, returns whether the unit is overloaded now
    pub(crate) fn add_load(&mut self, amount: u32) -> bool {
        self.load = self.load.saturating_add(amount);
        self.overloaded = self.capacity.is_some_and(|max| self.load > max);
        self.overloaded
    }

    /// Remove `amount` from the load, returns whether an overload was cleared
    pub(crate) fn remove_load(&mut self, amount: u32) -> bool {
        let was_overloaded = self.overloaded;
        self.load = self.load.saturating_sub(amount);
        self.overloaded = self.capacity.is_some_and(|max| self.load > max);
        was_overloaded && !self.overloaded
    }
}
