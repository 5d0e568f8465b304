//! Implementation of the unit pool

use std::collections::HashMap;

use allot_core::{AllocError, TopologyProvider, UnitId};

use crate::unit::ResourceUnit;

/// The pool of units, kept in id order
#[derive(Clone, Debug)]
pub struct UnitPool {
    units: Vec<ResourceUnit>,
    /// Map between the id of a unit and its index in `units`
    index: HashMap<UnitId, usize>,
}

impl UnitPool {
    /// Create a new [`UnitPool`] from a topology.
    pub fn new<T: TopologyProvider + ?Sized>(topology: &T) -> Result<Self, AllocError> {
        let mut units: Vec<ResourceUnit> = topology
            .units()
            .into_iter()
            .map(ResourceUnit::new)
            .collect();
        units.sort_by_key(ResourceUnit::id);

        let mut index = HashMap::with_capacity(units.len());
        for (i, unit) in units.iter().enumerate() {
            if index.insert(unit.id(), i).is_some() {
                return Err(AllocError::DuplicateUnit(unit.id()));
            }
        }
        Ok(Self { units, index })
    }

    /// All units in id order
    pub fn units(&self) -> &[ResourceUnit] {
        &self.units
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn get(&self, id: UnitId) -> Result<&ResourceUnit, AllocError> {
        self.index
            .get(&id)
            .map(|&i| &self.units[i])
            .ok_or(AllocError::UnknownUnit(id))
    }

    pub(crate) fn get_mut(&mut self, id: UnitId) -> Result<&mut ResourceUnit, AllocError> {
        match self.index.get(&id) {
            Some(&i) => Ok(&mut self.units[i]),
            None => Err(AllocError::UnknownUnit(id)),
        }
    }

    /// Units a policy may choose from, in id order
    pub fn selectable(&self) -> Vec<ResourceUnit> {
        self.units
            .iter()
            .filter(|unit| unit.is_selectable())
            .cloned()
            .collect()
    }

    /// Number of units that are currently selectable
    pub fn num_available(&self) -> usize {
        self.units.iter().filter(|unit| unit.is_selectable()).count()
    }

    /// Mark `ids` as occupied.
    ///
    /// Either all of them are occupied or, if one of them is not selectable,
    /// none is.
    pub(crate) fn occupy(&mut self, ids: &[UnitId]) -> Result<(), AllocError> {
        for (n, id) in ids.iter().enumerate() {
            let unit = self.get(*id)?;
            if !unit.is_selectable() || ids[..n].contains(id) {
                return Err(AllocError::AlreadyOccupied(*id));
            }
        }
        for id in ids {
            self.get_mut(*id)?.set_occupied(true);
        }
        Ok(())
    }

    /// Return `ids` to the free pool.
    pub(crate) fn vacate(&mut self, ids: &[UnitId]) -> Result<(), AllocError> {
        for id in ids {
            self.get_mut(*id)?.set_occupied(false);
        }
        Ok(())
    }
}
