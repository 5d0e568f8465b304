use serde::{Deserialize, Serialize};

use crate::{UnitId, UnitKind};

/// Static description of a unit, handed to the pool at initialization
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct UnitSpec {
    /// Unique id within the pool
    pub id: UnitId,
    /// Type tag used for matching
    pub kind: UnitKind,
    /// Initial position, e.g. the floor an elevator car starts on
    #[serde(default)]
    pub locality: Option<i64>,
    /// Maximum load the unit may carry before it counts as overloaded
    #[serde(default)]
    pub capacity: Option<u32>,
}

impl UnitSpec {
    /// Create a new [`UnitSpec`] without locality or capacity
    pub fn new(id: u32, kind: UnitKind) -> Self {
        Self {
            id: UnitId(id),
            kind,
            locality: None,
            capacity: None,
        }
    }

    /// Set the initial locality
    pub fn with_locality(mut self, locality: i64) -> Self {
        self.locality = Some(locality);
        self
    }

    /// Set the maximum load
    pub fn with_capacity(mut self, capacity: u32) -> Self {
        self.capacity = Some(capacity);
        self
    }
}

/// Supplier of the static list of units
///
/// Consulted once when the pool is built; never touched again at runtime.
pub trait TopologyProvider {
    /// The units making up the pool
    fn units(&self) -> Vec<UnitSpec>;
}

impl TopologyProvider for Vec<UnitSpec> {
    fn units(&self) -> Vec<UnitSpec> {
        self.clone()
    }
}

impl TopologyProvider for [UnitSpec] {
    fn units(&self) -> Vec<UnitSpec> {
        self.to_vec()
    }
}
