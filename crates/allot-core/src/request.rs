use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::UnitKind;

/// What a request needs from the pool
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Requirement {
    /// `count` units of a single kind
    Kind {
        /// Required kind
        kind: UnitKind,
        /// Number of units
        count: u32,
    },
    /// A number of units per kind, to be satisfied all at once
    Bulk(BTreeMap<UnitKind, u32>),
}

impl Requirement {
    /// One unit of `kind`
    pub fn single(kind: UnitKind) -> Self {
        Self::Kind { kind, count: 1 }
    }

    /// `count` units of `kind`
    pub fn count(kind: UnitKind, count: u32) -> Self {
        Self::Kind { kind, count }
    }

    /// A mapping of kind to count
    ///
    /// Repeated kinds are summed up.
    pub fn bulk(demands: impl IntoIterator<Item = (UnitKind, u32)>) -> Self {
        let mut map = BTreeMap::new();
        for (kind, count) in demands {
            *map.entry(kind).or_insert(0) += count;
        }
        Self::Bulk(map)
    }

    /// Non-zero demands in kind order
    pub fn demands(&self) -> Vec<(&UnitKind, u32)> {
        match self {
            Self::Kind { kind, count } if *count > 0 => vec![(kind, *count)],
            Self::Kind { .. } => Vec::new(),
            Self::Bulk(map) => map
                .iter()
                .filter(|(_, count)| **count > 0)
                .map(|(kind, count)| (kind, *count))
                .collect(),
        }
    }

    /// Total number of units demanded
    pub fn total(&self) -> u32 {
        self.demands().iter().map(|(_, count)| count).sum()
    }

    /// Whether the requirement demands nothing at all
    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

/// A request for units, as issued by a caller
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct AllocationRequest {
    /// Who is asking
    pub requester: Uuid,
    /// Which units are needed
    pub requirement: Requirement,
    /// Where the request originates, e.g. the calling floor
    pub locality: Option<i64>,
    /// When the request was issued
    pub created_at: DateTime<Utc>,
    /// When the resulting commitment is due (e.g. the date of journey)
    ///
    /// Release windows are computed against this time.
    pub target_time: Option<DateTime<Utc>>,
    /// Quoted cost, charged by payment finalizers
    pub cost: Option<u64>,
}

impl AllocationRequest {
    /// Create a new [`AllocationRequest`] issued now
    pub fn new(requester: Uuid, requirement: Requirement) -> Self {
        Self {
            requester,
            requirement,
            locality: None,
            created_at: Utc::now(),
            target_time: None,
            cost: None,
        }
    }

    /// Set the locality hint
    pub fn with_locality(mut self, locality: i64) -> Self {
        self.locality = Some(locality);
        self
    }

    /// Override the creation timestamp
    pub fn created_at(mut self, at: DateTime<Utc>) -> Self {
        self.created_at = at;
        self
    }

    /// Set the target time
    pub fn with_target_time(mut self, at: DateTime<Utc>) -> Self {
        self.target_time = Some(at);
        self
    }

    /// Attach a quoted cost
    pub fn with_cost(mut self, cost: u64) -> Self {
        self.cost = Some(cost);
        self
    }
}
