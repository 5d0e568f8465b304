//! Selection policies
//!
//! A policy only looks at the units it is given and never changes them. The
//! coordinator hands it the selectable part of the pool, but every policy
//! checks [`ResourceUnit::is_selectable()`] on its own as well.

use std::collections::BTreeMap;

use allot_core::{AllocationRequest, UnitId, UnitKind};
use serde::{Deserialize, Serialize};

use crate::unit::ResourceUnit;

/// Strategy matching a request against a pool of units
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AllocationPolicy {
    /// Units closest to the request's locality hint, ties broken by lowest id
    NearestMatch,
    /// First matching units in id order
    #[default]
    FirstFit,
    /// A count per kind, all satisfied at once in a single pass over the pool
    TypedBulk,
}

impl AllocationPolicy {
    /// Select units for `request` from `pool`.
    ///
    /// Returns [`None`] if the requirement cannot be satisfied as a whole. No
    /// partial selection is ever returned.
    pub fn select(
        &self,
        pool: &[ResourceUnit],
        request: &AllocationRequest,
    ) -> Option<Vec<UnitId>> {
        let demands = request.requirement.demands();
        if demands.is_empty() {
            return None;
        }

        match self {
            Self::NearestMatch => {
                let mut selected = Vec::new();
                for (kind, count) in demands {
                    let mut candidates: Vec<&ResourceUnit> = pool
                        .iter()
                        .filter(|unit| unit.is_selectable() && unit.kind() == kind)
                        .collect();
                    candidates
                        .sort_by_key(|unit| (unit.distance_to(request.locality), unit.id()));
                    if candidates.len() < count as usize {
                        return None;
                    }
                    selected.extend(candidates[..count as usize].iter().map(|unit| unit.id()));
                }
                Some(selected)
            }
            Self::FirstFit => {
                let mut selected = Vec::new();
                for (kind, count) in demands {
                    let mut ordered: Vec<&ResourceUnit> = pool.iter().collect();
                    ordered.sort_by_key(|unit| unit.id());
                    let found: Vec<UnitId> = ordered
                        .into_iter()
                        .filter(|unit| unit.is_selectable() && unit.kind() == kind)
                        .take(count as usize)
                        .map(ResourceUnit::id)
                        .collect();
                    if found.len() < count as usize {
                        return None;
                    }
                    selected.extend(found);
                }
                Some(selected)
            }
            Self::TypedBulk => {
                let wanted: BTreeMap<&UnitKind, u32> = demands.into_iter().collect();
                let mut buckets: BTreeMap<&UnitKind, Vec<UnitId>> = BTreeMap::new();

                let mut ordered: Vec<&ResourceUnit> = pool.iter().collect();
                ordered.sort_by_key(|unit| unit.id());
                for unit in ordered {
                    let Some(&count) = wanted.get(unit.kind()) else {
                        continue;
                    };
                    let bucket = buckets.entry(unit.kind()).or_default();
                    if unit.is_selectable() && bucket.len() < count as usize {
                        bucket.push(unit.id());
                    }
                }

                // Every kind must be filled completely, otherwise nothing is taken
                for (kind, count) in &wanted {
                    if buckets.get(*kind).map_or(0, Vec::len) != *count as usize {
                        return None;
                    }
                }
                Some(buckets.into_values().flatten().collect())
            }
        }
    }
}
