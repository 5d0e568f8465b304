//! Pricing collaborators for parking and seat fares

use std::collections::HashMap;

use allot_core::{Requirement, UnitKind};
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::parking::{BIKE, CAR, TRUCK};
use crate::ticketing::{DELUXE, EXECUTIVE, STANDARD};

#[derive(Clone, PartialEq, Eq, Debug, Error)]
pub enum PricingError {
    #[error("no rate configured for {0}")]
    NoRate(UnitKind),
    #[error("price does not fit into a u64")]
    Overflow,
}

/// Parking fee per full hour, by spot kind
///
/// Stays shorter than an hour are charged as one hour.
#[derive(Clone, Debug)]
pub struct HourlyPricing {
    rates: HashMap<UnitKind, u64>,
}

impl HourlyPricing {
    pub fn new(rates: impl IntoIterator<Item = (UnitKind, u64)>) -> Self {
        Self {
            rates: rates.into_iter().collect(),
        }
    }

    /// Bike 20, car 50, truck 100 per hour
    pub fn standard() -> Self {
        Self::new([(BIKE, 20), (CAR, 50), (TRUCK, 100)])
    }

    pub fn calculate_fee(
        &self,
        entry_time: DateTime<Utc>,
        exit_time: DateTime<Utc>,
        kind: &UnitKind,
    ) -> Result<u64, PricingError> {
        let rate = self
            .rates
            .get(kind)
            .ok_or_else(|| PricingError::NoRate(kind.clone()))?;
        let hours = u64::try_from((exit_time - entry_time).num_hours().max(1))
            .map_err(|_| PricingError::Overflow)?;
        hours.checked_mul(*rate).ok_or(PricingError::Overflow)
    }
}

/// Fare of a single seat of some class
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct SeatFare {
    pub fixed_price: u64,
    pub price_per_km: u64,
}

/// Seat fares by seat class
#[derive(Clone, Debug)]
pub struct SeatPricing {
    fares: HashMap<UnitKind, SeatFare>,
}

impl SeatPricing {
    pub fn new(fares: impl IntoIterator<Item = (UnitKind, SeatFare)>) -> Self {
        Self {
            fares: fares.into_iter().collect(),
        }
    }

    /// Standard 50 + 0/km, deluxe 200 + 2/km, executive 500 + 5/km
    pub fn standard() -> Self {
        let fare = |fixed_price, price_per_km| SeatFare {
            fixed_price,
            price_per_km,
        };
        Self::new([
            (STANDARD, fare(50, 0)),
            (DELUXE, fare(200, 2)),
            (EXECUTIVE, fare(500, 5)),
        ])
    }

    pub fn set_fare(&mut self, kind: UnitKind, fare: SeatFare) {
        self.fares.insert(kind, fare);
    }

    /// Total price of all seats in `requirement` over `distance_km`
    pub fn quote(&self, distance_km: u64, requirement: &Requirement) -> Result<u64, PricingError> {
        let mut total: u64 = 0;
        for (kind, count) in requirement.demands() {
            let fare = self
                .fares
                .get(kind)
                .ok_or_else(|| PricingError::NoRate(kind.clone()))?;
            let seat = fare
                .price_per_km
                .checked_mul(distance_km)
                .and_then(|per_km| per_km.checked_add(fare.fixed_price))
                .and_then(|seat| seat.checked_mul(u64::from(count)))
                .ok_or(PricingError::Overflow)?;
            total = total.checked_add(seat).ok_or(PricingError::Overflow)?;
        }
        Ok(total)
    }
}
