//! Parking lot with entrance and exit gates

use std::sync::Arc;

use allot_core::{
    AllocError, AllocationRequest, CommitmentId, Config, Requirement, TopologyProvider, UnitId,
    UnitKind, UnitSpec,
};
use allot_rocket::{AllocationPolicy, Desk, NoopFinalizer, QueryFacade, ReleaseOutcome};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use crate::payment::PaymentService;
use crate::pricing::{HourlyPricing, PricingError};

pub const BIKE: UnitKind = UnitKind::from_static("BIKE");
pub const CAR: UnitKind = UnitKind::from_static("CAR");
pub const TRUCK: UnitKind = UnitKind::from_static("TRUCK");

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Vehicle {
    pub number: String,
    pub kind: UnitKind,
}

impl Vehicle {
    pub fn new(number: impl Into<String>, kind: UnitKind) -> Self {
        Self {
            number: number.into(),
            kind,
        }
    }
}

/// Kind of spot a vehicle needs
///
/// Bikes park in compact (`BIKE`) spots, cars in regular (`CAR`) spots and
/// trucks in large (`TRUCK`) spots.
pub fn spot_kind_for(vehicle: &UnitKind) -> UnitKind {
    vehicle.clone()
}

/// Spot `id` of the given kind
pub fn spot(id: u32, kind: UnitKind) -> UnitSpec {
    UnitSpec::new(id, kind)
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct ParkingTicket {
    pub commitment: CommitmentId,
    pub holder: Uuid,
    pub vehicle: Vehicle,
    pub spot: UnitId,
    pub spot_kind: UnitKind,
    pub entry_time: DateTime<Utc>,
}

/// What the exit gate hands out
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct ExitReceipt {
    pub spot: UnitId,
    pub fee: u64,
    pub outcome: ReleaseOutcome,
}

#[derive(Error, Debug)]
pub enum ParkingError {
    #[error(transparent)]
    Alloc(#[from] AllocError),
    #[error(transparent)]
    Pricing(#[from] PricingError),
    #[error("payment of {amount} declined")]
    PaymentDeclined { amount: u64 },
}

/// A parking lot; hand out gates with [`Self::entrance()`] and
/// [`Self::exit_gate()`]
pub struct ParkingLot<P> {
    desk: Desk<NoopFinalizer>,
    pricing: Arc<HourlyPricing>,
    payment: Arc<Mutex<P>>,
}

impl<P: PaymentService> ParkingLot<P> {
    /// Open a lot with the spots supplied by `spots`
    pub fn open<T: TopologyProvider + ?Sized>(
        config: &Config,
        spots: &T,
        pricing: HourlyPricing,
        payment: P,
    ) -> Result<Self, ParkingError> {
        let desk = allot_rocket::launch(config, spots, AllocationPolicy::FirstFit, NoopFinalizer)?;
        Ok(Self {
            desk,
            pricing: Arc::new(pricing),
            payment: Arc::new(Mutex::new(payment)),
        })
    }

    pub fn entrance(&self) -> EntranceGate {
        EntranceGate {
            desk: self.desk.clone(),
        }
    }

    pub fn exit_gate(&self) -> ExitGate<P> {
        ExitGate {
            desk: self.desk.clone(),
            pricing: self.pricing.clone(),
            payment: self.payment.clone(),
        }
    }

    pub fn desk(&self) -> &Desk<NoopFinalizer> {
        &self.desk
    }

    /// Number of free spots of `kind`
    pub fn free_spots(&self, kind: &UnitKind) -> usize {
        self.desk
            .list_units()
            .iter()
            .filter(|unit| unit.kind() == kind && unit.is_selectable())
            .count()
    }
}

pub struct EntranceGate {
    desk: Desk<NoopFinalizer>,
}

impl EntranceGate {
    /// Park `vehicle` in the first free spot of the matching kind
    pub fn enter(
        &self,
        vehicle: Vehicle,
        now: DateTime<Utc>,
    ) -> Result<ParkingTicket, ParkingError> {
        let holder = Uuid::new_v4();
        let spot_kind = spot_kind_for(&vehicle.kind);
        let request =
            AllocationRequest::new(holder, Requirement::single(spot_kind.clone())).created_at(now);
        let commitment = self.desk.allocate_now(request)?;
        let spot = commitment.units()[0];
        info!(vehicle = %vehicle.number, %spot, "vehicle parked");

        Ok(ParkingTicket {
            commitment: commitment.id(),
            holder,
            vehicle,
            spot,
            spot_kind,
            entry_time: now,
        })
    }
}

pub struct ExitGate<P> {
    desk: Desk<NoopFinalizer>,
    pricing: Arc<HourlyPricing>,
    payment: Arc<Mutex<P>>,
}

impl<P: PaymentService> ExitGate<P> {
    /// Charge the parking fee and free the spot
    ///
    /// The spot is only freed once the payment went through. Presenting a
    /// ticket a second time costs nothing and changes nothing. The whole
    /// sequence holds the desk, so two gates presenting the same ticket at
    /// once charge it only once.
    pub fn exit(
        &self,
        ticket: &ParkingTicket,
        now: DateTime<Utc>,
    ) -> Result<ExitReceipt, ParkingError> {
        self.desk.with(|coordinator| -> Result<ExitReceipt, ParkingError> {
            if !coordinator.commitment(ticket.commitment)?.is_active() {
                return Ok(ExitReceipt {
                    spot: ticket.spot,
                    fee: 0,
                    outcome: ReleaseOutcome::AlreadyReleased,
                });
            }

            let fee = self
                .pricing
                .calculate_fee(ticket.entry_time, now, &ticket.spot_kind)?;
            if !self.payment.lock().process_payment(ticket.holder, fee) {
                return Err(ParkingError::PaymentDeclined { amount: fee });
            }

            let outcome = coordinator.release(ticket.commitment, now)?;
            info!(vehicle = %ticket.vehicle.number, spot = %ticket.spot, fee, "vehicle left");
            Ok(ExitReceipt {
                spot: ticket.spot,
                fee,
                outcome,
            })
        })
    }
}
