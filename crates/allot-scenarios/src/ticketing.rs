//! Train ticket booking

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use allot_core::{
    AllocError, AllocationRequest, CommitmentId, Config, PassMode, Requirement, TopologyProvider,
    UnitId, UnitKind, UnitSpec,
};
use allot_rocket::{AllocationPolicy, CommitmentStatus, Coordinator, QueryFacade, ReleaseOutcome};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use parking_lot::Mutex;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::payment::{PaymentFinalizer, PaymentService};
use crate::pricing::{PricingError, SeatPricing};

pub const STANDARD: UnitKind = UnitKind::from_static("Standard");
pub const DELUXE: UnitKind = UnitKind::from_static("Deluxe");
pub const EXECUTIVE: UnitKind = UnitKind::from_static("Executive");

/// Tickets can be cancelled up to this many days before the journey
pub const CANCELLATION_LEAD_DAYS: u32 = 3;

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: String,
}

/// A station on a train's route
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Stop {
    pub station: String,
    /// Distance from the first station
    pub distance_km: u64,
    pub time: NaiveTime,
}

impl Stop {
    pub fn new(station: impl Into<String>, distance_km: u64, time: NaiveTime) -> Self {
        Self {
            station: station.into(),
            distance_km,
            time,
        }
    }
}

/// A train running on all days of the week
#[derive(Clone, Debug)]
pub struct Train {
    pub id: u32,
    pub name: String,
    schedule: Vec<Stop>,
    seats: Vec<UnitSpec>,
}

impl Train {
    /// Create a new [`Train`]; seats are numbered from 1 in the order given
    pub fn new(
        id: u32,
        name: impl Into<String>,
        schedule: Vec<Stop>,
        seats: impl IntoIterator<Item = (UnitKind, u32)>,
    ) -> Self {
        let mut specs = Vec::new();
        for (kind, count) in seats {
            for _ in 0..count {
                specs.push(UnitSpec::new(specs.len() as u32 + 1, kind.clone()));
            }
        }
        Self {
            id,
            name: name.into(),
            schedule,
            seats: specs,
        }
    }

    pub fn schedule(&self) -> &[Stop] {
        &self.schedule
    }

    pub fn origin(&self) -> Option<&str> {
        self.schedule.first().map(|stop| stop.station.as_str())
    }

    pub fn destination(&self) -> Option<&str> {
        self.schedule.last().map(|stop| stop.station.as_str())
    }

    fn stop(&self, station: &str) -> Option<&Stop> {
        self.schedule.iter().find(|stop| stop.station == station)
    }

    /// Whether the train travels from `origin` to `destination`
    pub fn serves(&self, origin: &str, destination: &str) -> bool {
        match (self.stop(origin), self.stop(destination)) {
            (Some(from), Some(to)) => from.distance_km < to.distance_km,
            _ => false,
        }
    }

    /// Distance between two stations in travel direction
    pub fn distance(&self, origin: &str, destination: &str) -> Option<u64> {
        if !self.serves(origin, destination) {
            return None;
        }
        Some(self.stop(destination)?.distance_km - self.stop(origin)?.distance_km)
    }
}

impl TopologyProvider for Train {
    fn units(&self) -> Vec<UnitSpec> {
        self.seats.clone()
    }
}

/// Identity of a ticket across all trains
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct TicketId(pub u64);

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum TicketStatus {
    Booked,
    Cancelled,
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Ticket {
    pub id: TicketId,
    pub user: Uuid,
    pub train: u32,
    pub origin: String,
    pub destination: String,
    pub date_of_journey: NaiveDate,
    pub seats: Vec<UnitId>,
    pub price: u64,
    pub status: TicketStatus,
}

#[derive(Error, Debug)]
pub enum BookingError {
    #[error(transparent)]
    Alloc(#[from] AllocError),
    #[error(transparent)]
    Pricing(#[from] PricingError),
    #[error("unknown user {0}")]
    UnknownUser(Uuid),
    #[error("unknown train {0}")]
    UnknownTrain(u32),
    #[error("train {0} already exists")]
    DuplicateTrain(u32),
    #[error("train {train} does not run from {origin} to {destination}")]
    InvalidRoute {
        train: u32,
        origin: String,
        destination: String,
    },
    #[error("unknown ticket {0:?}")]
    UnknownTicket(TicketId),
    #[error("seats are not available")]
    SeatsUnavailable,
    #[error("payment failed: {0}")]
    PaymentFailed(String),
}

type SeatCoordinator<P> = Coordinator<PaymentFinalizer<Arc<Mutex<P>>>>;

struct TrainDesk<P> {
    train: Train,
    coordinator: SeatCoordinator<P>,
}

struct TicketRecord {
    ticket: Ticket,
    commitment: CommitmentId,
}

/// Ticket booking for a set of trains
pub struct TicketBookingSystem<P> {
    config: Config,
    users: HashMap<Uuid, User>,
    trains: BTreeMap<u32, TrainDesk<P>>,
    tickets: BTreeMap<TicketId, TicketRecord>,
    pricing: SeatPricing,
    payment: Arc<Mutex<P>>,
    next_ticket: u64,
}

impl<P: PaymentService> TicketBookingSystem<P> {
    /// Create a new [`TicketBookingSystem`] with a three day cancellation window
    pub fn new(pricing: SeatPricing, payment: P) -> Self {
        let config = Config {
            pass_mode: PassMode::StopAtFirstFailure,
            release_lead_days: CANCELLATION_LEAD_DAYS,
        };
        Self::with_config(config, pricing, payment)
    }

    pub fn with_config(config: Config, pricing: SeatPricing, payment: P) -> Self {
        Self {
            config,
            users: HashMap::new(),
            trains: BTreeMap::new(),
            tickets: BTreeMap::new(),
            pricing,
            payment: Arc::new(Mutex::new(payment)),
            next_ticket: 1,
        }
    }

    pub fn add_user(
        &mut self,
        name: impl Into<String>,
        email: impl Into<String>,
        phone: impl Into<String>,
    ) -> Uuid {
        let user = User {
            id: Uuid::new_v4(),
            name: name.into(),
            email: email.into(),
            phone: phone.into(),
        };
        let id = user.id;
        info!(user = %id, name = %user.name, "user added");
        self.users.insert(id, user);
        id
    }

    pub fn user(&self, id: Uuid) -> Option<&User> {
        self.users.get(&id)
    }

    pub fn add_train(&mut self, train: Train) -> Result<(), BookingError> {
        if self.trains.contains_key(&train.id) {
            return Err(BookingError::DuplicateTrain(train.id));
        }
        let coordinator = Coordinator::new(
            self.config,
            &train,
            AllocationPolicy::TypedBulk,
            PaymentFinalizer::new(self.payment.clone()),
        )?;
        info!(train = train.id, name = %train.name, seats = train.seats.len(), "train added");
        self.trains.insert(train.id, TrainDesk { train, coordinator });
        Ok(())
    }

    /// Trains running from `origin` to `destination`, by train id
    pub fn search_trains(&self, origin: &str, destination: &str) -> Vec<&Train> {
        self.trains
            .values()
            .map(|desk| &desk.train)
            .filter(|train| train.serves(origin, destination))
            .collect()
    }

    /// Number of free seats per class on a train
    pub fn available_seats(&self, train: u32) -> Result<BTreeMap<UnitKind, usize>, BookingError> {
        let desk = self
            .trains
            .get(&train)
            .ok_or(BookingError::UnknownTrain(train))?;
        let mut seats = BTreeMap::new();
        for unit in desk.coordinator.list_units() {
            if unit.is_selectable() {
                *seats.entry(unit.kind().clone()).or_insert(0) += 1;
            }
        }
        Ok(seats)
    }

    /// Book seats on a train and charge the fare
    ///
    /// Either every requested seat is booked and paid for, or nothing is.
    pub fn book_ticket(
        &mut self,
        user: Uuid,
        train: u32,
        origin: &str,
        destination: &str,
        date_of_journey: NaiveDate,
        seats: impl IntoIterator<Item = (UnitKind, u32)>,
    ) -> Result<Ticket, BookingError> {
        if !self.users.contains_key(&user) {
            return Err(BookingError::UnknownUser(user));
        }
        let desk = self
            .trains
            .get_mut(&train)
            .ok_or(BookingError::UnknownTrain(train))?;
        let distance = desk.train.distance(origin, destination).ok_or_else(|| {
            BookingError::InvalidRoute {
                train,
                origin: origin.into(),
                destination: destination.into(),
            }
        })?;

        let requirement = Requirement::bulk(seats);
        let price = self.pricing.quote(distance, &requirement)?;
        let request = AllocationRequest::new(user, requirement)
            .with_target_time(journey_start(date_of_journey))
            .with_cost(price);

        let commitment = match desk.coordinator.allocate_now(request) {
            Ok(commitment) => commitment,
            Err(AllocError::NoMatchingUnit(_)) => {
                warn!(%user, train, "seats are not available, booking failed");
                return Err(BookingError::SeatsUnavailable);
            }
            Err(AllocError::FinalizeFailed { reason, .. }) => {
                warn!(%user, train, %reason, "payment failed, booking failed");
                return Err(BookingError::PaymentFailed(reason));
            }
            Err(err) => return Err(err.into()),
        };

        let id = TicketId(self.next_ticket);
        self.next_ticket += 1;
        let ticket = Ticket {
            id,
            user,
            train,
            origin: origin.into(),
            destination: destination.into(),
            date_of_journey,
            seats: commitment.units().to_vec(),
            price,
            status: TicketStatus::Booked,
        };
        info!(ticket = id.0, %user, train, price, "ticket booked");
        self.tickets.insert(
            id,
            TicketRecord {
                ticket: ticket.clone(),
                commitment: commitment.id(),
            },
        );
        Ok(ticket)
    }

    fn status_of(&self, record: &TicketRecord) -> TicketStatus {
        let released = self
            .trains
            .get(&record.ticket.train)
            .and_then(|desk| desk.coordinator.commitment(record.commitment).ok())
            .is_some_and(|commitment| commitment.status() == CommitmentStatus::Released);
        if released {
            TicketStatus::Cancelled
        } else {
            TicketStatus::Booked
        }
    }

    /// All tickets of a user, in booking order
    pub fn get_tickets(&self, user: Uuid) -> Vec<Ticket> {
        self.tickets
            .values()
            .filter(|record| record.ticket.user == user)
            .map(|record| Ticket {
                status: self.status_of(record),
                ..record.ticket.clone()
            })
            .collect()
    }

    /// Cancel a ticket and free its seats
    ///
    /// Refused with [`AllocError::ReleaseTooLate`] when the journey is less
    /// than the cancellation window away. Cancelling twice is fine.
    pub fn cancel_ticket(
        &mut self,
        user: Uuid,
        ticket: TicketId,
        now: DateTime<Utc>,
    ) -> Result<ReleaseOutcome, BookingError> {
        let record = self
            .tickets
            .get(&ticket)
            .filter(|record| record.ticket.user == user)
            .ok_or(BookingError::UnknownTicket(ticket))?;
        let desk = self
            .trains
            .get_mut(&record.ticket.train)
            .ok_or(BookingError::UnknownTrain(record.ticket.train))?;

        let outcome = desk.coordinator.release(record.commitment, now)?;
        if outcome == ReleaseOutcome::Released {
            info!(ticket = ticket.0, %user, "ticket cancelled");
        }
        Ok(outcome)
    }
}

/// Midnight (UTC) of the day of journey
fn journey_start(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}
