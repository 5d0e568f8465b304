//! Elevator bank dispatching hall calls to the nearest idle car

use std::collections::HashMap;

use allot_core::{
    AllocError, AllocationRequest, CommitmentId, Config, RequestId, Requirement, TopologyProvider, UnitId,
    UnitKind, UnitSpec,
};
use allot_rocket::{AdminFacade, AllocationPolicy, Coordinator, NoopFinalizer};
use chrono::Utc;
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Kind of every elevator car
pub const ELEVATOR: UnitKind = UnitKind::from_static("ELEVATOR");

/// Maximum load of a car in kg
pub const MAX_LOAD: u32 = 680;

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Direction {
    Up,
    Down,
    Idle,
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum CarState {
    Idle,
    Maintenance,
}

/// What the display inside and above a car shows
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Display {
    pub floor: i64,
    pub direction: Direction,
    pub state: CarState,
}

/// Hall buttons on one floor
///
/// The ground floor has no down button and the top floor has no up button.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct HallPanel {
    up: Option<bool>,
    down: Option<bool>,
}

impl HallPanel {
    fn new(floor: u32, floors: u32) -> Self {
        Self {
            up: (floor + 1 < floors).then_some(false),
            down: (floor > 0).then_some(false),
        }
    }

    /// Whether the button for `direction` is lit, [`None`] if there is no
    /// such button
    pub fn is_pressed(&self, direction: Direction) -> Option<bool> {
        match direction {
            Direction::Up => self.up,
            Direction::Down => self.down,
            Direction::Idle => None,
        }
    }

    fn button(&mut self, direction: Direction) -> Option<&mut bool> {
        match direction {
            Direction::Up => self.up.as_mut(),
            Direction::Down => self.down.as_mut(),
            Direction::Idle => None,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum DoorState {
    Open,
    Closed,
}

#[derive(Error, Debug)]
pub enum ElevatorError {
    #[error(transparent)]
    Alloc(#[from] AllocError),
    #[error("floor {floor} does not exist in a building with {floors} floors")]
    FloorOutOfRange { floor: i64, floors: u32 },
    #[error("floor {floor} has no {direction:?} button")]
    NoButton { floor: i64, direction: Direction },
}

/// Building layout: number of floors and cars
#[derive(Clone, Copy, Debug)]
pub struct ElevatorTopology {
    pub floors: u32,
    pub cars: u32,
    pub max_load: u32,
}

impl ElevatorTopology {
    pub fn new(floors: u32, cars: u32) -> Self {
        Self {
            floors,
            cars,
            max_load: MAX_LOAD,
        }
    }
}

impl TopologyProvider for ElevatorTopology {
    fn units(&self) -> Vec<UnitSpec> {
        (0..self.cars)
            .map(|car| {
                UnitSpec::new(car, ELEVATOR)
                    .with_locality(0)
                    .with_capacity(self.max_load)
            })
            .collect()
    }
}

/// A car that was sent to answer a hall call
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Dispatch {
    pub car: UnitId,
    pub floor: i64,
}

#[derive(Clone, Copy, Debug)]
struct HallCall {
    floor: i64,
    direction: Direction,
}

#[derive(Clone, Copy, Debug)]
struct Car {
    door: DoorState,
    direction: Direction,
    state: CarState,
}

/// Elevator system of one building
pub struct ElevatorBank {
    coordinator: Coordinator<NoopFinalizer>,
    floors: u32,
    hall: Vec<HallPanel>,
    cars: HashMap<UnitId, Car>,
    /// Hall calls waiting for a car
    calls: HashMap<RequestId, HallCall>,
}

impl ElevatorBank {
    /// Create a new [`ElevatorBank`]; cars start idle on the ground floor
    pub fn new(config: Config, topology: ElevatorTopology) -> Result<Self, ElevatorError> {
        let coordinator = Coordinator::new(
            config,
            &topology,
            AllocationPolicy::NearestMatch,
            NoopFinalizer,
        )?;
        let cars = (0..topology.cars)
            .map(|car| {
                let state = Car {
                    door: DoorState::Closed,
                    direction: Direction::Idle,
                    state: CarState::Idle,
                };
                (UnitId(car), state)
            })
            .collect();
        Ok(Self {
            coordinator,
            floors: topology.floors,
            hall: (0..topology.floors)
                .map(|floor| HallPanel::new(floor, topology.floors))
                .collect(),
            cars,
            calls: HashMap::new(),
        })
    }

    pub fn coordinator(&self) -> &Coordinator<NoopFinalizer> {
        &self.coordinator
    }

    fn check_floor(&self, floor: i64) -> Result<usize, ElevatorError> {
        usize::try_from(floor)
            .ok()
            .filter(|floor| *floor < self.hall.len())
            .ok_or(ElevatorError::FloorOutOfRange {
                floor,
                floors: self.floors,
            })
    }

    fn car(&mut self, id: UnitId) -> Result<&mut Car, ElevatorError> {
        self.cars
            .get_mut(&id)
            .ok_or(ElevatorError::Alloc(AllocError::UnknownUnit(id)))
    }

    /// Press a hall button; the call waits until the next [`Self::dispatch()`]
    pub fn call_elevator(
        &mut self,
        floor: i64,
        direction: Direction,
    ) -> Result<RequestId, ElevatorError> {
        let index = self.check_floor(floor)?;
        let Some(button) = self.hall[index].button(direction) else {
            return Err(ElevatorError::NoButton { floor, direction });
        };
        *button = true;

        let request = AllocationRequest::new(Uuid::new_v4(), Requirement::single(ELEVATOR))
            .with_locality(floor);
        let id = self.coordinator.submit(request);
        self.calls.insert(id, HallCall { floor, direction });
        info!(floor, ?direction, request = %id, "hall button pressed, request queued");
        Ok(id)
    }

    /// Send idle cars to waiting hall calls, one call at a time
    ///
    /// Each dispatched car travels to the calling floor, the hall button is
    /// reset, the door opens and the ride is complete before the next call is
    /// served, so a car can answer several calls in one dispatch. Dispatching
    /// stops at the first call without an available car; that call and the
    /// ones behind it stay queued.
    pub fn dispatch(&mut self) -> Result<Vec<Dispatch>, ElevatorError> {
        let mut dispatched = Vec::new();
        for _ in 0..self.coordinator.num_pending() {
            let commitment = match self.coordinator.process_next() {
                Ok(commitment) => commitment,
                Err(AllocError::NoMatchingUnit(id)) => {
                    debug!(request = %id, "no available car, call stays queued");
                    break;
                }
                Err(AllocError::QueueEmpty) => break,
                Err(err) => {
                    warn!(%err, "hall call could not be served");
                    return Err(err.into());
                }
            };
            let Some(call) = self.calls.remove(&commitment.request()) else {
                continue;
            };
            let car = commitment.units()[0];
            info!(%car, floor = call.floor, "dispatching car");

            self.move_car(car, call.floor)?;
            let index = self.check_floor(call.floor)?;
            if let Some(button) = self.hall[index].button(call.direction) {
                *button = false;
            }
            self.car(car)?.door = DoorState::Open;
            self.end_ride(commitment.id())?;

            dispatched.push(Dispatch {
                car,
                floor: call.floor,
            });
        }
        Ok(dispatched)
    }

    /// Release a finished ride and drop it from the books
    fn end_ride(&mut self, ride: CommitmentId) -> Result<(), ElevatorError> {
        self.coordinator.release(ride, Utc::now())?;
        self.coordinator.forget(ride)?;
        Ok(())
    }

    fn move_car(&mut self, id: UnitId, floor: i64) -> Result<(), ElevatorError> {
        let from = self.coordinator.unit(id)?.locality().unwrap_or(0);
        let heading = match floor.cmp(&from) {
            std::cmp::Ordering::Greater => Direction::Up,
            std::cmp::Ordering::Less => Direction::Down,
            std::cmp::Ordering::Equal => Direction::Idle,
        };
        self.coordinator.reposition(id, floor)?;

        let car = self.car(id)?;
        car.direction = Direction::Idle;
        car.state = CarState::Idle;
        debug!(car = %id, from, to = floor, ?heading, "car arrived");
        Ok(())
    }

    /// A passenger inside `car` pressed the button for `floor`
    ///
    /// Cars in maintenance or overloaded refuse to move; the door stays as it
    /// is in that case.
    pub fn select_floor(&mut self, car: UnitId, floor: i64) -> Result<(), ElevatorError> {
        self.check_floor(floor)?;
        let unit = self.coordinator.unit(car)?;
        if unit.is_disabled() {
            return Err(AllocError::UnitDisabled(car).into());
        }
        if unit.is_overloaded() {
            return Err(AllocError::UnitOverloaded(car).into());
        }

        self.car(car)?.door = DoorState::Closed;
        self.move_car(car, floor)?;
        self.car(car)?.door = DoorState::Open;
        Ok(())
    }

    pub fn enter_maintenance(&mut self, car: UnitId) -> Result<(), ElevatorError> {
        self.coordinator.disable_unit(car)?;
        let car = self.car(car)?;
        car.state = CarState::Maintenance;
        car.door = DoorState::Closed;
        Ok(())
    }

    pub fn exit_maintenance(&mut self, car: UnitId) -> Result<(), ElevatorError> {
        self.coordinator.enable_unit(car)?;
        self.car(car)?.state = CarState::Idle;
        Ok(())
    }

    /// Passengers entering; returns whether the car is overloaded now
    pub fn add_load(&mut self, car: UnitId, kg: u32) -> Result<bool, ElevatorError> {
        Ok(self.coordinator.add_load(car, kg)?)
    }

    /// Passengers leaving; returns whether the car is still overloaded
    pub fn remove_load(&mut self, car: UnitId, kg: u32) -> Result<bool, ElevatorError> {
        Ok(self.coordinator.remove_load(car, kg)?)
    }

    /// Stop a car where it is, end its ride and close the door
    pub fn emergency_stop(&mut self, car: UnitId) -> Result<(), ElevatorError> {
        if let Some(ride) = self.coordinator.active_commitment(car).map(|c| c.id()) {
            self.end_ride(ride)?;
        }
        let state = self.car(car)?;
        state.door = DoorState::Closed;
        if state.state != CarState::Maintenance {
            state.state = CarState::Idle;
        }
        state.direction = Direction::Idle;
        warn!(%car, "emergency stop, doors closed");
        Ok(())
    }

    pub fn display(&self, car: UnitId) -> Result<Display, ElevatorError> {
        let unit = self.coordinator.unit(car)?;
        let state = self
            .cars
            .get(&car)
            .ok_or(AllocError::UnknownUnit(car))?;
        Ok(Display {
            floor: unit.locality().unwrap_or(0),
            direction: state.direction,
            state: state.state,
        })
    }

    pub fn door(&self, car: UnitId) -> Result<DoorState, ElevatorError> {
        Ok(self
            .cars
            .get(&car)
            .ok_or(AllocError::UnknownUnit(car))?
            .door)
    }

    pub fn hall_panel(&self, floor: i64) -> Result<HallPanel, ElevatorError> {
        Ok(self.hall[self.check_floor(floor)?])
    }

    /// Hall calls still waiting for a car
    pub fn pending_calls(&self) -> usize {
        self.coordinator.num_pending()
    }
}
