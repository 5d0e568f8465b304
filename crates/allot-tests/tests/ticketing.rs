use std::sync::Arc;

use allot_core::{AllocError, UnitId};
use allot_rocket::ReleaseOutcome;
use allot_scenarios::payment::{CashPayment, PaymentService};
use allot_scenarios::pricing::SeatPricing;
use allot_scenarios::ticketing::{
    BookingError, Stop, TicketBookingSystem, TicketStatus, Train, DELUXE, EXECUTIVE, STANDARD,
};
use chrono::{NaiveDate, NaiveTime};
use eyre::Result;
use parking_lot::Mutex;
use uuid::Uuid;

mod util;

/// Prepaid wallet shared by all users; declines when the balance is too low
#[derive(Clone)]
struct Wallet {
    balance: Arc<Mutex<u64>>,
}

impl Wallet {
    fn with_balance(balance: u64) -> Self {
        Self {
            balance: Arc::new(Mutex::new(balance)),
        }
    }
}

impl PaymentService for Wallet {
    fn process_payment(&mut self, _requester: Uuid, amount: u64) -> bool {
        let mut balance = self.balance.lock();
        if *balance < amount {
            return false;
        }
        *balance -= amount;
        true
    }
}

fn at(hour: u32, minute: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, minute, 0).unwrap()
}

fn express() -> Train {
    Train::new(
        101,
        "Express Northeast",
        vec![
            Stop::new("New York", 0, at(6, 0)),
            Stop::new("Philadelphia", 150, at(7, 30)),
            Stop::new("Washington DC", 350, at(9, 0)),
        ],
        [(STANDARD, 4), (DELUXE, 2), (EXECUTIVE, 1)],
    )
}

fn regional() -> Train {
    Train::new(
        102,
        "Regional Express",
        vec![
            Stop::new("Boston", 0, at(8, 0)),
            Stop::new("New York", 220, at(10, 30)),
            Stop::new("Philadelphia", 370, at(12, 0)),
            Stop::new("Washington DC", 570, at(14, 0)),
        ],
        [(STANDARD, 10)],
    )
}

fn system<P: PaymentService>(payment: P) -> Result<TicketBookingSystem<P>> {
    allot_tests::init_logging();
    let mut system = TicketBookingSystem::new(SeatPricing::standard(), payment);
    system.add_train(express())?;
    system.add_train(regional())?;
    Ok(system)
}

fn journey() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, 26).unwrap()
}

#[test]
#[ntest::timeout(10_000)]
fn search_follows_travel_direction() -> Result<()> {
    let system = system(CashPayment)?;

    let ids: Vec<u32> = system
        .search_trains("New York", "Washington DC")
        .iter()
        .map(|train| train.id)
        .collect();
    assert_eq!(ids, vec![101, 102]);

    let ids: Vec<u32> = system
        .search_trains("Boston", "Philadelphia")
        .iter()
        .map(|train| train.id)
        .collect();
    assert_eq!(ids, vec![102]);

    assert!(
        system.search_trains("Washington DC", "New York").is_empty(),
        "No train runs in the opposite direction."
    );
    assert!(system.search_trains("New York", "Chicago").is_empty());

    let express = express();
    assert_eq!(express.origin(), Some("New York"));
    assert_eq!(express.destination(), Some("Washington DC"));
    assert_eq!(express.distance("Philadelphia", "Washington DC"), Some(200));
    assert_eq!(express.distance("Washington DC", "Philadelphia"), None);
    Ok(())
}

#[test]
#[ntest::timeout(10_000)]
fn book_seats_of_several_classes() -> Result<()> {
    let wallet = Wallet::with_balance(10_000);
    let mut system = system(wallet.clone())?;
    let alice = system.add_user("Alice", "alice@example.com", "1234567890");

    let ticket = system.book_ticket(
        alice,
        101,
        "New York",
        "Washington DC",
        journey(),
        [(STANDARD, 2), (DELUXE, 1)],
    )?;
    // Two standard seats at 50, one deluxe seat at 200 + 2 * 350
    assert_eq!(ticket.price, 1_000);
    assert_eq!(*wallet.balance.lock(), 9_000);
    assert_eq!(ticket.status, TicketStatus::Booked);

    let mut seats = ticket.seats.clone();
    seats.sort();
    assert_eq!(seats, vec![UnitId(1), UnitId(2), UnitId(5)]);

    let available = system.available_seats(101)?;
    assert_eq!(available.get(&STANDARD), Some(&2));
    assert_eq!(available.get(&DELUXE), Some(&1));
    assert_eq!(available.get(&EXECUTIVE), Some(&1));

    assert_eq!(system.get_tickets(alice), vec![ticket]);
    Ok(())
}

#[test]
#[ntest::timeout(10_000)]
fn unavailable_seats_book_nothing() -> Result<()> {
    let wallet = Wallet::with_balance(10_000);
    let mut system = system(wallet.clone())?;
    let bob = system.add_user("Bob", "bob@example.com", "0987654321");

    let result = system.book_ticket(
        bob,
        101,
        "New York",
        "Philadelphia",
        journey(),
        [(STANDARD, 1), (EXECUTIVE, 2)],
    );
    assert!(matches!(result, Err(BookingError::SeatsUnavailable)));
    assert_eq!(
        system.available_seats(101)?.get(&STANDARD),
        Some(&4),
        "A failed booking must not hold any seat."
    );
    assert_eq!(*wallet.balance.lock(), 10_000, "A failed booking must not be charged.");
    assert!(system.get_tickets(bob).is_empty());
    Ok(())
}

#[test]
#[ntest::timeout(10_000)]
fn declined_payment_frees_the_seats() -> Result<()> {
    let mut system = system(Wallet::with_balance(100))?;
    let bob = system.add_user("Bob", "bob@example.com", "0987654321");

    let result = system.book_ticket(
        bob,
        101,
        "New York",
        "Washington DC",
        journey(),
        [(DELUXE, 1)],
    );
    assert!(matches!(result, Err(BookingError::PaymentFailed(_))));
    assert_eq!(system.available_seats(101)?.get(&DELUXE), Some(&2));

    // Two standard seats are affordable
    let ticket = system.book_ticket(
        bob,
        101,
        "New York",
        "Washington DC",
        journey(),
        [(STANDARD, 2)],
    )?;
    assert_eq!(ticket.price, 100);
    Ok(())
}

#[test]
#[ntest::timeout(10_000)]
fn cancel_in_time() -> Result<()> {
    let mut system = system(CashPayment)?;
    let alice = system.add_user("Alice", "alice@example.com", "1234567890");
    let ticket = system.book_ticket(
        alice,
        102,
        "Boston",
        "New York",
        journey(),
        [(STANDARD, 3)],
    )?;
    assert_eq!(system.available_seats(102)?.get(&STANDARD), Some(&7));

    let now = util::day(2026, 10, 16);
    assert_eq!(
        system.cancel_ticket(alice, ticket.id, now)?,
        ReleaseOutcome::Released
    );
    assert_eq!(system.available_seats(102)?.get(&STANDARD), Some(&10));
    assert_eq!(system.get_tickets(alice)[0].status, TicketStatus::Cancelled);

    assert_eq!(
        system.cancel_ticket(alice, ticket.id, now)?,
        ReleaseOutcome::AlreadyReleased,
        "Cancelling twice must not fail."
    );
    Ok(())
}

#[test]
#[ntest::timeout(10_000)]
fn cancel_too_late() -> Result<()> {
    let mut system = system(CashPayment)?;
    let alice = system.add_user("Alice", "alice@example.com", "1234567890");
    let date = NaiveDate::from_ymd_opt(2026, 10, 18).unwrap();
    let ticket = system.book_ticket(alice, 101, "New York", "Philadelphia", date, [(STANDARD, 1)])?;

    let result = system.cancel_ticket(alice, ticket.id, util::day(2026, 10, 16));
    assert!(
        matches!(
            result,
            Err(BookingError::Alloc(AllocError::ReleaseTooLate {
                lead_days: 2,
                required_days: 3,
                ..
            }))
        ),
        "Cancelling two days before the journey must be refused."
    );
    assert_eq!(system.get_tickets(alice)[0].status, TicketStatus::Booked);
    assert_eq!(system.available_seats(101)?.get(&STANDARD), Some(&3));
    Ok(())
}

#[test]
#[ntest::timeout(10_000)]
fn invalid_bookings_are_refused() -> Result<()> {
    let mut system = system(CashPayment)?;
    let alice = system.add_user("Alice", "alice@example.com", "1234567890");
    let bob = system.add_user("Bob", "bob@example.com", "0987654321");
    let seats = [(STANDARD, 1)];

    assert!(matches!(
        system.book_ticket(
            Uuid::new_v4(),
            101,
            "New York",
            "Philadelphia",
            journey(),
            seats.clone()
        ),
        Err(BookingError::UnknownUser(_))
    ));
    assert!(matches!(
        system.book_ticket(alice, 999, "New York", "Philadelphia", journey(), seats.clone()),
        Err(BookingError::UnknownTrain(999))
    ));
    assert!(matches!(
        system.book_ticket(alice, 101, "Philadelphia", "New York", journey(), seats.clone()),
        Err(BookingError::InvalidRoute { .. })
    ));
    assert!(matches!(
        system.add_train(express()),
        Err(BookingError::DuplicateTrain(101))
    ));

    let ticket = system.book_ticket(alice, 101, "New York", "Philadelphia", journey(), seats)?;
    assert!(
        matches!(
            system.cancel_ticket(bob, ticket.id, util::day(2026, 10, 16)),
            Err(BookingError::UnknownTicket(_))
        ),
        "Only the owner may cancel a ticket."
    );
    assert_eq!(system.user(alice).map(|user| user.name.as_str()), Some("Alice"));
    Ok(())
}
