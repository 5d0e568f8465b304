use allot_core::{AllocError, UnitId, UnitSpec};
use allot_rocket::{AdminFacade, AllocationEvent, AllocationPolicy};
use allot_tests::{TestCtxBuilder, CAR};
use eyre::Result;

mod util;

fn cars_with_capacity() -> Vec<UnitSpec> {
    (0..2)
        .map(|id| util::unit_at(id, CAR, 0).with_capacity(100))
        .collect()
}

#[test]
#[ntest::timeout(10_000)]
fn overloaded_unit_is_not_selected() -> Result<()> {
    let mut ctx = TestCtxBuilder::from_env()?
        .with_policy(AllocationPolicy::NearestMatch)
        .with_units(cars_with_capacity())
        .build()?;

    assert!(!ctx.coordinator.add_load(UnitId(0), 100)?);
    assert!(
        ctx.coordinator.add_load(UnitId(0), 1)?,
        "Exceeding the capacity must overload the unit."
    );

    let commitment = ctx.coordinator.allocate_now(util::request(CAR, 1).with_locality(0))?;
    assert_eq!(commitment.units(), &[UnitId(1)]);
    assert!(matches!(
        ctx.coordinator.allocate_now(util::request(CAR, 1)),
        Err(AllocError::NoMatchingUnit(_))
    ));
    Ok(())
}

#[test]
#[ntest::timeout(10_000)]
fn overloaded_unit_refuses_to_move_until_cleared() -> Result<()> {
    let mut ctx = TestCtxBuilder::from_env()?
        .with_units(cars_with_capacity())
        .build()?;

    ctx.coordinator.add_load(UnitId(0), 150)?;
    assert_eq!(
        ctx.coordinator.reposition(UnitId(0), 4),
        Err(AllocError::UnitOverloaded(UnitId(0)))
    );
    assert_eq!(ctx.coordinator.unit(UnitId(0))?.locality(), Some(0));

    assert!(
        ctx.coordinator.remove_load(UnitId(0), 20)?,
        "130 kg is still too much for a capacity of 100."
    );
    assert!(!ctx.coordinator.remove_load(UnitId(0), 30)?);
    ctx.coordinator.reposition(UnitId(0), 4)?;
    assert_eq!(ctx.coordinator.unit(UnitId(0))?.locality(), Some(4));

    let events = ctx.drain_events();
    assert_eq!(
        events,
        vec![
            AllocationEvent::Overloaded {
                unit: UnitId(0),
                load: 150
            },
            AllocationEvent::OverloadCleared {
                unit: UnitId(0),
                load: 100
            },
            AllocationEvent::Repositioned {
                unit: UnitId(0),
                locality: 4
            },
        ]
    );
    Ok(())
}

#[test]
#[ntest::timeout(10_000)]
fn units_without_capacity_never_overload() -> Result<()> {
    let mut ctx = TestCtxBuilder::from_env()?.build()?;

    assert!(!ctx.coordinator.add_load(UnitId(0), u32::MAX)?);
    assert!(ctx.coordinator.unit(UnitId(0))?.is_selectable());
    Ok(())
}

#[test]
#[ntest::timeout(10_000)]
fn disabled_unit_refuses_to_move() -> Result<()> {
    let mut ctx = TestCtxBuilder::from_env()?
        .with_units(cars_with_capacity())
        .build()?;

    ctx.coordinator.disable_unit(UnitId(1))?;
    ctx.drain_events();

    assert_eq!(
        ctx.coordinator.reposition(UnitId(1), 6),
        Err(AllocError::UnitDisabled(UnitId(1)))
    );
    assert_eq!(
        ctx.coordinator.unit(UnitId(1))?.locality(),
        Some(0),
        "A refused move must leave the unit where it is."
    );
    assert!(
        ctx.drain_events().is_empty(),
        "A refused move must not be announced."
    );

    ctx.coordinator.enable_unit(UnitId(1))?;
    ctx.coordinator.reposition(UnitId(1), 6)?;
    assert_eq!(ctx.coordinator.unit(UnitId(1))?.locality(), Some(6));
    Ok(())
}
