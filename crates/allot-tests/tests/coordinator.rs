use allot_core::{AllocError, PassMode, RequestId, UnitId, UnitStatus};
use allot_rocket::{AdminFacade, AllocationEvent, AllocationPolicy, QueryFacade};
use allot_tests::{TestCtxBuilder, CAR};
use chrono::Utc;
use eyre::Result;

mod util;

#[test]
#[ntest::timeout(10_000)]
fn submit_and_process_in_order() -> Result<()> {
    let mut ctx = TestCtxBuilder::from_env()?.build()?;

    let first = ctx.coordinator.submit(util::request(CAR, 1));
    let second = ctx.coordinator.submit(util::request(CAR, 2));
    assert_eq!(ctx.coordinator.num_pending(), 2);

    let a = ctx.coordinator.process_next()?;
    assert_eq!(a.request(), first, "Requests must be served in submission order.");
    assert_eq!(a.units(), &[UnitId(0)]);

    let b = ctx.coordinator.process_next()?;
    assert_eq!(b.request(), second);
    assert_eq!(b.units(), &[UnitId(1), UnitId(2)]);

    assert_eq!(ctx.coordinator.process_next(), Err(AllocError::QueueEmpty));
    assert_eq!(ctx.log.finalized(), vec![a.id(), b.id()]);
    assert_eq!(ctx.coordinator.unit_status(UnitId(1))?, UnitStatus::Occupied);
    assert_eq!(ctx.coordinator.unit_status(UnitId(3))?, UnitStatus::Free);
    util::assert_consistent(&ctx.coordinator);
    Ok(())
}

#[test]
#[ntest::timeout(10_000)]
fn disabled_unit_keeps_request_queued() -> Result<()> {
    let mut ctx = TestCtxBuilder::from_env()?
        .with_units([util::unit_at(0, CAR, 0)])
        .build()?;

    let id = ctx.coordinator.submit(util::request(CAR, 1));
    ctx.coordinator.disable_unit(UnitId(0))?;

    assert_eq!(
        ctx.coordinator.process_next(),
        Err(AllocError::NoMatchingUnit(id)),
        "A disabled unit must never be selected."
    );
    assert!(ctx.coordinator.is_pending(id));
    assert_eq!(ctx.coordinator.unit_status(UnitId(0))?, UnitStatus::Disabled);

    let report = ctx.coordinator.process_pass();
    assert!(report.committed.is_empty());
    assert_eq!(report.requeued, vec![id], "The request must be re-queued once per pass.");
    assert!(!report.made_progress());
    assert!(ctx.coordinator.is_pending(id));
    assert_eq!(ctx.coordinator.num_pending(), 1);

    ctx.coordinator.enable_unit(UnitId(0))?;
    let commitment = ctx.coordinator.process_next()?;
    assert_eq!(commitment.request(), id);
    Ok(())
}

#[test]
#[ntest::timeout(10_000)]
fn pass_stops_at_first_failure() -> Result<()> {
    let mut ctx = TestCtxBuilder::from_env()?
        .with_pass_mode(PassMode::StopAtFirstFailure)
        .build()?;

    let big = ctx.coordinator.submit(util::request(CAR, 5));
    let small = ctx.coordinator.submit(util::request(CAR, 1));

    let report = ctx.coordinator.process_pass();
    assert_eq!(report.requeued, vec![big]);
    assert!(
        report.committed.is_empty(),
        "The pass must end at the first unsatisfiable request."
    );
    // The big request moved behind the small one
    let pending: Vec<RequestId> = ctx.coordinator.pending().iter().map(|q| q.id).collect();
    assert_eq!(pending, vec![small, big]);

    let report = ctx.coordinator.process_pass();
    assert_eq!(report.committed.len(), 1);
    assert_eq!(report.committed[0].request(), small);
    assert_eq!(report.requeued, vec![big]);
    Ok(())
}

#[test]
#[ntest::timeout(10_000)]
fn pass_skips_and_continues() -> Result<()> {
    let mut ctx = TestCtxBuilder::from_env()?
        .with_pass_mode(PassMode::SkipAndContinue)
        .build()?;

    let a = ctx.coordinator.submit(util::request(CAR, 1));
    let big = ctx.coordinator.submit(util::request(CAR, 5));
    let b = ctx.coordinator.submit(util::request(CAR, 2));
    let c = ctx.coordinator.submit(util::request(CAR, 2));

    let report = ctx.coordinator.process_pass();
    let committed: Vec<RequestId> = report.committed.iter().map(|c| c.request()).collect();
    assert_eq!(committed, vec![a, b], "Every satisfiable request must be served.");
    assert_eq!(report.requeued, vec![big, c]);

    let pending: Vec<RequestId> = ctx.coordinator.pending().iter().map(|q| q.id).collect();
    assert_eq!(pending, vec![big, c]);

    // Nothing is free any more, the pass must still terminate
    let report = ctx.coordinator.process_pass();
    assert!(!report.made_progress());
    assert_eq!(report.requeued, vec![big, c]);
    util::assert_consistent(&ctx.coordinator);
    Ok(())
}

#[test]
#[ntest::timeout(10_000)]
fn failed_finalize_rolls_back() -> Result<()> {
    let mut ctx = TestCtxBuilder::from_env()?
        .with_failing_finalizer()
        .build()?;

    let id = ctx.coordinator.submit(util::request(CAR, 2));
    match ctx.coordinator.process_next() {
        Err(AllocError::FinalizeFailed { request, .. }) => assert_eq!(request, id),
        other => panic!("Finalizing must fail, got {other:?}"),
    }

    assert_eq!(
        ctx.coordinator.pool().num_available(),
        4,
        "The units of a rolled back allocation must be free again."
    );
    assert_eq!(ctx.coordinator.ledger().num_active(), 0);
    assert!(
        !ctx.coordinator.is_pending(id),
        "A request whose finalization failed must be dropped."
    );

    ctx.log.set_failing(false);
    ctx.coordinator.submit(util::request(CAR, 2));
    let commitment = ctx.coordinator.process_next()?;
    assert_eq!(commitment.units(), &[UnitId(0), UnitId(1)]);
    assert_eq!(ctx.log.finalized(), vec![commitment.id()]);
    util::assert_consistent(&ctx.coordinator);
    Ok(())
}

#[test]
#[ntest::timeout(10_000)]
fn finalize_failures_are_rejected_in_a_pass() -> Result<()> {
    let mut ctx = TestCtxBuilder::from_env()?
        .with_failing_finalizer()
        .build()?;

    let id = ctx.coordinator.submit(util::request(CAR, 1));
    let report = ctx.coordinator.process_pass();
    assert_eq!(report.rejected.len(), 1);
    assert_eq!(report.rejected[0].0, id);
    assert!(report.made_progress());
    assert_eq!(ctx.coordinator.num_pending(), 0);
    Ok(())
}

#[test]
#[ntest::timeout(10_000)]
fn abandon_removes_pending_request() -> Result<()> {
    let mut ctx = TestCtxBuilder::from_env()?.build()?;

    let id = ctx.coordinator.submit(util::request(CAR, 1));
    let request = ctx.coordinator.abandon(id)?;
    assert_eq!(request.requirement.total(), 1);
    assert!(!ctx.coordinator.is_pending(id));
    assert_eq!(
        ctx.coordinator.abandon(id),
        Err(AllocError::UnknownRequest(id)),
        "A request can only be abandoned once."
    );
    assert_eq!(ctx.coordinator.process_next(), Err(AllocError::QueueEmpty));
    Ok(())
}

#[test]
#[ntest::timeout(10_000)]
fn allocate_now_never_leaves_a_request_behind() -> Result<()> {
    let mut ctx = TestCtxBuilder::from_env()?
        .with_units([util::unit_at(0, CAR, 0)])
        .build()?;

    let queued = ctx.coordinator.submit(util::request(CAR, 1));
    let commitment = ctx.coordinator.allocate_now(util::request(CAR, 1))?;
    assert_ne!(commitment.request(), queued, "allocate_now must bypass the queue.");

    assert!(matches!(
        ctx.coordinator.allocate_now(util::request(CAR, 1)),
        Err(AllocError::NoMatchingUnit(_))
    ));
    let pending: Vec<RequestId> = ctx.coordinator.pending().iter().map(|q| q.id).collect();
    assert_eq!(pending, vec![queued]);
    Ok(())
}

#[test]
#[ntest::timeout(10_000)]
fn events_are_published() -> Result<()> {
    let mut ctx = TestCtxBuilder::from_env()?
        .with_units([util::unit_at(0, CAR, 0)])
        .build()?;

    let id = ctx.coordinator.submit(util::request(CAR, 1));
    let commitment = ctx.coordinator.process_next()?;
    ctx.coordinator.release(commitment.id(), Utc::now())?;
    ctx.coordinator.disable_unit(UnitId(0))?;

    let events = ctx.drain_events();
    assert!(matches!(events[0], AllocationEvent::Submitted { request, .. } if request == id));
    assert_eq!(
        events[1..],
        [
            AllocationEvent::Committed {
                request: id,
                commitment: commitment.id(),
                units: vec![UnitId(0)],
            },
            AllocationEvent::Released {
                commitment: commitment.id(),
                units: vec![UnitId(0)],
            },
            AllocationEvent::UnitDisabled { unit: UnitId(0) },
        ]
    );
    Ok(())
}

#[test]
#[ntest::timeout(10_000)]
fn unknown_ids_are_reported() -> Result<()> {
    let mut ctx = TestCtxBuilder::from_env()?
        .with_policy(AllocationPolicy::NearestMatch)
        .build()?;

    assert_eq!(
        ctx.coordinator.disable_unit(UnitId(42)),
        Err(AllocError::UnknownUnit(UnitId(42)))
    );
    assert!(matches!(
        ctx.coordinator.reposition(UnitId(42), 3),
        Err(AllocError::UnknownUnit(_))
    ));
    assert!(matches!(
        ctx.coordinator.commitment(allot_core::CommitmentId(9)),
        Err(AllocError::UnknownCommitment(_))
    ));
    Ok(())
}

#[test]
#[ntest::timeout(10_000)]
fn duplicate_units_are_refused() -> Result<()> {
    let result = TestCtxBuilder::from_env()?
        .with_units([util::unit_at(1, CAR, 0), util::unit_at(1, CAR, 4)])
        .build();
    assert!(result.is_err(), "A pool must not contain the same unit twice.");
    Ok(())
}

#[test]
#[ntest::timeout(10_000)]
fn disabling_keeps_the_commitment() -> Result<()> {
    let mut ctx = TestCtxBuilder::from_env()?.build()?;

    let commitment = ctx.coordinator.allocate_now(util::request(CAR, 1))?;
    let unit = commitment.units()[0];
    ctx.coordinator.disable_unit(unit)?;

    assert_eq!(ctx.coordinator.unit_status(unit)?, UnitStatus::Disabled);
    assert!(ctx.coordinator.active_commitment(unit).is_some());
    util::assert_consistent(&ctx.coordinator);

    ctx.coordinator.release(commitment.id(), Utc::now())?;
    ctx.coordinator.enable_unit(unit)?;
    assert_eq!(ctx.coordinator.unit_status(unit)?, UnitStatus::Free);
    Ok(())
}
