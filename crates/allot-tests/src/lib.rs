use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use allot_core::{CommitmentId, Config, PassMode, UnitKind, UnitSpec};
use allot_rocket::{
    AllocationEvent, AllocationPolicy, Commitment, Coordinator, FinalizeError, Finalizer,
};
use crossbeam::channel::Receiver;
use eyre::Result;
use parking_lot::Mutex;
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Kind used by the default test pool
pub const CAR: UnitKind = UnitKind::from_static("CAR");

/// Install a log subscriber honoring `RUST_LOG`
///
/// Safe to call from every test; only the first call has an effect.
pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Shared record of what a [`RecordingFinalizer`] saw
#[derive(Clone, Debug, Default)]
pub struct FinalizeLog {
    finalized: Arc<Mutex<Vec<CommitmentId>>>,
    fail: Arc<AtomicBool>,
}

impl FinalizeLog {
    /// Commitments finalized successfully, in order
    pub fn finalized(&self) -> Vec<CommitmentId> {
        self.finalized.lock().clone()
    }

    /// Make every following finalization fail (or succeed again)
    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }
}

/// Finalizer that records commitments and can be told to fail
#[derive(Clone, Debug, Default)]
pub struct RecordingFinalizer {
    log: FinalizeLog,
}

impl Finalizer for RecordingFinalizer {
    fn finalize(&mut self, commitment: &Commitment) -> Result<(), FinalizeError> {
        if self.log.fail.load(Ordering::SeqCst) {
            return Err(FinalizeError::new("finalizer switched to failing"));
        }
        self.log.finalized.lock().push(commitment.id());
        Ok(())
    }
}

pub struct TestCtxBuilder {
    /// Configuration of the coordinator
    pub config: Config,
    /// Selection policy
    pub policy: AllocationPolicy,
    /// Units making up the pool
    pub units: Vec<UnitSpec>,
    /// Whether the finalizer fails from the start
    pub failing_finalizer: bool,
}

impl TestCtxBuilder {
    /// Create a new test context builder initialized with environment defaults
    ///
    /// The default pool consists of four `CAR` units with ids 0 to 3, each
    /// located at the position equal to its id.
    pub fn from_env() -> Result<Self> {
        let config = Config::load()?;
        Ok(TestCtxBuilder {
            config,
            policy: AllocationPolicy::FirstFit,
            units: (0..4)
                .map(|id| UnitSpec::new(id, CAR).with_locality(i64::from(id)))
                .collect(),
            failing_finalizer: false,
        })
    }

    /// Replace the pool
    pub fn with_units(mut self, units: impl IntoIterator<Item = UnitSpec>) -> Self {
        self.units = units.into_iter().collect();
        self
    }

    /// Set the selection policy
    pub fn with_policy(mut self, policy: AllocationPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Set how a pass reacts to unsatisfiable requests
    pub fn with_pass_mode(mut self, pass_mode: PassMode) -> Self {
        self.config.pass_mode = pass_mode;
        self
    }

    /// Set the minimum release lead (in days)
    pub fn with_release_lead_days(mut self, days: u32) -> Self {
        self.config.release_lead_days = days;
        self
    }

    /// Let every finalization fail until switched back via [`FinalizeLog`]
    pub fn with_failing_finalizer(mut self) -> Self {
        self.failing_finalizer = true;
        self
    }

    /// Build the test context
    pub fn build(self) -> Result<TestCtx> {
        init_logging();

        let finalizer = RecordingFinalizer::default();
        let log = finalizer.log.clone();
        log.set_failing(self.failing_finalizer);

        debug!(
            units = self.units.len(),
            policy = ?self.policy,
            pass_mode = ?self.config.pass_mode,
            failing_finalizer = self.failing_finalizer,
            "building test context"
        );
        let mut coordinator = Coordinator::new(self.config, &self.units, self.policy, finalizer)?;
        let events = coordinator.subscribe();
        Ok(TestCtx {
            coordinator,
            log,
            events,
        })
    }
}

/// Test context
pub struct TestCtx {
    /// The coordinator under test
    pub coordinator: Coordinator<RecordingFinalizer>,
    /// What the finalizer saw
    pub log: FinalizeLog,
    /// Events emitted since the context was built
    pub events: Receiver<AllocationEvent>,
}

impl TestCtx {
    /// Drain all events emitted so far
    pub fn drain_events(&self) -> Vec<AllocationEvent> {
        self.events.try_iter().collect()
    }
}
