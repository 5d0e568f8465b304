//! Implementation of the release protocol

use allot_core::{AllocError, CommitmentId, Config};
use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::ledger::{Commitment, Ledger};
use crate::pool::UnitPool;

/// Result of a permitted release
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ReleaseOutcome {
    /// The commitment was active and its units are free again
    Released,
    /// The commitment had been released before; nothing changed
    AlreadyReleased,
}

/// Decides whether a commitment may be released and returns its units
#[derive(Clone, Copy, Debug, Default)]
pub struct ReleaseProtocol {
    /// Minimum number of calendar days between release and target time
    min_lead_days: i64,
}

impl ReleaseProtocol {
    /// Create a new [`ReleaseProtocol`] with the given minimum lead time.
    pub fn new(min_lead_days: u32) -> Self {
        Self {
            min_lead_days: i64::from(min_lead_days),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.release_lead_days)
    }

    pub fn min_lead_days(&self) -> i64 {
        self.min_lead_days
    }

    /// Check the release window of `commitment` at `now`
    ///
    /// Lead time is counted in calendar days between `now` and the target
    /// time. Commitments without a target time (rides, parked vehicles) can
    /// always be released.
    pub fn check(&self, commitment: &Commitment, now: DateTime<Utc>) -> Result<(), AllocError> {
        let Some(target) = commitment.target_time() else {
            return Ok(());
        };
        let lead_days = (target.date_naive() - now.date_naive()).num_days();
        if lead_days < self.min_lead_days {
            return Err(AllocError::ReleaseTooLate {
                commitment: commitment.id(),
                lead_days,
                required_days: self.min_lead_days,
            });
        }
        Ok(())
    }

    /// Release commitment `id` at `now`.
    ///
    /// Releasing a commitment twice is not an error; the second call leaves the
    /// pool untouched.
    pub(crate) fn release(
        &self,
        pool: &mut UnitPool,
        ledger: &mut Ledger,
        id: CommitmentId,
        now: DateTime<Utc>,
    ) -> Result<ReleaseOutcome, AllocError> {
        let commitment = ledger.get(id)?;
        if !commitment.is_active() {
            debug!(commitment = %id, "commitment already released");
            return Ok(ReleaseOutcome::AlreadyReleased);
        }
        self.check(commitment, now)?;

        let units = commitment.units().to_vec();
        pool.vacate(&units)?;
        ledger.release(id, now)?;
        info!(commitment = %id, ?units, "commitment released");
        Ok(ReleaseOutcome::Released)
    }
}
