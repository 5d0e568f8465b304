//! :rocket: Implementation of the resource allocation core.
//!
//! The components are the [unit pool][pool], the [selection policies][policy],
//! the [request queue][queue], the [ledger] of commitments, the
//! [release protocol][release] and the [coordinator] tying them together. The
//! [desk] shares one coordinator between several collaborators.
//!
//! Requests flow from [`Coordinator::submit()`] through the queue to
//! [`Coordinator::process_next()`], which asks the policy for units, commits
//! them and runs the [`Finalizer`].

use allot_core::{AllocError, Config, TopologyProvider};

pub mod coordinator;
pub mod desk;
pub mod events;
pub mod facade;
pub mod ledger;
pub mod policy;
pub mod pool;
pub mod queue;
pub mod release;
pub mod unit;

pub use coordinator::{Coordinator, PassReport};
pub use desk::Desk;
pub use events::AllocationEvent;
pub use facade::{AdminFacade, FinalizeError, Finalizer, NoopFinalizer, QueryFacade};
pub use ledger::{Commitment, CommitmentStatus, Ledger};
pub use policy::AllocationPolicy;
pub use pool::UnitPool;
pub use queue::{QueuedRequest, RequestQueue};
pub use release::{ReleaseOutcome, ReleaseProtocol};
pub use unit::ResourceUnit;

/// Entrypoint of the allocation core
///
/// Builds the pool from `topology` and returns a [`Desk`] owning the new
/// coordinator. Every call creates an independent instance.
pub fn launch<F, T>(
    config: &Config,
    topology: &T,
    policy: AllocationPolicy,
    finalizer: F,
) -> Result<Desk<F>, AllocError>
where
    F: Finalizer,
    T: TopologyProvider + ?Sized,
{
    let coordinator = Coordinator::new(*config, topology, policy, finalizer)?;
    Ok(Desk::new(coordinator))
}
