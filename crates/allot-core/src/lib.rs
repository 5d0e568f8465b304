//! 🏗 Infrastructure for allocation requests, unit descriptions and configuration.
//!
//! The implementation of the pool, the policies and the coordinator lives in
//! `allot-rocket`; this crate only holds what callers and collaborators need to
//! talk to it.
#![warn(missing_docs)]

mod config;
mod error;
mod ids;
mod request;
mod topology;

pub use config::{Config, ConfigError, PassMode};
pub use error::AllocError;
pub use ids::{CommitmentId, RequestId, UnitId, UnitKind, UnitStatus};
pub use request::{AllocationRequest, Requirement};
pub use topology::{TopologyProvider, UnitSpec};
