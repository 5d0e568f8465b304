//! Systems built on top of the allocation core.
//!
//! - [`elevator`]: cars answering hall calls, nearest car first
//! - [`parking`]: spots handed out at the entrance and paid at the exit
//! - [`ticketing`]: train seats booked in bulk per class and paid up front
//!
//! [`payment`] and [`pricing`] hold the collaborators these share.

pub mod elevator;
pub mod parking;
pub mod payment;
pub mod pricing;
pub mod ticketing;
