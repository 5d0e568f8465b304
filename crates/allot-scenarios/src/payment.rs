//! Payment collaborators

use std::sync::Arc;

use allot_rocket::{Commitment, FinalizeError, Finalizer};
use parking_lot::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

/// A way of charging a requester
pub trait PaymentService {
    /// Charge `amount` to `requester`, returns whether the payment went through
    fn process_payment(&mut self, requester: Uuid, amount: u64) -> bool;
}

impl<P: PaymentService> PaymentService for Arc<Mutex<P>> {
    fn process_payment(&mut self, requester: Uuid, amount: u64) -> bool {
        self.lock().process_payment(requester, amount)
    }
}

/// Cash payment, which always succeeds
#[derive(Clone, Copy, Debug, Default)]
pub struct CashPayment;

impl PaymentService for CashPayment {
    fn process_payment(&mut self, requester: Uuid, amount: u64) -> bool {
        info!(%requester, amount, "payment processed via cash");
        true
    }
}

/// Finalizer charging the quoted cost of every commitment
///
/// A declined payment fails finalization, so the coordinator frees the units
/// again.
#[derive(Clone, Debug)]
pub struct PaymentFinalizer<P> {
    payment: P,
}

impl<P: PaymentService> PaymentFinalizer<P> {
    pub fn new(payment: P) -> Self {
        Self { payment }
    }

    pub fn payment(&self) -> &P {
        &self.payment
    }
}

impl<P: PaymentService> Finalizer for PaymentFinalizer<P> {
    fn finalize(&mut self, commitment: &Commitment) -> Result<(), FinalizeError> {
        let amount = commitment.cost().unwrap_or(0);
        if self.payment.process_payment(commitment.requester(), amount) {
            Ok(())
        } else {
            warn!(commitment = %commitment.id(), amount, "payment declined");
            Err(FinalizeError::new(format!("payment of {amount} declined")))
        }
    }
}
