//! In-process payment processor and room provisioner.
//!
//! They back the service binary when no real collaborators are wired in and
//! let tests count side effects (captures, refunds, rooms) and inject failures.

use crate::domain::consultation::{ConsultationRequest, PaymentMethod};
use crate::domain::ports::{PaymentProcessor, PaymentReceipt, SessionProvisioner};
use crate::error::{ConsultationError, Result};
use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Default)]
struct PaymentCounters {
    captures: AtomicUsize,
    refunds: AtomicUsize,
    decline: AtomicBool,
}

/// Approves every capture unless told to decline.
#[derive(Debug, Default, Clone)]
pub struct SimulatedPaymentProcessor {
    counters: Arc<PaymentCounters>,
}

impl SimulatedPaymentProcessor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_decline(&self, decline: bool) {
        self.counters.decline.store(decline, Ordering::SeqCst);
    }

    pub fn captures(&self) -> usize {
        self.counters.captures.load(Ordering::SeqCst)
    }

    pub fn refunds(&self) -> usize {
        self.counters.refunds.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PaymentProcessor for SimulatedPaymentProcessor {
    async fn capture(
        &self,
        request: &ConsultationRequest,
        method: PaymentMethod,
    ) -> Result<PaymentReceipt> {
        if self.counters.decline.load(Ordering::SeqCst) {
            return Err(ConsultationError::PaymentFailed(
                "card declined by issuer".to_string(),
            ));
        }
        self.counters.captures.fetch_add(1, Ordering::SeqCst);
        let receipt = PaymentReceipt {
            reference: format!("pay_{}", Uuid::new_v4().simple()),
            amount: request.fee,
        };
        info!(
            request_id = %request.id,
            reference = %receipt.reference,
            ?method,
            "simulated capture"
        );
        Ok(receipt)
    }

    async fn refund(&self, receipt: &PaymentReceipt) -> Result<()> {
        self.counters.refunds.fetch_add(1, Ordering::SeqCst);
        info!(reference = %receipt.reference, "simulated refund");
        Ok(())
    }
}

#[derive(Debug, Default)]
struct RoomCounters {
    provisioned: AtomicUsize,
    released: AtomicUsize,
    fail: AtomicBool,
}

/// Hands out random room identifiers.
#[derive(Debug, Default, Clone)]
pub struct SimulatedRoomProvisioner {
    counters: Arc<RoomCounters>,
}

impl SimulatedRoomProvisioner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail(&self, fail: bool) {
        self.counters.fail.store(fail, Ordering::SeqCst);
    }

    pub fn provisioned(&self) -> usize {
        self.counters.provisioned.load(Ordering::SeqCst)
    }

    pub fn released(&self) -> usize {
        self.counters.released.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SessionProvisioner for SimulatedRoomProvisioner {
    async fn provision(&self, request: &ConsultationRequest) -> Result<String> {
        if self.counters.fail.load(Ordering::SeqCst) {
            return Err(ConsultationError::ProvisioningFailed(
                "no media capacity".to_string(),
            ));
        }
        self.counters.provisioned.fetch_add(1, Ordering::SeqCst);
        let room_id = format!("room-{}", Uuid::new_v4().simple());
        info!(request_id = %request.id, %room_id, "simulated room provisioned");
        Ok(room_id)
    }

    async fn release(&self, room_id: &str) -> Result<()> {
        self.counters.released.fetch_add(1, Ordering::SeqCst);
        info!(%room_id, "simulated room released");
        Ok(())
    }
}
