use super::engine::{ConsultationEngine, MAX_CAS_ATTEMPTS, WriteOutcome};
use crate::domain::consultation::{ConsultationRequest, PaymentMethod};
use crate::domain::ports::PaymentReceipt;
use crate::error::{ConsultationError, Result};
use tracing::{error, info, warn};
use uuid::Uuid;

impl ConsultationEngine {
    /// Captures the consultation fee and marks the request `PAID`.
    ///
    /// Payment is an axis of its own: the status is left as it was, and the
    /// session start checks both. The processor is only called for a payable,
    /// unpaid record; if the capture cannot then be recorded, it is refunded.
    pub async fn capture_payment(
        &self,
        request_id: Uuid,
        caller_id: Uuid,
        method: PaymentMethod,
    ) -> Result<ConsultationRequest> {
        let record = self.load(request_id).await?;
        if record.patient_id != caller_id {
            return Err(ConsultationError::Unauthorized);
        }
        let mut record = self.expire_if_overdue(record).await?;
        if !record.status.is_payable() {
            return Err(ConsultationError::not_payable(record.status));
        }
        if record.is_paid() {
            return Ok(record);
        }

        let receipt = self.payments.capture(&record, method).await?;
        let mut step = |current: &ConsultationRequest, now| {
            if current.is_paid() {
                return Ok(None);
            }
            current
                .paid(method, receipt.reference.clone(), now)
                .map(Some)
        };

        for _ in 0..MAX_CAS_ATTEMPTS {
            let outcome = match self.write_guarded(record, &mut step).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    self.refund_unrecorded(&receipt).await;
                    return Err(e);
                }
            };

            match outcome {
                WriteOutcome::Applied(updated) => {
                    info!(
                        request_id = %updated.id,
                        reference = %receipt.reference,
                        amount = %receipt.amount.value(),
                        version = updated.version,
                        "payment captured"
                    );
                    return Ok(updated);
                }
                WriteOutcome::Unchanged(current) => {
                    self.refund_unrecorded(&receipt).await;
                    return Ok(current);
                }
                // Acceptance moved the status but left the request payable.
                WriteOutcome::Superseded(current) if current.status.is_payable() => {
                    record = current;
                }
                WriteOutcome::Superseded(current) => {
                    self.refund_unrecorded(&receipt).await;
                    return Err(ConsultationError::not_payable(current.status));
                }
            }
        }

        self.refund_unrecorded(&receipt).await;
        Err(ConsultationError::ConcurrencyConflict(record.status))
    }

    async fn refund_unrecorded(&self, receipt: &PaymentReceipt) {
        match self.payments.refund(receipt).await {
            Ok(()) => warn!(
                reference = %receipt.reference,
                "capture could not be recorded, payment refunded"
            ),
            Err(e) => error!(
                reference = %receipt.reference,
                error = %e,
                "refund of unrecorded capture failed, needs manual reconciliation"
            ),
        }
    }
}
