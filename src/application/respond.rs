use super::engine::{ConsultationEngine, WriteOutcome};
use crate::domain::consultation::{ConsultationRequest, ConsultationStatus, Decision};
use crate::error::{ConsultationError, Result};
use tracing::info;
use uuid::Uuid;

impl ConsultationEngine {
    /// Applies the practitioner's accept/reject decision.
    ///
    /// Repeating a decision that already took effect is a no-op success. A
    /// decision that arrives after the acceptance deadline fails with
    /// `DeadlinePassed`, whether the expiry was written by this call, by an
    /// earlier poll, or by the sweep.
    pub async fn respond(
        &self,
        request_id: Uuid,
        practitioner_id: Uuid,
        decision: Decision,
    ) -> Result<ConsultationRequest> {
        let record = self.load(request_id).await?;
        if record.practitioner_id != practitioner_id {
            return Err(ConsultationError::Unauthorized);
        }
        let record = self.expire_if_overdue(record).await?;
        let target = decision.target_status();

        let status = record.status;
        match status {
            _ if status == target => return Ok(record),
            ConsultationStatus::Expired => return Err(ConsultationError::DeadlinePassed),
            ConsultationStatus::PendingAcceptance => {}
            from => return Err(ConsultationError::InvalidTransition { from, to: target }),
        }

        let outcome = self
            .write_guarded(record, |current, now| {
                if current.is_overdue(now) {
                    return Ok(None);
                }
                current.responded(decision, now).map(Some)
            })
            .await?;

        match outcome {
            WriteOutcome::Applied(updated) => {
                info!(
                    request_id = %updated.id,
                    %practitioner_id,
                    status = %updated.status,
                    version = updated.version,
                    "practitioner responded"
                );
                Ok(updated)
            }
            // The deadline passed while we retried; record the expiry first.
            WriteOutcome::Unchanged(current) => {
                let current = self.expire_if_overdue(current).await?;
                if current.status == target {
                    Ok(current)
                } else {
                    Err(ConsultationError::DeadlinePassed)
                }
            }
            WriteOutcome::Superseded(current) if current.status == target => Ok(current),
            WriteOutcome::Superseded(current) if current.status == ConsultationStatus::Expired => {
                Err(ConsultationError::DeadlinePassed)
            }
            WriteOutcome::Superseded(current) => {
                Err(ConsultationError::ConcurrencyConflict(current.status))
            }
        }
    }
}
