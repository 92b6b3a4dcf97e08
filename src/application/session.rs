use super::engine::{ConsultationEngine, WriteOutcome};
use crate::domain::consultation::{ConsultationRequest, ConsultationStatus, SessionOutcome};
use crate::error::{ConsultationError, Result};
use tracing::{error, info};
use uuid::Uuid;

impl ConsultationEngine {
    /// Moves an accepted, paid request to `IN_PROGRESS` with a fresh room.
    ///
    /// The room is provisioned before the write; if the write does not land
    /// the room is released again, so a failed start leaves nothing behind.
    pub async fn start_session(
        &self,
        request_id: Uuid,
        practitioner_id: Uuid,
    ) -> Result<ConsultationRequest> {
        let record = self.load(request_id).await?;
        if record.practitioner_id != practitioner_id {
            return Err(ConsultationError::Unauthorized);
        }
        record.ensure_startable()?;

        let room_id = self.rooms.provision(&record).await?;
        let outcome = self
            .write_guarded(record, |current, now| {
                current.started(room_id.clone(), now).map(Some)
            })
            .await;

        match outcome {
            Ok(WriteOutcome::Applied(started)) => {
                info!(
                    request_id = %started.id,
                    %practitioner_id,
                    %room_id,
                    version = started.version,
                    "session started"
                );
                Ok(started)
            }
            Ok(WriteOutcome::Superseded(current))
                if current.status == ConsultationStatus::InProgress =>
            {
                self.release_room(&room_id).await;
                Ok(current)
            }
            Ok(WriteOutcome::Superseded(current)) => {
                self.release_room(&room_id).await;
                Err(ConsultationError::ConcurrencyConflict(current.status))
            }
            Ok(WriteOutcome::Unchanged(current)) => {
                self.release_room(&room_id).await;
                Ok(current)
            }
            Err(e) => {
                self.release_room(&room_id).await;
                Err(e)
            }
        }
    }

    /// Closes a live session as `COMPLETED` or `NO_SHOW`.
    pub async fn end_session(
        &self,
        request_id: Uuid,
        caller_id: Uuid,
        outcome: SessionOutcome,
    ) -> Result<ConsultationRequest> {
        let record = self.load(request_id).await?;
        if !record.is_participant(caller_id) {
            return Err(ConsultationError::Unauthorized);
        }
        let target = outcome.target_status();
        if record.status != ConsultationStatus::InProgress {
            return Err(ConsultationError::InvalidTransition {
                from: record.status,
                to: target,
            });
        }

        match self
            .write_guarded(record, |current, now| current.ended(outcome, now).map(Some))
            .await?
        {
            WriteOutcome::Applied(ended) => {
                info!(
                    request_id = %ended.id,
                    %caller_id,
                    status = %ended.status,
                    version = ended.version,
                    "session ended"
                );
                Ok(ended)
            }
            WriteOutcome::Superseded(current) if current.status == target => Ok(current),
            WriteOutcome::Superseded(current) | WriteOutcome::Unchanged(current) => {
                Err(ConsultationError::ConcurrencyConflict(current.status))
            }
        }
    }

    /// Cancels a request that has not gone live yet.
    pub async fn cancel(
        &self,
        request_id: Uuid,
        actor: Uuid,
        reason: String,
    ) -> Result<ConsultationRequest> {
        let reason = self.validate_reason(reason)?;
        let record = self.load(request_id).await?;
        if !record.is_participant(actor) {
            return Err(ConsultationError::Unauthorized);
        }
        let record = self.expire_if_overdue(record).await?;

        match self
            .write_guarded(record, |current, now| {
                current.cancelled(actor, reason.clone(), now).map(Some)
            })
            .await?
        {
            WriteOutcome::Applied(cancelled) => {
                info!(
                    request_id = %cancelled.id,
                    cancelled_by = %actor,
                    version = cancelled.version,
                    "consultation cancelled"
                );
                Ok(cancelled)
            }
            WriteOutcome::Superseded(current)
                if current.status == ConsultationStatus::Cancelled =>
            {
                Ok(current)
            }
            WriteOutcome::Superseded(current) | WriteOutcome::Unchanged(current) => {
                Err(ConsultationError::ConcurrencyConflict(current.status))
            }
        }
    }

    async fn release_room(&self, room_id: &str) {
        if let Err(e) = self.rooms.release(room_id).await {
            error!(%room_id, error = %e, "failed to release unused room");
        }
    }

    fn validate_reason(&self, reason: String) -> Result<String> {
        let trimmed = reason.trim();
        if trimmed.is_empty() {
            return Err(ConsultationError::ValidationError(
                "Cancellation reason must not be empty".to_string(),
            ));
        }
        if trimmed.chars().count() > self.config.max_reason_len {
            return Err(ConsultationError::ValidationError(format!(
                "Cancellation reason exceeds {} characters",
                self.config.max_reason_len
            )));
        }
        Ok(trimmed.to_string())
    }
}
