use super::engine::ConsultationEngine;
use crate::domain::consultation::ConsultationRequest;
use crate::error::{ConsultationError, Result};
use uuid::Uuid;

impl ConsultationEngine {
    /// Read path polled by both participants.
    ///
    /// Applies lazy expiry first so a poll after the deadline observes
    /// `EXPIRED` without waiting for the sweep.
    pub async fn get_status(&self, request_id: Uuid, caller_id: Uuid) -> Result<ConsultationRequest> {
        let record = self.load(request_id).await?;
        if !record.is_participant(caller_id) {
            return Err(ConsultationError::Unauthorized);
        }
        self.expire_if_overdue(record).await
    }
}
