use super::engine::ConsultationEngine;
use crate::domain::consultation::ConsultationRequest;
use crate::domain::ports::InsertOutcome;
use crate::error::{ConsultationError, Result};
use tracing::{info, warn};
use uuid::Uuid;

impl ConsultationEngine {
    /// Creates a new instant-consultation request.
    ///
    /// The practitioner's fee is frozen onto the request and the acceptance
    /// deadline is fixed at `now + acceptance_timeout`. Returns `DoctorBusy`
    /// if the practitioner already holds an active request; the caller decides
    /// whether to try someone else.
    pub async fn create_request(
        &self,
        patient_id: Uuid,
        practitioner_id: Uuid,
        chief_complaint: String,
    ) -> Result<ConsultationRequest> {
        let chief_complaint = self.validate_complaint(chief_complaint)?;
        if patient_id == practitioner_id {
            return Err(ConsultationError::ValidationError(
                "Patient and practitioner must differ".to_string(),
            ));
        }
        if !self.directory.patient_exists(patient_id).await? {
            return Err(ConsultationError::ValidationError(format!(
                "Unknown patient {patient_id}"
            )));
        }
        let profile = self
            .directory
            .practitioner(practitioner_id)
            .await?
            .ok_or_else(|| {
                ConsultationError::ValidationError(format!(
                    "Unknown practitioner {practitioner_id}"
                ))
            })?;
        if !profile.available {
            return Err(ConsultationError::PractitionerUnavailable(practitioner_id));
        }

        let request = ConsultationRequest::new(
            patient_id,
            practitioner_id,
            chief_complaint,
            profile.fee,
            self.now(),
            self.config.acceptance_timeout,
        )?;

        let blocker = match self.store.insert_if_idle(request.clone()).await? {
            InsertOutcome::Inserted(created) => return Ok(Self::log_created(created)),
            InsertOutcome::PractitionerBusy(blocker) => blocker,
        };

        // An unanswered request past its deadline only blocks until someone
        // expires it, so expire it here and try the insert once more.
        if let Some(stale) = self.store.get(blocker).await?
            && stale.is_overdue(self.now())
            && !self.expire_if_overdue(stale).await?.status.is_active()
            && let InsertOutcome::Inserted(created) = self.store.insert_if_idle(request).await?
        {
            return Ok(Self::log_created(created));
        }

        warn!(
            %practitioner_id,
            %patient_id,
            blocking_request = %blocker,
            "practitioner busy, request refused"
        );
        Err(ConsultationError::DoctorBusy(practitioner_id))
    }

    fn log_created(created: ConsultationRequest) -> ConsultationRequest {
        info!(
            request_id = %created.id,
            practitioner_id = %created.practitioner_id,
            patient_id = %created.patient_id,
            fee = %created.fee.value(),
            deadline = %created.acceptance_deadline,
            "consultation requested"
        );
        created
    }

    fn validate_complaint(&self, chief_complaint: String) -> Result<String> {
        let trimmed = chief_complaint.trim();
        if trimmed.is_empty() {
            return Err(ConsultationError::ValidationError(
                "Chief complaint must not be empty".to_string(),
            ));
        }
        if trimmed.chars().count() > self.config.max_complaint_len {
            return Err(ConsultationError::ValidationError(format!(
                "Chief complaint exceeds {} characters",
                self.config.max_complaint_len
            )));
        }
        Ok(trimmed.to_string())
    }
}
