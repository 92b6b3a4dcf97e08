//! Request and response bodies for the HTTP surface.
//!
//! Consultation records themselves are returned as
//! [`ConsultationRequest`](crate::domain::consultation::ConsultationRequest).

use crate::domain::consultation::{Decision, PaymentMethod, SessionOutcome};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub ok: bool,
    pub service: &'static str,
    pub version: &'static str,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateConsultationBody {
    pub patient_id: Uuid,
    pub practitioner_id: Uuid,
    pub chief_complaint: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RespondBody {
    pub decision: Decision,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentBody {
    pub method: PaymentMethod,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndSessionBody {
    pub outcome: SessionOutcome,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PatchAction {
    Cancel,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatchConsultationBody {
    pub action: PatchAction,
    pub reason: String,
}

/// Body of every non-2xx response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
}
