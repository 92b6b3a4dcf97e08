use super::api_types::ErrorBody;
use crate::error::ConsultationError;
use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tracing::error;

/// Error returned by every handler.
#[derive(Debug)]
pub enum ApiError {
    /// `x-caller-id` missing or not a UUID.
    Unauthenticated,
    Engine(ConsultationError),
    /// Raised by the payment route, where an illegal transition means the
    /// record is not payable (402).
    Payment(ConsultationError),
}

impl ApiError {
    pub fn payment(e: ConsultationError) -> Self {
        Self::Payment(e)
    }
}

impl From<ConsultationError> for ApiError {
    fn from(e: ConsultationError) -> Self {
        Self::Engine(e)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Engine(ConsultationError::ValidationError(rejection.body_text()))
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self::Engine(ConsultationError::ValidationError(rejection.body_text()))
    }
}

pub(crate) fn status_for(e: &ConsultationError) -> StatusCode {
    match e {
        ConsultationError::ValidationError(_) => StatusCode::BAD_REQUEST,
        ConsultationError::Unauthorized => StatusCode::FORBIDDEN,
        ConsultationError::NotFound(_) => StatusCode::NOT_FOUND,
        ConsultationError::PractitionerUnavailable(_)
        | ConsultationError::DoctorBusy(_)
        | ConsultationError::DeadlinePassed
        | ConsultationError::InvalidTransition { .. }
        | ConsultationError::ConcurrencyConflict(_) => StatusCode::CONFLICT,
        ConsultationError::PaymentRequired
        | ConsultationError::PaymentFailed(_) => StatusCode::PAYMENT_REQUIRED,
        ConsultationError::ProvisioningFailed(_) => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::Unauthenticated => (
                StatusCode::UNAUTHORIZED,
                ErrorBody {
                    error: "UNAUTHENTICATED".to_string(),
                    message: "missing or malformed x-caller-id header".to_string(),
                },
            ),
            ApiError::Engine(e) => engine_error(status_for(&e), e),
            ApiError::Payment(e @ ConsultationError::InvalidTransition { .. }) => {
                engine_error(StatusCode::PAYMENT_REQUIRED, e)
            }
            ApiError::Payment(e) => engine_error(status_for(&e), e),
        };
        (status, Json(body)).into_response()
    }
}

fn engine_error(status: StatusCode, e: ConsultationError) -> (StatusCode, ErrorBody) {
    if status == StatusCode::INTERNAL_SERVER_ERROR {
        error!(error = %e, "request failed");
    }
    (
        status,
        ErrorBody {
            error: e.code().to_string(),
            message: e.to_string(),
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::consultation::ConsultationStatus;
    use uuid::Uuid;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            status_for(&ConsultationError::DoctorBusy(Uuid::new_v4())),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_for(&ConsultationError::not_payable(ConsultationStatus::Expired)),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::payment(ConsultationError::not_payable(ConsultationStatus::Expired))
                .into_response()
                .status(),
            StatusCode::PAYMENT_REQUIRED
        );
        assert_eq!(status_for(&ConsultationError::Unauthorized), StatusCode::FORBIDDEN);
        assert_eq!(
            status_for(&ConsultationError::InternalError("boom".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
