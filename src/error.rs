use crate::domain::consultation::ConsultationStatus;
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum ConsultationError {
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("Practitioner {0} is not accepting instant consultations")]
    PractitionerUnavailable(Uuid),
    #[error("Practitioner {0} already has an active consultation")]
    DoctorBusy(Uuid),
    #[error("Caller is not permitted to act on this consultation")]
    Unauthorized,
    #[error("Consultation request {0} not found")]
    NotFound(Uuid),
    #[error("Acceptance deadline has passed")]
    DeadlinePassed,
    #[error("Cannot move consultation from {from} to {to}")]
    InvalidTransition {
        from: ConsultationStatus,
        to: ConsultationStatus,
    },
    #[error("Payment is required before the session can start")]
    PaymentRequired,
    #[error("Payment failed: {0}")]
    PaymentFailed(String),
    #[error("Session provisioning failed: {0}")]
    ProvisioningFailed(String),
    #[error("Concurrent update left consultation in {0}")]
    ConcurrencyConflict(ConsultationStatus),
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[cfg(feature = "storage-rocksdb")]
    #[error("RocksDB error: {0}")]
    RocksDbError(#[from] rocksdb::Error),
    #[error("Internal error: {0}")]
    InternalError(Box<dyn std::error::Error + Send + Sync>),
}

impl ConsultationError {
    /// Payment never moves the status, so a payment refused in `status` is
    /// reported as an illegal transition from that status to itself.
    pub fn not_payable(status: ConsultationStatus) -> Self {
        Self::InvalidTransition {
            from: status,
            to: status,
        }
    }

    /// Stable machine-readable code used on the wire.
    pub fn code(&self) -> &'static str {
        match self {
            Self::ValidationError(_) => "VALIDATION_ERROR",
            Self::PractitionerUnavailable(_) => "PRACTITIONER_UNAVAILABLE",
            Self::DoctorBusy(_) => "DOCTOR_BUSY",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::NotFound(_) => "NOT_FOUND",
            Self::DeadlinePassed => "DEADLINE_PASSED",
            Self::InvalidTransition { .. } => "INVALID_TRANSITION",
            Self::PaymentRequired => "PAYMENT_REQUIRED",
            Self::PaymentFailed(_) => "PAYMENT_FAILED",
            Self::ProvisioningFailed(_) => "PROVISIONING_FAILED",
            Self::ConcurrencyConflict(_) => "CONCURRENCY_CONFLICT",
            Self::SerializationError(_) | Self::IoError(_) | Self::InternalError(_) => {
                "INTERNAL_ERROR"
            }
            #[cfg(feature = "storage-rocksdb")]
            Self::RocksDbError(_) => "INTERNAL_ERROR",
        }
    }
}

pub type Result<T> = std::result::Result<T, ConsultationError>;
