use crate::error::{ConsultationError, Result};
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// A practitioner's consultation rate, frozen onto a request at creation.
///
/// Wraps `rust_decimal::Decimal` so that negative fees cannot be represented.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Fee(Decimal);

impl Fee {
    pub const ZERO: Self = Self(Decimal::ZERO);

    pub fn new(value: Decimal) -> Result<Self> {
        if value >= Decimal::ZERO {
            Ok(Self(value))
        } else {
            Err(ConsultationError::ValidationError(
                "Fee must not be negative".to_string(),
            ))
        }
    }

    pub fn value(&self) -> Decimal {
        self.0
    }

    pub fn is_free(&self) -> bool {
        self.0.is_zero()
    }
}

impl TryFrom<Decimal> for Fee {
    type Error = ConsultationError;

    fn try_from(value: Decimal) -> Result<Self> {
        Self::new(value)
    }
}

impl From<Fee> for Decimal {
    fn from(fee: Fee) -> Self {
        fee.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConsultationStatus {
    PendingAcceptance,
    Waiting,
    InProgress,
    Completed,
    Rejected,
    Expired,
    Cancelled,
    NoShow,
}

impl ConsultationStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::PendingAcceptance => "PENDING_ACCEPTANCE",
            Self::Waiting => "WAITING",
            Self::InProgress => "IN_PROGRESS",
            Self::Completed => "COMPLETED",
            Self::Rejected => "REJECTED",
            Self::Expired => "EXPIRED",
            Self::Cancelled => "CANCELLED",
            Self::NoShow => "NO_SHOW",
        }
    }

    /// Statuses that occupy the practitioner.
    pub fn is_active(self) -> bool {
        matches!(self, Self::PendingAcceptance | Self::Waiting | Self::InProgress)
    }

    pub fn is_terminal(self) -> bool {
        !self.is_active()
    }

    /// Payment may be captured before or after acceptance, never later.
    pub fn is_payable(self) -> bool {
        matches!(self, Self::PendingAcceptance | Self::Waiting)
    }

    /// The complete edge set of the consultation state machine.
    pub fn can_transition_to(self, next: Self) -> bool {
        use ConsultationStatus::*;
        matches!(
            (self, next),
            (PendingAcceptance, Waiting)
                | (PendingAcceptance, Rejected)
                | (PendingAcceptance, Expired)
                | (PendingAcceptance, Cancelled)
                | (Waiting, InProgress)
                | (Waiting, Cancelled)
                | (InProgress, Completed)
                | (InProgress, NoShow)
        )
    }
}

impl fmt::Display for ConsultationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Unpaid,
    Paid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    Card,
    Wallet,
    BankTransfer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Decision {
    Accept,
    Reject,
}

impl Decision {
    pub fn target_status(self) -> ConsultationStatus {
        match self {
            Decision::Accept => ConsultationStatus::Waiting,
            Decision::Reject => ConsultationStatus::Rejected,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionOutcome {
    Completed,
    NoShow,
}

impl SessionOutcome {
    pub fn target_status(self) -> ConsultationStatus {
        match self {
            SessionOutcome::Completed => ConsultationStatus::Completed,
            SessionOutcome::NoShow => ConsultationStatus::NoShow,
        }
    }
}

/// The persisted record of one instant consultation.
///
/// Every mutator below is pure: it returns the next version of the record and
/// leaves `self` untouched, so the caller can hand both to a compare-and-set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsultationRequest {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub practitioner_id: Uuid,
    pub status: ConsultationStatus,
    /// CAS token, bumped by every write.
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub acceptance_deadline: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub fee: Fee,
    pub payment_status: PaymentStatus,
    pub payment_method: Option<PaymentMethod>,
    pub payment_reference: Option<String>,
    pub chief_complaint: String,
    pub room_id: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub cancellation_reason: Option<String>,
    pub cancelled_by: Option<Uuid>,
}

impl ConsultationRequest {
    pub fn new(
        patient_id: Uuid,
        practitioner_id: Uuid,
        chief_complaint: String,
        fee: Fee,
        now: DateTime<Utc>,
        acceptance_timeout: Duration,
    ) -> Result<Self> {
        let payment_status = if fee.is_free() {
            PaymentStatus::Paid
        } else {
            PaymentStatus::Unpaid
        };

        let acceptance_deadline = now.checked_add_signed(acceptance_timeout).ok_or_else(|| {
            ConsultationError::ValidationError(format!(
                "Acceptance timeout of {acceptance_timeout} overflows the deadline"
            ))
        })?;

        Ok(Self {
            id: Uuid::new_v4(),
            patient_id,
            practitioner_id,
            status: ConsultationStatus::PendingAcceptance,
            version: 0,
            created_at: now,
            acceptance_deadline,
            updated_at: now,
            fee,
            payment_status,
            payment_method: None,
            payment_reference: None,
            chief_complaint,
            room_id: None,
            started_at: None,
            ended_at: None,
            cancellation_reason: None,
            cancelled_by: None,
        })
    }

    pub fn is_participant(&self, caller: Uuid) -> bool {
        caller == self.patient_id || caller == self.practitioner_id
    }

    pub fn is_paid(&self) -> bool {
        self.payment_status == PaymentStatus::Paid
    }

    /// True once an unanswered request has outlived its acceptance window.
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.status == ConsultationStatus::PendingAcceptance && now > self.acceptance_deadline
    }

    fn next_version(&self, now: DateTime<Utc>) -> Self {
        let mut next = self.clone();
        next.version += 1;
        next.updated_at = now;
        next
    }

    fn transition(&self, to: ConsultationStatus, now: DateTime<Utc>) -> Result<Self> {
        if !self.status.can_transition_to(to) {
            return Err(ConsultationError::InvalidTransition {
                from: self.status,
                to,
            });
        }
        let mut next = self.next_version(now);
        next.status = to;
        Ok(next)
    }

    pub fn expired(&self, now: DateTime<Utc>) -> Result<Self> {
        self.transition(ConsultationStatus::Expired, now)
    }

    pub fn responded(&self, decision: Decision, now: DateTime<Utc>) -> Result<Self> {
        self.transition(decision.target_status(), now)
    }

    pub fn paid(
        &self,
        method: PaymentMethod,
        reference: String,
        now: DateTime<Utc>,
    ) -> Result<Self> {
        if !self.status.is_payable() {
            return Err(ConsultationError::not_payable(self.status));
        }
        let mut next = self.next_version(now);
        next.payment_status = PaymentStatus::Paid;
        next.payment_method = Some(method);
        next.payment_reference = Some(reference);
        Ok(next)
    }

    /// Checks the session-start preconditions without producing a new version.
    pub fn ensure_startable(&self) -> Result<()> {
        if self.status != ConsultationStatus::Waiting {
            return Err(ConsultationError::InvalidTransition {
                from: self.status,
                to: ConsultationStatus::InProgress,
            });
        }
        if !self.is_paid() {
            return Err(ConsultationError::PaymentRequired);
        }
        Ok(())
    }

    pub fn started(&self, room_id: String, now: DateTime<Utc>) -> Result<Self> {
        self.ensure_startable()?;
        let mut next = self.transition(ConsultationStatus::InProgress, now)?;
        next.started_at = Some(now);
        next.room_id = Some(room_id);
        Ok(next)
    }

    pub fn ended(&self, outcome: SessionOutcome, now: DateTime<Utc>) -> Result<Self> {
        let mut next = self.transition(outcome.target_status(), now)?;
        next.ended_at = Some(now);
        Ok(next)
    }

    /// Cancels on behalf of `actor`.
    ///
    /// While the request is still pending only the patient can withdraw it;
    /// the practitioner declines through a rejection instead.
    pub fn cancelled(&self, actor: Uuid, reason: String, now: DateTime<Utc>) -> Result<Self> {
        if !self.is_participant(actor) {
            return Err(ConsultationError::Unauthorized);
        }
        if self.status == ConsultationStatus::PendingAcceptance && actor != self.patient_id {
            return Err(ConsultationError::Unauthorized);
        }
        let mut next = self.transition(ConsultationStatus::Cancelled, now)?;
        next.cancelled_by = Some(actor);
        next.cancellation_reason = Some(reason);
        Ok(next)
    }
}
