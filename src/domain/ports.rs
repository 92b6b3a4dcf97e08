use super::consultation::{ConsultationRequest, Fee, PaymentMethod};
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Result of an insert guarded by the one-active-request-per-practitioner rule.
#[derive(Debug, Clone, PartialEq)]
pub enum InsertOutcome {
    Inserted(ConsultationRequest),
    /// The practitioner already holds the active request with this id.
    PractitionerBusy(Uuid),
}

/// Result of a compare-and-set against a record's `version`.
#[derive(Debug, Clone, PartialEq)]
pub enum CasOutcome {
    Applied(ConsultationRequest),
    /// The stored version moved on; carries the record as it is now.
    Conflict(ConsultationRequest),
}

/// Durable home of consultation requests.
///
/// Implementations must make `insert_if_idle` and `compare_and_set` atomic
/// with respect to each other, and keep the practitioner's active slot in step
/// with the record's status.
#[async_trait]
pub trait RequestStore: Send + Sync {
    /// Inserts `request` unless its practitioner already has an active one.
    async fn insert_if_idle(&self, request: ConsultationRequest) -> Result<InsertOutcome>;
    async fn get(&self, id: Uuid) -> Result<Option<ConsultationRequest>>;
    /// Replaces the stored record with `next` only if its version still equals
    /// `expected_version`.
    async fn compare_and_set(
        &self,
        expected_version: u64,
        next: ConsultationRequest,
    ) -> Result<CasOutcome>;
    /// Pending requests whose acceptance deadline lies before `now`.
    async fn overdue_pending(&self, now: DateTime<Utc>) -> Result<Vec<ConsultationRequest>>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PractitionerProfile {
    pub id: Uuid,
    pub display_name: String,
    pub available: bool,
    pub fee: Fee,
}

#[async_trait]
pub trait Directory: Send + Sync {
    async fn practitioner(&self, id: Uuid) -> Result<Option<PractitionerProfile>>;
    async fn patient_exists(&self, id: Uuid) -> Result<bool>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentReceipt {
    pub reference: String,
    pub amount: Fee,
}

#[async_trait]
pub trait PaymentProcessor: Send + Sync {
    /// Charges the request's fee. Declines surface as `PaymentFailed`.
    async fn capture(
        &self,
        request: &ConsultationRequest,
        method: PaymentMethod,
    ) -> Result<PaymentReceipt>;
    async fn refund(&self, receipt: &PaymentReceipt) -> Result<()>;
}

#[async_trait]
pub trait SessionProvisioner: Send + Sync {
    /// Allocates a video room and returns its opaque identifier.
    async fn provision(&self, request: &ConsultationRequest) -> Result<String>;
    async fn release(&self, room_id: &str) -> Result<()>;
}

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub type RequestStoreBox = Box<dyn RequestStore>;
pub type DirectoryBox = Box<dyn Directory>;
pub type PaymentProcessorBox = Box<dyn PaymentProcessor>;
pub type SessionProvisionerBox = Box<dyn SessionProvisioner>;
pub type ClockBox = Box<dyn Clock>;
