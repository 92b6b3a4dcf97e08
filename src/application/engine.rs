use crate::config::EngineConfig;
use crate::domain::consultation::{ConsultationRequest, ConsultationStatus};
use crate::domain::ports::{
    CasOutcome, ClockBox, DirectoryBox, PaymentProcessorBox, RequestStoreBox,
    SessionProvisionerBox,
};
use crate::error::{ConsultationError, Result};
use crate::infrastructure::clock::SystemClock;
use chrono::{DateTime, Utc};
use tracing::debug;
use uuid::Uuid;

/// Upper bound on CAS re-attempts after status-preserving concurrent writes.
pub const MAX_CAS_ATTEMPTS: usize = 8;

/// How a guarded write ended.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum WriteOutcome {
    /// Our write landed.
    Applied(ConsultationRequest),
    /// Nothing to write: the record already satisfies the caller.
    Unchanged(ConsultationRequest),
    /// Another writer moved the status first.
    Superseded(ConsultationRequest),
}

impl WriteOutcome {
    pub(crate) fn into_record(self) -> ConsultationRequest {
        match self {
            Self::Applied(record) | Self::Unchanged(record) | Self::Superseded(record) => record,
        }
    }
}

/// The main entry point for the instant-consultation engine.
///
/// `ConsultationEngine` owns the request store and the external collaborators.
/// It keeps no request state of its own: every operation reads the record,
/// decides, and writes back through the store's compare-and-set, so any
/// number of engines may share one store. Wrap it in an `Arc` to share it
/// between request handlers and the deadline sweeper.
pub struct ConsultationEngine {
    pub(crate) store: RequestStoreBox,
    pub(crate) directory: DirectoryBox,
    pub(crate) payments: PaymentProcessorBox,
    pub(crate) rooms: SessionProvisionerBox,
    pub(crate) clock: ClockBox,
    pub(crate) config: EngineConfig,
}

impl ConsultationEngine {
    /// Creates a new `ConsultationEngine` on the system clock and default config.
    ///
    /// # Arguments
    ///
    /// * `store` - The store for consultation requests.
    /// * `directory` - Practitioner availability, fees, and patient identity.
    /// * `payments` - The payment processor used by the payment gate.
    /// * `rooms` - The provisioner that allocates video rooms on session start.
    pub fn new(
        store: RequestStoreBox,
        directory: DirectoryBox,
        payments: PaymentProcessorBox,
        rooms: SessionProvisionerBox,
    ) -> Self {
        Self {
            store,
            directory,
            payments,
            rooms,
            clock: Box::new(SystemClock),
            config: EngineConfig::default(),
        }
    }

    pub fn with_clock(mut self, clock: ClockBox) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub(crate) fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub(crate) async fn load(&self, id: Uuid) -> Result<ConsultationRequest> {
        self.store
            .get(id)
            .await?
            .ok_or(ConsultationError::NotFound(id))
    }

    /// Writes the output of `step` over `record` with a compare-and-set.
    ///
    /// `step` returns `None` when the record needs no write. When the CAS loses
    /// to a writer that left the status as it was (a payment capture, say),
    /// `step` is re-run on the fresh record; a winner that changed the status
    /// is returned as `Superseded` for the caller to interpret.
    pub(crate) async fn write_guarded<F>(
        &self,
        mut record: ConsultationRequest,
        mut step: F,
    ) -> Result<WriteOutcome>
    where
        F: FnMut(&ConsultationRequest, DateTime<Utc>) -> Result<Option<ConsultationRequest>>,
    {
        let prior: ConsultationStatus = record.status;

        for _ in 0..MAX_CAS_ATTEMPTS {
            let Some(next) = step(&record, self.now())? else {
                return Ok(WriteOutcome::Unchanged(record));
            };

            match self.store.compare_and_set(record.version, next).await? {
                CasOutcome::Applied(written) => return Ok(WriteOutcome::Applied(written)),
                CasOutcome::Conflict(current) if current.status == prior => {
                    debug!(
                        request_id = %current.id,
                        version = current.version,
                        "cas lost to a status-preserving write, retrying"
                    );
                    record = current;
                }
                CasOutcome::Conflict(current) => {
                    debug!(
                        request_id = %current.id,
                        status = %current.status,
                        "cas lost to a transition"
                    );
                    return Ok(WriteOutcome::Superseded(current));
                }
            }
        }

        Err(ConsultationError::ConcurrencyConflict(prior))
    }
}

impl std::fmt::Debug for ConsultationEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsultationEngine")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
