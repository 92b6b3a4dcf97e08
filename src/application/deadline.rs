use super::engine::{ConsultationEngine, WriteOutcome};
use crate::domain::consultation::ConsultationRequest;
use crate::error::Result;
use serde::Serialize;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// Tally of one sweep pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    pub scanned: usize,
    /// Requests this pass moved to `EXPIRED`.
    pub expired: usize,
    /// Requests another writer resolved first.
    pub superseded: usize,
    /// Requests no longer overdue when re-checked.
    pub unchanged: usize,
    pub failed: usize,
}

impl ConsultationEngine {
    /// Lazy deadline evaluation.
    ///
    /// Expires `record` if it is still pending past its acceptance deadline and
    /// returns whatever state the record ends up in. Losing the race to another
    /// writer is not an error: the winner's state is returned as the truth.
    pub async fn expire_if_overdue(
        &self,
        record: ConsultationRequest,
    ) -> Result<ConsultationRequest> {
        Ok(self.try_expire(record).await?.into_record())
    }

    async fn try_expire(&self, record: ConsultationRequest) -> Result<WriteOutcome> {
        if !record.is_overdue(self.now()) {
            return Ok(WriteOutcome::Unchanged(record));
        }

        let outcome = self
            .write_guarded(record, |current, now| {
                if current.is_overdue(now) {
                    current.expired(now).map(Some)
                } else {
                    Ok(None)
                }
            })
            .await?;

        match &outcome {
            WriteOutcome::Applied(expired) => info!(
                request_id = %expired.id,
                practitioner_id = %expired.practitioner_id,
                version = expired.version,
                "acceptance deadline passed, request expired"
            ),
            WriteOutcome::Superseded(current) => debug!(
                request_id = %current.id,
                status = %current.status,
                "expiry lost to a concurrent transition"
            ),
            WriteOutcome::Unchanged(_) => {}
        }
        Ok(outcome)
    }

    /// One pass of the background sweep over every overdue pending request.
    ///
    /// Failures on individual records are logged and counted; the pass goes on.
    pub async fn sweep_expired(&self) -> Result<SweepReport> {
        let overdue = self.store.overdue_pending(self.now()).await?;
        let mut report = SweepReport::default();

        for record in overdue {
            report.scanned += 1;
            let request_id = record.id;
            match self.try_expire(record).await {
                Ok(WriteOutcome::Applied(_)) => report.expired += 1,
                Ok(WriteOutcome::Superseded(_)) => report.superseded += 1,
                Ok(WriteOutcome::Unchanged(_)) => report.unchanged += 1,
                Err(e) => {
                    report.failed += 1;
                    warn!(%request_id, error = %e, "deadline sweep could not expire request");
                }
            }
        }

        Ok(report)
    }
}

/// Spawn a background task that runs the deadline sweep every
/// `config.sweep_interval` until the handle is aborted.
///
/// A failed pass is logged and simply retried on the next tick.
pub fn spawn_deadline_sweeper(engine: Arc<ConsultationEngine>) -> JoinHandle<()> {
    let interval = engine.config().sweep_interval;
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            match engine.sweep_expired().await {
                Ok(report) if report.expired > 0 || report.failed > 0 => info!(
                    scanned = report.scanned,
                    expired = report.expired,
                    superseded = report.superseded,
                    failed = report.failed,
                    "deadline sweep"
                ),
                Ok(_) => {}
                Err(e) => warn!(error = %e, "deadline sweep failed, retrying next tick"),
            }
        }
    })
}
