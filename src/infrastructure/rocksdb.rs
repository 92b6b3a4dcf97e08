use crate::domain::consultation::ConsultationRequest;
use crate::domain::ports::{CasOutcome, InsertOutcome, RequestStore};
use crate::error::{ConsultationError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, DB, IteratorMode, Options, WriteBatch};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

/// Column Family for storing consultation records.
pub const CF_REQUESTS: &str = "requests";
/// Column Family mapping a practitioner to their active request.
pub const CF_ACTIVE: &str = "active_practitioners";

/// A persistent store implementation using RocksDB.
///
/// Records and the practitioner's active slot live in separate Column Families
/// and are always written together in one `WriteBatch`. Writers serialize on an
/// async mutex so the read-check-write sequences behind `insert_if_idle` and
/// `compare_and_set` are atomic within the process.
///
/// This struct is thread-safe (`Clone` shares the underlying `Arc<DB>`).
#[derive(Clone)]
pub struct RocksDBStore {
    db: Arc<DB>,
    write_lock: Arc<Mutex<()>>,
}

impl RocksDBStore {
    /// Opens or creates a RocksDB instance at the specified path.
    ///
    /// Ensures that the required column families ("requests" and
    /// "active_practitioners") exist.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_requests = ColumnFamilyDescriptor::new(CF_REQUESTS, Options::default());
        let cf_active = ColumnFamilyDescriptor::new(CF_ACTIVE, Options::default());

        let db = DB::open_cf_descriptors(&opts, path, vec![cf_requests, cf_active])?;

        Ok(Self {
            db: Arc::new(db),
            write_lock: Arc::new(Mutex::new(())),
        })
    }

    fn cf(&self, name: &str) -> Result<&ColumnFamily> {
        self.db.cf_handle(name).ok_or_else(|| {
            ConsultationError::InternalError(Box::new(std::io::Error::other(format!(
                "{name} column family not found"
            ))))
        })
    }

    fn read_request(&self, id: Uuid) -> Result<Option<ConsultationRequest>> {
        let cf = self.cf(CF_REQUESTS)?;
        match self.db.get_cf(cf, id.as_bytes())? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    fn read_active(&self, practitioner_id: Uuid) -> Result<Option<Uuid>> {
        let cf = self.cf(CF_ACTIVE)?;
        match self.db.get_cf(cf, practitioner_id.as_bytes())? {
            Some(bytes) => Uuid::from_slice(&bytes).map(Some).map_err(|e| {
                ConsultationError::InternalError(Box::new(std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    format!("Corrupt active slot: {e}"),
                )))
            }),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl RequestStore for RocksDBStore {
    async fn insert_if_idle(&self, request: ConsultationRequest) -> Result<InsertOutcome> {
        let _guard = self.write_lock.lock().await;

        if let Some(existing) = self.read_active(request.practitioner_id)? {
            return Ok(InsertOutcome::PractitionerBusy(existing));
        }

        let mut batch = WriteBatch::default();
        batch.put_cf(
            self.cf(CF_REQUESTS)?,
            request.id.as_bytes(),
            serde_json::to_vec(&request)?,
        );
        if request.status.is_active() {
            batch.put_cf(
                self.cf(CF_ACTIVE)?,
                request.practitioner_id.as_bytes(),
                request.id.as_bytes(),
            );
        }
        self.db.write(batch)?;

        Ok(InsertOutcome::Inserted(request))
    }

    async fn get(&self, id: Uuid) -> Result<Option<ConsultationRequest>> {
        self.read_request(id)
    }

    async fn compare_and_set(
        &self,
        expected_version: u64,
        next: ConsultationRequest,
    ) -> Result<CasOutcome> {
        let _guard = self.write_lock.lock().await;

        let current = self
            .read_request(next.id)?
            .ok_or(ConsultationError::NotFound(next.id))?;
        if current.version != expected_version {
            return Ok(CasOutcome::Conflict(current));
        }

        let mut batch = WriteBatch::default();
        batch.put_cf(
            self.cf(CF_REQUESTS)?,
            next.id.as_bytes(),
            serde_json::to_vec(&next)?,
        );
        if !next.status.is_active() && self.read_active(next.practitioner_id)? == Some(next.id) {
            batch.delete_cf(self.cf(CF_ACTIVE)?, next.practitioner_id.as_bytes());
        }
        self.db.write(batch)?;

        Ok(CasOutcome::Applied(next))
    }

    async fn overdue_pending(&self, now: DateTime<Utc>) -> Result<Vec<ConsultationRequest>> {
        let cf = self.cf(CF_ACTIVE)?;
        let mut overdue = Vec::new();

        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            let (_practitioner, request_id) = item?;
            let request_id = match Uuid::from_slice(&request_id) {
                Ok(id) => id,
                Err(_) => continue,
            };
            if let Some(request) = self.read_request(request_id)?
                && request.is_overdue(now)
            {
                overdue.push(request);
            }
        }

        Ok(overdue)
    }
}
