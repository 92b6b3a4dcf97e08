use crate::domain::consultation::ConsultationRequest;
use crate::domain::ports::{
    CasOutcome, Directory, InsertOutcome, PractitionerProfile, RequestStore,
};
use crate::error::{ConsultationError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Default)]
struct RequestTable {
    requests: HashMap<Uuid, ConsultationRequest>,
    /// practitioner_id -> id of their single active request.
    active: HashMap<Uuid, Uuid>,
}

/// A thread-safe in-memory store for consultation requests.
///
/// Records and the per-practitioner active slot live behind one
/// `Arc<RwLock<..>>`, so every check-then-write runs under a single write guard.
/// Ideal for testing or single-instance deployments where persistence is not required.
#[derive(Default, Clone)]
pub struct InMemoryRequestStore {
    table: Arc<RwLock<RequestTable>>,
}

impl InMemoryRequestStore {
    /// Creates a new, empty in-memory request store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records ever stored, terminal ones included.
    pub async fn len(&self) -> usize {
        self.table.read().await.requests.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl RequestStore for InMemoryRequestStore {
    async fn insert_if_idle(&self, request: ConsultationRequest) -> Result<InsertOutcome> {
        let mut table = self.table.write().await;
        if let Some(existing) = table.active.get(&request.practitioner_id) {
            return Ok(InsertOutcome::PractitionerBusy(*existing));
        }
        if request.status.is_active() {
            table.active.insert(request.practitioner_id, request.id);
        }
        table.requests.insert(request.id, request.clone());
        Ok(InsertOutcome::Inserted(request))
    }

    async fn get(&self, id: Uuid) -> Result<Option<ConsultationRequest>> {
        let table = self.table.read().await;
        Ok(table.requests.get(&id).cloned())
    }

    async fn compare_and_set(
        &self,
        expected_version: u64,
        next: ConsultationRequest,
    ) -> Result<CasOutcome> {
        let mut table = self.table.write().await;
        let current = table
            .requests
            .get(&next.id)
            .ok_or(ConsultationError::NotFound(next.id))?;

        if current.version != expected_version {
            return Ok(CasOutcome::Conflict(current.clone()));
        }

        if !next.status.is_active()
            && table.active.get(&next.practitioner_id) == Some(&next.id)
        {
            table.active.remove(&next.practitioner_id);
        }
        table.requests.insert(next.id, next.clone());
        Ok(CasOutcome::Applied(next))
    }

    async fn overdue_pending(&self, now: DateTime<Utc>) -> Result<Vec<ConsultationRequest>> {
        let table = self.table.read().await;
        Ok(table
            .active
            .values()
            .filter_map(|id| table.requests.get(id))
            .filter(|request| request.is_overdue(now))
            .cloned()
            .collect())
    }
}

/// Seed format for [`InMemoryDirectory`], as loaded by the service binary.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DirectorySnapshot {
    #[serde(default)]
    pub practitioners: Vec<PractitionerProfile>,
    #[serde(default)]
    pub patients: Vec<Uuid>,
}

impl DirectorySnapshot {
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

#[derive(Default)]
struct DirectoryTable {
    practitioners: HashMap<Uuid, PractitionerProfile>,
    patients: HashSet<Uuid>,
}

/// In-process stand-in for the practitioner/patient directory service.
#[derive(Default, Clone)]
pub struct InMemoryDirectory {
    table: Arc<RwLock<DirectoryTable>>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(snapshot: DirectorySnapshot) -> Self {
        let table = DirectoryTable {
            practitioners: snapshot
                .practitioners
                .into_iter()
                .map(|profile| (profile.id, profile))
                .collect(),
            patients: snapshot.patients.into_iter().collect(),
        };
        Self {
            table: Arc::new(RwLock::new(table)),
        }
    }

    pub async fn upsert_practitioner(&self, profile: PractitionerProfile) {
        let mut table = self.table.write().await;
        table.practitioners.insert(profile.id, profile);
    }

    pub async fn add_patient(&self, patient_id: Uuid) {
        let mut table = self.table.write().await;
        table.patients.insert(patient_id);
    }

    /// Flips the availability flag; returns false when the practitioner is unknown.
    pub async fn set_available(&self, practitioner_id: Uuid, available: bool) -> bool {
        let mut table = self.table.write().await;
        match table.practitioners.get_mut(&practitioner_id) {
            Some(profile) => {
                profile.available = available;
                true
            }
            None => false,
        }
    }
}

#[async_trait]
impl Directory for InMemoryDirectory {
    async fn practitioner(&self, id: Uuid) -> Result<Option<PractitionerProfile>> {
        let table = self.table.read().await;
        Ok(table.practitioners.get(&id).cloned())
    }

    async fn patient_exists(&self, id: Uuid) -> Result<bool> {
        let table = self.table.read().await;
        Ok(table.patients.contains(&id))
    }
}
