#![allow(dead_code)]

use chrono::{DateTime, Duration, TimeZone, Utc};
use instaconsult::application::engine::ConsultationEngine;
use instaconsult::config::EngineConfig;
use instaconsult::domain::consultation::{ConsultationRequest, Fee};
use instaconsult::domain::ports::{Clock, ClockBox, PractitionerProfile};
use instaconsult::infrastructure::clock::ManualClock;
use instaconsult::infrastructure::in_memory::{InMemoryDirectory, InMemoryRequestStore};
use instaconsult::infrastructure::simulated::{SimulatedPaymentProcessor, SimulatedRoomProvisioner};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

pub const COMPLAINT: &str = "fever and sore throat since yesterday";

/// An engine on a manual clock, with handles to every collaborator.
pub struct Harness {
    pub engine: Arc<ConsultationEngine>,
    pub clock: ManualClock,
    pub store: InMemoryRequestStore,
    pub directory: InMemoryDirectory,
    pub payments: SimulatedPaymentProcessor,
    pub rooms: SimulatedRoomProvisioner,
    pub patient: Uuid,
    /// Charges 500.
    pub practitioner: Uuid,
    /// Charges nothing.
    pub free_practitioner: Uuid,
}

pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap()
}

impl Harness {
    pub async fn new() -> Self {
        Self::with_config(EngineConfig::default()).await
    }

    pub async fn with_config(config: EngineConfig) -> Self {
        let clock = ManualClock::new(t0());
        Self::build(config, clock.clone(), Box::new(clock)).await
    }

    /// The engine reads `instants` in order, one per clock read, and then
    /// stays on the last one. `clock` is left at `t0`.
    pub async fn scripted(instants: Vec<DateTime<Utc>>) -> Self {
        let clock = ManualClock::new(t0());
        Self::build(
            EngineConfig::default(),
            clock,
            Box::new(ScriptedClock::new(instants)),
        )
        .await
    }

    async fn build(config: EngineConfig, clock: ManualClock, engine_clock: ClockBox) -> Self {
        let store = InMemoryRequestStore::new();
        let directory = InMemoryDirectory::new();
        let payments = SimulatedPaymentProcessor::new();
        let rooms = SimulatedRoomProvisioner::new();

        let patient = Uuid::new_v4();
        directory.add_patient(patient).await;
        let practitioner = add_practitioner(&directory, dec!(500)).await;
        let free_practitioner = add_practitioner(&directory, dec!(0)).await;

        let engine = ConsultationEngine::new(
            Box::new(store.clone()),
            Box::new(directory.clone()),
            Box::new(payments.clone()),
            Box::new(rooms.clone()),
        )
        .with_clock(engine_clock)
        .with_config(config);

        Self {
            engine: Arc::new(engine),
            clock,
            store,
            directory,
            payments,
            rooms,
            patient,
            practitioner,
            free_practitioner,
        }
    }

    pub async fn new_patient(&self) -> Uuid {
        let patient = Uuid::new_v4();
        self.directory.add_patient(patient).await;
        patient
    }

    pub async fn request(&self) -> ConsultationRequest {
        self.engine
            .create_request(self.patient, self.practitioner, COMPLAINT.to_string())
            .await
            .expect("create_request failed")
    }

    pub async fn free_request(&self) -> ConsultationRequest {
        self.engine
            .create_request(self.patient, self.free_practitioner, COMPLAINT.to_string())
            .await
            .expect("create_request failed")
    }

    /// A request the practitioner has accepted and the patient has paid for.
    pub async fn ready_request(&self) -> ConsultationRequest {
        let request = self.request().await;
        self.engine
            .respond(
                request.id,
                self.practitioner,
                instaconsult::domain::consultation::Decision::Accept,
            )
            .await
            .expect("accept failed");
        self.engine
            .capture_payment(
                request.id,
                self.patient,
                instaconsult::domain::consultation::PaymentMethod::Card,
            )
            .await
            .expect("payment failed")
    }

    pub async fn stored(&self, id: Uuid) -> ConsultationRequest {
        use instaconsult::domain::ports::RequestStore;
        self.store
            .get(id)
            .await
            .expect("store read failed")
            .expect("request missing")
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn advance_secs(&self, secs: i64) {
        self.clock.advance(Duration::seconds(secs));
    }
}

pub async fn add_practitioner(directory: &InMemoryDirectory, fee: Decimal) -> Uuid {
    let id = Uuid::new_v4();
    directory
        .upsert_practitioner(PractitionerProfile {
            id,
            display_name: format!("Dr. {}", &id.simple().to_string()[..6]),
            available: true,
            fee: Fee::new(fee).unwrap(),
        })
        .await;
    id
}

/// Hands out a fixed sequence of instants, repeating the last one.
pub struct ScriptedClock {
    instants: Mutex<VecDeque<DateTime<Utc>>>,
    last: Mutex<DateTime<Utc>>,
}

impl ScriptedClock {
    pub fn new(instants: Vec<DateTime<Utc>>) -> Self {
        Self {
            instants: Mutex::new(instants.into()),
            last: Mutex::new(t0()),
        }
    }
}

impl Clock for ScriptedClock {
    fn now(&self) -> DateTime<Utc> {
        let mut last = self.last.lock().unwrap();
        if let Some(next) = self.instants.lock().unwrap().pop_front() {
            *last = next;
        }
        *last
    }
}

pub fn at(secs: i64) -> DateTime<Utc> {
    t0() + Duration::seconds(secs)
}
