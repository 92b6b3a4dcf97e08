mod common;

use common::Harness;
use instaconsult::domain::consultation::{ConsultationStatus, Decision};
use instaconsult::domain::ports::{CasOutcome, RequestStore};
use instaconsult::error::ConsultationError;

#[tokio::test]
async fn test_double_accept_is_idempotent() {
    let h = Harness::new().await;
    let request = h.request().await;

    let first = h
        .engine
        .respond(request.id, h.practitioner, Decision::Accept)
        .await
        .unwrap();
    let second = h
        .engine
        .respond(request.id, h.practitioner, Decision::Accept)
        .await
        .unwrap();

    assert_eq!(first.status, ConsultationStatus::Waiting);
    assert_eq!(second.status, ConsultationStatus::Waiting);
    assert_eq!(second.version, 1);
    assert_eq!(h.payments.captures(), 0);
    assert_eq!(h.rooms.provisioned(), 0);
}

#[tokio::test]
async fn test_reject_frees_practitioner() {
    let h = Harness::new().await;
    let request = h.request().await;

    let rejected = h
        .engine
        .respond(request.id, h.practitioner, Decision::Reject)
        .await
        .unwrap();
    assert_eq!(rejected.status, ConsultationStatus::Rejected);

    let accept_after_reject = h
        .engine
        .respond(request.id, h.practitioner, Decision::Accept)
        .await
        .unwrap_err();
    assert!(matches!(
        accept_after_reject,
        ConsultationError::InvalidTransition {
            from: ConsultationStatus::Rejected,
            to: ConsultationStatus::Waiting,
        }
    ));

    let patient = h.new_patient().await;
    assert!(
        h.engine
            .create_request(patient, h.practitioner, common::COMPLAINT.to_string())
            .await
            .is_ok()
    );
}

#[tokio::test]
async fn test_only_assigned_practitioner_may_respond() {
    let h = Harness::new().await;
    let request = h.request().await;

    let by_patient = h
        .engine
        .respond(request.id, h.patient, Decision::Accept)
        .await;
    assert!(matches!(by_patient, Err(ConsultationError::Unauthorized)));

    let by_stranger = h
        .engine
        .respond(request.id, h.free_practitioner, Decision::Accept)
        .await;
    assert!(matches!(by_stranger, Err(ConsultationError::Unauthorized)));
    assert_eq!(h.stored(request.id).await.version, 0);
}

#[tokio::test]
async fn test_unknown_request_is_not_found() {
    let h = Harness::new().await;
    let missing = uuid::Uuid::new_v4();
    let err = h
        .engine
        .respond(missing, h.practitioner, Decision::Accept)
        .await
        .unwrap_err();
    assert!(matches!(err, ConsultationError::NotFound(id) if id == missing));
}

#[tokio::test]
async fn test_late_accept_is_deadline_passed() {
    let h = Harness::new().await;
    let request = h.request().await;
    h.advance_secs(61);

    let err = h
        .engine
        .respond(request.id, h.practitioner, Decision::Accept)
        .await
        .unwrap_err();
    assert!(matches!(err, ConsultationError::DeadlinePassed));

    let stored = h.stored(request.id).await;
    assert_eq!(stored.status, ConsultationStatus::Expired);
    assert_eq!(stored.version, 1);

    // The repeat sees the expiry already written and changes nothing.
    let again = h
        .engine
        .respond(request.id, h.practitioner, Decision::Reject)
        .await
        .unwrap_err();
    assert!(matches!(again, ConsultationError::DeadlinePassed));
    assert_eq!(h.stored(request.id).await.version, 1);
}

#[tokio::test]
async fn test_accept_and_expiry_cas_race_has_one_winner() {
    let h = Harness::new().await;
    let request = h.request().await;
    let snapshot = h.stored(request.id).await;
    let now = common::t0() + chrono::Duration::seconds(30);

    let accepted = snapshot.responded(Decision::Accept, now).unwrap();
    let expired = snapshot.expired(now).unwrap();

    let (a, b) = tokio::join!(
        h.store.compare_and_set(snapshot.version, accepted),
        h.store.compare_and_set(snapshot.version, expired),
    );
    let outcomes = [a.unwrap(), b.unwrap()];
    let applied: Vec<_> = outcomes
        .iter()
        .filter_map(|o| match o {
            CasOutcome::Applied(r) => Some(r.status),
            CasOutcome::Conflict(_) => None,
        })
        .collect();

    assert_eq!(applied.len(), 1);
    let stored = h.stored(request.id).await;
    assert_eq!(stored.status, applied[0]);
    assert!(matches!(
        stored.status,
        ConsultationStatus::Waiting | ConsultationStatus::Expired
    ));
    assert_eq!(stored.version, 1);
}

#[tokio::test]
async fn test_accept_racing_sweep_at_deadline() {
    for _ in 0..20 {
        let h = Harness::new().await;
        let request = h.request().await;
        h.advance_secs(61);

        let (respond, sweep) = tokio::join!(
            h.engine
                .respond(request.id, h.practitioner, Decision::Accept),
            h.engine.sweep_expired(),
        );
        assert!(matches!(respond, Err(ConsultationError::DeadlinePassed)));
        assert_eq!(sweep.unwrap().failed, 0);

        let stored = h.stored(request.id).await;
        assert_eq!(stored.status, ConsultationStatus::Expired);
        assert_eq!(stored.version, 1);
    }
}

#[tokio::test]
async fn test_concurrent_accepts_write_once() {
    let h = Harness::new().await;
    let request = h.request().await;

    let mut handles = Vec::new();
    for _ in 0..8 {
        let engine = h.engine.clone();
        let practitioner = h.practitioner;
        let id = request.id;
        handles.push(tokio::spawn(async move {
            engine.respond(id, practitioner, Decision::Accept).await
        }));
    }
    for handle in handles {
        let record = handle.await.unwrap().unwrap();
        assert_eq!(record.status, ConsultationStatus::Waiting);
    }
    assert_eq!(h.stored(request.id).await.version, 1);
}

#[tokio::test]
async fn test_accept_after_patient_cancel_is_invalid() {
    let h = Harness::new().await;
    let request = h.request().await;
    h.engine
        .cancel(request.id, h.patient, "no longer needed".to_string())
        .await
        .unwrap();

    let err = h
        .engine
        .respond(request.id, h.practitioner, Decision::Accept)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ConsultationError::InvalidTransition {
            from: ConsultationStatus::Cancelled,
            ..
        }
    ));
}

#[tokio::test]
async fn test_deadline_passing_mid_write_records_expiry() {
    // Fresh at the lazy check, overdue by the time the write is attempted.
    let h = Harness::scripted(vec![common::at(0), common::at(59), common::at(61)]).await;
    let request = h.request().await;

    let err = h
        .engine
        .respond(request.id, h.practitioner, Decision::Accept)
        .await
        .unwrap_err();
    assert!(matches!(err, ConsultationError::DeadlinePassed));

    let stored = h.stored(request.id).await;
    assert_eq!(stored.status, ConsultationStatus::Expired);
    assert_eq!(stored.version, 1);
}
