//! Tests for the incident creation workflow.
//!
//! These run against `db::mock::MemoryStore`, so no MySQL server is needed.
//! The store's operation journal shows exactly which statements the workflow
//! issued and in what order.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use db::mock::{Faults, MemoryStore, StoreOp};
use db::{ConstraintKind, DbError, IncidentStore};

use crate::error::CreationCause;
use crate::payload::IncidentPayload;
use crate::transaction::{ScopedTransaction, TxState};
use crate::workflow::{IncidentCreator, WorkflowConfig};
use crate::EngineError;

fn store() -> MemoryStore {
    MemoryStore::new()
        .with_user(1, "Dana Reyes")
        .with_user(5, "Sam Okafor")
        .with_user(7, "Lee Park")
}

fn creator(store: &MemoryStore) -> IncidentCreator {
    IncidentCreator::new(Arc::new(store.clone()), WorkflowConfig::default())
}

/// The structure-fire report used throughout: two crew members, one
/// without a role.
fn structure_fire() -> IncidentPayload {
    serde_json::from_value(json!({
        "incident_type": "fire",
        "priority": "high",
        "address": "123 Main St",
        "city": "Anytown",
        "state": "NY",
        "zip_code": "10001",
        "description": "Structure fire",
        "created_by_user_id": 1,
        "initial_crew": [
            { "user_id": 5, "role_on_incident": "Captain" },
            { "user_id": 7 }
        ]
    }))
    .expect("valid payload json")
}

fn has_op(journal: &[StoreOp], pred: impl Fn(&StoreOp) -> bool) -> bool {
    journal.iter().any(pred)
}

// ============================================================
// Success path
// ============================================================

#[tokio::test]
async fn structure_fire_creates_incident_and_two_crew_rows() {
    let store = store();
    let created = creator(&store).create_incident(&structure_fire()).await.unwrap();

    assert!(created.incident_id > 0);
    assert_eq!(created.crew_count, 2);

    let incident = store.get_incident(created.incident_id).await.unwrap();
    assert_eq!(incident.status, "active");
    assert_eq!(incident.incident_type, "fire");

    let crew = store.list_crew(created.incident_id).await.unwrap();
    assert_eq!(crew.len(), 2);
    let captain = crew.iter().find(|c| c.user_id == 5).unwrap();
    let second = crew.iter().find(|c| c.user_id == 7).unwrap();
    assert_eq!(captain.role_on_incident, "Captain");
    assert_eq!(second.role_on_incident, "Firefighter");

    assert_eq!(
        store.journal(),
        vec![
            StoreOp::Begin,
            StoreOp::InsertIncident,
            StoreOp::InsertCrew { incident_id: created.incident_id, rows: 2 },
            StoreOp::Commit,
        ]
    );
}

#[tokio::test]
async fn empty_crew_skips_the_crew_insert() {
    let store = store();
    let mut payload = structure_fire();
    payload.initial_crew.clear();

    let created = creator(&store).create_incident(&payload).await.unwrap();

    assert_eq!(created.crew_count, 0);
    assert!(store.list_crew(created.incident_id).await.unwrap().is_empty());
    assert!(!has_op(&store.journal(), |op| matches!(op, StoreOp::InsertCrew { .. })));
}

#[tokio::test]
async fn identical_payloads_create_distinct_incidents() {
    let store = store();
    let creator = creator(&store);
    let payload = structure_fire();

    let first = creator.create_incident(&payload).await.unwrap();
    let second = creator.create_incident(&payload).await.unwrap();

    assert_ne!(first.incident_id, second.incident_id);
    assert_eq!(store.incident_count(), 2);
    assert_eq!(store.crew_rows().len(), 4);
}

#[tokio::test]
async fn concurrent_creations_get_distinct_ids() {
    let store = store();
    let creator = Arc::new(creator(&store));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let creator = Arc::clone(&creator);
            tokio::spawn(async move { creator.create_incident(&structure_fire()).await })
        })
        .collect();

    let mut ids = HashSet::new();
    for handle in handles {
        let created = handle.await.unwrap().unwrap();
        assert!(ids.insert(created.incident_id));
    }
    assert_eq!(store.incident_count(), 8);
}

// ============================================================
// Failure paths
// ============================================================

#[tokio::test]
async fn invalid_crew_member_rolls_back_the_incident() {
    let store = store();
    let mut payload = structure_fire();
    payload.initial_crew[1].user_id = 99;

    let err = creator(&store).create_incident(&payload).await.unwrap_err();

    match &err {
        EngineError::CreationFailed { cause: CreationCause::Storage(db_err) } => {
            assert!(db_err.is_constraint(ConstraintKind::ForeignKey));
        }
        other => panic!("expected CreationFailed, got {other:?}"),
    }
    assert_eq!(store.incident_count(), 0);
    assert!(store.crew_rows().is_empty());

    // The id allocated inside the rolled-back transaction is not readable.
    assert!(matches!(store.get_incident(1).await, Err(DbError::NotFound)));

    let journal = store.journal();
    assert_eq!(journal.last(), Some(&StoreOp::Rollback));
    assert!(!has_op(&journal, |op| *op == StoreOp::Commit));
}

#[tokio::test]
async fn incident_insert_failure_never_reaches_crew_insert() {
    let store = store();
    store.set_faults(Faults { fail_insert_incident: true, ..Default::default() });

    let err = creator(&store).create_incident(&structure_fire()).await.unwrap_err();

    assert!(matches!(err, EngineError::CreationFailed { .. }));
    assert_eq!(
        store.journal(),
        vec![StoreOp::Begin, StoreOp::InsertIncident, StoreOp::Rollback]
    );
}

#[tokio::test]
async fn unknown_creator_fails_without_writing() {
    let store = store();
    let mut payload = structure_fire();
    payload.created_by_user_id = Some(404);

    let err = creator(&store).create_incident(&payload).await.unwrap_err();

    assert!(matches!(
        err,
        EngineError::CreationFailed { cause: CreationCause::Storage(DbError::Constraint { .. }) }
    ));
    assert_eq!(store.incident_count(), 0);
}

#[tokio::test]
async fn rollback_failure_does_not_replace_the_original_error() {
    let store = store();
    store.set_faults(Faults {
        fail_crew_insert: true,
        fail_rollback: true,
        ..Default::default()
    });

    let err = creator(&store).create_incident(&structure_fire()).await.unwrap_err();

    let msg = err.to_string();
    assert!(msg.contains("crew insert"), "unexpected error: {msg}");
    assert!(!msg.contains("rollback"), "unexpected error: {msg}");
    assert_eq!(store.journal().last(), Some(&StoreOp::Rollback));
    assert_eq!(store.incident_count(), 0);
}

#[tokio::test]
async fn commit_failure_is_reported_and_nothing_is_visible() {
    let store = store();
    store.set_faults(Faults { fail_commit: true, ..Default::default() });

    let err = creator(&store).create_incident(&structure_fire()).await.unwrap_err();

    assert!(matches!(err, EngineError::CreationFailed { cause: CreationCause::Storage(_) }));
    assert_eq!(store.incident_count(), 0);
    assert!(!has_op(&store.journal(), |op| *op == StoreOp::Rollback));
}

#[tokio::test]
async fn begin_failure_is_a_creation_failure() {
    let store = store();
    store.set_faults(Faults { fail_begin: true, ..Default::default() });

    let err = creator(&store).create_incident(&structure_fire()).await.unwrap_err();

    assert!(matches!(
        err,
        EngineError::CreationFailed { cause: CreationCause::Storage(DbError::Unavailable(_)) }
    ));
    assert_eq!(store.journal(), vec![StoreOp::Begin]);
}

#[tokio::test(start_paused = true)]
async fn stalled_transaction_times_out_and_rolls_back() {
    let store = store();
    store.set_faults(Faults {
        stall_crew_insert: Some(Duration::from_secs(60)),
        ..Default::default()
    });
    let creator = IncidentCreator::new(
        Arc::new(store.clone()),
        WorkflowConfig {
            transaction_timeout: Duration::from_secs(1),
            ..Default::default()
        },
    );

    let err = creator.create_incident(&structure_fire()).await.unwrap_err();

    assert!(matches!(
        err,
        EngineError::CreationFailed { cause: CreationCause::Timeout(d) } if d == Duration::from_secs(1)
    ));
    assert_eq!(store.incident_count(), 0);
    assert_eq!(store.journal().last(), Some(&StoreOp::Rollback));
}

#[tokio::test(start_paused = true)]
async fn late_commit_acknowledgement_is_still_a_success() {
    let store = store();
    store.set_faults(Faults {
        delay_commit_ack: Some(Duration::from_secs(30)),
        ..Default::default()
    });
    let creator = IncidentCreator::new(
        Arc::new(store.clone()),
        WorkflowConfig {
            transaction_timeout: Duration::from_secs(1),
            ..Default::default()
        },
    );

    let created = creator.create_incident(&structure_fire()).await.unwrap();

    assert_eq!(store.incident_count(), 1);
    assert_eq!(store.list_crew(created.incident_id).await.unwrap().len(), 2);
    assert!(!has_op(&store.journal(), |op| *op == StoreOp::Rollback));
}

#[tokio::test]
async fn invalid_payload_never_begins_a_transaction() {
    let store = store();
    let mut payload = structure_fire();
    payload.address = None;

    let err = creator(&store).create_incident(&payload).await.unwrap_err();

    assert!(matches!(err, EngineError::Validation(_)));
    assert!(store.journal().is_empty());
}

#[tokio::test]
async fn public_detail_does_not_leak_constraint_text() {
    let store = store();
    let mut payload = structure_fire();
    payload.initial_crew[0].user_id = 99;

    let err = creator(&store).create_incident(&payload).await.unwrap_err();

    assert!(err.to_string().contains("fk_crew_user"));
    let detail = err.public_detail();
    assert!(!detail.contains("fk_crew_user"));
    assert!(!detail.contains("CONSTRAINT"));
}

// ============================================================
// Scoped transaction guard
// ============================================================

#[tokio::test]
async fn dropping_an_open_guard_discards_its_writes() {
    let store = store();
    let valid = structure_fire().validate().unwrap();

    {
        let mut tx = ScopedTransaction::begin(&store).await.unwrap();
        assert_eq!(tx.state(), TxState::Open);
        tx.insert_incident(&valid.incident).await.unwrap();
    }

    assert_eq!(store.incident_count(), 0);
    assert!(!has_op(&store.journal(), |op| *op == StoreOp::Commit));
}

#[tokio::test]
async fn guard_commit_makes_rows_visible() {
    let store = store();
    let valid = structure_fire().validate().unwrap();

    let mut tx = ScopedTransaction::begin(&store).await.unwrap();
    let id = tx.insert_incident(&valid.incident).await.unwrap();
    tx.insert_crew_assignments(id, &valid.crew).await.unwrap();
    tx.commit().await.unwrap();

    assert_eq!(store.list_crew(id).await.unwrap().len(), 2);
}
