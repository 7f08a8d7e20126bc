//! `MemoryStore`: an in-memory test double for `IncidentStore`.
//!
//! Mirrors the storage rules the workflow depends on: staged writes are
//! invisible until commit, foreign keys and the `(incident_id, user_id)`
//! uniqueness are enforced, and identifiers are allocated monotonically and
//! never reused after a rollback. Faults can be injected per operation.

use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;

use crate::{
    ConstraintKind, DbError,
    models::{CrewAssignmentRow, CrewMember, IncidentFilter, IncidentRow, IncidentStatus, NewIncident},
    store::{IncidentStore, IncidentTx},
};

/// One call observed by the store, in call order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreOp {
    Begin,
    InsertIncident,
    InsertCrew { incident_id: u64, rows: usize },
    Commit,
    Rollback,
}

/// Failures to inject into the next transactions.
#[derive(Debug, Clone, Default)]
pub struct Faults {
    pub fail_begin: bool,
    pub fail_insert_incident: bool,
    pub fail_crew_insert: bool,
    pub fail_commit: bool,
    pub fail_rollback: bool,
    /// Sleep this long inside the crew insert before doing any work.
    pub stall_crew_insert: Option<Duration>,
    /// Apply the commit, then sleep this long before acknowledging it.
    pub delay_commit_ack: Option<Duration>,
}

#[derive(Debug, Default)]
struct MemoryState {
    users: BTreeMap<u64, String>,
    incidents: BTreeMap<u64, IncidentRow>,
    crew: Vec<CrewAssignmentRow>,
    last_id: u64,
    journal: Vec<StoreOp>,
    faults: Faults,
}

impl MemoryState {
    fn unknown_user(user_id: u64, constraint: &str) -> DbError {
        DbError::Constraint {
            kind: ConstraintKind::ForeignKey,
            message: format!(
                "Cannot add or update a child row: a foreign key constraint fails \
                 (CONSTRAINT `{constraint}`, user_id={user_id})"
            ),
        }
    }

    fn crew_row(&self, incident_id: u64, member: &CrewMember) -> CrewAssignmentRow {
        CrewAssignmentRow {
            incident_id,
            user_id: member.user_id,
            full_name: self.users.get(&member.user_id).cloned(),
            role_on_incident: member.role_on_incident.clone(),
            assigned_at: Utc::now(),
        }
    }
}

/// In-memory [`IncidentStore`]. Clones share the same data.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a user that foreign keys may reference.
    pub fn with_user(self, user_id: u64, full_name: impl Into<String>) -> Self {
        self.state.lock().unwrap().users.insert(user_id, full_name.into());
        self
    }

    /// Register several users with generated names.
    pub fn with_users(self, ids: impl IntoIterator<Item = u64>) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            for id in ids {
                state.users.insert(id, format!("User {id}"));
            }
        }
        self
    }

    /// Replace the injected faults for subsequent operations.
    pub fn set_faults(&self, faults: Faults) {
        self.state.lock().unwrap().faults = faults;
    }

    /// Every operation seen so far.
    pub fn journal(&self) -> Vec<StoreOp> {
        self.state.lock().unwrap().journal.clone()
    }

    /// Number of committed incident rows.
    pub fn incident_count(&self) -> usize {
        self.state.lock().unwrap().incidents.len()
    }

    /// Every committed crew row, across all incidents.
    pub fn crew_rows(&self) -> Vec<CrewAssignmentRow> {
        self.state.lock().unwrap().crew.clone()
    }
}

/// A transaction whose writes are staged locally until commit.
pub struct MemoryTx {
    state: Arc<Mutex<MemoryState>>,
    faults: Faults,
    staged_incidents: Vec<IncidentRow>,
    staged_crew: Vec<CrewAssignmentRow>,
}

#[async_trait]
impl IncidentTx for MemoryTx {
    async fn insert_incident(&mut self, incident: &NewIncident) -> Result<u64, DbError> {
        let mut state = self.state.lock().unwrap();
        state.journal.push(StoreOp::InsertIncident);

        if self.faults.fail_insert_incident {
            return Err(DbError::Unavailable("connection lost during insert".into()));
        }
        if !state.users.contains_key(&incident.created_by_user_id) {
            return Err(MemoryState::unknown_user(
                incident.created_by_user_id,
                "fk_incidents_creator",
            ));
        }

        state.last_id += 1;
        let now = Utc::now();
        let row = IncidentRow {
            incident_id: state.last_id,
            incident_type: incident.incident_type.as_str().to_string(),
            priority: incident.priority.as_str().to_string(),
            status: incident.status.as_str().to_string(),
            address: incident.address.clone(),
            city: incident.city.clone(),
            state: incident.state.clone(),
            zip_code: incident.zip_code.clone(),
            latitude: incident.latitude,
            longitude: incident.longitude,
            description: incident.description.clone(),
            created_by_user_id: incident.created_by_user_id,
            created_at: now,
            updated_at: now,
        };
        let id = row.incident_id;
        self.staged_incidents.push(row);
        Ok(id)
    }

    async fn insert_crew_assignments(
        &mut self,
        incident_id: u64,
        members: &[CrewMember],
    ) -> Result<(), DbError> {
        if let Some(stall) = self.faults.stall_crew_insert {
            tokio::time::sleep(stall).await;
        }

        let state_handle = Arc::clone(&self.state);
        let mut state = state_handle.lock().unwrap();
        state.journal.push(StoreOp::InsertCrew { incident_id, rows: members.len() });

        if self.faults.fail_crew_insert {
            return Err(DbError::Unavailable("connection lost during crew insert".into()));
        }

        let parent_visible = state.incidents.contains_key(&incident_id)
            || self.staged_incidents.iter().any(|i| i.incident_id == incident_id);
        if !parent_visible {
            return Err(DbError::Constraint {
                kind: ConstraintKind::ForeignKey,
                message: format!("CONSTRAINT `fk_crew_incident`, incident_id={incident_id}"),
            });
        }

        // The statement is all-or-nothing: check every row before staging any.
        let mut seen: HashSet<u64> = state
            .crew
            .iter()
            .chain(self.staged_crew.iter())
            .filter(|c| c.incident_id == incident_id)
            .map(|c| c.user_id)
            .collect();
        for member in members {
            if !state.users.contains_key(&member.user_id) {
                return Err(MemoryState::unknown_user(member.user_id, "fk_crew_user"));
            }
            if !seen.insert(member.user_id) {
                return Err(DbError::Constraint {
                    kind: ConstraintKind::Unique,
                    message: format!("Duplicate entry '{incident_id}-{}'", member.user_id),
                });
            }
        }

        let rows: Vec<CrewAssignmentRow> =
            members.iter().map(|m| state.crew_row(incident_id, m)).collect();
        self.staged_crew.extend(rows);
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), DbError> {
        let this = *self;
        {
            let mut state = this.state.lock().unwrap();
            state.journal.push(StoreOp::Commit);

            if this.faults.fail_commit {
                return Err(DbError::Unavailable("connection lost during commit".into()));
            }

            for row in this.staged_incidents {
                state.incidents.insert(row.incident_id, row);
            }
            state.crew.extend(this.staged_crew);
        }

        // The writes are already durable; only the acknowledgement is late.
        if let Some(delay) = this.faults.delay_commit_ack {
            tokio::time::sleep(delay).await;
        }
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), DbError> {
        let mut state = self.state.lock().unwrap();
        state.journal.push(StoreOp::Rollback);

        if self.faults.fail_rollback {
            return Err(DbError::Unavailable("connection dropped during rollback".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl IncidentStore for MemoryStore {
    async fn begin(&self) -> Result<Box<dyn IncidentTx>, DbError> {
        let faults = {
            let mut state = self.state.lock().unwrap();
            state.journal.push(StoreOp::Begin);
            state.faults.clone()
        };
        if faults.fail_begin {
            return Err(DbError::Unavailable("connection refused".into()));
        }
        Ok(Box::new(MemoryTx {
            state: Arc::clone(&self.state),
            faults,
            staged_incidents: Vec::new(),
            staged_crew: Vec::new(),
        }))
    }

    async fn get_incident(&self, incident_id: u64) -> Result<IncidentRow, DbError> {
        self.state
            .lock()
            .unwrap()
            .incidents
            .get(&incident_id)
            .cloned()
            .ok_or(DbError::NotFound)
    }

    async fn list_incidents(&self, filter: &IncidentFilter) -> Result<Vec<IncidentRow>, DbError> {
        let state = self.state.lock().unwrap();
        let mut rows: Vec<IncidentRow> = state
            .incidents
            .values()
            .filter(|row| filter.matches(row))
            .cloned()
            .collect();
        rows.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then(b.incident_id.cmp(&a.incident_id))
        });
        Ok(rows)
    }

    async fn list_crew(&self, incident_id: u64) -> Result<Vec<CrewAssignmentRow>, DbError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .crew
            .iter()
            .filter(|c| c.incident_id == incident_id)
            .cloned()
            .collect())
    }

    async fn add_crew_member(&self, incident_id: u64, member: &CrewMember) -> Result<(), DbError> {
        let mut state = self.state.lock().unwrap();
        if !state.incidents.contains_key(&incident_id) {
            return Err(DbError::Constraint {
                kind: ConstraintKind::ForeignKey,
                message: format!("CONSTRAINT `fk_crew_incident`, incident_id={incident_id}"),
            });
        }
        if !state.users.contains_key(&member.user_id) {
            return Err(MemoryState::unknown_user(member.user_id, "fk_crew_user"));
        }
        if state
            .crew
            .iter()
            .any(|c| c.incident_id == incident_id && c.user_id == member.user_id)
        {
            return Err(DbError::Constraint {
                kind: ConstraintKind::Unique,
                message: format!("Duplicate entry '{incident_id}-{}'", member.user_id),
            });
        }
        let row = state.crew_row(incident_id, member);
        state.crew.push(row);
        Ok(())
    }

    async fn update_status(&self, incident_id: u64, status: IncidentStatus) -> Result<(), DbError> {
        let mut state = self.state.lock().unwrap();
        let row = state.incidents.get_mut(&incident_id).ok_or(DbError::NotFound)?;
        row.status = status.as_str().to_string();
        row.updated_at = Utc::now();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{IncidentType, Priority};

    fn sample(creator: u64) -> NewIncident {
        NewIncident {
            incident_type: IncidentType::Fire,
            priority: Priority::High,
            status: IncidentStatus::Active,
            address: "1 Station Rd".into(),
            city: "Anytown".into(),
            state: "NY".into(),
            zip_code: "10001".into(),
            latitude: None,
            longitude: None,
            description: "test".into(),
            created_by_user_id: creator,
        }
    }

    #[tokio::test]
    async fn staged_rows_are_invisible_until_commit() {
        let store = MemoryStore::new().with_users([1, 5]);
        let mut tx = store.begin().await.unwrap();
        let id = tx.insert_incident(&sample(1)).await.unwrap();
        tx.insert_crew_assignments(id, &[CrewMember::new(5, None)]).await.unwrap();

        assert!(matches!(store.get_incident(id).await, Err(DbError::NotFound)));
        tx.commit().await.unwrap();

        assert_eq!(store.get_incident(id).await.unwrap().incident_id, id);
        assert_eq!(store.list_crew(id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn rolled_back_ids_are_not_reused() {
        let store = MemoryStore::new().with_users([1]);

        let mut tx = store.begin().await.unwrap();
        let first = tx.insert_incident(&sample(1)).await.unwrap();
        tx.rollback().await.unwrap();

        let mut tx = store.begin().await.unwrap();
        let second = tx.insert_incident(&sample(1)).await.unwrap();
        tx.commit().await.unwrap();

        assert!(second > first);
        assert_eq!(store.incident_count(), 1);
    }

    #[tokio::test]
    async fn crew_insert_checks_every_row_before_staging() {
        let store = MemoryStore::new().with_users([1, 5]);
        let mut tx = store.begin().await.unwrap();
        let id = tx.insert_incident(&sample(1)).await.unwrap();

        let err = tx
            .insert_crew_assignments(id, &[CrewMember::new(5, None), CrewMember::new(99, None)])
            .await
            .unwrap_err();
        assert!(err.is_constraint(ConstraintKind::ForeignKey));

        tx.commit().await.unwrap();
        assert!(store.list_crew(id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn duplicate_member_in_one_batch_is_a_unique_violation() {
        let store = MemoryStore::new().with_users([1, 5]);
        let mut tx = store.begin().await.unwrap();
        let id = tx.insert_incident(&sample(1)).await.unwrap();
        let err = tx
            .insert_crew_assignments(id, &[CrewMember::new(5, None), CrewMember::new(5, Some("Captain"))])
            .await
            .unwrap_err();
        assert!(err.is_constraint(ConstraintKind::Unique));
    }

    #[tokio::test]
    async fn unknown_creator_is_a_foreign_key_violation() {
        let store = MemoryStore::new();
        let mut tx = store.begin().await.unwrap();
        let err = tx.insert_incident(&sample(42)).await.unwrap_err();
        assert!(err.is_constraint(ConstraintKind::ForeignKey));
    }

    #[tokio::test]
    async fn list_filters_are_exact_match() {
        let store = MemoryStore::new().with_users([1]);
        let mut tx = store.begin().await.unwrap();
        tx.insert_incident(&sample(1)).await.unwrap();
        let mut closed = sample(1);
        closed.status = IncidentStatus::Closed;
        tx.insert_incident(&closed).await.unwrap();
        tx.commit().await.unwrap();

        let filter = IncidentFilter { status: Some(IncidentStatus::Closed), ..Default::default() };
        let rows = store.list_incidents(&filter).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].status, "closed");
        assert_eq!(store.list_incidents(&IncidentFilter::default()).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn update_status_of_missing_incident_is_not_found() {
        let store = MemoryStore::new();
        let err = store.update_status(7, IncidentStatus::Closed).await.unwrap_err();
        assert!(matches!(err, DbError::NotFound));
    }
}
