//! The transaction seam between the creation workflow and persistence.
//!
//! [`IncidentStore`] is what the rest of the application holds: it hands out
//! one [`IncidentTx`] per invocation and serves the plain read/update paths.
//! [`MySqlIncidentStore`] is the production implementation; the in-memory
//! double lives in [`crate::mock`].

use async_trait::async_trait;
use sqlx::{MySql, Transaction};
use tracing::debug;

use crate::{
    DbError, DbPool,
    models::{CrewAssignmentRow, CrewMember, IncidentFilter, IncidentRow, IncidentStatus, NewIncident},
    repository::{crew as crew_repo, incidents as incident_repo},
};

/// An open transaction on one exclusive connection.
///
/// `commit` and `rollback` consume the transaction, so a terminal
/// transaction can never be finished twice. Dropping an open transaction
/// discards its work.
#[async_trait]
pub trait IncidentTx: Send {
    /// Insert the incident row and return the generated identifier.
    async fn insert_incident(&mut self, incident: &NewIncident) -> Result<u64, DbError>;

    /// Insert one crew row per member, keyed to `incident_id`.
    async fn insert_crew_assignments(
        &mut self,
        incident_id: u64,
        members: &[CrewMember],
    ) -> Result<(), DbError>;

    async fn commit(self: Box<Self>) -> Result<(), DbError>;

    async fn rollback(self: Box<Self>) -> Result<(), DbError>;
}

/// Shared handle to incident persistence.
#[async_trait]
pub trait IncidentStore: Send + Sync {
    /// Check out a connection and begin a transaction on it.
    async fn begin(&self) -> Result<Box<dyn IncidentTx>, DbError>;

    async fn get_incident(&self, incident_id: u64) -> Result<IncidentRow, DbError>;

    async fn list_incidents(&self, filter: &IncidentFilter) -> Result<Vec<IncidentRow>, DbError>;

    async fn list_crew(&self, incident_id: u64) -> Result<Vec<CrewAssignmentRow>, DbError>;

    /// Attach one crew member to an already committed incident.
    async fn add_crew_member(&self, incident_id: u64, member: &CrewMember) -> Result<(), DbError>;

    async fn update_status(&self, incident_id: u64, status: IncidentStatus) -> Result<(), DbError>;
}

// ---------------------------------------------------------------------------
// MySQL implementation
// ---------------------------------------------------------------------------

/// [`IncidentStore`] backed by a MySQL connection pool.
#[derive(Debug, Clone)]
pub struct MySqlIncidentStore {
    pool: DbPool,
}

impl MySqlIncidentStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

/// A pooled sqlx transaction. The connection returns to the pool when this
/// value is consumed or dropped.
pub struct MySqlIncidentTx {
    tx: Transaction<'static, MySql>,
}

#[async_trait]
impl IncidentTx for MySqlIncidentTx {
    async fn insert_incident(&mut self, incident: &NewIncident) -> Result<u64, DbError> {
        incident_repo::insert_incident(&mut *self.tx, incident).await
    }

    async fn insert_crew_assignments(
        &mut self,
        incident_id: u64,
        members: &[CrewMember],
    ) -> Result<(), DbError> {
        crew_repo::insert_crew_assignments(&mut *self.tx, incident_id, members).await
    }

    async fn commit(self: Box<Self>) -> Result<(), DbError> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), DbError> {
        self.tx.rollback().await?;
        Ok(())
    }
}

#[async_trait]
impl IncidentStore for MySqlIncidentStore {
    async fn begin(&self) -> Result<Box<dyn IncidentTx>, DbError> {
        let tx = self.pool.begin().await?;
        debug!("transaction opened");
        Ok(Box::new(MySqlIncidentTx { tx }))
    }

    async fn get_incident(&self, incident_id: u64) -> Result<IncidentRow, DbError> {
        incident_repo::get_incident(&self.pool, incident_id).await
    }

    async fn list_incidents(&self, filter: &IncidentFilter) -> Result<Vec<IncidentRow>, DbError> {
        incident_repo::list_incidents(&self.pool, filter).await
    }

    async fn list_crew(&self, incident_id: u64) -> Result<Vec<CrewAssignmentRow>, DbError> {
        crew_repo::list_crew(&self.pool, incident_id).await
    }

    async fn add_crew_member(&self, incident_id: u64, member: &CrewMember) -> Result<(), DbError> {
        crew_repo::insert_crew_member(&self.pool, incident_id, member).await
    }

    async fn update_status(&self, incident_id: u64, status: IncidentStatus) -> Result<(), DbError> {
        let mut conn = self.pool.acquire().await?;
        incident_repo::update_incident_status(&mut *conn, incident_id, status).await
    }
}
