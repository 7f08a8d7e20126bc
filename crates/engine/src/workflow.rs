//! Incident creation workflow.
//!
//! `IncidentCreator` writes an incident and its initial crew atomically:
//! 1. Validates the payload (no transaction is begun for invalid input).
//! 2. Begins a transaction on one pooled connection.
//! 3. Inserts the incident row and captures the generated identifier.
//! 4. Bulk-inserts the crew rows keyed to that identifier, if any.
//! 5. Commits, or on any failure rolls back and reports `CreationFailed`.
//!
//! Steps 2 to 4 share one deadline (`transaction_timeout`); commit is
//! awaited to completion. Nothing here is retried: creation is not
//! idempotent, so a retry would duplicate incidents.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{timeout_at, Instant};
use tracing::{error, info, instrument, warn};

use db::{DbError, IncidentStore};

use crate::payload::{IncidentPayload, ValidIncident};
use crate::transaction::ScopedTransaction;
use crate::EngineError;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Tuning knobs for the creation workflow.
#[derive(Debug, Clone)]
pub struct WorkflowConfig {
    /// Upper bound for begin and both inserts together. Commit runs to
    /// completion once the rows are written.
    pub transaction_timeout: Duration,
    /// How long a best-effort rollback may take before the connection is
    /// abandoned.
    pub rollback_grace: Duration,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            transaction_timeout: Duration::from_secs(10),
            rollback_grace: Duration::from_secs(5),
        }
    }
}

// ---------------------------------------------------------------------------
// Output of a successful creation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CreatedIncident {
    pub incident_id: u64,
    /// Number of crew rows written alongside the incident.
    pub crew_count: usize,
}

// ---------------------------------------------------------------------------
// IncidentCreator
// ---------------------------------------------------------------------------

/// Orchestrates the incident + crew transaction against an injected store.
///
/// Holds no per-request state; one instance serves concurrent requests, each
/// of which checks out its own connection.
pub struct IncidentCreator {
    store: Arc<dyn IncidentStore>,
    config: WorkflowConfig,
}

impl IncidentCreator {
    pub fn new(store: Arc<dyn IncidentStore>, config: WorkflowConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &WorkflowConfig {
        &self.config
    }

    /// Validate `payload` and create the incident with its initial crew.
    ///
    /// # Errors
    /// - [`EngineError::Validation`] before any transaction is begun.
    /// - [`EngineError::CreationFailed`] after the transaction was rolled back
    ///   (or could not be begun or committed).
    #[instrument(
        skip(self, payload),
        fields(incident_type = ?payload.incident_type, crew = payload.initial_crew.len())
    )]
    pub async fn create_incident(
        &self,
        payload: &IncidentPayload,
    ) -> Result<CreatedIncident, EngineError> {
        let valid = payload.validate()?;
        self.create_validated(&valid).await
    }

    /// Run the transaction for an already validated incident.
    pub async fn create_validated(
        &self,
        valid: &ValidIncident,
    ) -> Result<CreatedIncident, EngineError> {
        let limit = self.config.transaction_timeout;
        let deadline = Instant::now() + limit;

        // ------------------------------------------------------------------
        // Begin.
        // ------------------------------------------------------------------
        let mut tx = match timeout_at(deadline, ScopedTransaction::begin(self.store.as_ref())).await {
            Ok(Ok(tx)) => tx,
            Ok(Err(err)) => {
                error!(error = %err, "could not begin creation transaction");
                return Err(EngineError::storage(err));
            }
            Err(_) => {
                error!(?limit, "timed out waiting for a connection");
                return Err(EngineError::timeout(limit));
            }
        };

        // ------------------------------------------------------------------
        // Incident row, then crew rows. Strictly sequential: the crew rows
        // reference the captured identifier.
        // ------------------------------------------------------------------
        let incident_id = match timeout_at(deadline, write_rows(&mut tx, valid)).await {
            Ok(Ok(id)) => id,
            Ok(Err(err)) => {
                warn!(error = %err, "creation failed; rolling back");
                tx.rollback(self.config.rollback_grace).await;
                return Err(EngineError::storage(err));
            }
            Err(_) => {
                warn!(?limit, "creation timed out; rolling back");
                tx.rollback(self.config.rollback_grace).await;
                return Err(EngineError::timeout(limit));
            }
        };

        // ------------------------------------------------------------------
        // Commit. Not bounded by the deadline: once COMMIT is sent the
        // server may already have applied it, so a late acknowledgement is
        // still a success and must not be reported as a rollback.
        // ------------------------------------------------------------------
        match tx.commit().await {
            Ok(()) => {
                info!(incident_id, crew = valid.crew.len(), "incident created");
                Ok(CreatedIncident { incident_id, crew_count: valid.crew.len() })
            }
            Err(err) => {
                error!(error = %err, incident_id, "commit failed");
                Err(EngineError::storage(err))
            }
        }
    }
}

async fn write_rows(tx: &mut ScopedTransaction, valid: &ValidIncident) -> Result<u64, DbError> {
    let incident_id = tx.insert_incident(&valid.incident).await?;
    if !valid.crew.is_empty() {
        tx.insert_crew_assignments(incident_id, &valid.crew).await?;
    }
    Ok(incident_id)
}
