//! Scoped transaction guard.
//!
//! A [`ScopedTransaction`] is `Open` from `begin` until it is consumed by
//! [`commit`](ScopedTransaction::commit) or
//! [`rollback`](ScopedTransaction::rollback), which move it to `Committed`
//! or `RolledBack` exactly once. Both consume the guard, so a terminal
//! transaction cannot be finished a second time.

use std::time::Duration;

use tracing::{debug, error, warn};

use db::{
    DbError, IncidentStore, IncidentTx,
    models::{CrewMember, NewIncident},
};

/// Lifecycle of one creation transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxState {
    Open,
    Committed,
    RolledBack,
}

impl std::fmt::Display for TxState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Open       => write!(f, "open"),
            Self::Committed  => write!(f, "committed"),
            Self::RolledBack => write!(f, "rolled_back"),
        }
    }
}

/// Owns one open [`IncidentTx`] and its connection until a terminal state.
pub struct ScopedTransaction {
    tx: Option<Box<dyn IncidentTx>>,
    state: TxState,
}

impl ScopedTransaction {
    /// Check out a connection from `store` and begin a transaction.
    pub async fn begin(store: &dyn IncidentStore) -> Result<Self, DbError> {
        let tx = store.begin().await?;
        debug!("creation transaction open");
        Ok(Self { tx: Some(tx), state: TxState::Open })
    }

    pub fn state(&self) -> TxState {
        self.state
    }

    fn open_tx(&mut self) -> Result<&mut Box<dyn IncidentTx>, DbError> {
        self.tx
            .as_mut()
            .ok_or_else(|| DbError::Unavailable(format!("transaction is {}", self.state)))
    }

    pub async fn insert_incident(&mut self, incident: &NewIncident) -> Result<u64, DbError> {
        self.open_tx()?.insert_incident(incident).await
    }

    pub async fn insert_crew_assignments(
        &mut self,
        incident_id: u64,
        members: &[CrewMember],
    ) -> Result<(), DbError> {
        self.open_tx()?.insert_crew_assignments(incident_id, members).await
    }

    /// Commit and release the connection.
    ///
    /// A failed commit leaves nothing to roll back: the backend discards the
    /// transaction together with the connection.
    pub async fn commit(mut self) -> Result<(), DbError> {
        let Some(tx) = self.tx.take() else {
            return Err(DbError::Unavailable(format!("transaction is {}", self.state)));
        };
        match tx.commit().await {
            Ok(()) => {
                self.state = TxState::Committed;
                debug!("creation transaction committed");
                Ok(())
            }
            Err(err) => {
                self.state = TxState::RolledBack;
                Err(err)
            }
        }
    }

    /// Roll back and release the connection. Best effort: a failure (or a
    /// rollback that outlives `grace`) is logged and swallowed, since the
    /// caller already holds the error that caused the rollback.
    pub async fn rollback(mut self, grace: Duration) {
        let Some(tx) = self.tx.take() else {
            return;
        };
        self.state = TxState::RolledBack;
        match tokio::time::timeout(grace, tx.rollback()).await {
            Ok(Ok(())) => debug!("creation transaction rolled back"),
            Ok(Err(err)) => error!(error = %err, "rollback failed; connection discarded"),
            Err(_) => error!(?grace, "rollback timed out; connection discarded"),
        }
    }
}

impl Drop for ScopedTransaction {
    fn drop(&mut self) {
        if self.state == TxState::Open {
            warn!("creation transaction dropped while open; uncommitted work discarded");
        }
    }
}
