//! `engine` crate: incident payload validation and the transactional
//! incident creation workflow.

pub mod error;
pub mod payload;
pub mod transaction;
pub mod workflow;

pub use error::{CreationCause, EngineError};
pub use payload::{CrewMemberPayload, IncidentPayload, ValidIncident};
pub use transaction::{ScopedTransaction, TxState};
pub use workflow::{CreatedIncident, IncidentCreator, WorkflowConfig};

#[cfg(test)]
mod workflow_tests;
