use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use db::models::{CrewAssignmentRow, IncidentFilter, IncidentRow, IncidentStatus};
use db::DbError;
use engine::IncidentPayload;

use super::AppState;
use crate::ApiError;

/// An incident together with its assigned crew.
#[derive(Debug, Serialize, Deserialize)]
pub struct IncidentDetail {
    pub incident: IncidentRow,
    pub crew: Vec<CrewAssignmentRow>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusDto {
    pub status: IncidentStatus,
}

/// Transactional creation: incident row and initial crew commit together
/// or not at all.
pub async fn create(
    State(state): State<AppState>,
    Json(payload): Json<IncidentPayload>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let created = state.creator.create_incident(&payload).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Incident created successfully",
            "incident_id": created.incident_id,
        })),
    ))
}

pub async fn list(
    State(state): State<AppState>,
    Query(filter): Query<IncidentFilter>,
) -> Result<Json<Vec<IncidentRow>>, ApiError> {
    let rows = state.store.list_incidents(&filter).await?;
    Ok(Json(rows))
}

pub async fn get(
    Path(id): Path<u64>,
    State(state): State<AppState>,
) -> Result<Json<IncidentDetail>, ApiError> {
    let incident = match state.store.get_incident(id).await {
        Ok(row) => row,
        Err(DbError::NotFound) => return Err(ApiError::IncidentNotFound(id)),
        Err(e) => return Err(e.into()),
    };
    let crew = state.store.list_crew(id).await?;
    Ok(Json(IncidentDetail { incident, crew }))
}

pub async fn update_status(
    Path(id): Path<u64>,
    State(state): State<AppState>,
    Json(body): Json<UpdateStatusDto>,
) -> Result<Json<Value>, ApiError> {
    match state.store.update_status(id, body.status).await {
        Ok(()) => Ok(Json(json!({
            "message": "Incident status updated",
            "incident_id": id,
            "status": body.status,
        }))),
        Err(DbError::NotFound) => Err(ApiError::IncidentNotFound(id)),
        Err(e) => Err(e.into()),
    }
}
