use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};

use db::DbError;
use engine::CrewMemberPayload;

use super::AppState;
use crate::ApiError;

/// Add one crew member to an existing incident (single-row insert, outside
/// the creation transaction).
pub async fn add(
    Path(id): Path<u64>,
    State(state): State<AppState>,
    Json(payload): Json<CrewMemberPayload>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    match state.store.get_incident(id).await {
        Ok(_) => {}
        Err(DbError::NotFound) => return Err(ApiError::IncidentNotFound(id)),
        Err(e) => return Err(e.into()),
    }

    let member = payload.to_member()?;
    state.store.add_crew_member(id, &member).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Crew member assigned",
            "incident_id": id,
            "user_id": member.user_id,
            "role_on_incident": member.role_on_incident,
        })),
    ))
}

pub async fn list(
    Path(id): Path<u64>,
    State(state): State<AppState>,
) -> Result<Json<Vec<db::models::CrewAssignmentRow>>, ApiError> {
    let crew = state.store.list_crew(id).await?;
    Ok(Json(crew))
}
