//! Incident repository functions.

use chrono::Utc;
use sqlx::{Executor, MySql, MySqlConnection, QueryBuilder};

use crate::{
    DbError,
    models::{IncidentFilter, IncidentRow, IncidentStatus, NewIncident},
};

const INCIDENT_COLUMNS: &str = "incident_id, incident_type, priority, status, address, city, \
     state, zip_code, latitude, longitude, description, created_by_user_id, created_at, updated_at";

/// Insert one incident row and return its server-generated identifier.
pub async fn insert_incident<'e, E>(executor: E, incident: &NewIncident) -> Result<u64, DbError>
where
    E: Executor<'e, Database = MySql>,
{
    let now = Utc::now();

    let result = sqlx::query(
        r#"
        INSERT INTO incidents
            (incident_type, priority, status, address, city, state, zip_code,
             latitude, longitude, description, created_by_user_id, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(incident.incident_type.as_str())
    .bind(incident.priority.as_str())
    .bind(incident.status.as_str())
    .bind(&incident.address)
    .bind(&incident.city)
    .bind(&incident.state)
    .bind(&incident.zip_code)
    .bind(incident.latitude)
    .bind(incident.longitude)
    .bind(&incident.description)
    .bind(incident.created_by_user_id)
    .bind(now)
    .bind(now)
    .execute(executor)
    .await?;

    Ok(result.last_insert_id())
}

/// Fetch a single incident by its primary key.
pub async fn get_incident<'e, E>(executor: E, incident_id: u64) -> Result<IncidentRow, DbError>
where
    E: Executor<'e, Database = MySql>,
{
    let sql = format!("SELECT {INCIDENT_COLUMNS} FROM incidents WHERE incident_id = ?");
    sqlx::query_as::<_, IncidentRow>(&sql)
        .bind(incident_id)
        .fetch_optional(executor)
        .await?
        .ok_or(DbError::NotFound)
}

/// Build the incident listing for `filter`. Every set field becomes an
/// exact-match bound parameter.
pub(crate) fn list_query(filter: &IncidentFilter) -> QueryBuilder<'static, MySql> {
    let mut qb: QueryBuilder<MySql> = QueryBuilder::new(format!(
        "SELECT {INCIDENT_COLUMNS} FROM incidents WHERE 1 = 1"
    ));
    if let Some(status) = filter.status {
        qb.push(" AND status = ").push_bind(status.as_str());
    }
    if let Some(priority) = filter.priority {
        qb.push(" AND priority = ").push_bind(priority.as_str());
    }
    if let Some(incident_type) = filter.incident_type {
        qb.push(" AND incident_type = ").push_bind(incident_type.as_str());
    }
    qb.push(" ORDER BY created_at DESC, incident_id DESC");
    qb
}

/// Return incidents matching every filter that is set, newest first.
pub async fn list_incidents<'e, E>(
    executor: E,
    filter: &IncidentFilter,
) -> Result<Vec<IncidentRow>, DbError>
where
    E: Executor<'e, Database = MySql>,
{
    let rows = list_query(filter)
        .build_query_as::<IncidentRow>()
        .fetch_all(executor)
        .await?;

    Ok(rows)
}

/// Change the status of an existing incident.
///
/// Returns `DbError::NotFound` if no such incident exists.
pub async fn update_incident_status(
    conn: &mut MySqlConnection,
    incident_id: u64,
    status: IncidentStatus,
) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE incidents SET status = ?, updated_at = ? WHERE incident_id = ?",
    )
    .bind(status.as_str())
    .bind(Utc::now())
    .bind(incident_id)
    .execute(&mut *conn)
    .await?;

    // MySQL reports changed rows, not matched rows, so an unchanged
    // status needs an explicit existence check.
    if result.rows_affected() == 0 {
        let exists: Option<u64> =
            sqlx::query_scalar("SELECT incident_id FROM incidents WHERE incident_id = ?")
                .bind(incident_id)
                .fetch_optional(&mut *conn)
                .await?;
        if exists.is_none() {
            return Err(DbError::NotFound);
        }
    }

    Ok(())
}
