//! Crew-assignment (`incident_personnel`) repository functions.

use chrono::Utc;
use sqlx::{Executor, MySql, QueryBuilder};

use crate::{
    DbError,
    models::{CrewAssignmentRow, CrewMember},
};

/// Build the multi-row crew insert, or `None` when there is nothing to
/// insert.
pub(crate) fn crew_insert_query(
    incident_id: u64,
    members: &[CrewMember],
) -> Option<QueryBuilder<'_, MySql>> {
    if members.is_empty() {
        return None;
    }

    let now = Utc::now();
    let mut qb: QueryBuilder<MySql> = QueryBuilder::new(
        "INSERT INTO incident_personnel (incident_id, user_id, role_on_incident, assigned_at) ",
    );
    qb.push_values(members, |mut row, member| {
        row.push_bind(incident_id)
            .push_bind(member.user_id)
            .push_bind(&member.role_on_incident)
            .push_bind(now);
    });
    Some(qb)
}

/// Insert one row per member, all keyed to `incident_id`, in a single
/// multi-row statement.
///
/// An empty `members` slice issues no statement. Atomicity across calls is
/// the caller's responsibility.
pub async fn insert_crew_assignments<'e, E>(
    executor: E,
    incident_id: u64,
    members: &[CrewMember],
) -> Result<(), DbError>
where
    E: Executor<'e, Database = MySql>,
{
    let Some(mut qb) = crew_insert_query(incident_id, members) else {
        return Ok(());
    };
    qb.build().execute(executor).await?;
    Ok(())
}

/// Attach a single crew member to an existing incident.
pub async fn insert_crew_member<'e, E>(
    executor: E,
    incident_id: u64,
    member: &CrewMember,
) -> Result<(), DbError>
where
    E: Executor<'e, Database = MySql>,
{
    sqlx::query(
        r#"
        INSERT INTO incident_personnel (incident_id, user_id, role_on_incident, assigned_at)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(incident_id)
    .bind(member.user_id)
    .bind(&member.role_on_incident)
    .bind(Utc::now())
    .execute(executor)
    .await?;

    Ok(())
}

/// Return the crew assigned to an incident, in assignment order.
pub async fn list_crew<'e, E>(
    executor: E,
    incident_id: u64,
) -> Result<Vec<CrewAssignmentRow>, DbError>
where
    E: Executor<'e, Database = MySql>,
{
    let rows = sqlx::query_as::<_, CrewAssignmentRow>(
        r#"
        SELECT ip.incident_id,
               ip.user_id,
               CONCAT(u.first_name, ' ', u.last_name) AS full_name,
               ip.role_on_incident,
               ip.assigned_at
        FROM incident_personnel ip
        LEFT JOIN users u ON u.user_id = ip.user_id
        WHERE ip.incident_id = ?
        ORDER BY ip.assigned_at ASC, ip.user_id ASC
        "#,
    )
    .bind(incident_id)
    .fetch_all(executor)
    .await?;

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crew_insert_is_one_statement_with_a_tuple_per_member() {
        let members = [CrewMember::new(5, Some("Captain")), CrewMember::new(7, None)];
        let qb = crew_insert_query(42, &members).expect("non-empty crew builds a query");

        let sql = qb.sql();
        assert!(sql.starts_with("INSERT INTO incident_personnel"));
        assert!(sql.ends_with("VALUES (?, ?, ?, ?), (?, ?, ?, ?)"), "{sql}");
        assert_eq!(sql.matches("INSERT").count(), 1);
        assert_eq!(sql.matches('?').count(), 8);
        assert!(!sql.contains("Captain"));
    }

    #[test]
    fn empty_crew_builds_no_statement() {
        assert!(crew_insert_query(42, &[]).is_none());
    }
}
