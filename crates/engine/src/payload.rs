//! Incident creation payload and its validation.
//!
//! Required fields are modelled as `Option` so a missing field surfaces as
//! [`EngineError::Validation`] naming every absent field, rather than as an
//! opaque deserialization failure.

use serde::{Deserialize, Serialize};

use db::models::{
    CrewMember, IncidentStatus, IncidentType, NewIncident, Priority, ADDRESS_MAX_CHARS,
    CITY_MAX_CHARS, DESCRIPTION_MAX_BYTES, ROLE_MAX_CHARS, STATE_MAX_CHARS, ZIP_CODE_MAX_CHARS,
};

use crate::EngineError;

/// One entry of `initial_crew`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrewMemberPayload {
    pub user_id: u64,
    #[serde(default)]
    pub role_on_incident: Option<String>,
}

impl CrewMemberPayload {
    /// Validate this entry and normalize its role.
    ///
    /// # Errors
    /// [`EngineError::Validation`] for a zero `user_id` or a role longer than
    /// its column.
    pub fn to_member(&self) -> Result<CrewMember, EngineError> {
        if self.user_id == 0 {
            return Err(EngineError::Validation(
                "crew entries need a positive user_id".into(),
            ));
        }
        let member = CrewMember::new(self.user_id, self.role_on_incident.as_deref());
        fits("role_on_incident", &member.role_on_incident, ROLE_MAX_CHARS)?;
        Ok(member)
    }
}

/// Request body for creating an incident.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IncidentPayload {
    pub incident_type: Option<String>,
    pub priority: Option<String>,
    /// Defaults to `active` when absent.
    #[serde(default)]
    pub status: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip_code: Option<String>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    pub description: Option<String>,
    pub created_by_user_id: Option<u64>,
    #[serde(default)]
    pub initial_crew: Vec<CrewMemberPayload>,
}

/// A payload that passed validation, ready to be written.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidIncident {
    pub incident: NewIncident,
    /// Crew with roles already defaulted.
    pub crew: Vec<CrewMember>,
}

fn fits(name: &str, value: &str, max_chars: usize) -> Result<(), EngineError> {
    let len = value.chars().count();
    if len > max_chars {
        return Err(EngineError::Validation(format!(
            "{name} is too long: {len} characters, at most {max_chars} allowed"
        )));
    }
    Ok(())
}

fn required(value: &Option<String>, name: &'static str, missing: &mut Vec<&'static str>) -> String {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => v.to_string(),
        _ => {
            missing.push(name);
            String::new()
        }
    }
}

impl IncidentPayload {
    /// Check required fields and value ranges, normalizing crew roles.
    ///
    /// # Errors
    /// [`EngineError::Validation`] describing the first class of problem
    /// found: missing fields, then invalid values (creator id, column
    /// lengths, enum strings, coordinates, crew entries).
    pub fn validate(&self) -> Result<ValidIncident, EngineError> {
        let mut missing = Vec::new();
        let incident_type = required(&self.incident_type, "incident_type", &mut missing);
        let priority = required(&self.priority, "priority", &mut missing);
        let address = required(&self.address, "address", &mut missing);
        let city = required(&self.city, "city", &mut missing);
        let state = required(&self.state, "state", &mut missing);
        let zip_code = required(&self.zip_code, "zip_code", &mut missing);
        let description = required(&self.description, "description", &mut missing);
        if self.created_by_user_id.is_none() {
            missing.push("created_by_user_id");
        }
        if !missing.is_empty() {
            return Err(EngineError::Validation(format!(
                "missing required fields: {}",
                missing.join(", ")
            )));
        }

        let created_by_user_id = match self.created_by_user_id {
            Some(id) if id > 0 => id,
            _ => {
                return Err(EngineError::Validation(
                    "created_by_user_id must be a positive integer".into(),
                ))
            }
        };

        fits("address", &address, ADDRESS_MAX_CHARS)?;
        fits("city", &city, CITY_MAX_CHARS)?;
        fits("state", &state, STATE_MAX_CHARS)?;
        fits("zip_code", &zip_code, ZIP_CODE_MAX_CHARS)?;
        if description.len() > DESCRIPTION_MAX_BYTES {
            return Err(EngineError::Validation(format!(
                "description is too long: {} bytes, at most {DESCRIPTION_MAX_BYTES} allowed",
                description.len()
            )));
        }

        let incident_type: IncidentType = incident_type.parse().map_err(EngineError::Validation)?;
        let priority: Priority = priority.parse().map_err(EngineError::Validation)?;
        let status: IncidentStatus = match self.status.as_deref().map(str::trim) {
            Some(s) if !s.is_empty() => s.parse().map_err(EngineError::Validation)?,
            _ => IncidentStatus::default(),
        };

        if let Some(lat) = self.latitude {
            if !(-90.0..=90.0).contains(&lat) {
                return Err(EngineError::Validation(format!("latitude out of range: {lat}")));
            }
        }
        if let Some(lon) = self.longitude {
            if !(-180.0..=180.0).contains(&lon) {
                return Err(EngineError::Validation(format!("longitude out of range: {lon}")));
            }
        }

        let crew = self
            .initial_crew
            .iter()
            .map(CrewMemberPayload::to_member)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(ValidIncident {
            incident: NewIncident {
                incident_type,
                priority,
                status,
                address,
                city,
                state,
                zip_code,
                latitude: self.latitude,
                longitude: self.longitude,
                description,
                created_by_user_id,
            },
            crew,
        })
    }
}
