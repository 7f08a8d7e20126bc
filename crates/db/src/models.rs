//! Row structs that map 1-to-1 onto database tables, plus the insert
//! inputs the repository binds as query parameters.
//!
//! These are *persistence* models. Payload validation lives in the
//! `engine` crate.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Role recorded for a crew member when the caller does not name one.
pub const DEFAULT_CREW_ROLE: &str = "Firefighter";

// Column widths from `migrations/0001_init.sql`. VARCHAR limits count
// characters; `description` is TEXT, which is limited in bytes.
pub const ADDRESS_MAX_CHARS: usize = 255;
pub const CITY_MAX_CHARS: usize = 100;
pub const STATE_MAX_CHARS: usize = 32;
pub const ZIP_CODE_MAX_CHARS: usize = 16;
pub const ROLE_MAX_CHARS: usize = 64;
pub const DESCRIPTION_MAX_BYTES: usize = 65_535;

// ---------------------------------------------------------------------------
// incident enums
// ---------------------------------------------------------------------------

/// Kind of emergency an incident describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncidentType {
    Fire,
    Ems,
    Rescue,
    Hazmat,
    PublicAssist,
    Other,
}

impl IncidentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fire         => "fire",
            Self::Ems          => "ems",
            Self::Rescue       => "rescue",
            Self::Hazmat       => "hazmat",
            Self::PublicAssist => "public_assist",
            Self::Other        => "other",
        }
    }
}

impl std::fmt::Display for IncidentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for IncidentType {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fire"          => Ok(Self::Fire),
            "ems"           => Ok(Self::Ems),
            "rescue"        => Ok(Self::Rescue),
            "hazmat"        => Ok(Self::Hazmat),
            "public_assist" => Ok(Self::PublicAssist),
            "other"         => Ok(Self::Other),
            other           => Err(format!("unknown incident type: {other}")),
        }
    }
}

/// Dispatch priority of an incident.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::High   => "high",
            Self::Medium => "medium",
            Self::Low    => "low",
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Priority {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "high"   => Ok(Self::High),
            "medium" => Ok(Self::Medium),
            "low"    => Ok(Self::Low),
            other    => Err(format!("unknown priority: {other}")),
        }
    }
}

/// Lifecycle status of an incident.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncidentStatus {
    #[default]
    Active,
    Pending,
    Closed,
}

impl IncidentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active  => "active",
            Self::Pending => "pending",
            Self::Closed  => "closed",
        }
    }
}

impl std::fmt::Display for IncidentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for IncidentStatus {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active"  => Ok(Self::Active),
            "pending" => Ok(Self::Pending),
            "closed"  => Ok(Self::Closed),
            other     => Err(format!("unknown incident status: {other}")),
        }
    }
}

// ---------------------------------------------------------------------------
// incidents
// ---------------------------------------------------------------------------

/// Column values for one `incidents` insert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewIncident {
    pub incident_type: IncidentType,
    pub priority: Priority,
    pub status: IncidentStatus,
    pub address: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub description: String,
    pub created_by_user_id: u64,
}

/// A persisted incident row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct IncidentRow {
    pub incident_id: u64,
    pub incident_type: String,
    pub priority: String,
    pub status: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub description: String,
    pub created_by_user_id: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Optional exact-match filters for listing incidents.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct IncidentFilter {
    pub status: Option<IncidentStatus>,
    pub priority: Option<Priority>,
    pub incident_type: Option<IncidentType>,
}

impl IncidentFilter {
    /// `true` when `row` satisfies every filter that is set.
    pub fn matches(&self, row: &IncidentRow) -> bool {
        self.status.map_or(true, |s| row.status == s.as_str())
            && self.priority.map_or(true, |p| row.priority == p.as_str())
            && self.incident_type.map_or(true, |t| row.incident_type == t.as_str())
    }
}

// ---------------------------------------------------------------------------
// incident_personnel
// ---------------------------------------------------------------------------

/// One crew member to attach to an incident.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrewMember {
    pub user_id: u64,
    pub role_on_incident: String,
}

impl CrewMember {
    /// Build a member, falling back to [`DEFAULT_CREW_ROLE`] when `role`
    /// is absent or blank.
    pub fn new(user_id: u64, role: Option<&str>) -> Self {
        let role_on_incident = match role.map(str::trim) {
            Some(r) if !r.is_empty() => r.to_string(),
            _ => DEFAULT_CREW_ROLE.to_string(),
        };
        Self { user_id, role_on_incident }
    }
}

/// A persisted crew assignment, joined with the member's display name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct CrewAssignmentRow {
    pub incident_id: u64,
    pub user_id: u64,
    pub full_name: Option<String>,
    pub role_on_incident: String,
    pub assigned_at: DateTime<Utc>,
}
