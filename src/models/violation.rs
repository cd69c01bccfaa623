use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ViolationType {
    FaceMismatch,
    LocationDrift,
    BrowserTabChange,
    ThirdPartyAccess,
}

impl ViolationType {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "FACE_MISMATCH" => Some(Self::FaceMismatch),
            "LOCATION_DRIFT" => Some(Self::LocationDrift),
            "BROWSER_TAB_CHANGE" => Some(Self::BrowserTabChange),
            "THIRD_PARTY_ACCESS" => Some(Self::ThirdPartyAccess),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FaceMismatch => "FACE_MISMATCH",
            Self::LocationDrift => "LOCATION_DRIFT",
            Self::BrowserTabChange => "BROWSER_TAB_CHANGE",
            Self::ThirdPartyAccess => "THIRD_PARTY_ACCESS",
        }
    }
}

/// Append-only security event tied to an attempt. Only the reviewed flag is
/// ever mutated, by staff.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Violation {
    pub id: Uuid,
    pub attempt_id: Uuid,
    pub violation_type: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub evidence_path: Option<String>,
    pub is_reviewed: bool,
    pub recorded_at: DateTime<Utc>,
}
