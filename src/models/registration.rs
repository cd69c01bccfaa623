use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RegistrationStatus {
    Registered,
    Shortlisted,
    Rejected,
}

impl RegistrationStatus {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "REGISTERED" => Some(Self::Registered),
            "SHORTLISTED" => Some(Self::Shortlisted),
            "REJECTED" => Some(Self::Rejected),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Registered => "REGISTERED",
            Self::Shortlisted => "SHORTLISTED",
            Self::Rejected => "REJECTED",
        }
    }
}

/// One row per (student, exam). Rows are never deleted; staff review only
/// moves the status and records who did it.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ExamRegistration {
    pub id: Uuid,
    pub student_id: Uuid,
    pub exam_id: Uuid,
    pub status: String,
    pub shortlist_reason: Option<String>,
    pub registered_at: DateTime<Utc>,
    pub reviewed_by: Option<Uuid>,
    pub reviewed_at: Option<DateTime<Utc>>,
}
