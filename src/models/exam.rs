use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Exam {
    pub id: Uuid,
    pub school_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub duration_minutes: i32,
    pub is_active: bool,
    pub enforce_face_scan: bool,
    pub enforce_location_check: bool,
    pub max_allowed_violations: i32,
    pub requires_registration: bool,
    pub questions: JsonValue,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Exam {
    pub fn parsed_questions(&self) -> Vec<crate::models::question::Question> {
        serde_json::from_value(self.questions.clone()).unwrap_or_default()
    }
}
