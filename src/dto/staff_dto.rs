use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::question::QuestionType;
use crate::models::registration::RegistrationStatus;

/// A question as authored by staff. Ids are assigned server-side.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateQuestion {
    #[validate(length(min = 1))]
    pub text: String,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    pub options: Option<Vec<String>>,
    #[validate(length(min = 1))]
    pub correct_answer: String,
    #[validate(range(min = 1))]
    pub points: i32,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateExamPayload {
    #[validate(length(min = 1))]
    pub title: String,
    pub description: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    #[validate(range(min = 1, message = "Duration must be at least 1 minute"))]
    pub duration_minutes: i32,
    pub is_active: Option<bool>,
    pub enforce_face_scan: Option<bool>,
    pub enforce_location_check: Option<bool>,
    #[validate(range(min = 0))]
    pub max_allowed_violations: Option<i32>,
    pub requires_registration: Option<bool>,
    #[validate(nested)]
    pub questions: Option<Vec<CreateQuestion>>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateExamPayload {
    #[validate(length(min = 1))]
    pub title: Option<String>,
    pub description: Option<String>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    #[validate(range(min = 1, message = "Duration must be at least 1 minute"))]
    pub duration_minutes: Option<i32>,
    pub is_active: Option<bool>,
    pub enforce_face_scan: Option<bool>,
    pub enforce_location_check: Option<bool>,
    #[validate(range(min = 0))]
    pub max_allowed_violations: Option<i32>,
    pub requires_registration: Option<bool>,
    #[validate(nested)]
    pub questions: Option<Vec<CreateQuestion>>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ShortlistUpdatePayload {
    pub status: RegistrationStatus,
    pub reason: Option<String>,
}
