use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Correctness is computed once at submit time and immutable after.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AnswerSubmission {
    pub id: Uuid,
    pub attempt_id: Uuid,
    pub question_id: i32,
    pub answer_text: String,
    pub is_correct: bool,
    pub points_earned: i32,
    pub submitted_at: DateTime<Utc>,
}
