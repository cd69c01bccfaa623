use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Denormalized per-student assessment aggregates, recomputed after every
/// submitted attempt.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct LearningProgress {
    pub student_id: Uuid,
    pub total_assessments_taken: i32,
    pub average_assessment_score: Decimal,
    pub last_updated: DateTime<Utc>,
}
