use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Deferred facial-template generation job. Enqueued by the enrollment
/// endpoint, claimed by the background worker with SKIP LOCKED.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct FaceJob {
    pub id: Uuid,
    pub student_id: Uuid,
    pub image_path: String,
    pub status: String,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}
