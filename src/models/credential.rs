use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Per-student exam credential. The assessment number is generated once on
/// the first-ever registration and never regenerated. The whitelist flag is
/// an administrative kill-switch independent of shortlisting.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct StudentCredential {
    pub student_id: Uuid,
    pub assessment_number: String,
    pub is_whitelisted: bool,
    #[serde(skip_serializing)]
    pub face_template: Option<Vec<u8>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
