use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct XpLog {
    pub id: Uuid,
    pub student_id: Uuid,
    pub amount: i32,
    pub reason: String,
    pub awarded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct StudentXp {
    pub student_id: Uuid,
    pub total_xp: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Badge {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub required_xp: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UserBadge {
    pub id: Uuid,
    pub student_id: Uuid,
    pub badge_id: Uuid,
    pub earned_at: DateTime<Utc>,
}
