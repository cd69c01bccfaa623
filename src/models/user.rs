use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Closed set of account roles. Tokens carrying anything else are rejected
/// at the auth middleware.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Student,
    Teacher,
    Administrator,
}

impl Role {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "STUDENT" => Some(Role::Student),
            "TEACHER" => Some(Role::Teacher),
            "ADMINISTRATOR" => Some(Role::Administrator),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Student => "STUDENT",
            Role::Teacher => "TEACHER",
            Role::Administrator => "ADMINISTRATOR",
        }
    }

    pub fn is_staff(&self) -> bool {
        match self {
            Role::Teacher | Role::Administrator => true,
            Role::Student => false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: String,
    pub school_id: Uuid,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct School {
    pub id: Uuid,
    /// Short numeric code embedded in assessment numbers.
    pub code: i32,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_parse_round_trip() {
        for role in [Role::Student, Role::Teacher, Role::Administrator] {
            assert_eq!(Role::parse(role.as_str()), Some(role));
        }
    }

    #[test]
    fn unknown_role_is_rejected() {
        assert_eq!(Role::parse("HR"), None);
        assert_eq!(Role::parse("student"), None);
        assert_eq!(Role::parse(""), None);
    }

    #[test]
    fn staff_roles() {
        assert!(Role::Teacher.is_staff());
        assert!(Role::Administrator.is_staff());
        assert!(!Role::Student.is_staff());
    }
}
