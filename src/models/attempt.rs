use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AttemptStatus {
    InProgress,
    Submitted,
    Disqualified,
}

impl AttemptStatus {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "IN_PROGRESS" => Some(Self::InProgress),
            "SUBMITTED" => Some(Self::Submitted),
            "DISQUALIFIED" => Some(Self::Disqualified),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InProgress => "IN_PROGRESS",
            Self::Submitted => "SUBMITTED",
            Self::Disqualified => "DISQUALIFIED",
        }
    }

    /// SUBMITTED and DISQUALIFIED are final; score and status never change
    /// once an attempt reaches either.
    pub fn is_terminal(&self) -> bool {
        match self {
            Self::InProgress => false,
            Self::Submitted | Self::Disqualified => true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ExamAttempt {
    pub id: Uuid,
    pub student_id: Uuid,
    pub exam_id: Uuid,
    pub status: String,
    pub started_at: DateTime<Utc>,
    pub deadline: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub score: Option<i32>,
    pub max_score: Option<i32>,
    pub total_violations: i32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_states() {
        assert!(!AttemptStatus::InProgress.is_terminal());
        assert!(AttemptStatus::Submitted.is_terminal());
        assert!(AttemptStatus::Disqualified.is_terminal());
    }

    #[test]
    fn status_round_trip() {
        for s in [
            AttemptStatus::InProgress,
            AttemptStatus::Submitted,
            AttemptStatus::Disqualified,
        ] {
            assert_eq!(AttemptStatus::parse(s.as_str()), Some(s));
        }
        assert_eq!(AttemptStatus::parse("in_progress"), None);
    }
}
