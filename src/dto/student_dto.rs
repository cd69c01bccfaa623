use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::attempt::ExamAttempt;
use crate::models::exam::Exam;
use crate::models::gamification::{Badge, XpLog};
use crate::models::question::RedactedQuestion;
use crate::models::registration::ExamRegistration;
use crate::models::violation::ViolationType;
use crate::services::scoring::GradedAnswer;

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub registration: ExamRegistration,
    pub assessment_number: String,
}

/// Exam as shown to students before an attempt: answer keys stripped.
#[derive(Debug, Serialize)]
pub struct AvailableExam {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub duration_minutes: i32,
    pub enforce_face_scan: bool,
    pub requires_registration: bool,
    pub question_count: usize,
}

impl From<&Exam> for AvailableExam {
    fn from(exam: &Exam) -> Self {
        Self {
            id: exam.id,
            title: exam.title.clone(),
            description: exam.description.clone(),
            start_time: exam.start_time,
            end_time: exam.end_time,
            duration_minutes: exam.duration_minutes,
            enforce_face_scan: exam.enforce_face_scan,
            requires_registration: exam.requires_registration,
            question_count: exam.parsed_questions().len(),
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct StartExamRequest {
    #[validate(length(min = 1))]
    pub assessment_number: String,
    pub live_image_b64: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct StartExamResponse {
    pub attempt_id: Uuid,
    pub status: String,
    pub started_at: DateTime<Utc>,
    pub deadline: DateTime<Utc>,
    pub resumed: bool,
    pub questions: Vec<RedactedQuestion>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct AnswerInput {
    pub question_id: i32,
    pub answer: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct SubmitRequest {
    #[validate(nested)]
    pub answers: Vec<AnswerInput>,
}

#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub attempt_id: Uuid,
    pub status: String,
    pub score: i32,
    pub max_score: i32,
    pub graded: Vec<GradedAnswer>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ViolationRequest {
    pub violation_type: ViolationType,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub evidence_b64: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ViolationResponse {
    pub violation_id: Uuid,
    pub total_violations: i32,
    pub disqualified: bool,
}

#[derive(Debug, Serialize)]
pub struct AttemptStatusResponse {
    pub attempt_id: Uuid,
    pub status: String,
    pub started_at: DateTime<Utc>,
    pub deadline: DateTime<Utc>,
    pub time_remaining_seconds: i64,
    pub score: Option<i32>,
    pub max_score: Option<i32>,
    pub total_violations: i32,
}

impl AttemptStatusResponse {
    pub fn from_attempt(attempt: &ExamAttempt, now: DateTime<Utc>) -> Self {
        let remaining = (attempt.deadline - now).num_seconds().max(0);
        Self {
            attempt_id: attempt.id,
            status: attempt.status.clone(),
            started_at: attempt.started_at,
            deadline: attempt.deadline,
            time_remaining_seconds: remaining,
            score: attempt.score,
            max_score: attempt.max_score,
            total_violations: attempt.total_violations,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct FaceEnrollRequest {
    #[validate(length(min = 1))]
    pub image_b64: String,
}

#[derive(Debug, Serialize)]
pub struct XpResponse {
    pub total_xp: i32,
    pub log: Vec<XpLog>,
    pub badges: Vec<Badge>,
}
