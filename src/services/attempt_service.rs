use chrono::{Duration, Utc};
use serde_json::Value as JsonValue;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::middleware::auth::AuthContext;
use crate::models::attempt::{AttemptStatus, ExamAttempt};
use crate::models::exam::Exam;
use crate::models::registration::RegistrationStatus;
use crate::models::violation::{Violation, ViolationType};
use crate::services::face_service::FaceService;
use crate::services::gate::{self, GateContext};
use crate::services::notification_service::NotificationService;
use crate::services::progress_service::ProgressService;
use crate::services::scoring::{self, ScoreResult};

#[derive(Clone)]
pub struct AttemptService {
    pool: PgPool,
}

/// Disqualification fires when the violation count exceeds (not reaches)
/// the exam's allowance: with max 3, the 4th violation disqualifies.
pub fn exceeds_allowance(total_violations: i32, max_allowed: i32) -> bool {
    total_violations > max_allowed
}

/// Resolves the counter outcome of a violation report. The increment only
/// applies to live attempts; against a finished attempt the row is kept for
/// review but the tally stays where it was.
pub fn violation_tally(updated_total: Option<i32>, prior_total: i32) -> (i32, bool) {
    match updated_total {
        Some(total) => (total, true),
        None => (prior_total, false),
    }
}

impl AttemptService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Runs the start gate and, on success, claims an attempt atomically.
    /// Returns the attempt and whether it was freshly created; an existing
    /// IN_PROGRESS attempt is resumed instead of duplicated.
    pub async fn start_attempt(
        &self,
        ctx: &AuthContext,
        exam_id: Uuid,
        assessment_number: &str,
        live_image: Option<Vec<u8>>,
        face: &FaceService,
    ) -> Result<(ExamAttempt, bool)> {
        let exam = sqlx::query_as::<_, Exam>(
            r#"SELECT * FROM exams WHERE id = $1 AND school_id = $2 AND is_active = TRUE"#,
        )
        .bind(exam_id)
        .bind(ctx.school_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| Error::NotFound("Exam not found".to_string()))?;

        let credential = sqlx::query_as::<_, crate::models::credential::StudentCredential>(
            r#"SELECT * FROM student_credentials WHERE student_id = $1"#,
        )
        .bind(ctx.user_id)
        .fetch_optional(&self.pool)
        .await?;

        let registration_status: Option<RegistrationStatus> = sqlx::query_scalar::<_, String>(
            r#"SELECT status FROM exam_registrations WHERE student_id = $1 AND exam_id = $2"#,
        )
        .bind(ctx.user_id)
        .bind(exam_id)
        .fetch_optional(&self.pool)
        .await?
        .as_deref()
        .and_then(RegistrationStatus::parse);

        let now = Utc::now();
        let gate_ctx = GateContext {
            supplied_assessment_number: assessment_number,
            credential: credential.as_ref(),
            registration_status,
            requires_registration: exam.requires_registration,
            exam_start: exam.start_time,
            exam_end: exam.end_time,
            now,
        };
        if let Err(denial) = gate::evaluate(&gate_ctx) {
            tracing::warn!(
                student_id = %ctx.user_id,
                exam_id = %exam_id,
                denial = ?denial,
                "Exam start denied"
            );
            return Err(Error::PermissionDenied(denial.message().to_string()));
        }

        // Optional face scan, outside the pure gate. The credential is
        // present here since the gate passed.
        if exam.enforce_face_scan {
            let Some(image) = live_image else {
                return Err(Error::BadRequest(
                    "A live face image is required to start this exam.".to_string(),
                ));
            };
            let template = credential
                .as_ref()
                .and_then(|c| c.face_template.as_deref())
                .ok_or_else(|| {
                    Error::PermissionDenied(
                        "No facial template on record. Complete enrollment first.".to_string(),
                    )
                })?;
            let threshold = crate::config::get_config().face_match_threshold;
            let similarity = face.verify_match(&image, template).await?;
            if similarity < threshold {
                return Err(Error::PermissionDenied(
                    "Face verification failed.".to_string(),
                ));
            }
        }

        let deadline = {
            let by_duration = now + Duration::minutes(exam.duration_minutes as i64);
            if by_duration < exam.end_time {
                by_duration
            } else {
                exam.end_time
            }
        };

        // Atomic claim: the partial unique index on (student_id, exam_id)
        // WHERE status = 'IN_PROGRESS' makes concurrent starts collapse to
        // a single row.
        let inserted = sqlx::query_as::<_, ExamAttempt>(
            r#"INSERT INTO exam_attempts (student_id, exam_id, status, started_at, deadline)
               VALUES ($1, $2, 'IN_PROGRESS', $3, $4)
               ON CONFLICT (student_id, exam_id) WHERE status = 'IN_PROGRESS' DO NOTHING
               RETURNING *"#,
        )
        .bind(ctx.user_id)
        .bind(exam_id)
        .bind(now)
        .bind(deadline)
        .fetch_optional(&self.pool)
        .await?;

        match inserted {
            Some(attempt) => {
                tracing::info!(attempt_id = %attempt.id, exam_id = %exam_id, "Attempt started");
                Ok((attempt, true))
            }
            None => {
                let existing = sqlx::query_as::<_, ExamAttempt>(
                    r#"SELECT * FROM exam_attempts
                       WHERE student_id = $1 AND exam_id = $2 AND status = 'IN_PROGRESS'"#,
                )
                .bind(ctx.user_id)
                .bind(exam_id)
                .fetch_optional(&self.pool)
                .await?
                .ok_or_else(|| {
                    Error::Conflict("You have already completed this exam.".to_string())
                })?;
                tracing::info!(attempt_id = %existing.id, "Resuming in-progress attempt");
                Ok((existing, false))
            }
        }
    }

    /// Grades and finalizes an attempt. Answer rows and the attempt update
    /// commit in one transaction; a concurrent submit loses the conditional
    /// claim and gets Conflict.
    pub async fn submit(
        &self,
        ctx: &AuthContext,
        attempt_id: Uuid,
        answers: Vec<(i32, String)>,
    ) -> Result<(ExamAttempt, ScoreResult)> {
        let attempt = self.get_own_attempt(ctx, attempt_id).await?;

        match AttemptStatus::parse(&attempt.status) {
            Some(AttemptStatus::InProgress) => {}
            _ => {
                return Err(Error::Conflict(
                    "This attempt has already been completed.".to_string(),
                ))
            }
        }

        let now = Utc::now();
        if now > attempt.deadline {
            return Err(Error::TimeExceeded(
                "Submission failed: time limit exceeded.".to_string(),
            ));
        }

        let exam = sqlx::query_as::<_, Exam>(r#"SELECT * FROM exams WHERE id = $1"#)
            .bind(attempt.exam_id)
            .fetch_one(&self.pool)
            .await?;
        let questions = exam.parsed_questions();
        let result = scoring::score_answers(&questions, &answers);

        let mut tx = self.pool.begin().await?;

        let finalized = sqlx::query_as::<_, ExamAttempt>(
            r#"UPDATE exam_attempts
               SET status = 'SUBMITTED', score = $1, max_score = $2, completed_at = $3
               WHERE id = $4 AND status = 'IN_PROGRESS'
               RETURNING *"#,
        )
        .bind(result.score)
        .bind(result.max_score)
        .bind(now)
        .bind(attempt_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(finalized) = finalized else {
            tx.rollback().await?;
            return Err(Error::Conflict(
                "This attempt has already been completed.".to_string(),
            ));
        };

        for graded in &result.graded {
            sqlx::query(
                r#"INSERT INTO answer_submissions
                       (attempt_id, question_id, answer_text, is_correct, points_earned)
                   VALUES ($1, $2, $3, $4, $5)"#,
            )
            .bind(attempt_id)
            .bind(graded.question_id)
            .bind(&graded.answer_text)
            .bind(graded.is_correct)
            .bind(graded.points_earned)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        tracing::info!(
            attempt_id = %attempt_id,
            score = result.score,
            max_score = result.max_score,
            "Attempt submitted"
        );

        Ok((finalized, result))
    }

    /// Appends a violation and, for live attempts only, bumps the counter in
    /// one status-guarded statement; finished attempts keep the row for
    /// review but stay untouched. Crossing the exam's allowance flips the
    /// attempt to DISQUALIFIED via another status-guarded update, so the
    /// flip happens exactly once even under concurrent reports.
    pub async fn record_violation(
        &self,
        ctx: &AuthContext,
        attempt_id: Uuid,
        violation_type: ViolationType,
        latitude: Option<f64>,
        longitude: Option<f64>,
        evidence_path: Option<String>,
    ) -> Result<(Violation, i32, bool)> {
        let attempt = self.get_own_attempt(ctx, attempt_id).await?;

        let violation = sqlx::query_as::<_, Violation>(
            r#"INSERT INTO violations (attempt_id, violation_type, latitude, longitude, evidence_path)
               VALUES ($1, $2, $3, $4, $5)
               RETURNING *"#,
        )
        .bind(attempt_id)
        .bind(violation_type.as_str())
        .bind(latitude)
        .bind(longitude)
        .bind(evidence_path)
        .fetch_one(&self.pool)
        .await?;

        let updated_total: Option<i32> = sqlx::query_scalar(
            r#"UPDATE exam_attempts
               SET total_violations = total_violations + 1
               WHERE id = $1 AND status = 'IN_PROGRESS'
               RETURNING total_violations"#,
        )
        .bind(attempt_id)
        .fetch_optional(&self.pool)
        .await?;

        let (total_violations, live) = violation_tally(updated_total, attempt.total_violations);

        let mut disqualified = false;
        if live {
            let max_allowed: i32 =
                sqlx::query_scalar(r#"SELECT max_allowed_violations FROM exams WHERE id = $1"#)
                    .bind(attempt.exam_id)
                    .fetch_one(&self.pool)
                    .await?;

            if exceeds_allowance(total_violations, max_allowed) {
                let flipped = sqlx::query(
                    r#"UPDATE exam_attempts
                       SET status = 'DISQUALIFIED', completed_at = NOW()
                       WHERE id = $1 AND status = 'IN_PROGRESS'"#,
                )
                .bind(attempt_id)
                .execute(&self.pool)
                .await?;
                disqualified = flipped.rows_affected() > 0;
                if disqualified {
                    tracing::warn!(
                        attempt_id = %attempt_id,
                        total_violations,
                        max_allowed,
                        "Attempt disqualified after exceeding violation allowance"
                    );
                }
            }
        }

        Ok((violation, total_violations, disqualified))
    }

    pub async fn get_own_attempt(&self, ctx: &AuthContext, attempt_id: Uuid) -> Result<ExamAttempt> {
        sqlx::query_as::<_, ExamAttempt>(
            r#"SELECT * FROM exam_attempts WHERE id = $1 AND student_id = $2"#,
        )
        .bind(attempt_id)
        .bind(ctx.user_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| Error::NotFound("Attempt not found".to_string()))
    }

    /// Staff listing, scoped to the staff member's school via the exam.
    pub async fn list_for_exam(&self, ctx: &AuthContext, exam_id: Uuid) -> Result<Vec<ExamAttempt>> {
        let rows = sqlx::query_as::<_, ExamAttempt>(
            r#"SELECT a.* FROM exam_attempts a
               JOIN exams e ON e.id = a.exam_id
               WHERE a.exam_id = $1 AND e.school_id = $2
               ORDER BY a.started_at DESC"#,
        )
        .bind(exam_id)
        .bind(ctx.school_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn list_violations(
        &self,
        ctx: &AuthContext,
        attempt_id: Uuid,
    ) -> Result<Vec<Violation>> {
        let rows = sqlx::query_as::<_, Violation>(
            r#"SELECT v.* FROM violations v
               JOIN exam_attempts a ON a.id = v.attempt_id
               JOIN exams e ON e.id = a.exam_id
               WHERE v.attempt_id = $1 AND e.school_id = $2
               ORDER BY v.recorded_at ASC"#,
        )
        .bind(attempt_id)
        .bind(ctx.school_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// The reviewed flag is the only mutable field on a violation.
    pub async fn review_violation(&self, ctx: &AuthContext, violation_id: Uuid) -> Result<Violation> {
        sqlx::query_as::<_, Violation>(
            r#"UPDATE violations v
               SET is_reviewed = TRUE
               FROM exam_attempts a
               JOIN exams e ON e.id = a.exam_id
               WHERE v.id = $1 AND a.id = v.attempt_id AND e.school_id = $2
               RETURNING v.*"#,
        )
        .bind(violation_id)
        .bind(ctx.school_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| Error::NotFound("Violation not found".to_string()))
    }

    /// Background sweep: finalizes IN_PROGRESS attempts whose deadline has
    /// passed. Unsubmitted work scores zero. Each swept attempt gets the
    /// same post-completion side effects as a live submit, minus the XP
    /// grant (forfeited attempts earn nothing).
    pub async fn sweep_deadlines(
        &self,
        notifications: &NotificationService,
        progress: &ProgressService,
    ) -> Result<u64> {
        let swept = sqlx::query_as::<_, ExamAttempt>(
            r#"UPDATE exam_attempts
               SET status = 'SUBMITTED',
                   score = COALESCE(score, 0),
                   max_score = COALESCE(max_score, 0),
                   completed_at = deadline
               WHERE status = 'IN_PROGRESS' AND deadline <= NOW()
               RETURNING *"#,
        )
        .fetch_all(&self.pool)
        .await?;

        for attempt in &swept {
            notifications
                .emit("attempt_completed", swept_event_payload(attempt))
                .await;
            if let Err(e) = progress.recompute(attempt.student_id).await {
                tracing::error!(
                    student_id = %attempt.student_id,
                    error = %e,
                    "Progress recompute failed after sweep"
                );
            }
        }

        Ok(swept.len() as u64)
    }
}

/// Completion event for an attempt the sweeper expired.
pub fn swept_event_payload(attempt: &ExamAttempt) -> JsonValue {
    serde_json::json!({
        "attempt_id": attempt.id,
        "student_id": attempt.student_id,
        "exam_id": attempt.exam_id,
        "score": attempt.score,
        "max_score": attempt.max_score,
        "completed_at": attempt.completed_at,
        "expired": true,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allowance_is_exceeded_only_past_the_maximum() {
        assert!(!exceeds_allowance(2, 3));
        assert!(!exceeds_allowance(3, 3));
        assert!(exceeds_allowance(4, 3));
        assert!(exceeds_allowance(1, 0));
    }

    #[test]
    fn finished_attempts_keep_their_tally() {
        // The guarded increment returns no row for SUBMITTED/DISQUALIFIED
        // attempts; the report must surface the prior count unchanged and
        // never consider disqualification.
        assert_eq!(violation_tally(None, 2), (2, false));
        assert_eq!(violation_tally(None, 0), (0, false));
        assert_eq!(violation_tally(Some(4), 3), (4, true));
    }

    #[test]
    fn swept_attempts_emit_a_completion_event() {
        let now = Utc::now();
        let attempt = ExamAttempt {
            id: Uuid::new_v4(),
            student_id: Uuid::new_v4(),
            exam_id: Uuid::new_v4(),
            status: "SUBMITTED".to_string(),
            started_at: now - Duration::hours(2),
            deadline: now - Duration::hours(1),
            completed_at: Some(now - Duration::hours(1)),
            score: Some(0),
            max_score: Some(10),
            total_violations: 0,
        };
        let payload = swept_event_payload(&attempt);
        assert_eq!(payload["attempt_id"], serde_json::json!(attempt.id));
        assert_eq!(payload["student_id"], serde_json::json!(attempt.student_id));
        assert_eq!(payload["score"], serde_json::json!(0));
        assert_eq!(payload["expired"], serde_json::json!(true));
    }
}
