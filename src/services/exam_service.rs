use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::dto::staff_dto::{CreateExamPayload, UpdateExamPayload};
use crate::error::{is_foreign_key_violation, Error, Result};
use crate::middleware::auth::AuthContext;
use crate::models::exam::Exam;
use crate::models::question::Question;

#[derive(Clone)]
pub struct ExamService {
    pool: PgPool,
}

impl ExamService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create_exam(&self, ctx: &AuthContext, payload: CreateExamPayload) -> Result<Exam> {
        validate_window(payload.start_time, payload.end_time)?;

        let questions_json = match &payload.questions {
            Some(qs) => {
                let with_ids = assign_question_ids(qs);
                serde_json::to_value(with_ids)?
            }
            None => serde_json::json!([]),
        };

        let exam = sqlx::query_as::<_, Exam>(
            r#"INSERT INTO exams (
                   school_id, title, description, start_time, end_time, duration_minutes,
                   is_active, enforce_face_scan, enforce_location_check,
                   max_allowed_violations, requires_registration, questions, created_by
               )
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
               RETURNING *"#,
        )
        .bind(ctx.school_id)
        .bind(&payload.title)
        .bind(&payload.description)
        .bind(payload.start_time)
        .bind(payload.end_time)
        .bind(payload.duration_minutes)
        .bind(payload.is_active.unwrap_or(false))
        .bind(payload.enforce_face_scan.unwrap_or(true))
        .bind(payload.enforce_location_check.unwrap_or(true))
        .bind(payload.max_allowed_violations.unwrap_or(3))
        .bind(payload.requires_registration.unwrap_or(true))
        .bind(questions_json)
        .bind(ctx.user_id)
        .fetch_one(&self.pool)
        .await?;

        tracing::info!(exam_id = %exam.id, title = %exam.title, "Exam created");
        Ok(exam)
    }

    pub async fn get_exam(&self, ctx: &AuthContext, exam_id: Uuid) -> Result<Exam> {
        sqlx::query_as::<_, Exam>(r#"SELECT * FROM exams WHERE id = $1 AND school_id = $2"#)
            .bind(exam_id)
            .bind(ctx.school_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::NotFound("Exam not found".to_string()))
    }

    pub async fn update_exam(
        &self,
        ctx: &AuthContext,
        exam_id: Uuid,
        payload: UpdateExamPayload,
    ) -> Result<Exam> {
        let current = self.get_exam(ctx, exam_id).await?;

        let start = payload.start_time.unwrap_or(current.start_time);
        let end = payload.end_time.unwrap_or(current.end_time);
        validate_window(start, end)?;

        let questions_json = match payload.questions {
            Some(qs) => Some(serde_json::to_value(assign_question_ids(&qs))?),
            None => None,
        };

        let exam = sqlx::query_as::<_, Exam>(
            r#"UPDATE exams SET
                   title = COALESCE($1, title),
                   description = COALESCE($2, description),
                   start_time = $3,
                   end_time = $4,
                   duration_minutes = COALESCE($5, duration_minutes),
                   is_active = COALESCE($6, is_active),
                   enforce_face_scan = COALESCE($7, enforce_face_scan),
                   enforce_location_check = COALESCE($8, enforce_location_check),
                   max_allowed_violations = COALESCE($9, max_allowed_violations),
                   requires_registration = COALESCE($10, requires_registration),
                   questions = COALESCE($11, questions),
                   updated_at = NOW()
               WHERE id = $12 AND school_id = $13
               RETURNING *"#,
        )
        .bind(payload.title)
        .bind(payload.description)
        .bind(start)
        .bind(end)
        .bind(payload.duration_minutes)
        .bind(payload.is_active)
        .bind(payload.enforce_face_scan)
        .bind(payload.enforce_location_check)
        .bind(payload.max_allowed_violations)
        .bind(payload.requires_registration)
        .bind(questions_json)
        .bind(exam_id)
        .bind(ctx.school_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(exam)
    }

    /// Hard delete is only possible before any student has touched the
    /// exam; referencing registrations or attempts turn it into a 409.
    pub async fn delete_exam(&self, ctx: &AuthContext, exam_id: Uuid) -> Result<bool> {
        let result = sqlx::query(r#"DELETE FROM exams WHERE id = $1 AND school_id = $2"#)
            .bind(exam_id)
            .bind(ctx.school_id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                if is_foreign_key_violation(&e) {
                    Error::Conflict(
                        "Exam has registrations or attempts and cannot be deleted. Deactivate it instead.".to_string(),
                    )
                } else {
                    e.into()
                }
            })?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn list_exams(&self, ctx: &AuthContext) -> Result<Vec<Exam>> {
        let exams = sqlx::query_as::<_, Exam>(
            r#"SELECT * FROM exams WHERE school_id = $1 ORDER BY start_time DESC"#,
        )
        .bind(ctx.school_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(exams)
    }

    /// Questions including the answer key; staff only, the handler guards.
    pub async fn exam_questions(&self, ctx: &AuthContext, exam_id: Uuid) -> Result<Vec<Question>> {
        let exam = self.get_exam(ctx, exam_id).await?;
        Ok(exam.parsed_questions())
    }
}

fn validate_window(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<()> {
    if end <= start {
        return Err(Error::BadRequest(
            "end_time must be after start_time".to_string(),
        ));
    }
    Ok(())
}

fn assign_question_ids(questions: &[crate::dto::staff_dto::CreateQuestion]) -> Vec<Question> {
    questions
        .iter()
        .enumerate()
        .map(|(idx, q)| Question {
            id: (idx as i32) + 1,
            text: q.text.clone(),
            question_type: q.question_type,
            options: q.options.clone(),
            correct_answer: q.correct_answer.clone(),
            points: q.points,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dto::staff_dto::CreateQuestion;
    use crate::models::question::QuestionType;

    #[test]
    fn question_ids_are_one_based_and_sequential() {
        let qs = vec![
            CreateQuestion {
                text: "First".into(),
                question_type: QuestionType::Mcq,
                options: Some(vec!["A".into(), "B".into()]),
                correct_answer: "A".into(),
                points: 5,
            },
            CreateQuestion {
                text: "Second".into(),
                question_type: QuestionType::Text,
                options: None,
                correct_answer: "Nairobi".into(),
                points: 2,
            },
        ];
        let assigned = assign_question_ids(&qs);
        assert_eq!(assigned[0].id, 1);
        assert_eq!(assigned[1].id, 2);
        assert_eq!(assigned[1].correct_answer, "Nairobi");
    }

    #[test]
    fn rejects_inverted_window() {
        let now = Utc::now();
        assert!(validate_window(now, now).is_err());
        assert!(validate_window(now, now - chrono::Duration::hours(1)).is_err());
        assert!(validate_window(now, now + chrono::Duration::hours(1)).is_ok());
    }
}
