use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{is_unique_violation, Error, Result};
use crate::middleware::auth::AuthContext;
use crate::models::credential::StudentCredential;
use crate::models::exam::Exam;
use crate::models::registration::{ExamRegistration, RegistrationStatus};
use crate::utils::assessment::generate_assessment_number;

const ASSESSMENT_NUMBER_RETRIES: usize = 5;

#[derive(Clone)]
pub struct RegistrationService {
    pool: PgPool,
}

impl RegistrationService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Registers the student for an exam. On the first-ever registration
    /// (across any exam) an assessment number is generated and persisted on
    /// the student credential; subsequent registrations return the existing
    /// number unchanged.
    pub async fn register(
        &self,
        ctx: &AuthContext,
        exam_id: Uuid,
    ) -> Result<(ExamRegistration, String)> {
        let exam = sqlx::query_as::<_, Exam>(
            r#"SELECT * FROM exams
               WHERE id = $1 AND school_id = $2 AND is_active = TRUE
                 AND requires_registration = TRUE"#,
        )
        .bind(exam_id)
        .bind(ctx.school_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| {
            Error::NotFound("Exam not found or does not require registration.".to_string())
        })?;

        let credential = self.ensure_credential(ctx).await?;

        let registration = sqlx::query_as::<_, ExamRegistration>(
            r#"INSERT INTO exam_registrations (student_id, exam_id, status)
               VALUES ($1, $2, 'REGISTERED')
               RETURNING *"#,
        )
        .bind(ctx.user_id)
        .bind(exam.id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                Error::Conflict("You are already registered for this exam.".to_string())
            } else {
                e.into()
            }
        })?;

        tracing::info!(
            student_id = %ctx.user_id,
            exam_id = %exam.id,
            "Student registered for exam"
        );

        Ok((registration, credential.assessment_number))
    }

    /// Loads the student credential, creating one with a fresh assessment
    /// number if the student has never registered before. The unique index
    /// on the number column resolves generator collisions; the primary key
    /// on student_id resolves concurrent first registrations.
    async fn ensure_credential(&self, ctx: &AuthContext) -> Result<StudentCredential> {
        if let Some(existing) = self.get_credential(ctx.user_id).await? {
            return Ok(existing);
        }

        let school_code: i32 =
            sqlx::query_scalar(r#"SELECT code FROM schools WHERE id = $1"#)
                .bind(ctx.school_id)
                .fetch_one(&self.pool)
                .await?;

        for _ in 0..ASSESSMENT_NUMBER_RETRIES {
            let number = generate_assessment_number(school_code);
            let inserted = sqlx::query_as::<_, StudentCredential>(
                r#"INSERT INTO student_credentials (student_id, assessment_number)
                   VALUES ($1, $2)
                   ON CONFLICT (student_id) DO NOTHING
                   RETURNING *"#,
            )
            .bind(ctx.user_id)
            .bind(&number)
            .fetch_optional(&self.pool)
            .await;

            match inserted {
                Ok(Some(credential)) => {
                    tracing::info!(student_id = %ctx.user_id, "Assessment number assigned");
                    return Ok(credential);
                }
                // Another request won the student_id race; reuse its number.
                Ok(None) => {
                    if let Some(existing) = self.get_credential(ctx.user_id).await? {
                        return Ok(existing);
                    }
                }
                Err(e) if is_unique_violation(&e) => continue,
                Err(e) => return Err(e.into()),
            }
        }

        Err(Error::Internal(
            "Could not allocate a unique assessment number".to_string(),
        ))
    }

    pub async fn get_credential(&self, student_id: Uuid) -> Result<Option<StudentCredential>> {
        let credential = sqlx::query_as::<_, StudentCredential>(
            r#"SELECT * FROM student_credentials WHERE student_id = $1"#,
        )
        .bind(student_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(credential)
    }

    /// Active exams of the student's school that require registration.
    pub async fn list_available(&self, ctx: &AuthContext) -> Result<Vec<Exam>> {
        let exams = sqlx::query_as::<_, Exam>(
            r#"SELECT * FROM exams
               WHERE school_id = $1 AND is_active = TRUE AND requires_registration = TRUE
               ORDER BY start_time ASC"#,
        )
        .bind(ctx.school_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(exams)
    }

    pub async fn list_own(&self, ctx: &AuthContext) -> Result<Vec<ExamRegistration>> {
        let rows = sqlx::query_as::<_, ExamRegistration>(
            r#"SELECT * FROM exam_registrations WHERE student_id = $1 ORDER BY registered_at DESC"#,
        )
        .bind(ctx.user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// All registrations for an exam, staff view, scoped to the staff
    /// member's school.
    pub async fn list_for_exam(
        &self,
        ctx: &AuthContext,
        exam_id: Uuid,
    ) -> Result<Vec<ExamRegistration>> {
        let rows = sqlx::query_as::<_, ExamRegistration>(
            r#"SELECT r.* FROM exam_registrations r
               JOIN exams e ON e.id = r.exam_id
               WHERE r.exam_id = $1 AND e.school_id = $2
               ORDER BY r.registered_at ASC"#,
        )
        .bind(exam_id)
        .bind(ctx.school_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Staff shortlisting review. The acting staff's school must match the
    /// exam's school. Moving to REJECTED requires a reason. Any transition
    /// among the three statuses is allowed so records can be re-reviewed.
    pub async fn update_status(
        &self,
        ctx: &AuthContext,
        registration_id: Uuid,
        new_status: RegistrationStatus,
        reason: Option<String>,
    ) -> Result<ExamRegistration> {
        let exam_school: Uuid = sqlx::query_scalar(
            r#"SELECT e.school_id FROM exam_registrations r
               JOIN exams e ON e.id = r.exam_id
               WHERE r.id = $1"#,
        )
        .bind(registration_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| Error::NotFound("Registration not found".to_string()))?;

        if exam_school != ctx.school_id {
            return Err(Error::PermissionDenied(
                "Not authorized to modify this record.".to_string(),
            ));
        }

        if new_status == RegistrationStatus::Rejected
            && reason.as_deref().map(str::trim).unwrap_or("").is_empty()
        {
            return Err(Error::BadRequest(
                "A reason is required when rejecting a registration.".to_string(),
            ));
        }

        let updated = sqlx::query_as::<_, ExamRegistration>(
            r#"UPDATE exam_registrations
               SET status = $1,
                   shortlist_reason = COALESCE($2, shortlist_reason),
                   reviewed_by = $3,
                   reviewed_at = NOW()
               WHERE id = $4
               RETURNING *"#,
        )
        .bind(new_status.as_str())
        .bind(reason)
        .bind(ctx.user_id)
        .bind(registration_id)
        .fetch_one(&self.pool)
        .await?;

        tracing::info!(
            registration_id = %registration_id,
            status = new_status.as_str(),
            reviewer = %ctx.user_id,
            "Registration status updated"
        );

        Ok(updated)
    }
}
