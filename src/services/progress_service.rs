use sqlx::PgPool;
use uuid::Uuid;

use crate::error::Result;
use crate::models::progress::LearningProgress;

#[derive(Clone)]
pub struct ProgressService {
    pool: PgPool,
}

impl ProgressService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Recomputes the student's aggregates from their submitted attempts in
    /// a single upsert. The average is the mean percentage score; attempts
    /// with an empty exam (max_score 0) count as zero.
    pub async fn recompute(&self, student_id: Uuid) -> Result<LearningProgress> {
        let progress = sqlx::query_as::<_, LearningProgress>(
            r#"INSERT INTO learning_progress
                   (student_id, total_assessments_taken, average_assessment_score, last_updated)
               SELECT
                   $1,
                   COUNT(*)::int,
                   COALESCE(AVG(
                       CASE WHEN a.max_score > 0
                            THEN a.score::numeric * 100 / a.max_score
                            ELSE 0 END
                   ), 0),
                   NOW()
               FROM exam_attempts a
               WHERE a.student_id = $1 AND a.status = 'SUBMITTED'
               ON CONFLICT (student_id) DO UPDATE SET
                   total_assessments_taken = EXCLUDED.total_assessments_taken,
                   average_assessment_score = EXCLUDED.average_assessment_score,
                   last_updated = EXCLUDED.last_updated
               RETURNING *"#,
        )
        .bind(student_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(progress)
    }

    pub async fn get(&self, student_id: Uuid) -> Result<Option<LearningProgress>> {
        let progress = sqlx::query_as::<_, LearningProgress>(
            r#"SELECT * FROM learning_progress WHERE student_id = $1"#,
        )
        .bind(student_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(progress)
    }
}
