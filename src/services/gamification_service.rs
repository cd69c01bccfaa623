use sqlx::PgPool;
use uuid::Uuid;

use crate::error::Result;
use crate::models::gamification::{Badge, StudentXp, UserBadge, XpLog};

/// Points per action key. Unknown keys award nothing.
pub fn xp_points(action_key: &str) -> i32 {
    match action_key {
        "QUIZ_PASSED" => 100,
        "LESSON_COMPLETE" => 50,
        "COURSE_COMPLETE" => 500,
        "DAILY_LOGIN" => 5,
        _ => 0,
    }
}

#[derive(Clone)]
pub struct GamificationService {
    pool: PgPool,
}

impl GamificationService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Awards XP for an action, logs the grant, and hands out any badge the
    /// new total qualifies for. Badge grants are idempotent through the
    /// unique (student, badge) constraint. Returns the points awarded.
    pub async fn award_xp(&self, student_id: Uuid, action_key: &str) -> Result<i32> {
        let points = xp_points(action_key);
        if points == 0 {
            return Ok(0);
        }

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"INSERT INTO xp_logs (student_id, amount, reason) VALUES ($1, $2, $3)"#,
        )
        .bind(student_id)
        .bind(points)
        .bind(action_key)
        .execute(&mut *tx)
        .await?;

        let total: i32 = sqlx::query_scalar(
            r#"INSERT INTO student_xp (student_id, total_xp)
               VALUES ($1, $2)
               ON CONFLICT (student_id) DO UPDATE SET total_xp = student_xp.total_xp + $2
               RETURNING total_xp"#,
        )
        .bind(student_id)
        .bind(points)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            r#"INSERT INTO user_badges (student_id, badge_id)
               SELECT $1, b.id FROM badges b WHERE b.required_xp <= $2
               ON CONFLICT (student_id, badge_id) DO NOTHING"#,
        )
        .bind(student_id)
        .bind(total)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(
            student_id = %student_id,
            action = action_key,
            points,
            total_xp = total,
            "XP awarded"
        );

        Ok(points)
    }

    pub async fn total_xp(&self, student_id: Uuid) -> Result<i32> {
        let total = sqlx::query_as::<_, StudentXp>(
            r#"SELECT * FROM student_xp WHERE student_id = $1"#,
        )
        .bind(student_id)
        .fetch_optional(&self.pool)
        .await?
        .map(|s| s.total_xp)
        .unwrap_or(0);
        Ok(total)
    }

    pub async fn xp_log(&self, student_id: Uuid) -> Result<Vec<XpLog>> {
        let rows = sqlx::query_as::<_, XpLog>(
            r#"SELECT * FROM xp_logs WHERE student_id = $1 ORDER BY awarded_at DESC"#,
        )
        .bind(student_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn earned_badges(&self, student_id: Uuid) -> Result<Vec<Badge>> {
        let rows = sqlx::query_as::<_, Badge>(
            r#"SELECT b.* FROM badges b
               JOIN user_badges ub ON ub.badge_id = b.id
               WHERE ub.student_id = $1
               ORDER BY b.required_xp ASC"#,
        )
        .bind(student_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn badge_grants(&self, student_id: Uuid) -> Result<Vec<UserBadge>> {
        let rows = sqlx::query_as::<_, UserBadge>(
            r#"SELECT * FROM user_badges WHERE student_id = $1 ORDER BY earned_at ASC"#,
        )
        .bind(student_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_actions_have_points() {
        assert_eq!(xp_points("QUIZ_PASSED"), 100);
        assert_eq!(xp_points("LESSON_COMPLETE"), 50);
        assert_eq!(xp_points("COURSE_COMPLETE"), 500);
        assert_eq!(xp_points("DAILY_LOGIN"), 5);
    }

    #[test]
    fn unknown_actions_award_nothing() {
        assert_eq!(xp_points("SOMETHING_ELSE"), 0);
        assert_eq!(xp_points(""), 0);
    }
}
