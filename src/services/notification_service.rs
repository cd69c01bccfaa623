use reqwest::Client;
use serde_json::Value as JsonValue;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::error::Result;
use crate::models::outbox::OutboxEvent;

/// Claim is a single statement: the subselect's row lock lives inside the
/// UPDATE's transaction, and the status flip to 'delivering' keeps the row
/// out of every other worker's candidate set until an outcome is recorded.
const CLAIM_SQL: &str = r#"UPDATE event_outbox
    SET status = 'delivering', updated_at = NOW()
    WHERE id = (
        SELECT id FROM event_outbox
        WHERE status = 'pending' AND (next_retry_at IS NULL OR next_retry_at <= NOW())
        ORDER BY created_at ASC
        FOR UPDATE SKIP LOCKED
        LIMIT 1
    )
    RETURNING id"#;

/// Webhook outbox. Events are enqueued inside request handling and
/// delivered asynchronously by the worker loop, at least once, with
/// exponential backoff up to max_attempts.
#[derive(Clone)]
pub struct NotificationService {
    pool: PgPool,
    client: Client,
    target_url: String,
}

impl NotificationService {
    pub fn new(pool: PgPool, target_url: String) -> Self {
        Self {
            pool,
            client: Client::new(),
            target_url,
        }
    }

    pub async fn enqueue(&self, event_type: &str, payload: &JsonValue) -> Result<OutboxEvent> {
        let event = sqlx::query_as::<_, OutboxEvent>(
            r#"INSERT INTO event_outbox (event_type, payload, target_url, status)
               VALUES ($1, $2, $3, 'pending')
               RETURNING *"#,
        )
        .bind(event_type)
        .bind(payload)
        .bind(&self.target_url)
        .fetch_one(&self.pool)
        .await?;
        Ok(event)
    }

    /// Fire-and-forget variant for request paths: an outbox failure is
    /// logged and swallowed so it never fails the operation that emitted it.
    pub async fn emit(&self, event_type: &str, payload: JsonValue) {
        if let Err(e) = self.enqueue(event_type, &payload).await {
            tracing::error!(event_type, error = %e, "Failed to enqueue outbox event");
        }
    }

    pub async fn deliver_once(&self, event_id: Uuid) -> Result<()> {
        let event = sqlx::query_as::<_, OutboxEvent>(
            r#"SELECT * FROM event_outbox WHERE id = $1"#,
        )
        .bind(event_id)
        .fetch_one(&self.pool)
        .await?;

        let secret = crate::config::get_config().webhook_secret.clone();
        let res = self
            .client
            .post(&event.target_url)
            .header("X-Webhook-Secret", secret)
            .json(&serde_json::json!({
                "event_type": event.event_type,
                "payload": event.payload,
            }))
            .send()
            .await;

        match res {
            Ok(resp) => {
                let status = resp.status().as_u16() as i32;
                let body = resp.text().await.unwrap_or_default();
                sqlx::query(
                    r#"UPDATE event_outbox
                       SET http_status = $1,
                           response_body = $2,
                           status = CASE WHEN $1 BETWEEN 200 AND 299 THEN 'success' ELSE 'failed' END,
                           attempts = attempts + 1,
                           updated_at = NOW()
                       WHERE id = $3"#,
                )
                .bind(status)
                .bind(body)
                .bind(event.id)
                .execute(&self.pool)
                .await?;
            }
            Err(err) => {
                sqlx::query(
                    r#"UPDATE event_outbox
                       SET response_body = $1, status = 'failed', attempts = attempts + 1,
                           updated_at = NOW()
                       WHERE id = $2"#,
                )
                .bind(err.to_string())
                .bind(event.id)
                .execute(&self.pool)
                .await?;
            }
        }
        Ok(())
    }

    /// Claims and delivers one due event. Failed deliveries with attempts
    /// left are rescheduled with exponential backoff capped at an hour.
    /// Returns false when nothing is due.
    pub async fn run_once(&self) -> Result<bool> {
        let row_opt = sqlx::query(CLAIM_SQL).fetch_optional(&self.pool).await?;

        let Some(row) = row_opt else { return Ok(false) };
        let id: Uuid = row.try_get("id")?;

        if let Err(e) = self.deliver_once(id).await {
            tracing::error!(event_id = %id, error = %e, "Outbox delivery errored");
            // Delivery never got to record an outcome; release the claim so
            // a later pass retries the row instead of stranding it.
            sqlx::query(
                r#"UPDATE event_outbox SET status = 'pending', updated_at = NOW()
                   WHERE id = $1 AND status = 'delivering'"#,
            )
            .bind(id)
            .execute(&self.pool)
            .await?;
            return Ok(true);
        }

        let row2 = sqlx::query(
            r#"SELECT attempts, max_attempts, status FROM event_outbox WHERE id = $1"#,
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?;
        let attempts: i32 = row2.try_get("attempts")?;
        let max_attempts: i32 = row2.try_get("max_attempts")?;
        let status: String = row2.try_get("status")?;

        if status == "failed" && attempts < max_attempts {
            sqlx::query(
                r#"UPDATE event_outbox
                   SET status = 'pending',
                       next_retry_at = NOW() + make_interval(secs => LEAST(3600, 30 * power(2::float, GREATEST(0, attempts - 1))::int))
                   WHERE id = $1"#,
            )
            .bind(id)
            .execute(&self.pool)
            .await?;
        }

        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // A bare SELECT .. FOR UPDATE in autocommit drops its lock when the
    // statement ends, letting two workers pick the same event. The claim
    // must be one UPDATE statement that also takes the row out of the
    // 'pending' pool.
    #[test]
    fn claim_flips_status_and_locks_in_one_statement() {
        let sql = CLAIM_SQL.trim_start();
        assert!(sql.starts_with("UPDATE event_outbox"));
        assert!(sql.contains("SET status = 'delivering'"));
        assert!(sql.contains("FOR UPDATE SKIP LOCKED"));
        assert!(sql.contains("WHERE status = 'pending'"));
        assert_eq!(sql.matches(';').count(), 0);
    }
}
