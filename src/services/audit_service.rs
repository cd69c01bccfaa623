use serde_json::Value as JsonValue;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::Result;
use crate::models::audit_log::AuditLog;

#[derive(Clone)]
pub struct AuditService {
    pool: PgPool,
}

impl AuditService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn log(
        &self,
        user_id: Option<Uuid>,
        action: &str,
        entity_type: &str,
        entity_id: Uuid,
        changes: Option<JsonValue>,
    ) -> Result<AuditLog> {
        let row = sqlx::query_as::<_, AuditLog>(
            r#"INSERT INTO audit_logs (user_id, action, entity_type, entity_id, changes)
               VALUES ($1, $2, $3, $4, $5)
               RETURNING *"#,
        )
        .bind(user_id)
        .bind(action)
        .bind(entity_type)
        .bind(entity_id)
        .bind(changes)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }
}
