use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use reqwest::Client;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::error::{Error, Result};

/// Facial-recognition collaborator. When FACE_API_URL is configured the
/// service calls the external recognizer; without it, templates degrade to
/// an image digest and matching to digest equality, which is enough for
/// development and test environments.
#[derive(Clone)]
pub struct FaceService {
    client: Client,
    api_url: Option<String>,
}

#[derive(Deserialize)]
struct TemplateResponse {
    template_b64: String,
}

#[derive(Deserialize)]
struct VerifyResponse {
    similarity: f64,
}

impl FaceService {
    pub fn new(api_url: Option<String>) -> Self {
        Self {
            client: Client::new(),
            api_url,
        }
    }

    pub async fn generate_template(&self, image: &[u8]) -> Result<Vec<u8>> {
        match &self.api_url {
            Some(url) => {
                let resp: TemplateResponse = self
                    .client
                    .post(format!("{}/template", url))
                    .json(&serde_json::json!({ "image_b64": BASE64.encode(image) }))
                    .send()
                    .await
                    .map_err(|e| Error::Internal(format!("Face API request failed: {}", e)))?
                    .error_for_status()
                    .map_err(|e| Error::Internal(format!("Face API error: {}", e)))?
                    .json()
                    .await
                    .map_err(|e| Error::Internal(format!("Face API response invalid: {}", e)))?;
                BASE64
                    .decode(resp.template_b64)
                    .map_err(|e| Error::Internal(format!("Face API template invalid: {}", e)))
            }
            None => Ok(digest(image)),
        }
    }

    /// Returns a similarity in [0, 1] between a live capture and the stored
    /// template.
    pub async fn verify_match(&self, live_image: &[u8], template: &[u8]) -> Result<f64> {
        match &self.api_url {
            Some(url) => {
                let resp: VerifyResponse = self
                    .client
                    .post(format!("{}/verify", url))
                    .json(&serde_json::json!({
                        "image_b64": BASE64.encode(live_image),
                        "template_b64": BASE64.encode(template),
                    }))
                    .send()
                    .await
                    .map_err(|e| Error::Internal(format!("Face API request failed: {}", e)))?
                    .error_for_status()
                    .map_err(|e| Error::Internal(format!("Face API error: {}", e)))?
                    .json()
                    .await
                    .map_err(|e| Error::Internal(format!("Face API response invalid: {}", e)))?;
                Ok(resp.similarity.clamp(0.0, 1.0))
            }
            None => {
                if digest(live_image) == template {
                    Ok(1.0)
                } else {
                    Ok(0.0)
                }
            }
        }
    }
}

fn digest(image: &[u8]) -> Vec<u8> {
    Sha256::digest(image).to_vec()
}

/// Deferred template enrollment. Enrollment requests only enqueue a job;
/// this worker claims pending jobs one at a time and writes the generated
/// template onto the student credential.
#[derive(Clone)]
pub struct FaceJobQueue {
    pool: PgPool,
    face: FaceService,
}

impl FaceJobQueue {
    pub fn new(pool: PgPool, face: FaceService) -> Self {
        Self { pool, face }
    }

    pub async fn enqueue(&self, student_id: Uuid, image_path: &str) -> Result<Uuid> {
        let row = sqlx::query(
            r#"INSERT INTO face_jobs (student_id, image_path) VALUES ($1, $2) RETURNING id"#,
        )
        .bind(student_id)
        .bind(image_path)
        .fetch_one(&self.pool)
        .await?;
        let id: Uuid = row.try_get("id")?;
        tracing::info!(job_id = %id, student_id = %student_id, "Face enrollment job queued");
        Ok(id)
    }

    /// Claims and processes one pending job. Returns false when the queue
    /// is empty. Job failures are recorded on the row, never propagated.
    pub async fn run_once(&self) -> Result<bool> {
        let claimed = sqlx::query(
            r#"UPDATE face_jobs SET status = 'running', started_at = NOW()
               WHERE id = (
                   SELECT id FROM face_jobs WHERE status = 'pending'
                   ORDER BY created_at ASC FOR UPDATE SKIP LOCKED LIMIT 1
               )
               RETURNING id, student_id, image_path"#,
        )
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = claimed else { return Ok(false) };
        let job_id: Uuid = row.try_get("id")?;
        let student_id: Uuid = row.try_get("student_id")?;
        let image_path: String = row.try_get("image_path")?;

        match self.process(student_id, &image_path).await {
            Ok(()) => {
                sqlx::query(
                    r#"UPDATE face_jobs SET status = 'succeeded', finished_at = NOW() WHERE id = $1"#,
                )
                .bind(job_id)
                .execute(&self.pool)
                .await?;
                tracing::info!(job_id = %job_id, "Face template stored");
            }
            Err(e) => {
                tracing::error!(job_id = %job_id, error = %e, "Face enrollment job failed");
                sqlx::query(
                    r#"UPDATE face_jobs SET status = 'failed', error = $1, finished_at = NOW()
                       WHERE id = $2"#,
                )
                .bind(e.to_string())
                .bind(job_id)
                .execute(&self.pool)
                .await?;
            }
        }

        Ok(true)
    }

    async fn process(&self, student_id: Uuid, image_path: &str) -> Result<()> {
        let image = tokio::fs::read(image_path)
            .await
            .map_err(|e| Error::Internal(format!("Could not read enrollment image: {}", e)))?;
        let template = self.face.generate_template(&image).await?;

        let updated = sqlx::query(
            r#"UPDATE student_credentials SET face_template = $1, updated_at = NOW()
               WHERE student_id = $2"#,
        )
        .bind(&template)
        .bind(student_id)
        .execute(&self.pool)
        .await?;

        if updated.rows_affected() == 0 {
            return Err(Error::NotFound(
                "Student has no credential record to attach a template to".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn stub_matches_identical_images_only() {
        let face = FaceService::new(None);
        let template = face.generate_template(b"selfie-bytes").await.unwrap();

        let same = face.verify_match(b"selfie-bytes", &template).await.unwrap();
        assert_eq!(same, 1.0);

        let other = face.verify_match(b"other-bytes", &template).await.unwrap();
        assert_eq!(other, 0.0);
    }

    #[tokio::test]
    async fn stub_templates_are_deterministic() {
        let face = FaceService::new(None);
        let a = face.generate_template(b"selfie").await.unwrap();
        let b = face.generate_template(b"selfie").await.unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 32);
    }
}
