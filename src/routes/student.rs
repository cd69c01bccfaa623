use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::Utc;
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::student_dto::{
        AttemptStatusResponse, AvailableExam, FaceEnrollRequest, RegisterResponse,
        StartExamRequest, StartExamResponse, SubmitRequest, SubmitResponse, ViolationRequest,
        ViolationResponse, XpResponse,
    },
    error::{Error, Result},
    middleware::auth::AuthContext,
    models::attempt::AttemptStatus,
    AppState,
};

#[axum::debug_handler]
pub async fn list_exams(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
) -> Result<impl IntoResponse> {
    let exams = state.registration_service.list_available(&ctx).await?;
    let listed: Vec<AvailableExam> = exams.iter().map(AvailableExam::from).collect();
    Ok(Json(listed))
}

#[axum::debug_handler]
pub async fn register(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(exam_id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let (registration, assessment_number) =
        state.registration_service.register(&ctx, exam_id).await?;
    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            registration,
            assessment_number,
        }),
    ))
}

#[axum::debug_handler]
pub async fn my_registrations(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
) -> Result<impl IntoResponse> {
    let rows = state.registration_service.list_own(&ctx).await?;
    Ok(Json(rows))
}

#[axum::debug_handler]
pub async fn start_exam(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(exam_id): Path<Uuid>,
    Json(payload): Json<StartExamRequest>,
) -> Result<impl IntoResponse> {
    payload.validate()?;

    let live_image = payload
        .live_image_b64
        .as_deref()
        .map(decode_b64)
        .transpose()?;

    let (attempt, created) = state
        .attempt_service
        .start_attempt(
            &ctx,
            exam_id,
            &payload.assessment_number,
            live_image,
            &state.face_service,
        )
        .await?;

    let exam = state.exam_service.get_exam(&ctx, exam_id).await?;
    let questions = exam
        .parsed_questions()
        .iter()
        .map(|q| q.redacted())
        .collect();

    if created {
        state
            .notification_service
            .emit(
                "attempt_started",
                json!({
                    "attempt_id": attempt.id,
                    "student_id": ctx.user_id,
                    "exam_id": exam_id,
                    "started_at": attempt.started_at,
                    "deadline": attempt.deadline,
                }),
            )
            .await;
    }

    let status = if created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((
        status,
        Json(StartExamResponse {
            attempt_id: attempt.id,
            status: attempt.status,
            started_at: attempt.started_at,
            deadline: attempt.deadline,
            resumed: !created,
            questions,
        }),
    ))
}

#[axum::debug_handler]
pub async fn submit_attempt(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(attempt_id): Path<Uuid>,
    Json(payload): Json<SubmitRequest>,
) -> Result<impl IntoResponse> {
    payload.validate()?;

    let answers: Vec<(i32, String)> = payload
        .answers
        .into_iter()
        .map(|a| (a.question_id, a.answer))
        .collect();

    let (attempt, result) = state.attempt_service.submit(&ctx, attempt_id, answers).await?;

    // Post-commit side effects are best-effort and never undo the submit.
    state
        .notification_service
        .emit(
            "attempt_completed",
            json!({
                "attempt_id": attempt.id,
                "student_id": ctx.user_id,
                "exam_id": attempt.exam_id,
                "score": result.score,
                "max_score": result.max_score,
                "completed_at": attempt.completed_at,
            }),
        )
        .await;
    if let Err(e) = state
        .gamification_service
        .award_xp(ctx.user_id, "QUIZ_PASSED")
        .await
    {
        tracing::error!(student_id = %ctx.user_id, error = %e, "XP award failed");
    }
    if let Err(e) = state.progress_service.recompute(ctx.user_id).await {
        tracing::error!(student_id = %ctx.user_id, error = %e, "Progress recompute failed");
    }

    Ok(Json(SubmitResponse {
        attempt_id: attempt.id,
        status: attempt.status,
        score: result.score,
        max_score: result.max_score,
        graded: result.graded,
    }))
}

#[axum::debug_handler]
pub async fn report_violation(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(attempt_id): Path<Uuid>,
    Json(payload): Json<ViolationRequest>,
) -> Result<impl IntoResponse> {
    payload.validate()?;

    let evidence_path = match payload.evidence_b64.as_deref() {
        Some(b64) => {
            let bytes = decode_b64(b64)?;
            Some(store_upload("evidence", &bytes).await?)
        }
        None => None,
    };

    let (violation, total_violations, disqualified) = state
        .attempt_service
        .record_violation(
            &ctx,
            attempt_id,
            payload.violation_type,
            payload.latitude,
            payload.longitude,
            evidence_path,
        )
        .await?;

    if disqualified {
        state
            .notification_service
            .emit(
                "attempt_disqualified",
                json!({
                    "attempt_id": attempt_id,
                    "student_id": ctx.user_id,
                    "total_violations": total_violations,
                    "final_violation_type": payload.violation_type,
                }),
            )
            .await;
    }

    Ok((
        StatusCode::CREATED,
        Json(ViolationResponse {
            violation_id: violation.id,
            total_violations,
            disqualified,
        }),
    ))
}

#[axum::debug_handler]
pub async fn attempt_status(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(attempt_id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let attempt = state.attempt_service.get_own_attempt(&ctx, attempt_id).await?;
    let mut response = AttemptStatusResponse::from_attempt(&attempt, Utc::now());
    if AttemptStatus::parse(&attempt.status).map(|s| s.is_terminal()) == Some(true) {
        response.time_remaining_seconds = 0;
    }
    Ok(Json(response))
}

/// Stores the enrollment image and queues template generation; the template
/// appears on the credential whenever the worker gets to it.
#[axum::debug_handler]
pub async fn enroll_face(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Json(payload): Json<FaceEnrollRequest>,
) -> Result<impl IntoResponse> {
    payload.validate()?;

    let image = decode_b64(&payload.image_b64)?;
    let path = store_upload("faces", &image).await?;
    let job_id = state.face_jobs.enqueue(ctx.user_id, &path).await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(json!({ "job_id": job_id, "status": "pending" })),
    ))
}

#[axum::debug_handler]
pub async fn my_progress(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
) -> Result<impl IntoResponse> {
    match state.progress_service.get(ctx.user_id).await? {
        Some(progress) => Ok(Json(serde_json::to_value(progress)?)),
        None => Ok(Json(json!({
            "student_id": ctx.user_id,
            "total_assessments_taken": 0,
            "average_assessment_score": "0",
        }))),
    }
}

#[axum::debug_handler]
pub async fn my_xp(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
) -> Result<impl IntoResponse> {
    let total_xp = state.gamification_service.total_xp(ctx.user_id).await?;
    let log = state.gamification_service.xp_log(ctx.user_id).await?;
    let badges = state.gamification_service.earned_badges(ctx.user_id).await?;
    Ok(Json(XpResponse {
        total_xp,
        log,
        badges,
    }))
}

fn decode_b64(value: &str) -> Result<Vec<u8>> {
    BASE64
        .decode(value)
        .map_err(|_| Error::BadRequest("Invalid base64 payload".to_string()))
}

async fn store_upload(subdir: &str, bytes: &[u8]) -> Result<String> {
    let base = &crate::config::get_config().uploads_dir;
    let dir = format!("{}/{}", base, subdir);
    tokio::fs::create_dir_all(&dir)
        .await
        .map_err(|e| Error::Internal(format!("Could not create upload directory: {}", e)))?;
    let path = format!("{}/{}.bin", dir, Uuid::new_v4());
    tokio::fs::write(&path, bytes)
        .await
        .map_err(|e| Error::Internal(format!("Could not store upload: {}", e)))?;
    Ok(path)
}
