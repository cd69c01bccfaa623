use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::staff_dto::{CreateExamPayload, ShortlistUpdatePayload, UpdateExamPayload},
    error::Result,
    middleware::auth::AuthContext,
    AppState,
};

#[axum::debug_handler]
pub async fn create_exam(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Json(payload): Json<CreateExamPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let exam = state.exam_service.create_exam(&ctx, payload).await?;
    state
        .audit_service
        .log(Some(ctx.user_id), "create", "exam", exam.id, None)
        .await?;
    Ok((StatusCode::CREATED, Json(exam)))
}

#[axum::debug_handler]
pub async fn list_exams(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
) -> Result<impl IntoResponse> {
    let exams = state.exam_service.list_exams(&ctx).await?;
    Ok(Json(exams))
}

#[axum::debug_handler]
pub async fn get_exam(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(exam_id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let exam = state.exam_service.get_exam(&ctx, exam_id).await?;
    Ok(Json(exam))
}

#[axum::debug_handler]
pub async fn update_exam(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(exam_id): Path<Uuid>,
    Json(payload): Json<UpdateExamPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let exam = state.exam_service.update_exam(&ctx, exam_id, payload).await?;
    state
        .audit_service
        .log(Some(ctx.user_id), "update", "exam", exam.id, None)
        .await?;
    Ok(Json(exam))
}

#[axum::debug_handler]
pub async fn delete_exam(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(exam_id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let deleted = state.exam_service.delete_exam(&ctx, exam_id).await?;
    if !deleted {
        return Err(crate::error::Error::NotFound("Exam not found".to_string()));
    }
    state
        .audit_service
        .log(Some(ctx.user_id), "delete", "exam", exam_id, None)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Questions including the answer key. Staff only; the router's middleware
/// enforces the role, this handler enforces the school.
#[axum::debug_handler]
pub async fn exam_questions(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(exam_id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let questions = state.exam_service.exam_questions(&ctx, exam_id).await?;
    Ok(Json(questions))
}

#[axum::debug_handler]
pub async fn list_registrations(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(exam_id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let rows = state
        .registration_service
        .list_for_exam(&ctx, exam_id)
        .await?;
    Ok(Json(rows))
}

#[axum::debug_handler]
pub async fn update_registration(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(registration_id): Path<Uuid>,
    Json(payload): Json<ShortlistUpdatePayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let updated = state
        .registration_service
        .update_status(&ctx, registration_id, payload.status, payload.reason.clone())
        .await?;
    state
        .audit_service
        .log(
            Some(ctx.user_id),
            "review",
            "exam_registration",
            registration_id,
            Some(json!({
                "status": payload.status,
                "reason": payload.reason,
            })),
        )
        .await?;
    Ok(Json(updated))
}

#[axum::debug_handler]
pub async fn list_attempts(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(exam_id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let rows = state.attempt_service.list_for_exam(&ctx, exam_id).await?;
    Ok(Json(rows))
}

#[axum::debug_handler]
pub async fn list_violations(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(attempt_id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let rows = state.attempt_service.list_violations(&ctx, attempt_id).await?;
    Ok(Json(rows))
}

#[axum::debug_handler]
pub async fn review_violation(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(violation_id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let violation = state
        .attempt_service
        .review_violation(&ctx, violation_id)
        .await?;
    state
        .audit_service
        .log(Some(ctx.user_id), "review", "violation", violation_id, None)
        .await?;
    Ok(Json(violation))
}
