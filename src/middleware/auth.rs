use axum::{
    extract::Request,
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Json, Response},
};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::models::user::Role;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
    pub role: String,
    pub school_id: String,
}

/// Authorization facts for one request, resolved once at the middleware and
/// passed into every service call instead of ad-hoc role lookups.
#[derive(Debug, Clone, Copy)]
pub struct AuthContext {
    pub user_id: Uuid,
    pub role: Role,
    pub school_id: Uuid,
}

fn unauthorized(code: &str) -> Response {
    (StatusCode::UNAUTHORIZED, Json(json!({ "error": code }))).into_response()
}

fn decode_context(req: &Request) -> Result<AuthContext, Response> {
    let Some(auth_header) = req.headers().get(axum::http::header::AUTHORIZATION) else {
        return Err(unauthorized("missing_authorization"));
    };
    let Ok(auth_str) = auth_header.to_str() else {
        return Err(unauthorized("bad_authorization"));
    };
    let Some(token) = auth_str.strip_prefix("Bearer ") else {
        return Err(unauthorized("unsupported_scheme"));
    };

    let config = crate::config::get_config();
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.jwt_secret.as_bytes()),
        &validation,
    )
    .map_err(|_| unauthorized("invalid_token"))?;

    let user_id =
        Uuid::parse_str(&data.claims.sub).map_err(|_| unauthorized("invalid_subject"))?;
    let school_id =
        Uuid::parse_str(&data.claims.school_id).map_err(|_| unauthorized("invalid_school"))?;
    let Some(role) = Role::parse(&data.claims.role) else {
        return Err(unauthorized("unknown_role"));
    };

    Ok(AuthContext {
        user_id,
        role,
        school_id,
    })
}

pub async fn require_auth(mut req: Request, next: Next) -> Response {
    match decode_context(&req) {
        Ok(ctx) => {
            req.extensions_mut().insert(ctx);
            next.run(req).await
        }
        Err(resp) => resp,
    }
}

pub async fn require_student(mut req: Request, next: Next) -> Response {
    match decode_context(&req) {
        Ok(ctx) => {
            if ctx.role != Role::Student {
                return (StatusCode::FORBIDDEN, Json(json!({"error":"forbidden"})))
                    .into_response();
            }
            req.extensions_mut().insert(ctx);
            next.run(req).await
        }
        Err(resp) => resp,
    }
}

pub async fn require_staff(mut req: Request, next: Next) -> Response {
    match decode_context(&req) {
        Ok(ctx) => {
            if !ctx.role.is_staff() {
                return (StatusCode::FORBIDDEN, Json(json!({"error":"forbidden"})))
                    .into_response();
            }
            req.extensions_mut().insert(ctx);
            next.run(req).await
        }
        Err(resp) => resp,
    }
}
