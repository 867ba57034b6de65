//! Authentication middleware.
//!
//! Admin routes require a bearer access token issued by the hosted auth
//! provider, and the token's user must hold an admin role in `user_roles`.

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use serde_json::json;
use shared::jwt::{extract_user_id, JwtError};
use uuid::Uuid;

use crate::app::AppState;

/// Authenticated administrator, stored in request extensions.
#[derive(Debug, Clone)]
pub struct AdminUser {
    pub user_id: Uuid,
    pub email: Option<String>,
}

/// Middleware for admin-only routes.
pub async fn require_admin(
    State(state): State<AppState>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let Some(TypedHeader(Authorization(bearer))) = bearer else {
        return unauthorized_response("Missing bearer token");
    };

    let claims = match state.verifier.verify(bearer.token()) {
        Ok(claims) => claims,
        Err(JwtError::TokenExpired) => return unauthorized_response("Token has expired"),
        Err(e) => {
            tracing::debug!(error = %e, "Rejected access token");
            return unauthorized_response("Invalid access token");
        }
    };
    let Ok(user_id) = extract_user_id(&claims) else {
        return unauthorized_response("Invalid access token");
    };

    if !state.users.is_admin(user_id).await {
        tracing::warn!(user_id = %user_id, "Non-admin attempted admin access");
        return forbidden_response("Admin access required");
    }

    req.extensions_mut().insert(AdminUser {
        user_id,
        email: claims.email,
    });
    next.run(req).await
}

fn unauthorized_response(message: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({
            "error": "unauthorized",
            "message": message
        })),
    )
        .into_response()
}

fn forbidden_response(message: &str) -> Response {
    (
        StatusCode::FORBIDDEN,
        Json(json!({
            "error": "forbidden",
            "message": message
        })),
    )
        .into_response()
}
