//! Sign-in routes.

use axum::{
    extract::{Extension, State},
    Json,
};
use domain::models::AppRole;
use serde::Serialize;
use uuid::Uuid;

use crate::app::AppState;
use crate::auth::{spotify_authorize_url, AuthUrlError};
use crate::error::ApiError;
use crate::middleware::AdminUser;

#[derive(Debug, Serialize)]
pub struct AuthorizeResponse {
    pub url: String,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub user_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub role: Option<AppRole>,
}

/// GET /api/auth/spotify/authorize
///
/// URL the browser should be sent to in order to sign in with Spotify.
pub async fn spotify_authorize(
    State(state): State<AppState>,
) -> Result<Json<AuthorizeResponse>, ApiError> {
    let url = spotify_authorize_url(&state.config.auth).map_err(|e| match e {
        AuthUrlError::NotConfigured => ApiError::ServiceUnavailable(e.to_string()),
        AuthUrlError::InvalidUrl(_) => ApiError::Internal(e.to_string()),
    })?;
    Ok(Json(AuthorizeResponse {
        url: url.to_string(),
    }))
}

/// GET /api/v1/admin/session
///
/// The signed-in administrator.
pub async fn session(
    State(state): State<AppState>,
    Extension(admin): Extension<AdminUser>,
) -> Result<Json<SessionResponse>, ApiError> {
    let role = state.users.get_user_role(admin.user_id).await?;
    Ok(Json(SessionResponse {
        user_id: admin.user_id,
        email: admin.email,
        role,
    }))
}
