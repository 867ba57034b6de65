//! Playlist curation routes.

use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    Json,
};
use domain::models::{
    CatalogTrack, ListOptions, NewPlaylist, Playlist, PlaylistDetail, PlaylistPatch, PlaylistView,
    Track,
};
use tracing::info;
use uuid::Uuid;

use super::first_or;
use crate::app::AppState;
use crate::error::ApiError;
use crate::middleware::AdminUser;

fn playlist_not_found() -> ApiError {
    ApiError::NotFound("Playlist not found".to_string())
}

/// GET /api/v1/admin/playlists
pub async fn list_playlists(
    State(state): State<AppState>,
    Query(options): Query<ListOptions>,
) -> Result<Json<Vec<PlaylistView>>, ApiError> {
    Ok(Json(state.ctx.playlists().list_playlists(&options).await?))
}

/// POST /api/v1/admin/playlists
pub async fn create_playlist(
    State(state): State<AppState>,
    Extension(admin): Extension<AdminUser>,
    Json(request): Json<NewPlaylist>,
) -> Result<(StatusCode, Json<Playlist>), ApiError> {
    let playlist = state
        .ctx
        .playlists()
        .create_playlist(request, Some(admin.user_id))
        .await?;
    info!(admin_id = %admin.user_id, playlist_id = %playlist.id, "Admin created playlist");
    Ok((StatusCode::CREATED, Json(playlist)))
}

/// GET /api/v1/admin/playlists/:playlist_id
pub async fn get_playlist(
    State(state): State<AppState>,
    Path(playlist_id): Path<Uuid>,
) -> Result<Json<PlaylistDetail>, ApiError> {
    state
        .ctx
        .playlists()
        .get_playlist_with_tracks(playlist_id)
        .await?
        .map(Json)
        .ok_or_else(playlist_not_found)
}

/// PATCH /api/v1/admin/playlists/:playlist_id
pub async fn update_playlist(
    State(state): State<AppState>,
    Path(playlist_id): Path<Uuid>,
    Json(patch): Json<PlaylistPatch>,
) -> Result<Json<Playlist>, ApiError> {
    let updated = state
        .ctx
        .playlists()
        .update_playlist(playlist_id, patch)
        .await?;
    Ok(Json(first_or(updated, playlist_not_found())?))
}

/// DELETE /api/v1/admin/playlists/:playlist_id
pub async fn delete_playlist(
    State(state): State<AppState>,
    Extension(admin): Extension<AdminUser>,
    Path(playlist_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let deleted = state
        .ctx
        .playlists()
        .delete_playlist(playlist_id, Some(admin.user_id))
        .await?;
    first_or(deleted, playlist_not_found())?;
    info!(admin_id = %admin.user_id, playlist_id = %playlist_id, "Admin deleted playlist");
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/admin/playlists/:playlist_id/tracks
///
/// Imports catalog tracks and appends them to the playlist.
pub async fn import_tracks(
    State(state): State<AppState>,
    Path(playlist_id): Path<Uuid>,
    Json(tracks): Json<Vec<CatalogTrack>>,
) -> Result<Json<Vec<Track>>, ApiError> {
    if tracks.is_empty() {
        return Err(ApiError::Validation("No tracks to import".to_string()));
    }
    Ok(Json(
        state
            .ctx
            .playlists()
            .import_tracks(playlist_id, tracks)
            .await?,
    ))
}

/// DELETE /api/v1/admin/playlists/:playlist_id/tracks/:track_id
pub async fn remove_track(
    State(state): State<AppState>,
    Path((playlist_id, track_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, ApiError> {
    let removed = state
        .ctx
        .playlists()
        .remove_track(playlist_id, track_id)
        .await?;
    first_or(
        removed,
        ApiError::NotFound("Track is not part of this playlist".to_string()),
    )?;
    Ok(StatusCode::NO_CONTENT)
}
