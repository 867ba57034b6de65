//! Playlist, track and membership models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Row of the `playlists` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Playlist {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub spotify_playlist_id: Option<String>,
    #[serde(default)]
    pub cover_url: Option<String>,
    #[serde(default)]
    pub is_featured: bool,
    #[serde(default = "default_true")]
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

fn default_true() -> bool {
    true
}

/// Row of the `tracks` table, denormalized from the external catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub id: Uuid,
    pub spotify_id: String,
    pub name: String,
    pub artist: String,
    #[serde(default)]
    pub album: Option<String>,
    #[serde(default)]
    pub duration_ms: i64,
    #[serde(default)]
    pub preview_url: Option<String>,
}

/// Row of the `playlist_tracks` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaylistTrack {
    pub playlist_id: Uuid,
    pub track_id: Uuid,
    pub position: i32,
    #[serde(default)]
    pub added_at: Option<DateTime<Utc>>,
}

/// A track as delivered by the catalog on import.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct CatalogTrack {
    #[validate(length(min = 1, message = "Catalog ID must not be empty"))]
    pub spotify_id: String,
    #[validate(length(min = 1, message = "Track name must not be empty"))]
    pub name: String,
    pub artist: String,
    #[serde(default)]
    pub album: Option<String>,
    #[serde(default)]
    pub duration_ms: i64,
    #[serde(default)]
    pub preview_url: Option<String>,
}

/// Input for creating a playlist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct NewPlaylist {
    #[validate(
        length(min = 1, max = 100, message = "Name must be between 1 and 100 characters"),
        custom(function = "shared::validation::validate_not_blank")
    )]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub spotify_playlist_id: Option<String>,
    #[serde(default)]
    pub cover_url: Option<String>,
    #[serde(default)]
    pub is_featured: bool,
}

/// Partial update of a playlist.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
pub struct PlaylistPatch {
    #[validate(
        length(min = 1, max = 100, message = "Name must be between 1 and 100 characters"),
        custom(function = "shared::validation::validate_not_blank")
    )]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_featured: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

/// Playlist reshaped for the playlists table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistView {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub track_count: usize,
    pub is_featured: bool,
    pub status: String,
    pub created: String,
}

/// Playlist with its ordered tracks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistDetail {
    pub playlist: Playlist,
    pub tracks: Vec<Track>,
    pub total_duration_ms: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_playlist_validation() {
        let ok = NewPlaylist {
            name: "Focus".into(),
            description: None,
            spotify_playlist_id: None,
            cover_url: None,
            is_featured: false,
        };
        assert!(ok.validate().is_ok());

        let bad = NewPlaylist {
            name: " ".into(),
            ..ok
        };
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_catalog_track_requires_id() {
        let track = CatalogTrack {
            spotify_id: String::new(),
            name: "Song".into(),
            artist: "Band".into(),
            album: None,
            duration_ms: 1000,
            preview_url: None,
        };
        assert!(track.validate().is_err());
    }
}
