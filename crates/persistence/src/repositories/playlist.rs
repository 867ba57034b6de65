//! Curated playlists, their tracks and ordering.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::Utc;
use domain::models::{
    AuditAction, CatalogTrack, ListOptions, NewPlaylist, Playlist, PlaylistDetail, PlaylistPatch,
    PlaylistTrack, PlaylistView, Track,
};
use domain::services::AuditLogBuilder;
use serde_json::{json, Value};
use shared::format::format_date;
use uuid::Uuid;
use validator::Validate;

use super::{audit_mutation, logged, row, timestamp};
use crate::schema::tables;
use crate::store::{
    decode_row, decode_rows, row_str, to_row, DataStore, Direction, Mutation, Query, StoreError,
};

#[derive(Clone)]
pub struct PlaylistRepository {
    store: Arc<dyn DataStore>,
}

impl PlaylistRepository {
    pub fn new(store: Arc<dyn DataStore>) -> Self {
        Self { store }
    }

    /// List playlists with track counts.
    ///
    /// Status accepts `active`, `inactive` and `featured`.
    pub async fn list_playlists(
        &self,
        options: &ListOptions,
    ) -> Result<Vec<PlaylistView>, StoreError> {
        logged(self.fetch_playlists(options).await, "list_playlists")
    }

    async fn fetch_playlists(&self, options: &ListOptions) -> Result<Vec<PlaylistView>, StoreError> {
        let mut query = Query::from(tables::PLAYLISTS).order_by("created_at", Direction::Desc);
        if let Some(term) = options.search_term() {
            query = query.search(&["name", "description"], term);
        }
        match options.status_filter() {
            Some("active") => query = query.eq("is_active", true),
            Some("inactive") => query = query.eq("is_active", false),
            Some("featured") => query = query.eq("is_featured", true),
            Some(other) => {
                tracing::debug!(status = %other, "Unknown playlist status filter matches nothing");
                return Ok(Vec::new());
            }
            None => {}
        }
        let query = query.range(options.page_limit(), options.offset);

        let playlists: Vec<Playlist> = decode_rows(self.store.select(&query).await?)?;
        if playlists.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<String> = playlists.iter().map(|p| p.id.to_string()).collect();
        let memberships = self
            .store
            .select(
                &Query::from(tables::PLAYLIST_TRACKS)
                    .columns(&["playlist_id"])
                    .is_in("playlist_id", ids),
            )
            .await?;
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for membership in &memberships {
            if let Some(id) = row_str(membership, "playlist_id") {
                *counts.entry(id).or_default() += 1;
            }
        }

        Ok(playlists
            .into_iter()
            .map(|p| {
                let track_count = counts.get(p.id.to_string().as_str()).copied().unwrap_or(0);
                PlaylistView {
                    id: p.id,
                    name: p.name,
                    description: p.description.unwrap_or_default(),
                    track_count,
                    is_featured: p.is_featured,
                    status: if p.is_active { "active" } else { "inactive" }.to_string(),
                    created: format_date(&p.created_at),
                }
            })
            .collect())
    }

    /// A playlist with its tracks in position order.
    pub async fn get_playlist_with_tracks(
        &self,
        id: Uuid,
    ) -> Result<Option<PlaylistDetail>, StoreError> {
        logged(self.fetch_playlist_with_tracks(id).await, "get_playlist_with_tracks")
    }

    async fn fetch_playlist_with_tracks(
        &self,
        id: Uuid,
    ) -> Result<Option<PlaylistDetail>, StoreError> {
        let Some(playlist) = self.fetch_playlist(id).await? else {
            return Ok(None);
        };
        let memberships = self.memberships(id).await?;
        let track_ids: Vec<String> = memberships.iter().map(|m| m.track_id.to_string()).collect();
        let mut by_id: HashMap<Uuid, Track> = if track_ids.is_empty() {
            HashMap::new()
        } else {
            decode_rows::<Track>(
                self.store
                    .select(&Query::from(tables::TRACKS).is_in("id", track_ids))
                    .await?,
            )?
            .into_iter()
            .map(|t| (t.id, t))
            .collect()
        };

        let tracks: Vec<Track> = memberships
            .iter()
            .filter_map(|m| by_id.remove(&m.track_id))
            .collect();
        let total_duration_ms = tracks.iter().map(|t| t.duration_ms).sum();
        Ok(Some(PlaylistDetail {
            playlist,
            tracks,
            total_duration_ms,
        }))
    }

    async fn fetch_playlist(&self, id: Uuid) -> Result<Option<Playlist>, StoreError> {
        self.store
            .select(&Query::from(tables::PLAYLISTS).eq("id", id.to_string()))
            .await?
            .into_iter()
            .next()
            .map(decode_row)
            .transpose()
    }

    async fn memberships(&self, playlist_id: Uuid) -> Result<Vec<PlaylistTrack>, StoreError> {
        decode_rows(
            self.store
                .select(
                    &Query::from(tables::PLAYLIST_TRACKS)
                        .eq("playlist_id", playlist_id.to_string())
                        .order_by("position", Direction::Asc),
                )
                .await?,
        )
    }

    pub async fn create_playlist(
        &self,
        input: NewPlaylist,
        actor: Option<Uuid>,
    ) -> Result<Playlist, StoreError> {
        input.validate()?;

        let now = timestamp(Utc::now());
        let mut values = to_row(&input)?;
        values.insert("name".into(), json!(input.name.trim()));
        values.insert("created_at".into(), now.clone());
        values.insert("updated_at".into(), now);

        let inserted = logged(
            self.store.insert(tables::PLAYLISTS, vec![values]).await,
            "create_playlist",
        )?;
        let playlist: Playlist = inserted
            .into_iter()
            .next()
            .map(decode_row)
            .transpose()?
            .ok_or_else(|| StoreError::NotFound("inserted playlist".into()))?;

        let audit = AuditLogBuilder::new(actor, AuditAction::PlaylistCreated)
            .on_resource("playlist", playlist.id)
            .with_detail("name", playlist.name.clone())
            .build();
        if let Err(e) = self.store.execute(audit_mutation(&audit)?).await {
            tracing::warn!(error = %e, playlist_id = %playlist.id, "Failed to record playlist creation");
        }
        tracing::info!(playlist_id = %playlist.id, name = %playlist.name, "Created playlist");
        Ok(playlist)
    }

    pub async fn update_playlist(
        &self,
        id: Uuid,
        patch: PlaylistPatch,
    ) -> Result<Vec<Playlist>, StoreError> {
        patch.validate()?;
        let mut values = to_row(&patch)?;
        if values.is_empty() {
            return Err(StoreError::Validation("No fields to update".into()));
        }
        if let Some(Value::String(name)) = values.get_mut("name") {
            *name = name.trim().to_string();
        }
        values.insert("updated_at".into(), timestamp(Utc::now()));

        let rows = logged(
            self.store
                .update(Query::from(tables::PLAYLISTS).eq("id", id.to_string()), values)
                .await,
            "update_playlist",
        )?;
        if rows.is_empty() {
            tracing::warn!(playlist_id = %id, "No playlist matched update");
        }
        decode_rows(rows)
    }

    /// Delete a playlist and its memberships. Tracks stay in the catalog.
    pub async fn delete_playlist(
        &self,
        id: Uuid,
        actor: Option<Uuid>,
    ) -> Result<Vec<Playlist>, StoreError> {
        let audit = AuditLogBuilder::new(actor, AuditAction::PlaylistDeleted)
            .on_resource("playlist", id)
            .build();
        let result = self
            .store
            .batch(vec![
                Mutation::delete(
                    Query::from(tables::PLAYLIST_TRACKS).eq("playlist_id", id.to_string()),
                ),
                Mutation::delete(Query::from(tables::PLAYLISTS).eq("id", id.to_string()))
                    .required(),
                audit_mutation(&audit)?,
            ])
            .await;

        match result {
            Ok(mut results) => {
                let deleted: Vec<Playlist> = decode_rows(results.swap_remove(1))?;
                tracing::info!(playlist_id = %id, "Deleted playlist");
                Ok(deleted)
            }
            Err(StoreError::NotFound(_)) => {
                tracing::warn!(playlist_id = %id, "No playlist matched delete");
                Ok(Vec::new())
            }
            Err(e) => logged(Err(e), "delete_playlist"),
        }
    }

    /// Add catalog tracks to the end of a playlist.
    ///
    /// Tracks are upserted on their catalog id, then appended in input order.
    /// Tracks already on the playlist keep their position. The two writes are
    /// separate calls; a failed append leaves the upserted tracks in the catalog.
    pub async fn import_tracks(
        &self,
        playlist_id: Uuid,
        tracks: Vec<CatalogTrack>,
    ) -> Result<Vec<Track>, StoreError> {
        for track in &tracks {
            track.validate()?;
        }
        let mut seen = HashSet::new();
        let tracks: Vec<CatalogTrack> = tracks
            .into_iter()
            .filter(|t| seen.insert(t.spotify_id.clone()))
            .collect();
        if tracks.is_empty() {
            return Ok(Vec::new());
        }

        if logged(self.fetch_playlist(playlist_id).await, "import_tracks")?.is_none() {
            tracing::warn!(playlist_id = %playlist_id, "Import target playlist not found");
            return Ok(Vec::new());
        }

        let rows = tracks.iter().map(to_row).collect::<Result<Vec<_>, _>>()?;
        let upserted: Vec<Track> = decode_rows(logged(
            self.store.upsert(tables::TRACKS, rows, &["spotify_id"]).await,
            "upsert_tracks",
        )?)?;
        let by_catalog_id: HashMap<&str, &Track> =
            upserted.iter().map(|t| (t.spotify_id.as_str(), t)).collect();

        let existing = logged(self.memberships(playlist_id).await, "import_tracks")?;
        let present: HashSet<Uuid> = existing.iter().map(|m| m.track_id).collect();
        let mut next_position = existing.iter().map(|m| m.position).max().map_or(0, |p| p + 1);

        let now = timestamp(Utc::now());
        let mut appended = Vec::new();
        let mut memberships = Vec::new();
        for track in tracks
            .iter()
            .filter_map(|t| by_catalog_id.get(t.spotify_id.as_str()))
        {
            if present.contains(&track.id) {
                continue;
            }
            memberships.push(row(json!({
                "playlist_id": playlist_id,
                "track_id": track.id,
                "position": next_position,
                "added_at": now,
            })));
            next_position += 1;
            appended.push((*track).clone());
        }

        if !memberships.is_empty() {
            logged(
                self.store.insert(tables::PLAYLIST_TRACKS, memberships).await,
                "append_playlist_tracks",
            )?;
        }
        tracing::info!(
            playlist_id = %playlist_id,
            imported = upserted.len(),
            appended = appended.len(),
            "Imported tracks"
        );
        Ok(appended)
    }

    /// Remove one track from a playlist. Returns the removed memberships.
    pub async fn remove_track(
        &self,
        playlist_id: Uuid,
        track_id: Uuid,
    ) -> Result<Vec<PlaylistTrack>, StoreError> {
        let rows = logged(
            self.store
                .delete(
                    Query::from(tables::PLAYLIST_TRACKS)
                        .eq("playlist_id", playlist_id.to_string())
                        .eq("track_id", track_id.to_string()),
                )
                .await,
            "remove_track",
        )?;
        if rows.is_empty() {
            tracing::warn!(playlist_id = %playlist_id, track_id = %track_id, "Track was not on playlist");
        }
        decode_rows(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::test_support::store;
    use crate::store::MemoryStore;

    fn catalog(id: &str, duration_ms: i64) -> CatalogTrack {
        CatalogTrack {
            spotify_id: id.into(),
            name: format!("Song {id}"),
            artist: "Band".into(),
            album: None,
            duration_ms,
            preview_url: None,
        }
    }

    fn new_playlist(name: &str, featured: bool) -> NewPlaylist {
        NewPlaylist {
            name: name.into(),
            description: Some(format!("{name} mix")),
            spotify_playlist_id: None,
            cover_url: None,
            is_featured: featured,
        }
    }

    fn repo() -> (Arc<MemoryStore>, PlaylistRepository) {
        let (memory, store) = store();
        (memory, PlaylistRepository::new(store))
    }

    #[tokio::test]
    async fn test_import_appends_in_order() {
        let (_, repo) = repo();
        let playlist = repo.create_playlist(new_playlist("Focus", false), None).await.unwrap();

        let first = repo
            .import_tracks(playlist.id, vec![catalog("a", 1000), catalog("b", 2000)])
            .await
            .unwrap();
        assert_eq!(first.len(), 2);

        let second = repo
            .import_tracks(
                playlist.id,
                vec![catalog("b", 2000), catalog("c", 3000), catalog("c", 3000)],
            )
            .await
            .unwrap();
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].spotify_id, "c");

        let detail = repo.get_playlist_with_tracks(playlist.id).await.unwrap().unwrap();
        let order: Vec<&str> = detail.tracks.iter().map(|t| t.spotify_id.as_str()).collect();
        assert_eq!(order, vec!["a", "b", "c"]);
        assert_eq!(detail.total_duration_ms, 6000);
    }

    #[tokio::test]
    async fn test_import_reuses_catalog_rows() {
        let (memory, repo) = repo();
        let one = repo.create_playlist(new_playlist("One", false), None).await.unwrap();
        let two = repo.create_playlist(new_playlist("Two", false), None).await.unwrap();

        repo.import_tracks(one.id, vec![catalog("a", 1000)]).await.unwrap();
        repo.import_tracks(two.id, vec![catalog("a", 1500)]).await.unwrap();

        let tracks = memory.rows(tables::TRACKS);
        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0]["duration_ms"], json!(1500));
    }

    #[tokio::test]
    async fn test_import_into_missing_playlist() {
        let (memory, repo) = repo();
        let added = repo
            .import_tracks(Uuid::new_v4(), vec![catalog("a", 1)])
            .await
            .unwrap();
        assert!(added.is_empty());
        assert!(memory.rows(tables::TRACKS).is_empty());
    }

    #[tokio::test]
    async fn test_list_with_counts_and_featured_filter() {
        let (_, repo) = repo();
        let focus = repo.create_playlist(new_playlist("Focus", true), None).await.unwrap();
        repo.create_playlist(new_playlist("Chill", false), None).await.unwrap();
        repo.import_tracks(focus.id, vec![catalog("a", 1), catalog("b", 1)])
            .await
            .unwrap();

        let featured = repo
            .list_playlists(&ListOptions::default().with_status("featured"))
            .await
            .unwrap();
        assert_eq!(featured.len(), 1);
        assert_eq!(featured[0].track_count, 2);

        let unknown = repo
            .list_playlists(&ListOptions::default().with_status("archived"))
            .await
            .unwrap();
        assert!(unknown.is_empty());

        let searched = repo
            .list_playlists(&ListOptions::default().with_search("chill mix"))
            .await
            .unwrap();
        assert_eq!(searched.len(), 1);
        assert_eq!(searched[0].track_count, 0);
        assert_eq!(searched[0].status, "active");
    }

    #[tokio::test]
    async fn test_remove_track_and_delete() {
        let (memory, repo) = repo();
        let playlist = repo.create_playlist(new_playlist("Gym", false), None).await.unwrap();
        let added = repo
            .import_tracks(playlist.id, vec![catalog("a", 1), catalog("b", 1)])
            .await
            .unwrap();

        let removed = repo.remove_track(playlist.id, added[0].id).await.unwrap();
        assert_eq!(removed.len(), 1);
        assert!(repo.remove_track(playlist.id, added[0].id).await.unwrap().is_empty());

        let deleted = repo.delete_playlist(playlist.id, None).await.unwrap();
        assert_eq!(deleted.len(), 1);
        assert!(memory.rows(tables::PLAYLIST_TRACKS).is_empty());
        assert_eq!(memory.rows(tables::TRACKS).len(), 2);
        assert!(repo.get_playlist_with_tracks(playlist.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_playlist() {
        let (_, repo) = repo();
        let playlist = repo.create_playlist(new_playlist("Old", false), None).await.unwrap();
        let updated = repo
            .update_playlist(
                playlist.id,
                PlaylistPatch {
                    name: Some(" New ".into()),
                    is_active: Some(false),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated[0].name, "New");
        assert!(!updated[0].is_active);

        let err = repo
            .update_playlist(playlist.id, PlaylistPatch::default())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));
    }
}
