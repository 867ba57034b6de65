//! Playlist bindings and actions.

use domain::models::{
    CatalogTrack, ListOptions, NewPlaylist, Playlist, PlaylistDetail, PlaylistPatch, PlaylistView,
    Track,
};
use uuid::Uuid;

use super::{done, done_unless_empty, ActionResult, ActionRunner, DashboardContext, Refetch};
use crate::query::AsyncQuery;

pub fn use_playlists(ctx: &DashboardContext) -> AsyncQuery<Vec<PlaylistView>, ListOptions> {
    let repo = ctx.playlists();
    AsyncQuery::new(ctx.notifier.clone(), move |options: ListOptions| {
        let repo = repo.clone();
        async move { repo.list_playlists(&options).await }
    })
}

/// One playlist with its ordered tracks. `None` when it does not exist.
pub fn use_playlist(ctx: &DashboardContext) -> AsyncQuery<Option<PlaylistDetail>, Uuid> {
    let repo = ctx.playlists();
    AsyncQuery::new(ctx.notifier.clone(), move |id: Uuid| {
        let repo = repo.clone();
        async move { repo.get_playlist_with_tracks(id).await }
    })
}

#[derive(Clone)]
pub struct PlaylistActions {
    ctx: DashboardContext,
    runner: ActionRunner,
}

impl PlaylistActions {
    pub fn new(ctx: &DashboardContext) -> Self {
        Self {
            ctx: ctx.clone(),
            runner: ActionRunner::new("playlists", ctx.notifier.clone()),
        }
    }

    pub fn with_refetch(mut self, refetch: Refetch) -> Self {
        self.runner.set_refetch(refetch);
        self
    }

    pub fn loading(&self) -> bool {
        self.runner.loading()
    }

    pub async fn create(&self, input: NewPlaylist, actor: Option<Uuid>) -> ActionResult<Playlist> {
        if input.name.trim().is_empty() {
            return self.runner.reject("Name Required", "Please enter a playlist name");
        }
        let repo = self.ctx.playlists();
        self.runner
            .run(repo.create_playlist(input, actor), |playlist| {
                done("Success", format!("Playlist \"{}\" created", playlist.name))
            })
            .await
    }

    pub async fn update(&self, id: Uuid, patch: PlaylistPatch) -> bool {
        let repo = self.ctx.playlists();
        self.runner
            .run(repo.update_playlist(id, patch), |rows| {
                done_unless_empty(rows, "Success", "Playlist updated", "Playlist not found")
            })
            .await
            .success
    }

    pub async fn delete(&self, id: Uuid, actor: Option<Uuid>) -> bool {
        let repo = self.ctx.playlists();
        self.runner
            .run(repo.delete_playlist(id, actor), |rows| {
                done_unless_empty(rows, "Success", "Playlist deleted", "Playlist not found")
            })
            .await
            .success
    }

    pub async fn import_tracks(
        &self,
        playlist_id: Uuid,
        tracks: Vec<CatalogTrack>,
    ) -> ActionResult<Vec<Track>> {
        if tracks.is_empty() {
            return self.runner.reject("No Tracks", "Select at least one track to import");
        }
        let repo = self.ctx.playlists();
        self.runner
            .run(repo.import_tracks(playlist_id, tracks), |imported| {
                done_unless_empty(
                    imported,
                    "Tracks Imported",
                    format!("{} track(s) added", imported.len()),
                    "Playlist not found",
                )
            })
            .await
    }

    pub async fn remove_track(&self, playlist_id: Uuid, track_id: Uuid) -> bool {
        let repo = self.ctx.playlists();
        self.runner
            .run(repo.remove_track(playlist_id, track_id), |rows| {
                done_unless_empty(rows, "Success", "Track removed", "Track is not in this playlist")
            })
            .await
            .success
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hooks::test_support::harness;

    fn track(id: &str) -> CatalogTrack {
        CatalogTrack {
            spotify_id: id.into(),
            name: format!("Song {}", id),
            artist: "Band".into(),
            album: None,
            duration_ms: 180_000,
            preview_url: None,
        }
    }

    #[tokio::test]
    async fn test_create_import_and_remove() {
        let h = harness();
        let actions = PlaylistActions::new(&h.ctx);
        let playlist = actions
            .create(
                NewPlaylist {
                    name: "Focus".into(),
                    description: None,
                    spotify_playlist_id: None,
                    cover_url: None,
                    is_featured: false,
                },
                None,
            )
            .await
            .data
            .unwrap();

        let imported = actions
            .import_tracks(playlist.id, vec![track("a"), track("b")])
            .await;
        assert_eq!(imported.data.as_ref().map(Vec::len), Some(2));

        let detail = use_playlist(&h.ctx);
        detail.sync(playlist.id).await;
        let loaded = detail.snapshot().data.flatten().unwrap();
        assert_eq!(loaded.tracks.len(), 2);

        let first = imported.data.unwrap()[0].id;
        assert!(actions.remove_track(playlist.id, first).await);
        assert!(!actions.remove_track(playlist.id, first).await);
    }

    #[tokio::test]
    async fn test_empty_import_rejected() {
        let h = harness();
        let actions = PlaylistActions::new(&h.ctx);
        let result = actions.import_tracks(Uuid::new_v4(), vec![]).await;
        assert!(!result.success);
        assert_eq!(h.memory.write_count(), 0);
    }
}
