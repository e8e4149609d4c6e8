//! Collaborator contracts for the association pipeline.
//!
//! Lookups return `Ok(None)` for "not found"; an `Err` means the storage
//! layer itself failed. The pipeline turns both into soft errors.

use anyhow::Result;

use crate::models::{Album, AlbumStatus, Artist, Track, TrackFile, UnmatchedTrack};

/// Read side of the catalog.
pub trait CatalogRepository {
    /// Exact name equality.
    fn find_artist_by_name(&self, name: &str) -> Result<Option<Artist>>;

    /// Title match tolerant of case and apostrophe variants.
    fn find_album_by_title_and_artist_flexible(
        &self,
        title: &str,
        artist: &Artist,
    ) -> Result<Option<Album>>;

    fn find_track_by_artist_album_title(
        &self,
        artist: &Artist,
        album: &Album,
        title: &str,
    ) -> Result<Option<Track>>;

    /// Title match ignoring album, version suffixes and featuring credits.
    fn find_track_by_artist_title_flexible(
        &self,
        artist: &Artist,
        title: &str,
    ) -> Result<Option<Track>>;
}

/// Write side used once a track has been resolved.
pub trait AssociationSink {
    fn find_track_file_by_path(&self, path: &str) -> Result<Option<TrackFile>>;

    /// Point `file` at `track` and persist it. Returns the stored record.
    fn attach_file(&self, track: &Track, file: TrackFile) -> Result<TrackFile>;

    /// Persist the track's file/downloaded flags.
    fn save_track(&self, track: &Track) -> Result<()>;

    /// Recompute and persist the album's aggregate status from its tracks.
    fn update_album_status(&self, album: &Album) -> Result<AlbumStatus>;
}

/// Source of candidate file records.
pub trait CandidateStore {
    /// Candidates not yet matched, oldest first.
    fn unmatched_tracks(&self, limit: Option<usize>) -> Result<Vec<UnmatchedTrack>>;

    fn unmatched_track(&self, id: i64) -> Result<Option<UnmatchedTrack>>;

    fn save_unmatched_track(&self, candidate: &UnmatchedTrack) -> Result<()>;
}
