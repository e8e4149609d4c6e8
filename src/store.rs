//! SQLite-backed library: catalog, file records, candidates and configuration.
//!
//! One `rusqlite::Connection` serves every collaborator contract. Dates are
//! stored as text (`YYYY-MM-DD` for release dates, RFC 3339 for attempt
//! timestamps) and booleans as integers.

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde_json::Value;
use std::path::Path;

use crate::catalog::{AssociationSink, CandidateStore, CatalogRepository};
use crate::config::MapConfig;
use crate::models::{Album, AlbumStatus, Artist, Track, TrackFile, UnmatchedTrack};
use crate::normalize::normalize_apostrophes;

// ============================================================================
// Schema
// ============================================================================

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS artist (
        id INTEGER PRIMARY KEY,
        name TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS album (
        id INTEGER PRIMARY KEY,
        artist_id INTEGER NOT NULL REFERENCES artist(id),
        title TEXT NOT NULL,
        release_date TEXT,
        has_file INTEGER NOT NULL DEFAULT 0,
        downloaded INTEGER NOT NULL DEFAULT 0,
        status TEXT
    );

    CREATE TABLE IF NOT EXISTS track (
        id INTEGER PRIMARY KEY,
        album_id INTEGER NOT NULL REFERENCES album(id),
        title TEXT NOT NULL,
        track_number TEXT,
        duration INTEGER,
        has_file INTEGER NOT NULL DEFAULT 0,
        downloaded INTEGER NOT NULL DEFAULT 0
    );

    CREATE TABLE IF NOT EXISTS track_file (
        id INTEGER PRIMARY KEY,
        track_id INTEGER NOT NULL REFERENCES track(id),
        file_path TEXT NOT NULL UNIQUE,
        file_size INTEGER,
        format TEXT,
        duration INTEGER,
        lyrics_path TEXT
    );

    CREATE TABLE IF NOT EXISTS unmatched_track (
        id INTEGER PRIMARY KEY,
        file_path TEXT NOT NULL UNIQUE,
        file_name TEXT,
        title TEXT,
        artist TEXT,
        album TEXT,
        track_number TEXT,
        year INTEGER,
        duration INTEGER,
        file_size INTEGER,
        extension TEXT,
        lyrics_path TEXT,
        last_attempted_match TEXT,
        matched INTEGER NOT NULL DEFAULT 0
    );

    CREATE TABLE IF NOT EXISTS configuration (
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_artist_name ON artist(name);
    CREATE INDEX IF NOT EXISTS idx_album_artist ON album(artist_id);
    CREATE INDEX IF NOT EXISTS idx_track_album ON track(album_id);
    CREATE INDEX IF NOT EXISTS idx_unmatched_matched ON unmatched_track(matched);
";

const TRACK_SELECT: &str = "
    SELECT t.id, t.title, t.track_number, t.duration, t.has_file, t.downloaded,
           a.id, a.title, a.release_date, a.has_file, a.downloaded, a.status,
           ar.id, ar.name
    FROM track t
    JOIN album a ON a.id = t.album_id
    JOIN artist ar ON ar.id = a.artist_id";

const ALBUM_SELECT: &str = "
    SELECT a.id, a.title, a.release_date, a.has_file, a.downloaded, a.status,
           ar.id, ar.name
    FROM album a
    JOIN artist ar ON ar.id = a.artist_id";

const UNMATCHED_SELECT: &str = "
    SELECT id, file_path, file_name, title, artist, album, track_number, year,
           duration, file_size, extension, lyrics_path, last_attempted_match, matched
    FROM unmatched_track";

const TRACK_FILE_SELECT: &str = "
    SELECT id, track_id, file_path, file_size, format, duration, lyrics_path
    FROM track_file";

// ============================================================================
// Title Cleaning
// ============================================================================

static NUMBER_PREFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+\.\s*").unwrap());

static FEATURING_TAIL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+(?:ft\.|feat\.|featuring)\s+[^)]+$").unwrap());

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Longer forms first so " (Acoustic Version)" is not left as " Version)".
const VERSION_SUFFIXES: &[&str] = &[
    " (Acoustic Version)",
    " (Acoustic)",
    " (Remix)",
    " (Radio Edit)",
    " (Explicit)",
    " (Clean)",
    " (Album Version)",
    " (Single Version)",
    " (Extended Version)",
    " (Short Version)",
    " (Karaoke Version)",
    " (Studio Version)",
    " (Original Mix)",
    " (Club Mix)",
    " (Radio Mix)",
    " (Album Mix)",
    " (Single Mix)",
    " (Extended Mix)",
    " (Short Mix)",
    " (Instrumental Mix)",
    " (Karaoke Mix)",
    " (Live Mix)",
    " (Studio Mix)",
    " (Instrumental)",
    " (Live)",
    " (Original)",
    " (Club)",
    " (Radio)",
    " (Album)",
    " (Single)",
    " (Extended)",
    " (Short)",
    " (Karaoke)",
    " (Studio)",
];

/// Title form used by the flexible track lookup: drops "NN." prefixes,
/// version suffixes and trailing featuring credits, folds dashes to spaces
/// and curly apostrophes to straight ones, collapses whitespace.
pub fn clean_track_title(title: &str) -> String {
    let mut clean = NUMBER_PREFIX.replace(title, "").into_owned();
    for suffix in VERSION_SUFFIXES {
        clean = clean.replace(suffix, "");
    }
    clean = FEATURING_TAIL.replace(&clean, "").into_owned();
    clean = clean.replace(['‐', '–', '—', '-'], " ");
    clean = normalize_apostrophes(&clean);
    WHITESPACE.replace_all(&clean, " ").trim().to_string()
}

// ============================================================================
// Row Mapping
// ============================================================================

fn parse_date(s: Option<String>) -> Option<NaiveDate> {
    s.and_then(|s| NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok())
}

fn parse_timestamp(s: Option<String>) -> Option<DateTime<Utc>> {
    s.and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
        .map(|d| d.with_timezone(&Utc))
}

/// Album columns starting at `offset`: id, title, release_date, has_file,
/// downloaded, status, artist id, artist name.
fn album_from_row(row: &Row, offset: usize) -> rusqlite::Result<Album> {
    let status: Option<String> = row.get(offset + 5)?;
    Ok(Album {
        id: row.get(offset)?,
        title: row.get(offset + 1)?,
        release_date: parse_date(row.get(offset + 2)?),
        has_file: row.get(offset + 3)?,
        downloaded: row.get(offset + 4)?,
        status: AlbumStatus::from(status.as_deref()),
        artist: Some(Artist {
            id: row.get(offset + 6)?,
            name: row.get(offset + 7)?,
        }),
    })
}

fn track_from_row(row: &Row) -> rusqlite::Result<Track> {
    Ok(Track {
        id: row.get(0)?,
        title: row.get(1)?,
        track_number: row.get(2)?,
        duration: row.get(3)?,
        has_file: row.get(4)?,
        downloaded: row.get(5)?,
        album: Some(album_from_row(row, 6)?),
    })
}

fn unmatched_from_row(row: &Row) -> rusqlite::Result<UnmatchedTrack> {
    Ok(UnmatchedTrack {
        id: row.get(0)?,
        file_path: row.get(1)?,
        file_name: row.get(2)?,
        title: row.get(3)?,
        artist: row.get(4)?,
        album: row.get(5)?,
        track_number: row.get(6)?,
        year: row.get(7)?,
        duration: row.get(8)?,
        file_size: row.get(9)?,
        extension: row.get(10)?,
        lyrics_path: row.get(11)?,
        last_attempted_match: parse_timestamp(row.get(12)?),
        matched: row.get(13)?,
    })
}

fn track_file_from_row(row: &Row) -> rusqlite::Result<TrackFile> {
    Ok(TrackFile {
        id: row.get(0)?,
        track_id: row.get(1)?,
        file_path: row.get(2)?,
        file_size: row.get(3)?,
        format: row.get(4)?,
        duration: row.get(5)?,
        lyrics_path: row.get(6)?,
    })
}

// ============================================================================
// Configuration
// ============================================================================

/// Snapshot the `configuration` table. Values are JSON; anything that does
/// not parse is kept as a JSON string.
pub fn load_configuration(conn: &Connection) -> Result<MapConfig> {
    let mut stmt = conn.prepare("SELECT key, value FROM configuration ORDER BY key")?;
    let mut rows = stmt.query([])?;

    let mut config = MapConfig::new();
    while let Some(row) = rows.next()? {
        let key: String = row.get(0)?;
        let raw: String = row.get(1)?;
        let value = serde_json::from_str(&raw).unwrap_or(Value::String(raw));
        config.set(&key, value);
    }

    Ok(config)
}

// ============================================================================
// Library
// ============================================================================

pub struct SqliteLibrary {
    conn: Connection,
}

impl SqliteLibrary {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open library database {}", path.display()))?;
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA temp_store = MEMORY;",
        )?;
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        let library = Self { conn };
        library.create_schema()?;
        Ok(library)
    }

    pub fn create_schema(&self) -> Result<()> {
        self.conn
            .execute_batch(SCHEMA)
            .context("Failed to create library schema")
    }

    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    pub fn configuration(&self) -> Result<MapConfig> {
        load_configuration(&self.conn)
    }

    // ------------------------------------------------------------------------
    // Writers
    // ------------------------------------------------------------------------

    pub fn insert_artist(&self, name: &str) -> Result<i64> {
        self.conn
            .execute("INSERT INTO artist (name) VALUES (?1)", [name])?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn insert_album(&self, artist_id: i64, title: &str, release_date: Option<NaiveDate>) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO album (artist_id, title, release_date) VALUES (?1, ?2, ?3)",
            params![artist_id, title, release_date.map(|d| d.to_string())],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn insert_track(
        &self,
        album_id: i64,
        title: &str,
        track_number: Option<&str>,
        duration: Option<u32>,
    ) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO track (album_id, title, track_number, duration) VALUES (?1, ?2, ?3, ?4)",
            params![album_id, title, track_number, duration],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Insert a candidate; `candidate.id` is ignored and the new id returned.
    pub fn insert_unmatched_track(&self, candidate: &UnmatchedTrack) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO unmatched_track
                (file_path, file_name, title, artist, album, track_number, year,
                 duration, file_size, extension, lyrics_path, last_attempted_match, matched)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
            params![
                candidate.file_path,
                candidate.file_name,
                candidate.title,
                candidate.artist,
                candidate.album,
                candidate.track_number,
                candidate.year,
                candidate.duration,
                candidate.file_size,
                candidate.extension,
                candidate.lyrics_path,
                candidate.last_attempted_match.map(|t| t.to_rfc3339()),
                candidate.matched,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Store `value` as JSON under `key`, replacing any previous value.
    pub fn set_config(&self, key: &str, value: &Value) -> Result<()> {
        self.conn.execute(
            "INSERT INTO configuration (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, value.to_string()],
        )?;
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Readers
    // ------------------------------------------------------------------------

    fn query_tracks(&self, filter: &str, params: impl rusqlite::Params) -> Result<Vec<Track>> {
        let sql = format!("{} {} ORDER BY t.id", TRACK_SELECT, filter);
        let mut stmt = self.conn.prepare(&sql)?;
        let tracks = stmt
            .query_map(params, track_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(tracks)
    }

    /// Every catalog track with album and artist loaded, in id order.
    pub fn all_tracks(&self) -> Result<Vec<Track>> {
        self.query_tracks("", [])
    }

    pub fn tracks_by_artist(&self, artist_name: &str) -> Result<Vec<Track>> {
        self.query_tracks("WHERE ar.name = ?1", [artist_name])
    }

    pub fn track(&self, id: i64) -> Result<Option<Track>> {
        Ok(self.query_tracks("WHERE t.id = ?1", [id])?.into_iter().next())
    }

    pub fn album(&self, id: i64) -> Result<Option<Album>> {
        let sql = format!("{} WHERE a.id = ?1", ALBUM_SELECT);
        let album = self
            .conn
            .query_row(&sql, [id], |row| album_from_row(row, 0))
            .optional()?;
        Ok(album)
    }

    fn albums_by_artist(&self, artist_id: i64) -> Result<Vec<Album>> {
        let sql = format!("{} WHERE ar.id = ?1 ORDER BY a.id", ALBUM_SELECT);
        let mut stmt = self.conn.prepare(&sql)?;
        let albums = stmt
            .query_map([artist_id], |row| album_from_row(row, 0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(albums)
    }

    pub fn track_files(&self, track_id: i64) -> Result<Vec<TrackFile>> {
        let sql = format!("{} WHERE track_id = ?1 ORDER BY id", TRACK_FILE_SELECT);
        let mut stmt = self.conn.prepare(&sql)?;
        let files = stmt
            .query_map([track_id], track_file_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(files)
    }
}

// ============================================================================
// Collaborator Contracts
// ============================================================================

impl CatalogRepository for SqliteLibrary {
    fn find_artist_by_name(&self, name: &str) -> Result<Option<Artist>> {
        let artist = self
            .conn
            .query_row(
                "SELECT id, name FROM artist WHERE name = ?1 ORDER BY id LIMIT 1",
                [name],
                |row| {
                    Ok(Artist {
                        id: row.get(0)?,
                        name: row.get(1)?,
                    })
                },
            )
            .optional()?;
        Ok(artist)
    }

    fn find_album_by_title_and_artist_flexible(&self, title: &str, artist: &Artist) -> Result<Option<Album>> {
        let folded = normalize_apostrophes(title);
        let albums = self.albums_by_artist(artist.id)?;

        if let Some(album) = albums.iter().find(|a| a.title == title || a.title == folded) {
            return Ok(Some(album.clone()));
        }

        let folded = folded.to_lowercase();
        Ok(albums
            .into_iter()
            .find(|a| normalize_apostrophes(&a.title).to_lowercase() == folded))
    }

    fn find_track_by_artist_album_title(&self, artist: &Artist, album: &Album, title: &str) -> Result<Option<Track>> {
        let tracks = self.query_tracks(
            "WHERE ar.name = ?1
               AND (a.title = ?2 OR a.title = ?3)
               AND REPLACE(t.title, '’', '''') = ?4 COLLATE NOCASE",
            params![artist.name, album.title, album.title.trim(), title],
        )?;
        Ok(tracks.into_iter().next())
    }

    fn find_track_by_artist_title_flexible(&self, artist: &Artist, title: &str) -> Result<Option<Track>> {
        let clean = clean_track_title(title);
        let tracks = self.tracks_by_artist(&artist.name)?;

        let direct = tracks.iter().find(|t| {
            let folded = normalize_apostrophes(&t.title);
            folded.eq_ignore_ascii_case(title) || folded.eq_ignore_ascii_case(&clean)
        });
        if let Some(track) = direct {
            return Ok(Some(track.clone()));
        }

        Ok(tracks
            .into_iter()
            .find(|t| clean_track_title(&t.title).eq_ignore_ascii_case(&clean)))
    }
}

impl AssociationSink for SqliteLibrary {
    fn find_track_file_by_path(&self, path: &str) -> Result<Option<TrackFile>> {
        let sql = format!("{} WHERE file_path = ?1", TRACK_FILE_SELECT);
        let file = self
            .conn
            .query_row(&sql, [path], track_file_from_row)
            .optional()?;
        Ok(file)
    }

    fn attach_file(&self, track: &Track, mut file: TrackFile) -> Result<TrackFile> {
        file.track_id = track.id;
        match file.id {
            Some(id) => {
                self.conn.execute(
                    "UPDATE track_file
                     SET track_id = ?1, file_path = ?2, file_size = ?3, format = ?4,
                         duration = ?5, lyrics_path = ?6
                     WHERE id = ?7",
                    params![
                        file.track_id,
                        file.file_path,
                        file.file_size,
                        file.format,
                        file.duration,
                        file.lyrics_path,
                        id,
                    ],
                )?;
            }
            None => {
                self.conn
                    .execute(
                        "INSERT INTO track_file
                            (track_id, file_path, file_size, format, duration, lyrics_path)
                         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                        params![
                            file.track_id,
                            file.file_path,
                            file.file_size,
                            file.format,
                            file.duration,
                            file.lyrics_path,
                        ],
                    )
                    .with_context(|| format!("Failed to insert track file {}", file.file_path))?;
                file.id = Some(self.conn.last_insert_rowid());
            }
        }
        Ok(file)
    }

    fn save_track(&self, track: &Track) -> Result<()> {
        self.conn.execute(
            "UPDATE track SET has_file = ?1, downloaded = ?2 WHERE id = ?3",
            params![track.has_file, track.downloaded, track.id],
        )?;
        Ok(())
    }

    fn update_album_status(&self, album: &Album) -> Result<AlbumStatus> {
        let (total, with_files, downloaded): (i64, Option<i64>, Option<i64>) = self.conn.query_row(
            "SELECT COUNT(*), SUM(has_file), SUM(has_file AND downloaded)
             FROM track WHERE album_id = ?1",
            [album.id],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )?;
        let total = total as usize;
        let with_files = with_files.unwrap_or(0) as usize;
        let downloaded = downloaded.unwrap_or(0) as usize;

        let status = AlbumStatus::from_counts(total, with_files, downloaded);
        self.conn.execute(
            "UPDATE album SET has_file = ?1, downloaded = ?2, status = ?3 WHERE id = ?4",
            params![
                with_files > 0,
                total > 0 && downloaded == total,
                status.as_str(),
                album.id
            ],
        )?;

        tracing::debug!(
            album_id = album.id,
            total,
            with_files,
            downloaded,
            status = status.as_str(),
            "Album status updated"
        );
        Ok(status)
    }
}

impl CandidateStore for SqliteLibrary {
    fn unmatched_tracks(&self, limit: Option<usize>) -> Result<Vec<UnmatchedTrack>> {
        // SQLite treats a negative LIMIT as unbounded
        let limit = limit.map(|l| l as i64).unwrap_or(-1);
        let sql = format!("{} WHERE matched = 0 ORDER BY id LIMIT ?1", UNMATCHED_SELECT);
        let mut stmt = self.conn.prepare(&sql)?;
        let candidates = stmt
            .query_map([limit], unmatched_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(candidates)
    }

    fn unmatched_track(&self, id: i64) -> Result<Option<UnmatchedTrack>> {
        let sql = format!("{} WHERE id = ?1", UNMATCHED_SELECT);
        let candidate = self
            .conn
            .query_row(&sql, [id], unmatched_from_row)
            .optional()?;
        Ok(candidate)
    }

    fn save_unmatched_track(&self, candidate: &UnmatchedTrack) -> Result<()> {
        self.conn.execute(
            "UPDATE unmatched_track SET matched = ?1, last_attempted_match = ?2 WHERE id = ?3",
            params![
                candidate.matched,
                candidate.last_attempted_match.map(|t| t.to_rfc3339()),
                candidate.id,
            ],
        )?;
        Ok(())
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigProvider;
    use crate::models::fixtures;
    use serde_json::json;

    /// One artist with two albums; ids are returned for assertions.
    fn seeded() -> (SqliteLibrary, i64, i64, i64) {
        let library = SqliteLibrary::open_in_memory().unwrap();
        let artist = library.insert_artist("Test Artist").unwrap();
        let album = library
            .insert_album(artist, "Don’t Look Back", NaiveDate::from_ymd_opt(2020, 5, 1))
            .unwrap();
        let other = library.insert_album(artist, "Second Record", None).unwrap();
        let track = library
            .insert_track(album, "Song Name (Live)", Some("01"), Some(180))
            .unwrap();
        library.insert_track(album, "Another One", Some("02"), Some(200)).unwrap();
        library.insert_track(other, "It’s Fine", Some("A1"), None).unwrap();
        (library, artist, album, track)
    }

    fn artist(library: &SqliteLibrary) -> Artist {
        library.find_artist_by_name("Test Artist").unwrap().unwrap()
    }

    #[test]
    fn test_clean_track_title() {
        assert_eq!(clean_track_title("03. Song Name (Live)"), "Song Name");
        assert_eq!(clean_track_title("Song (Acoustic Version)"), "Song");
        assert_eq!(clean_track_title("Song feat. Other Artist"), "Song");
        assert_eq!(clean_track_title("Song (feat. Other Artist)"), "Song (feat. Other Artist)");
        assert_eq!(clean_track_title("Rock-n-Roll"), "Rock n Roll");
        assert_eq!(clean_track_title("Don’t   Stop"), "Don't Stop");
    }

    #[test]
    fn test_find_artist() {
        let (library, artist_id, _, _) = seeded();
        assert_eq!(artist(&library).id, artist_id);
        assert!(library.find_artist_by_name("test artist").unwrap().is_none());
    }

    #[test]
    fn test_album_flexible_lookup() {
        let (library, _, album_id, _) = seeded();
        let artist = artist(&library);

        let exact = library
            .find_album_by_title_and_artist_flexible("Don’t Look Back", &artist)
            .unwrap()
            .unwrap();
        assert_eq!(exact.id, album_id);
        assert_eq!(exact.release_year(), Some(2020));
        assert_eq!(exact.artist.as_ref().map(|a| a.name.as_str()), Some("Test Artist"));

        let folded = library
            .find_album_by_title_and_artist_flexible("don't look back", &artist)
            .unwrap();
        assert_eq!(folded.map(|a| a.id), Some(album_id));

        assert!(library
            .find_album_by_title_and_artist_flexible("Missing", &artist)
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_exact_track_lookup() {
        let (library, _, album_id, track_id) = seeded();
        let artist = artist(&library);
        let album = library.album(album_id).unwrap().unwrap();

        let found = library
            .find_track_by_artist_album_title(&artist, &album, "song name (live)")
            .unwrap()
            .unwrap();
        assert_eq!(found.id, track_id);
        assert_eq!(found.duration, Some(180));
        assert!(found.is_scorable());

        // Version suffix is only stripped by the flexible lookup
        assert!(library
            .find_track_by_artist_album_title(&artist, &album, "Song Name")
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_flexible_track_lookup() {
        let (library, _, _, track_id) = seeded();
        let artist = artist(&library);

        let cleaned = library
            .find_track_by_artist_title_flexible(&artist, "Song Name")
            .unwrap();
        assert_eq!(cleaned.map(|t| t.id), Some(track_id));

        let apostrophe = library
            .find_track_by_artist_title_flexible(&artist, "it's fine")
            .unwrap()
            .unwrap();
        assert_eq!(apostrophe.track_number.as_deref(), Some("A1"));

        assert!(library
            .find_track_by_artist_title_flexible(&artist, "Nope")
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_attach_file_and_album_status() {
        let (library, _, album_id, track_id) = seeded();
        let mut track = library.track(track_id).unwrap().unwrap();
        let album = library.album(album_id).unwrap().unwrap();

        let file = library
            .attach_file(
                &track,
                TrackFile {
                    file_path: "/music/song.flac".to_string(),
                    format: Some("flac".to_string()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert!(file.id.is_some());
        assert_eq!(file.track_id, track_id);
        assert_eq!(library.find_track_file_by_path("/music/song.flac").unwrap(), Some(file.clone()));

        track.has_file = true;
        track.downloaded = true;
        library.save_track(&track).unwrap();
        assert_eq!(library.update_album_status(&album).unwrap(), AlbumStatus::Partial);

        let refreshed = library.album(album_id).unwrap().unwrap();
        assert!(refreshed.has_file);
        assert!(!refreshed.downloaded);
        assert_eq!(refreshed.status, AlbumStatus::Partial);

        // Re-pointing an existing record keeps its id
        let other = library.tracks_by_artist("Test Artist").unwrap()[1].clone();
        let moved = library.attach_file(&other, file.clone()).unwrap();
        assert_eq!(moved.id, file.id);
        assert_eq!(library.track_files(other.id).unwrap().len(), 1);
        assert!(library.track_files(track_id).unwrap().is_empty());
    }

    #[test]
    fn test_unmatched_tracks() {
        let library = SqliteLibrary::open_in_memory().unwrap();
        let first = library.insert_unmatched_track(&fixtures::candidate()).unwrap();
        library
            .insert_unmatched_track(&UnmatchedTrack {
                file_path: "/library/other.mp3".to_string(),
                matched: true,
                ..fixtures::candidate()
            })
            .unwrap();
        library
            .insert_unmatched_track(&UnmatchedTrack {
                file_path: "/library/third.mp3".to_string(),
                ..fixtures::candidate()
            })
            .unwrap();

        assert_eq!(library.unmatched_tracks(None).unwrap().len(), 2);
        assert_eq!(library.unmatched_tracks(Some(1)).unwrap().len(), 1);

        let mut candidate = library.unmatched_track(first).unwrap().unwrap();
        assert_eq!(candidate.title.as_deref(), Some("Test Song"));
        assert_eq!(candidate.year, Some(2020));
        assert!(candidate.last_attempted_match.is_none());

        let stamp = Utc::now();
        candidate.matched = true;
        candidate.last_attempted_match = Some(stamp);
        library.save_unmatched_track(&candidate).unwrap();

        let saved = library.unmatched_track(first).unwrap().unwrap();
        assert!(saved.matched);
        assert_eq!(saved.last_attempted_match.map(|t| t.timestamp()), Some(stamp.timestamp()));
        assert_eq!(library.unmatched_tracks(None).unwrap().len(), 1);
    }

    #[test]
    fn test_load_configuration() {
        let library = SqliteLibrary::open_in_memory().unwrap();
        library.set_config("association.min_score", &json!(70.5)).unwrap();
        library.set_config("association.exact_artist_match", &json!(true)).unwrap();
        library.set_config("association.min_score", &json!(72.0)).unwrap();
        library
            .conn()
            .execute(
                "INSERT INTO configuration (key, value) VALUES ('library.name', 'not json')",
                [],
            )
            .unwrap();

        let config = library.configuration().unwrap();
        assert_eq!(config.len(), 3);
        assert_eq!(config.get_f64("association.min_score", 0.0), 72.0);
        assert!(config.get_bool("association.exact_artist_match", false));
        assert_eq!(config.get("library.name"), Some(json!("not json")));
    }
}
