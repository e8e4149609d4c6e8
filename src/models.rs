//! Core data models for catalog matching.
//!
//! Catalog entities (artist, album, track), the candidate file record that
//! is matched against them, the file record produced by an association, and
//! run statistics.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::Serialize;

// ============================================================================
// Catalog Models
// ============================================================================

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Artist {
    pub id: i64,
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Album {
    pub id: i64,
    pub title: String,
    pub release_date: Option<NaiveDate>,
    pub artist: Option<Artist>,
    pub has_file: bool,
    pub downloaded: bool,
    pub status: AlbumStatus,
}

impl Album {
    pub fn release_year(&self) -> Option<i32> {
        self.release_date.map(|d| d.year())
    }
}

/// Catalog track. The album (and through it the artist) is loaded eagerly;
/// scoring treats a track without both as unscorable.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Track {
    pub id: i64,
    pub title: String,
    /// Kept as text: vinyl releases use "A1", "B2", ...
    pub track_number: Option<String>,
    /// Seconds
    pub duration: Option<u32>,
    pub album: Option<Album>,
    pub has_file: bool,
    pub downloaded: bool,
}

impl Track {
    pub fn artist(&self) -> Option<&Artist> {
        self.album.as_ref().and_then(|a| a.artist.as_ref())
    }

    pub fn artist_name(&self) -> Option<&str> {
        self.artist().map(|a| a.name.as_str())
    }

    pub fn album_title(&self) -> Option<&str> {
        self.album.as_ref().map(|a| a.title.as_str())
    }

    /// Album and artist both resolved.
    pub fn is_scorable(&self) -> bool {
        self.artist().is_some()
    }
}

/// Album aggregate status, recomputed from its tracks.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AlbumStatus {
    Empty,
    Missing,
    Downloaded,
    Partial,
    #[default]
    Unknown,
}

impl AlbumStatus {
    pub fn from_counts(total: usize, with_files: usize, downloaded: usize) -> Self {
        if total == 0 {
            AlbumStatus::Empty
        } else if with_files == 0 {
            AlbumStatus::Missing
        } else if downloaded == total {
            AlbumStatus::Downloaded
        } else if with_files < total {
            AlbumStatus::Partial
        } else {
            AlbumStatus::Unknown
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AlbumStatus::Empty => "empty",
            AlbumStatus::Missing => "missing",
            AlbumStatus::Downloaded => "downloaded",
            AlbumStatus::Partial => "partial",
            AlbumStatus::Unknown => "unknown",
        }
    }
}

impl From<Option<&str>> for AlbumStatus {
    fn from(s: Option<&str>) -> Self {
        match s {
            Some("empty") => AlbumStatus::Empty,
            Some("missing") => AlbumStatus::Missing,
            Some("downloaded") => AlbumStatus::Downloaded,
            Some("partial") => AlbumStatus::Partial,
            _ => AlbumStatus::Unknown,
        }
    }
}

// ============================================================================
// Candidate + File Models
// ============================================================================

/// A file found on disk that is not yet linked to a catalog track.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct UnmatchedTrack {
    pub id: i64,
    pub file_path: String,
    pub file_name: Option<String>,
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub track_number: Option<String>,
    pub year: Option<i32>,
    /// Seconds
    pub duration: Option<u32>,
    /// Bytes
    pub file_size: Option<i64>,
    pub extension: Option<String>,
    pub lyrics_path: Option<String>,
    pub last_attempted_match: Option<DateTime<Utc>>,
    pub matched: bool,
}

/// File record linking a path on disk to a catalog track.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct TrackFile {
    /// None until persisted
    pub id: Option<i64>,
    pub track_id: i64,
    pub file_path: String,
    pub file_size: Option<i64>,
    pub format: Option<String>,
    pub duration: Option<u32>,
    pub lyrics_path: Option<String>,
}

// ============================================================================
// Scoring Models
// ============================================================================

/// Summed calculator output: raw total plus the reasons that contributed.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ScoreResult {
    pub score: f64,
    pub reasons: Vec<String>,
}

// ============================================================================
// Statistics (Instrumentation)
// ============================================================================

/// Counters for one association run.
#[derive(Default, Debug, Clone, Serialize)]
pub struct AssociationStats {
    pub candidates_seen: usize,
    pub skipped_count: usize,
    pub associated_count: usize,
    pub not_found_count: usize,
    pub audio_analysis_count: usize,
    pub errors: Vec<String>,

    // Score bands of accepted associations
    pub score_excellent: usize,
    pub score_good: usize,
    pub score_fair: usize,
    pub score_poor: usize,

    pub elapsed_seconds: f64,
}

impl AssociationStats {
    /// Association rate over the candidates that were actually processed
    pub fn association_rate(&self) -> f64 {
        let processed = self.associated_count + self.not_found_count;
        if processed == 0 {
            0.0
        } else {
            100.0 * self.associated_count as f64 / processed as f64
        }
    }

    pub fn record_score_band(&mut self, score: f64) {
        match score_quality(score) {
            "excellent" => self.score_excellent += 1,
            "good" => self.score_good += 1,
            "fair" => self.score_fair += 1,
            _ => self.score_poor += 1,
        }
    }

    /// Log stats to stderr in JSON format
    pub fn log_phase(&self, phase: &str) {
        if let Ok(json) = serde_json::to_string_pretty(self) {
            eprintln!("[STATS:{}]\n{}", phase, json);
        }
    }

    /// Write stats to a JSON file
    pub fn write_to_file(&self, path: &std::path::Path) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

/// Quality band for an accepted match score.
pub fn score_quality(score: f64) -> &'static str {
    if score >= 80.0 {
        "excellent"
    } else if score >= 60.0 {
        "good"
    } else if score >= 40.0 {
        "fair"
    } else {
        "poor"
    }
}

// ============================================================================
// Test Fixtures
// ============================================================================
