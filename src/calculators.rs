//! Per-factor score calculators.
//!
//! Each calculator scores one dimension of a (catalog track, candidate file)
//! pair. A track without a resolved album and artist scores 0.0 with no
//! reason on every calculator. Scores may be negative; clamping happens in
//! the matcher.

use anyhow::{bail, Result};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::config::{ConfigProvider, EXACT_ALBUM_MATCH, EXACT_TITLE_MATCH, EXACT_YEAR_MATCH};
use crate::models::{Track, UnmatchedTrack};
use crate::normalize::similarity;
use crate::path_hints::PathHints;
use crate::strategy::{
    default_album_chain, default_artist_chain, default_duration_chain,
    default_track_number_chain, ExactAlbumMatch, ScoringStrategy, StrategyChain, DURATION_REJECTED,
};

// ============================================================================
// Calculator Kinds
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum CalculatorKind {
    Title,
    Artist,
    Album,
    Duration,
    Year,
    TrackNumber,
    Null,
}

impl CalculatorKind {
    pub const ALL: [CalculatorKind; 7] = [
        CalculatorKind::Title,
        CalculatorKind::Artist,
        CalculatorKind::Album,
        CalculatorKind::Duration,
        CalculatorKind::Year,
        CalculatorKind::TrackNumber,
        CalculatorKind::Null,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            CalculatorKind::Title => "title",
            CalculatorKind::Artist => "artist",
            CalculatorKind::Album => "album",
            CalculatorKind::Duration => "duration",
            CalculatorKind::Year => "year",
            CalculatorKind::TrackNumber => "trackNumber",
            CalculatorKind::Null => "null",
        }
    }

    /// Chain order: higher runs first.
    pub fn priority(self) -> i32 {
        match self {
            CalculatorKind::Title => 100,
            CalculatorKind::Artist => 80,
            CalculatorKind::Album => 60,
            CalculatorKind::Duration => 50,
            CalculatorKind::Year => 40,
            CalculatorKind::TrackNumber => 20,
            CalculatorKind::Null => 0,
        }
    }

    /// Parse a comma-separated allow-list ("title,artist").
    pub fn parse_list(s: &str) -> Result<Vec<CalculatorKind>> {
        s.split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(str::parse)
            .collect()
    }
}

impl fmt::Display for CalculatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CalculatorKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match CalculatorKind::ALL.iter().find(|k| k.as_str() == s) {
            Some(kind) => Ok(*kind),
            None => bail!("Unknown calculator type '{}'", s),
        }
    }
}

// ============================================================================
// Calculator Trait
// ============================================================================

pub trait ScoreCalculator: Send + Sync {
    fn kind(&self) -> CalculatorKind;

    fn priority(&self) -> i32 {
        self.kind().priority()
    }

    fn score(&self, track: &Track, candidate: &UnmatchedTrack, hints: &PathHints) -> f64;

    fn reason(&self, track: &Track, candidate: &UnmatchedTrack, hints: &PathHints) -> Option<String>;
}

fn non_empty(s: Option<&str>) -> Option<&str> {
    s.filter(|s| !s.is_empty())
}

// ============================================================================
// Title
// ============================================================================

pub struct TitleCalculator {
    config: Arc<dyn ConfigProvider>,
}

enum TitleOutcome {
    Exact,
    StrictMiss,
    Similar(f64),
}

impl TitleCalculator {
    pub fn new(config: Arc<dyn ConfigProvider>) -> Self {
        Self { config }
    }

    fn evaluate(&self, track: &Track, candidate: &UnmatchedTrack) -> Option<TitleOutcome> {
        if !track.is_scorable() {
            return None;
        }
        let catalog = non_empty(Some(track.title.as_str()))?;
        let title = non_empty(candidate.title.as_deref())?;

        if catalog == title {
            Some(TitleOutcome::Exact)
        } else if self.config.get_bool(EXACT_TITLE_MATCH, false) {
            Some(TitleOutcome::StrictMiss)
        } else {
            Some(TitleOutcome::Similar(similarity(catalog, title)))
        }
    }
}

impl ScoreCalculator for TitleCalculator {
    fn kind(&self) -> CalculatorKind {
        CalculatorKind::Title
    }

    fn score(&self, track: &Track, candidate: &UnmatchedTrack, _hints: &PathHints) -> f64 {
        match self.evaluate(track, candidate) {
            Some(TitleOutcome::Exact) => 100.0,
            Some(TitleOutcome::Similar(sim)) => sim * 100.0,
            Some(TitleOutcome::StrictMiss) | None => 0.0,
        }
    }

    fn reason(&self, track: &Track, candidate: &UnmatchedTrack, _hints: &PathHints) -> Option<String> {
        let reason = match self.evaluate(track, candidate)? {
            TitleOutcome::Exact => "Exact title match".to_string(),
            TitleOutcome::StrictMiss => "Exact title match required but not found".to_string(),
            TitleOutcome::Similar(sim) if sim < 0.2 => {
                "Title mismatch penalty (very low similarity)".to_string()
            }
            TitleOutcome::Similar(sim) => format!("Title similarity: {:.1}%", sim * 100.0),
        };
        Some(reason)
    }
}

// ============================================================================
// Artist
// ============================================================================

pub struct ArtistCalculator {
    strategies: StrategyChain<str>,
}

impl ArtistCalculator {
    pub fn new(config: Arc<dyn ConfigProvider>) -> Self {
        Self::with_strategies(default_artist_chain(config))
    }

    pub fn with_strategies(strategies: StrategyChain<str>) -> Self {
        Self { strategies }
    }

    fn names<'a>(track: &'a Track, candidate: &'a UnmatchedTrack) -> Option<(&'a str, &'a str)> {
        let catalog = non_empty(track.artist_name())?;
        let artist = non_empty(candidate.artist.as_deref())?;
        Some((catalog, artist))
    }
}

impl ScoreCalculator for ArtistCalculator {
    fn kind(&self) -> CalculatorKind {
        CalculatorKind::Artist
    }

    fn score(&self, track: &Track, candidate: &UnmatchedTrack, hints: &PathHints) -> f64 {
        Self::names(track, candidate)
            .map(|(catalog, artist)| self.strategies.score(catalog, artist, hints))
            .unwrap_or(0.0)
    }

    fn reason(&self, track: &Track, candidate: &UnmatchedTrack, hints: &PathHints) -> Option<String> {
        let (catalog, artist) = Self::names(track, candidate)?;
        self.strategies.reason(catalog, artist, hints)
    }
}

// ============================================================================
// Album
// ============================================================================

pub struct AlbumCalculator {
    strategies: StrategyChain<str>,
    config: Arc<dyn ConfigProvider>,
}

/// Drop colons and dashes, squeeze double spaces, trim.
pub fn clean_album_title(title: &str) -> String {
    title
        .replace([':', '-'], "")
        .replace("  ", " ")
        .trim()
        .to_string()
}

impl AlbumCalculator {
    pub fn new(config: Arc<dyn ConfigProvider>) -> Self {
        Self::with_strategies(default_album_chain(), config)
    }

    pub fn with_strategies(strategies: StrategyChain<str>, config: Arc<dyn ConfigProvider>) -> Self {
        Self { strategies, config }
    }

    fn cleaned_titles(track: &Track, candidate: &UnmatchedTrack) -> Option<(String, String)> {
        if !track.is_scorable() {
            return None;
        }
        let catalog = non_empty(track.album_title())?;
        let album = non_empty(candidate.album.as_deref())?;
        Some((clean_album_title(catalog), clean_album_title(album)))
    }

    /// Strict mode only accepts titles that are equal once cleaned.
    fn strict_miss(&self, catalog: &str, album: &str, hints: &PathHints) -> bool {
        self.config.get_bool(EXACT_ALBUM_MATCH, false)
            && ExactAlbumMatch.score(catalog, album, hints) == 0.0
    }
}

impl ScoreCalculator for AlbumCalculator {
    fn kind(&self) -> CalculatorKind {
        CalculatorKind::Album
    }

    fn score(&self, track: &Track, candidate: &UnmatchedTrack, hints: &PathHints) -> f64 {
        let Some((catalog, album)) = Self::cleaned_titles(track, candidate) else {
            return 0.0;
        };
        if self.strict_miss(&catalog, &album, hints) {
            return 0.0;
        }
        self.strategies.score(&catalog, &album, hints)
    }

    fn reason(&self, track: &Track, candidate: &UnmatchedTrack, hints: &PathHints) -> Option<String> {
        let (catalog, album) = Self::cleaned_titles(track, candidate)?;
        if self.strict_miss(&catalog, &album, hints) {
            return Some("Exact album match required but not found".to_string());
        }
        self.strategies.reason(&catalog, &album, hints)
    }
}

// ============================================================================
// Duration
// ============================================================================

pub struct DurationCalculator {
    strategies: StrategyChain<u32>,
}

impl DurationCalculator {
    pub fn new(config: Arc<dyn ConfigProvider>) -> Self {
        Self {
            strategies: default_duration_chain(config),
        }
    }

    fn durations(track: &Track, candidate: &UnmatchedTrack) -> Option<(u32, u32)> {
        if !track.is_scorable() {
            return None;
        }
        Some((track.duration?, candidate.duration?))
    }
}

impl ScoreCalculator for DurationCalculator {
    fn kind(&self) -> CalculatorKind {
        CalculatorKind::Duration
    }

    fn score(&self, track: &Track, candidate: &UnmatchedTrack, hints: &PathHints) -> f64 {
        let Some((catalog, file)) = Self::durations(track, candidate) else {
            return 0.0;
        };
        let score = self.strategies.score(&catalog, &file, hints);
        // Strict rejection contributes nothing rather than a negative score
        if score == DURATION_REJECTED {
            0.0
        } else {
            score
        }
    }

    fn reason(&self, track: &Track, candidate: &UnmatchedTrack, hints: &PathHints) -> Option<String> {
        let (catalog, file) = Self::durations(track, candidate)?;
        self.strategies.reason(&catalog, &file, hints)
    }
}

// ============================================================================
// Year
// ============================================================================

pub struct YearCalculator {
    config: Arc<dyn ConfigProvider>,
}

impl YearCalculator {
    pub fn new(config: Arc<dyn ConfigProvider>) -> Self {
        Self { config }
    }

    fn years(track: &Track, candidate: &UnmatchedTrack) -> Option<(i32, i32)> {
        if !track.is_scorable() {
            return None;
        }
        let catalog = track.album.as_ref()?.release_year()?;
        Some((catalog, candidate.year?))
    }

    fn strict(&self) -> bool {
        self.config.get_bool(EXACT_YEAR_MATCH, false)
    }
}

impl ScoreCalculator for YearCalculator {
    fn kind(&self) -> CalculatorKind {
        CalculatorKind::Year
    }

    fn score(&self, track: &Track, candidate: &UnmatchedTrack, _hints: &PathHints) -> f64 {
        match Self::years(track, candidate).map(|(a, b)| a.abs_diff(b)) {
            Some(0) => 100.0,
            Some(_) if self.strict() => 0.0,
            Some(1) => 80.0,
            Some(2) => 60.0,
            Some(3) => 40.0,
            Some(_) => 20.0,
            None => 0.0,
        }
    }

    fn reason(&self, track: &Track, candidate: &UnmatchedTrack, _hints: &PathHints) -> Option<String> {
        let (catalog, year) = Self::years(track, candidate)?;
        let reason = match catalog.abs_diff(year) {
            0 => format!("Exact year match: {}", year),
            d if self.strict() => format!("Year mismatch (exact match required): {} year difference", d),
            d @ 1..=2 => format!("Close year match: {} year difference", d),
            d => format!("Year match: {} year difference", d),
        };
        Some(reason)
    }
}

// ============================================================================
// Track Number
// ============================================================================

pub struct TrackNumberCalculator {
    strategies: StrategyChain<str>,
}

impl TrackNumberCalculator {
    pub fn new() -> Self {
        Self {
            strategies: default_track_number_chain(),
        }
    }

    fn numbers<'a>(track: &'a Track, candidate: &'a UnmatchedTrack) -> Option<(&'a str, &'a str)> {
        if !track.is_scorable() {
            return None;
        }
        Some((track.track_number.as_deref()?, candidate.track_number.as_deref()?))
    }
}

impl Default for TrackNumberCalculator {
    fn default() -> Self {
        Self::new()
    }
}

impl ScoreCalculator for TrackNumberCalculator {
    fn kind(&self) -> CalculatorKind {
        CalculatorKind::TrackNumber
    }

    fn score(&self, track: &Track, candidate: &UnmatchedTrack, hints: &PathHints) -> f64 {
        Self::numbers(track, candidate)
            .map(|(catalog, number)| self.strategies.score(catalog, number, hints))
            .unwrap_or(0.0)
    }

    fn reason(&self, track: &Track, candidate: &UnmatchedTrack, hints: &PathHints) -> Option<String> {
        let (catalog, number) = Self::numbers(track, candidate)?;
        self.strategies.reason(catalog, number, hints)
    }
}

// ============================================================================
// Null
// ============================================================================

/// Neutral calculator; contributes nothing.
pub struct NullCalculator;

impl ScoreCalculator for NullCalculator {
    fn kind(&self) -> CalculatorKind {
        CalculatorKind::Null
    }

    fn score(&self, _track: &Track, _candidate: &UnmatchedTrack, _hints: &PathHints) -> f64 {
        0.0
    }

    fn reason(&self, _track: &Track, _candidate: &UnmatchedTrack, _hints: &PathHints) -> Option<String> {
        None
    }
}

// ============================================================================
// TESTS
// ============================================================================
